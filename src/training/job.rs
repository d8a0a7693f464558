// Training job for speech-data
// The request handed to the pipeline and its control file layout

use serde::{Deserialize, Serialize};

/// One training request for the external pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub label_names: Vec<String>,
    pub sample_duration_cut_off: i64,
    pub speech_api_name: String,
}

impl TrainingJob {
    /// Records of the control file, in the order the watcher reads them:
    /// comma-joined label names, the cutoff, then the API name
    pub fn control_file_lines(&self) -> [String; 3] {
        [
            self.label_names.join(","),
            self.sample_duration_cut_off.to_string(),
            self.speech_api_name.clone(),
        ]
    }

    pub fn control_file_contents(&self) -> String {
        let mut contents = self.control_file_lines().join("\n");
        contents.push('\n');
        contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_file_layout() {
        let job = TrainingJob {
            label_names: vec!["Yes".into(), "No".into()],
            sample_duration_cut_off: 5,
            speech_api_name: "YesNo".into(),
        };

        assert_eq!(job.control_file_contents(), "Yes,No\n5\nYesNo\n");
    }
}
