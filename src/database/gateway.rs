// Data store gateway for speech-data
// Statements, row sets, and the trait every store backend implements

use std::fmt;

use rusqlite::types::Value;

use crate::error::StoreError;

/// A unit of work sent to the store: a named procedure or an inline query.
///
/// Every value travels as a bound parameter; nothing is formatted into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Procedure {
        name: &'static str,
        args: Vec<(&'static str, Value)>,
    },
    Query {
        sql: &'static str,
        params: Vec<Value>,
    },
}

impl Statement {
    pub fn procedure(name: &'static str) -> Self {
        Statement::Procedure {
            name,
            args: Vec::new(),
        }
    }

    pub fn query(sql: &'static str) -> Self {
        Statement::Query {
            sql,
            params: Vec::new(),
        }
    }

    /// Add a named argument to a procedure call
    pub fn arg(mut self, arg_name: &'static str, value: impl Into<Value>) -> Self {
        if let Statement::Procedure { args, .. } = &mut self {
            args.push((arg_name, value.into()));
        }
        self
    }

    /// Bind the next positional parameter of an inline query
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        if let Statement::Query { params, .. } = &mut self {
            params.push(value.into());
        }
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Procedure { name, .. } => f.write_str(name),
            Statement::Query { .. } => f.write_str("inline query"),
        }
    }
}

/// One result row with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn value(&self, column: &str) -> Result<&Value, StoreError> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| StoreError::new(format!("Column '{}' missing from result row", column)))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, StoreError> {
        match self.value(column)? {
            Value::Integer(v) => Ok(*v),
            other => Err(type_mismatch(column, "integer", other)),
        }
    }

    pub fn get_text(&self, column: &str) -> Result<String, StoreError> {
        match self.value(column)? {
            Value::Text(v) => Ok(v.clone()),
            other => Err(type_mismatch(column, "text", other)),
        }
    }

    pub fn get_opt_text(&self, column: &str) -> Result<Option<String>, StoreError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(v.clone())),
            other => Err(type_mismatch(column, "text", other)),
        }
    }

    /// SQLite stores flags as integers
    pub fn get_bool(&self, column: &str) -> Result<bool, StoreError> {
        Ok(self.get_i64(column)? != 0)
    }
}

fn type_mismatch(column: &str, expected: &str, found: &Value) -> StoreError {
    StoreError::new(format!(
        "Column '{}' expected {}, found {:?}",
        column,
        expected,
        found.data_type()
    ))
}

/// Executes statements against the relational store.
///
/// Each call is one atomic unit: implementations acquire their own connection,
/// and release it on every exit path.
pub trait StoreGateway: Send + Sync {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, StoreError>;
}

impl<T: StoreGateway + ?Sized> StoreGateway for &T {
    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        (**self).execute(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::new(vec![
            ("id".to_string(), Value::Integer(4)),
            ("name".to_string(), Value::Text("Yes".to_string())),
            ("description".to_string(), Value::Null),
            ("is_active".to_string(), Value::Integer(1)),
        ])
    }

    #[test]
    fn test_typed_accessors() {
        let row = sample_row();
        assert_eq!(row.get_i64("id").unwrap(), 4);
        assert_eq!(row.get_text("name").unwrap(), "Yes");
        assert_eq!(row.get_opt_text("description").unwrap(), None);
        assert!(row.get_bool("is_active").unwrap());
    }

    #[test]
    fn test_missing_and_mismatched_columns() {
        let row = sample_row();
        assert!(row.get_i64("sample_count").is_err());
        assert!(row.get_i64("name").is_err());
        assert!(row.get_text("id").is_err());
    }

    #[test]
    fn test_builders_ignore_wrong_kind() {
        let query = Statement::query("SELECT 1").arg("Ignored", 1i64).bind(2i64);
        assert_eq!(
            query,
            Statement::Query {
                sql: "SELECT 1",
                params: vec![Value::Integer(2)],
            }
        );

        let procedure = Statement::procedure("GetCollections").arg("LabelId", 9i64);
        assert_eq!(procedure.to_string(), "GetCollections");
    }
}
