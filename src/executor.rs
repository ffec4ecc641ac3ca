//! Provider contract: statements, rows, and the executor trait.
//!
//! The persistence provider is opaque to this crate. Queries are rendered to
//! a [`Statement`] (SQL text, positional values, and per-invocation
//! metadata: lock mode, hints, comment, fetch graph) and handed to a
//! [`QueryExecutor`]. All execution is blocking on the caller's thread; the
//! crate schedules nothing itself.

use sea_query::{Value, Values};

use crate::error::QuarryError;
use crate::metadata::{CrudMethodMetadata, EntityGraph, LockMode, QueryHint};
use crate::procedure::ProcedureCall;
use crate::value::ValueType;

/// A fully rendered query plus the metadata the provider must apply.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub values: Values,
    pub lock: Option<LockMode>,
    pub hints: Vec<QueryHint>,
    pub comment: Option<String>,
    pub graph: Option<EntityGraph>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Values) -> Self {
        Self {
            sql: sql.into(),
            values,
            lock: None,
            hints: Vec::new(),
            comment: None,
            graph: None,
        }
    }

    /// Copy resolved method metadata onto this statement.
    ///
    /// Count queries receive only the hints flagged for counting and never a
    /// lock mode or fetch graph.
    pub fn apply_metadata(mut self, metadata: &CrudMethodMetadata, for_count: bool) -> Self {
        if for_count {
            self.hints = metadata.query_hints().for_count().cloned().collect();
        } else {
            self.hints = metadata.query_hints().for_query().cloned().collect();
            self.lock = metadata.lock_mode();
            self.graph = metadata.entity_graph().cloned();
        }
        self.comment = metadata.comment().map(str::to_string);
        self
    }
}

/// One result row: column names plus dynamic values, in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. Fails if names and values disagree in length.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Result<Self, QuarryError> {
        if columns.len() != values.len() {
            return Err(QuarryError::Conversion(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The raw value of a column, by name.
    pub fn raw(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// The raw value at a select-list position.
    pub fn raw_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Typed access by column name.
    pub fn get<T: ValueType>(&self, column: &str) -> Result<T, QuarryError> {
        let value = self.raw(column).ok_or_else(|| {
            QuarryError::Conversion(format!("no column '{column}' in result row"))
        })?;
        T::from_value(value.clone()).ok_or_else(|| {
            QuarryError::Conversion(format!("column '{column}' holds an unexpected value type"))
        })
    }

    /// Typed access by select-list position.
    pub fn get_at<T: ValueType>(&self, index: usize) -> Result<T, QuarryError> {
        let value = self.raw_at(index).ok_or_else(|| {
            QuarryError::Conversion(format!("no column at index {index} in result row"))
        })?;
        T::from_value(value.clone()).ok_or_else(|| {
            QuarryError::Conversion(format!("column {index} holds an unexpected value type"))
        })
    }
}

/// Fallible conversion from a result row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, QuarryError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, QuarryError> {
        Ok(row.clone())
    }
}

/// Blocking execution facade over the persistence provider.
///
/// Implementations apply the statement's lock mode, hints, comment and fetch
/// graph in whatever way the provider supports; this crate only carries them.
pub trait QueryExecutor {
    /// Execute a data-modifying statement; returns affected row count.
    fn execute(&self, statement: &Statement) -> Result<u64, QuarryError>;

    /// Execute a select and materialize every row.
    fn query(&self, statement: &Statement) -> Result<Vec<Row>, QuarryError>;

    /// Execute a stored procedure call; returns its outputs in registration
    /// order as (parameter name, value) pairs.
    fn call(&self, procedure: &ProcedureCall) -> Result<Vec<(String, Value)>, QuarryError>;
}
