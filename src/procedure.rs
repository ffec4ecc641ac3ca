//! Stored procedure calls.
//!
//! A call is built either ad hoc from a database procedure name or from a
//! [`NamedProcedure`] declaration that fixes the parameter signature up
//! front. IN parameters are registered named or positional (1-based, never
//! mixed); output parameters always sit after all inputs. Execution hands
//! the call to the executor and shapes the returned outputs: one declared
//! output yields a scalar, several yield a name→value map.

use std::collections::HashMap;
use std::fmt;

use sea_query::{Value, Values};

use crate::error::QuarryError;
use crate::executor::QueryExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    In,
    InOut,
    Out,
}

/// One parameter slot in a procedure signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParameter {
    name: Option<String>,
    position: u32,
    mode: ParameterMode,
}

impl ProcedureParameter {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    /// The key outputs are reported under: the declared name, or the
    /// stringified position for unnamed parameters.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.position.to_string(),
        }
    }
}

/// An up-front procedure declaration, the counterpart of a procedure
/// registered on an entity rather than named inline at the call site.
#[derive(Debug, Clone)]
pub struct NamedProcedure {
    name: String,
    procedure_name: String,
    outputs: Vec<String>,
}

impl NamedProcedure {
    pub fn new(name: impl Into<String>, procedure_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procedure_name: procedure_name.into(),
            outputs: Vec::new(),
        }
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn procedure_name(&self) -> &str {
        &self.procedure_name
    }
}

/// How the call site refers to the procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureRef {
    /// A declared procedure, addressed by its registration name.
    Named(String),
    /// A database procedure addressed directly.
    AdHoc(String),
}

impl fmt::Display for ProcedureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureRef::Named(name) => write!(f, "named procedure '{name}'"),
            ProcedureRef::AdHoc(name) => write!(f, "procedure '{name}'"),
        }
    }
}

/// Builder for a single stored procedure invocation.
///
/// # Example
///
/// ```ignore
/// let call = StoredProcedureQuery::ad_hoc("plus1inout")
///     .in_param("arg", 4)
///     .out_param("res")
///     .build()?;
/// let output = call.execute(&executor)?;
/// ```
pub struct StoredProcedureQuery {
    reference: ProcedureRef,
    procedure_name: String,
    in_parameters: Vec<(Option<String>, Value)>,
    out_parameters: Vec<Option<String>>,
}

impl StoredProcedureQuery {
    pub fn ad_hoc(procedure_name: impl Into<String>) -> Self {
        let procedure_name = procedure_name.into();
        Self {
            reference: ProcedureRef::AdHoc(procedure_name.clone()),
            procedure_name,
            in_parameters: Vec::new(),
            out_parameters: Vec::new(),
        }
    }

    /// Start from a declaration: the database name and declared outputs come
    /// from the registration, only inputs remain to be bound.
    pub fn named(declaration: &NamedProcedure) -> Self {
        Self {
            reference: ProcedureRef::Named(declaration.name.clone()),
            procedure_name: declaration.procedure_name.clone(),
            in_parameters: Vec::new(),
            out_parameters: declaration.outputs.iter().cloned().map(Some).collect(),
        }
    }

    pub fn in_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.in_parameters.push((Some(name.into()), value.into()));
        self
    }

    /// Register the next positional input; positions follow registration
    /// order, starting at 1.
    pub fn in_param_at(mut self, value: impl Into<Value>) -> Self {
        self.in_parameters.push((None, value.into()));
        self
    }

    pub fn out_param(mut self, name: impl Into<String>) -> Self {
        self.out_parameters.push(Some(name.into()));
        self
    }

    pub fn out_param_at(mut self) -> Self {
        self.out_parameters.push(None);
        self
    }

    /// Validate and assemble the call. Named and positional parameters
    /// cannot be mixed; output positions are assigned after all inputs.
    pub fn build(self) -> Result<ProcedureCall, QuarryError> {
        let named = self
            .in_parameters
            .iter()
            .filter(|(name, _)| name.is_some())
            .count()
            + self.out_parameters.iter().filter(|n| n.is_some()).count();
        let total = self.in_parameters.len() + self.out_parameters.len();
        if named != 0 && named != total {
            return Err(QuarryError::InvalidUsage(format!(
                "{} mixes named and positional parameters",
                self.reference
            )));
        }

        let mut parameters = Vec::with_capacity(self.in_parameters.len());
        let mut values = Vec::with_capacity(self.in_parameters.len());
        for (index, (name, value)) in self.in_parameters.into_iter().enumerate() {
            parameters.push(ProcedureParameter {
                name,
                position: index as u32 + 1,
                mode: ParameterMode::In,
            });
            values.push(value);
        }

        let offset = parameters.len() as u32;
        let outputs = self
            .out_parameters
            .into_iter()
            .enumerate()
            .map(|(index, name)| ProcedureParameter {
                name,
                position: offset + index as u32 + 1,
                mode: ParameterMode::Out,
            })
            .collect();

        Ok(ProcedureCall {
            reference: self.reference,
            procedure_name: self.procedure_name,
            parameters,
            values,
            outputs,
        })
    }
}

/// Shaped result of a procedure invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureOutput {
    None,
    Scalar(Value),
    Map(HashMap<String, Value>),
}

impl ProcedureOutput {
    pub fn scalar(self) -> Option<Value> {
        match self {
            ProcedureOutput::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn map(self) -> Option<HashMap<String, Value>> {
        match self {
            ProcedureOutput::Map(map) => Some(map),
            _ => None,
        }
    }
}

/// A fully built procedure invocation, ready for the executor.
#[derive(Debug, Clone)]
pub struct ProcedureCall {
    reference: ProcedureRef,
    procedure_name: String,
    parameters: Vec<ProcedureParameter>,
    values: Vec<Value>,
    outputs: Vec<ProcedureParameter>,
}

impl ProcedureCall {
    pub fn reference(&self) -> &ProcedureRef {
        &self.reference
    }

    pub fn procedure_name(&self) -> &str {
        &self.procedure_name
    }

    pub fn in_parameters(&self) -> &[ProcedureParameter] {
        &self.parameters
    }

    pub fn in_values(&self) -> &[Value] {
        &self.values
    }

    pub fn out_parameters(&self) -> &[ProcedureParameter] {
        &self.outputs
    }

    /// Render `CALL name($1, .., NULL, ..)`: one numbered bind per input,
    /// `NULL` for each output slot.
    pub fn to_sql(&self) -> (String, Values) {
        let mut args = Vec::with_capacity(self.parameters.len() + self.outputs.len());
        for n in 1..=self.values.len() {
            args.push(format!("${n}"));
        }
        for _ in &self.outputs {
            args.push("NULL".to_string());
        }
        let sql = format!("CALL {}({})", self.procedure_name, args.join(", "));
        (sql, Values(self.values.clone()))
    }

    /// Execute through the provider and shape the outputs.
    pub fn execute(&self, executor: &dyn QueryExecutor) -> Result<ProcedureOutput, QuarryError> {
        let returned = executor.call(self)?;
        self.extract(returned)
    }

    /// A procedure-backed query has no derivable count form.
    pub fn count(&self) -> Result<u64, QuarryError> {
        Err(QuarryError::Unsupported(format!(
            "count query for {} is not supported",
            self.reference
        )))
    }

    fn extract(&self, returned: Vec<(String, Value)>) -> Result<ProcedureOutput, QuarryError> {
        match self.outputs.len() {
            0 => Ok(ProcedureOutput::None),
            1 => {
                let declared = &self.outputs[0];
                let value = match declared.name() {
                    Some(name) => returned
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value.clone()),
                    None => returned.first().map(|(_, value)| value.clone()),
                };
                let value = value.ok_or_else(|| {
                    QuarryError::Execution(format!(
                        "{} returned no value for output parameter '{}'",
                        self.reference,
                        declared.label()
                    ))
                })?;
                Ok(ProcedureOutput::Scalar(value))
            }
            _ => {
                let mut by_name: HashMap<String, Value> = returned.into_iter().collect();
                let mut map = HashMap::with_capacity(self.outputs.len());
                for declared in &self.outputs {
                    let label = declared.label();
                    let value = by_name.remove(&label).ok_or_else(|| {
                        QuarryError::Execution(format!(
                            "{} returned no value for output parameter '{label}'",
                            self.reference
                        ))
                    })?;
                    map.insert(label, value);
                }
                Ok(ProcedureOutput::Map(map))
            }
        }
    }
}
