//! Parameter binding for hand-written query strings.
//!
//! [`StringQuery`] parses `:name`, `?position` and `:#{expression}`
//! placeholders out of a SQL string, recognises `LIKE %:name%` and
//! `IN :names` usage around them, and rewrites the text to numbered `$n`
//! placeholders. [`Parameters`] carries the caller-supplied values;
//! [`StringQuery::bind`] marries the two into a final SQL string plus an
//! ordered value list, failing loudly when a placeholder has no value.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use sea_query::{Value, Values};

use crate::error::QuarryError;

/// How a parameter is addressed: by name, by 1-based position, or both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingIdentifier {
    Name(String),
    Position(u32),
}

impl BindingIdentifier {
    pub fn named(name: impl Into<String>) -> Self {
        BindingIdentifier::Name(name.into())
    }

    pub fn positional(position: u32) -> Self {
        BindingIdentifier::Position(position)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            BindingIdentifier::Name(name) => Some(name),
            BindingIdentifier::Position(_) => None,
        }
    }

    pub fn position(&self) -> Option<u32> {
        match self {
            BindingIdentifier::Name(_) => None,
            BindingIdentifier::Position(position) => Some(*position),
        }
    }
}

impl fmt::Display for BindingIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingIdentifier::Name(name) => write!(f, ":{name}"),
            BindingIdentifier::Position(position) => write!(f, "?{position}"),
        }
    }
}

/// Where a binding came from: written literally in the query string, or
/// synthesised (an expression the caller computes rather than passes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterOrigin {
    MethodArgument(BindingIdentifier),
    Expression(String),
}

impl fmt::Display for ParameterOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterOrigin::MethodArgument(identifier) => write!(f, "{identifier}"),
            ParameterOrigin::Expression(expression) => write!(f, "#{{{expression}}}"),
        }
    }
}

/// LIKE wildcard placement derived from the `%` markers surrounding a
/// placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMatch {
    /// `value` as written, wildcards included by the caller.
    Like,
    /// `value%`
    StartingWith,
    /// `%value`
    EndingWith,
    /// `%value%`
    Containing,
}

/// Escapes LIKE wildcard characters inside user-supplied match values so
/// they match literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeEscaper {
    escape_character: char,
}

impl LikeEscaper {
    pub fn new(escape_character: char) -> Result<Self, QuarryError> {
        if escape_character == '%' || escape_character == '_' {
            return Err(QuarryError::InvalidUsage(format!(
                "'{escape_character}' cannot be used as a LIKE escape character"
            )));
        }
        Ok(Self { escape_character })
    }

    pub fn escape_character(&self) -> char {
        self.escape_character
    }

    /// Escape `%`, `_` and the escape character itself.
    pub fn escape(&self, value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            if c == '%' || c == '_' || c == self.escape_character {
                escaped.push(self.escape_character);
            }
            escaped.push(c);
        }
        escaped
    }
}

impl Default for LikeEscaper {
    fn default() -> Self {
        Self {
            escape_character: '\\',
        }
    }
}

impl LikeMatch {
    /// Escape the raw value and attach the wildcards this match mode
    /// implies.
    pub fn prepare(&self, value: &str, escaper: &LikeEscaper) -> String {
        match self {
            LikeMatch::Like => value.to_string(),
            LikeMatch::StartingWith => format!("{}%", escaper.escape(value)),
            LikeMatch::EndingWith => format!("%{}", escaper.escape(value)),
            LikeMatch::Containing => format!("%{}%", escaper.escape(value)),
        }
    }
}

/// Precision a date-time argument is narrowed to before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
}

impl TemporalKind {
    pub fn coerce(&self, value: NaiveDateTime) -> Value {
        match self {
            TemporalKind::Date => Value::from(value.date()),
            TemporalKind::Time => Value::from(value.time()),
            TemporalKind::Timestamp => Value::from(value),
        }
    }
}

/// What a placeholder expects beyond a plain scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Simple,
    Like(LikeMatch),
    In,
}

/// One placeholder occurrence in a parsed query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    identifier: BindingIdentifier,
    origin: ParameterOrigin,
    kind: BindingKind,
}

impl ParameterBinding {
    pub fn new(identifier: BindingIdentifier, kind: BindingKind) -> Self {
        let origin = ParameterOrigin::MethodArgument(identifier.clone());
        Self {
            identifier,
            origin,
            kind,
        }
    }

    /// A binding whose value is the result of `expression`, computed by the
    /// caller and supplied through [`Parameters::bind_expression`] rather
    /// than passed as a method argument.
    pub fn expression(
        identifier: BindingIdentifier,
        expression: impl Into<String>,
        kind: BindingKind,
    ) -> Self {
        Self {
            identifier,
            origin: ParameterOrigin::Expression(expression.into()),
            kind,
        }
    }

    pub fn identifier(&self) -> &BindingIdentifier {
        &self.identifier
    }

    pub fn origin(&self) -> &ParameterOrigin {
        &self.origin
    }

    pub fn kind(&self) -> &BindingKind {
        &self.kind
    }
}

/// A single bound value or a collection destined for an `IN` list.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Single(Value),
    Multiple(Vec<Value>),
}

/// Caller-supplied parameter values, addressable by name and position.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    named: HashMap<String, ParameterValue>,
    positional: HashMap<u32, ParameterValue>,
    expressions: HashMap<String, ParameterValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named
            .insert(name.into(), ParameterValue::Single(value.into()));
        self
    }

    pub fn bind_at(mut self, position: u32, value: impl Into<Value>) -> Self {
        self.positional
            .insert(position, ParameterValue::Single(value.into()));
        self
    }

    /// Bind a collection for an `IN` placeholder. Nested collections are
    /// not supported; the values are bound one placeholder slot each.
    pub fn bind_all<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.named
            .insert(name.into(), ParameterValue::Multiple(values));
        self
    }

    pub fn bind_all_at<V: Into<Value>>(
        mut self,
        position: u32,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.positional
            .insert(position, ParameterValue::Multiple(values));
        self
    }

    pub fn bind_temporal(
        self,
        name: impl Into<String>,
        value: NaiveDateTime,
        kind: TemporalKind,
    ) -> Self {
        let coerced = kind.coerce(value);
        let mut this = self;
        this.named.insert(name.into(), ParameterValue::Single(coerced));
        this
    }

    /// Supply the evaluated result for an expression placeholder, keyed by
    /// the expression text as written in the query.
    pub fn bind_expression(
        mut self,
        expression: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.expressions
            .insert(expression.into(), ParameterValue::Single(value.into()));
        self
    }

    fn get(&self, identifier: &BindingIdentifier) -> Option<&ParameterValue> {
        match identifier {
            BindingIdentifier::Name(name) => self.named.get(name),
            BindingIdentifier::Position(position) => self.positional.get(position),
        }
    }

    fn expression(&self, expression: &str) -> Option<&ParameterValue> {
        self.expressions.get(expression)
    }
}

#[derive(Debug)]
enum Segment {
    Text(String),
    Placeholder(usize),
}

/// A hand-written query with its placeholders parsed out.
#[derive(Debug)]
pub struct StringQuery {
    source: String,
    segments: Vec<Segment>,
    bindings: Vec<ParameterBinding>,
}

impl StringQuery {
    /// Parse `:name` and `?position` placeholders.
    ///
    /// Text inside single-quoted literals is left alone, as is the
    /// PostgreSQL `::type` cast syntax. `:#{expression}` marks a binding
    /// the caller computes rather than passes; its value is supplied under
    /// the expression text via [`Parameters::bind_expression`]. A
    /// placeholder directly wrapped in `%` markers becomes a LIKE binding
    /// with the markers stripped from the text; a placeholder preceded by
    /// the keyword `IN` becomes a collection binding.
    pub fn parse(source: &str) -> Result<Self, QuarryError> {
        let chars: Vec<char> = source.chars().collect();
        let mut segments: Vec<Segment> = Vec::new();
        let mut bindings: Vec<ParameterBinding> = Vec::new();
        let mut text = String::new();
        let mut i = 0;
        let mut in_literal = false;

        while i < chars.len() {
            let c = chars[i];

            if in_literal {
                text.push(c);
                if c == '\'' {
                    in_literal = false;
                }
                i += 1;
                continue;
            }

            match c {
                '\'' => {
                    in_literal = true;
                    text.push(c);
                    i += 1;
                }
                ':' if i + 1 < chars.len() && chars[i + 1] == ':' => {
                    // postgres cast, not a placeholder
                    text.push_str("::");
                    i += 2;
                }
                ':' if i + 2 < chars.len() && chars[i + 1] == '#' && chars[i + 2] == '{' => {
                    let mut expression = String::new();
                    let mut depth = 1;
                    i += 3;
                    while i < chars.len() {
                        match chars[i] {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        expression.push(chars[i]);
                        i += 1;
                    }
                    if depth != 0 {
                        return Err(QuarryError::InvalidUsage(format!(
                            "unterminated expression placeholder in '{source}'"
                        )));
                    }
                    i += 1;
                    // synthesize a name that cannot clash with written ones
                    let synthetic = bindings
                        .iter()
                        .filter(|b| matches!(b.origin(), ParameterOrigin::Expression(_)))
                        .count()
                        + 1;
                    let identifier = BindingIdentifier::named(format!("__synthetic_{synthetic}"));
                    Self::push_placeholder(
                        &mut segments,
                        &mut bindings,
                        &mut text,
                        &chars,
                        &mut i,
                        identifier,
                        Some(expression),
                    );
                }
                ':' if i + 1 < chars.len() && is_identifier_start(chars[i + 1]) => {
                    let mut name = String::new();
                    i += 1;
                    while i < chars.len() && is_identifier_char(chars[i]) {
                        name.push(chars[i]);
                        i += 1;
                    }
                    let identifier = BindingIdentifier::named(name);
                    Self::push_placeholder(
                        &mut segments,
                        &mut bindings,
                        &mut text,
                        &chars,
                        &mut i,
                        identifier,
                        None,
                    );
                }
                '?' if i + 1 < chars.len() && chars[i + 1].is_ascii_digit() => {
                    let mut digits = String::new();
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        digits.push(chars[i]);
                        i += 1;
                    }
                    let position: u32 = digits.parse().map_err(|_| {
                        QuarryError::InvalidUsage(format!(
                            "invalid positional placeholder ?{digits}"
                        ))
                    })?;
                    if position == 0 {
                        return Err(QuarryError::InvalidUsage(
                            "positional placeholders are 1-based".to_string(),
                        ));
                    }
                    let identifier = BindingIdentifier::positional(position);
                    Self::push_placeholder(
                        &mut segments,
                        &mut bindings,
                        &mut text,
                        &chars,
                        &mut i,
                        identifier,
                        None,
                    );
                }
                _ => {
                    text.push(c);
                    i += 1;
                }
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
            bindings,
        })
    }

    fn push_placeholder(
        segments: &mut Vec<Segment>,
        bindings: &mut Vec<ParameterBinding>,
        text: &mut String,
        chars: &[char],
        i: &mut usize,
        identifier: BindingIdentifier,
        expression: Option<String>,
    ) {
        let leading_percent = text.ends_with('%');
        let trailing_percent = *i < chars.len() && chars[*i] == '%';

        let kind = if leading_percent || trailing_percent {
            if leading_percent {
                text.pop();
            }
            if trailing_percent {
                *i += 1;
            }
            let like = match (leading_percent, trailing_percent) {
                (true, true) => LikeMatch::Containing,
                (true, false) => LikeMatch::EndingWith,
                (false, true) => LikeMatch::StartingWith,
                (false, false) => unreachable!(),
            };
            BindingKind::Like(like)
        } else if last_word_is_in(text) {
            // the expansion brings its own parens; drop any written ones
            if text.trim_end().ends_with('(') {
                let mut ahead = *i;
                while ahead < chars.len() && chars[ahead].is_whitespace() {
                    ahead += 1;
                }
                if ahead < chars.len() && chars[ahead] == ')' {
                    while !text.ends_with('(') {
                        text.pop();
                    }
                    text.pop();
                    *i = ahead + 1;
                }
            }
            BindingKind::In
        } else {
            BindingKind::Simple
        };

        segments.push(Segment::Text(std::mem::take(text)));
        segments.push(Segment::Placeholder(bindings.len()));
        bindings.push(match expression {
            Some(expression) => ParameterBinding::expression(identifier, expression, kind),
            None => ParameterBinding::new(identifier, kind),
        });
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Resolve every placeholder against `parameters`, producing the final
    /// SQL with `$n` placeholders and the ordered value list.
    pub fn bind(&self, parameters: &Parameters) -> Result<(String, Values), QuarryError> {
        self.bind_with(parameters, &LikeEscaper::default())
    }

    pub fn bind_with(
        &self,
        parameters: &Parameters,
        escaper: &LikeEscaper,
    ) -> Result<(String, Values), QuarryError> {
        let mut sql = String::with_capacity(self.source.len());
        let mut values: Vec<Value> = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Placeholder(index) => {
                    let binding = &self.bindings[*index];
                    let supplied = match binding.origin() {
                        ParameterOrigin::MethodArgument(identifier) => parameters.get(identifier),
                        ParameterOrigin::Expression(expression) => {
                            parameters.expression(expression)
                        }
                    }
                    .ok_or_else(|| QuarryError::MissingParameter(binding.origin().to_string()))?;
                    Self::render_binding(binding, supplied, escaper, &mut sql, &mut values)?;
                }
            }
        }

        Ok((sql, Values(values)))
    }

    fn render_binding(
        binding: &ParameterBinding,
        supplied: &ParameterValue,
        escaper: &LikeEscaper,
        sql: &mut String,
        values: &mut Vec<Value>,
    ) -> Result<(), QuarryError> {
        match (binding.kind(), supplied) {
            (BindingKind::In, ParameterValue::Multiple(items)) => {
                if items.is_empty() {
                    // an empty IN list matches nothing
                    sql.push_str("(NULL)");
                    return Ok(());
                }
                sql.push('(');
                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        sql.push_str(", ");
                    }
                    values.push(item.clone());
                    sql.push_str(&format!("${}", values.len()));
                }
                sql.push(')');
                Ok(())
            }
            (BindingKind::In, ParameterValue::Single(_)) => Err(QuarryError::InvalidUsage(
                format!("{} requires a collection value", binding.identifier()),
            )),
            (BindingKind::Like(like), ParameterValue::Single(value)) => {
                let prepared = match value {
                    Value::String(Some(s)) => {
                        Value::String(Some(like.prepare(s, escaper)))
                    }
                    Value::String(None) => value.clone(),
                    other => {
                        return Err(QuarryError::Conversion(format!(
                            "LIKE parameter {} must be a string, got {:?}",
                            binding.identifier(),
                            other
                        )))
                    }
                };
                values.push(prepared);
                sql.push_str(&format!("${}", values.len()));
                Ok(())
            }
            (_, ParameterValue::Multiple(_)) => Err(QuarryError::InvalidUsage(format!(
                "{} is not an IN placeholder but was given a collection",
                binding.identifier()
            ))),
            (BindingKind::Simple, ParameterValue::Single(value)) => {
                values.push(value.clone());
                sql.push_str(&format!("${}", values.len()));
                Ok(())
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn last_word_is_in(text: &str) -> bool {
    let trimmed = text.trim_end();
    let trimmed = trimmed.strip_suffix('(').map(str::trim_end).unwrap_or(trimmed);
    trimmed
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .map(|word| word.eq_ignore_ascii_case("in"))
        .unwrap_or(false)
}
