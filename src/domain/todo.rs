use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::TodoId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<i64>,
}

/// A validated, normalized document ready to be inserted.
///
/// `id` is `None` for anything arriving over HTTP; the store assigns one.
/// Fixtures may pin it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub id: Option<TodoId>,
    pub text: String,
    pub completed: bool,
    pub completed_at: Option<i64>,
}

impl NewTodo {
    pub fn new(text: impl Into<String>) -> Self {
        Self { id: None, text: text.into(), completed: false, completed_at: None }
    }

    pub fn with_id(mut self, id: TodoId) -> Self {
        self.id = Some(id);
        self
    }

    /// Validates an untyped request body against the todo schema.
    ///
    /// Only `text`, `completed` and `completedAt` are read. `completedAt` is
    /// kept only for completed todos and defaults to now when one is missing.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let empty = Map::new();
        let fields = body.as_object().unwrap_or(&empty);
        let mut errors = ValidationError::default();

        let text = match fields.get("text") {
            None | Some(Value::Null) => {
                errors.push("text", FieldErrorKind::Required);
                None
            }
            Some(raw) => check_text(raw, &mut errors),
        };
        let completed = match fields.get("completed") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                errors.push("completed", FieldErrorKind::Type("boolean"));
                false
            }
        };
        let completed_at = match fields.get("completedAt") {
            None | Some(Value::Null) => None,
            Some(raw) => match timestamp_millis(raw) {
                Some(ms) => Some(ms),
                None => {
                    errors.push("completedAt", FieldErrorKind::Type("number"));
                    None
                }
            },
        };

        errors.into_result()?;
        let completed_at = if completed { Some(completed_at.unwrap_or_else(now_millis)) } else { None };
        Ok(Self {
            id: None,
            text: text.unwrap_or_default(),
            completed,
            completed_at,
        })
    }
}

/// Field assignments for an atomic find-and-update. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<i64>>,
}

impl TodoPatch {
    /// Validates an update body. Marking a todo complete stamps `completedAt`;
    /// marking it incomplete clears it.
    pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
        let empty = Map::new();
        let fields = body.as_object().unwrap_or(&empty);
        let mut errors = ValidationError::default();

        let text = match fields.get("text") {
            None | Some(Value::Null) => None,
            Some(raw) => check_text(raw, &mut errors),
        };
        let completed = match fields.get("completed") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                errors.push("completed", FieldErrorKind::Type("boolean"));
                None
            }
        };

        errors.into_result()?;
        let completed_at = completed.map(|done| done.then(now_millis));
        Ok(Self { text, completed, completed_at })
    }
}

/// Narrows a `find` to documents matching every populated field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl TodoFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        self.text.as_ref().is_none_or(|t| *t == todo.text)
            && self.completed.is_none_or(|c| c == todo.completed)
    }
}

fn check_text(raw: &Value, errors: &mut ValidationError) -> Option<String> {
    let Some(s) = raw.as_str() else {
        errors.push("text", FieldErrorKind::Type("string"));
        return None;
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        errors.push("text", FieldErrorKind::MinLength(1));
        return None;
    }
    Some(trimmed.to_string())
}

/// Any JSON number; fractional milliseconds are truncated.
fn timestamp_millis(raw: &Value) -> Option<i64> {
    raw.as_i64().or_else(|| raw.as_f64().map(|ms| ms.trunc() as i64))
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    MinLength(usize),
    Type(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: String,
    pub path: String,
    pub message: String,
}

/// Every field that failed schema checks, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: BTreeMap<String, FieldError>,
}

impl ValidationError {
    pub const MESSAGE: &'static str = "Todo validation failed";

    fn push(&mut self, path: &str, kind: FieldErrorKind) {
        let (kind, message) = match kind {
            FieldErrorKind::Required => ("required".to_string(), format!("Path `{path}` is required.")),
            FieldErrorKind::MinLength(min) => (
                "minlength".to_string(),
                format!("Path `{path}` is shorter than the minimum allowed length ({min})."),
            ),
            FieldErrorKind::Type(expected) => {
                (expected.to_string(), format!("Path `{path}` must be of type {expected}."))
            }
        };
        self.errors.insert(path.to_string(), FieldError { kind, path: path.to_string(), message });
    }

    fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::MESSAGE)?;
        for (i, err) in self.errors.values().enumerate() {
            write!(f, "{} {}: {}", if i == 0 { ":" } else { "," }, err.path, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
