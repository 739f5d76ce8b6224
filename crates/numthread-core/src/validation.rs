use crate::{NewOperation, NumthreadError, OperationType, Result};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("{field} must be at least {min} characters long")]
    TooShort { field: &'static str, min: usize },

    #[error("Starting number must be a valid number")]
    InvalidStartingNumber,

    #[error("discussionId, operationType, and rightNumber are required")]
    MissingOperationFields,

    #[error("operationType must be one of: add, subtract, multiply, divide")]
    UnknownOperationType,
}

/// Username/password pair as it arrives on the wire. Fields stay untyped so
/// a wrong JSON type is reported like a missing field.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl CredentialsRequest {
    /// Presence check only; used for login where length rules do not apply.
    pub fn into_credentials(self) -> std::result::Result<Credentials, ValidationError> {
        match (non_empty_string(self.username), non_empty_string(self.password)) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(ValidationError::MissingCredentials),
        }
    }

    /// Presence and length checks applied on registration.
    pub fn into_registration(self) -> std::result::Result<Credentials, ValidationError> {
        let credentials = self.into_credentials()?;

        if credentials.username.chars().count() < MIN_USERNAME_LEN {
            return Err(ValidationError::TooShort {
                field: "Username",
                min: MIN_USERNAME_LEN,
            });
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort {
                field: "Password",
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(credentials)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiscussionRequest {
    pub starting_number: Option<Value>,
}

impl CreateDiscussionRequest {
    pub fn starting_number(&self) -> std::result::Result<f64, ValidationError> {
        number(self.starting_number.as_ref()).ok_or(ValidationError::InvalidStartingNumber)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOperationRequest {
    pub discussion_id: Option<Value>,
    /// Absent and `null` both mean a reply to the starting number.
    pub parent_id: Option<Value>,
    pub operation_type: Option<Value>,
    pub right_number: Option<Value>,
}

impl CreateOperationRequest {
    /// Checks the request shape, then resolves ids. An id that is not a UUID
    /// string cannot name a stored record, so it is reported as not found.
    pub fn into_new_operation(self) -> Result<NewOperation> {
        let discussion_id = self
            .discussion_id
            .filter(is_truthy)
            .ok_or(ValidationError::MissingOperationFields)?;
        let operation_type = self
            .operation_type
            .filter(is_truthy)
            .ok_or(ValidationError::MissingOperationFields)?;
        let right_number =
            number(self.right_number.as_ref()).ok_or(ValidationError::MissingOperationFields)?;

        let operation_type: OperationType = operation_type
            .as_str()
            .and_then(|op| op.parse().ok())
            .ok_or(ValidationError::UnknownOperationType)?;

        let discussion_id = uuid(&discussion_id).ok_or(NumthreadError::DiscussionNotFound)?;
        let parent_id = match self.parent_id {
            None | Some(Value::Null) => None,
            Some(id) => Some(uuid(&id).ok_or(NumthreadError::ParentNotFound)?),
        };

        Ok(NewOperation {
            discussion_id,
            parent_id,
            operation_type,
            right_number,
        })
    }
}

fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// JSON values that count as "provided": everything except `null`, `false`,
/// `0` and `""`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn uuid(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|id| Uuid::parse_str(id).ok())
}

fn number(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}
