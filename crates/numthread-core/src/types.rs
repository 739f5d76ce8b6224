use crate::{NumthreadError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;
pub type DiscussionId = Uuid;
pub type OperationId = Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: UserId::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// The user a discussion or operation is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub user_id: UserId,
    pub username: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: DiscussionId,
    pub starting_number: f64,
    pub created_by: UserId,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

impl Discussion {
    pub fn new(starting_number: f64, author: &Author) -> Self {
        Self {
            id: DiscussionId::new_v4(),
            starting_number,
            created_by: author.user_id,
            created_by_username: author.username.clone(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperationType {
    pub const ALL: [OperationType; 4] = [
        OperationType::Add,
        OperationType::Subtract,
        OperationType::Multiply,
        OperationType::Divide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Add => "add",
            OperationType::Subtract => "subtract",
            OperationType::Multiply => "multiply",
            OperationType::Divide => "divide",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            OperationType::Add => "+",
            OperationType::Subtract => "-",
            OperationType::Multiply => "×",
            OperationType::Divide => "÷",
        }
    }

    /// Applies the operation to the value of the parent node.
    ///
    /// This is the only place a result is ever computed: every edge of an
    /// operation tree goes through it, both on creation and on replay.
    pub fn apply(&self, left: f64, right: f64) -> Result<f64> {
        let result = match self {
            OperationType::Add => left + right,
            OperationType::Subtract => left - right,
            OperationType::Multiply => left * right,
            OperationType::Divide => {
                if right == 0.0 {
                    return Err(NumthreadError::DivisionByZero);
                }
                left / right
            }
        };

        if !result.is_finite() {
            return Err(NumthreadError::NonFiniteResult);
        }
        Ok(result)
    }

    /// Recovers the left operand from a result. Multiplying by zero loses the
    /// operand, in which case 0 is returned.
    pub fn left_operand(&self, result: f64, right: f64) -> f64 {
        match self {
            OperationType::Add => result - right,
            OperationType::Subtract => result + right,
            OperationType::Multiply => {
                if right == 0.0 {
                    0.0
                } else {
                    result / right
                }
            }
            OperationType::Divide => result * right,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperationType(pub String);

impl fmt::Display for UnknownOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation type: {}", self.0)
    }
}

impl std::error::Error for UnknownOperationType {}

impl FromStr for OperationType {
    type Err = UnknownOperationType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperationType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub discussion_id: DiscussionId,
    /// `None` when replying to the starting number.
    pub parent_id: Option<OperationId>,
    pub operation_type: OperationType,
    pub right_number: f64,
    pub left_number: f64,
    pub result: f64,
    pub created_by: UserId,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} = {}",
            self.left_number,
            self.operation_type.symbol(),
            self.right_number,
            self.result
        )
    }
}

/// A reply to be attached to a discussion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    pub discussion_id: DiscussionId,
    pub parent_id: Option<OperationId>,
    pub operation_type: OperationType,
    pub right_number: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationNode {
    #[serde(flatten)]
    pub operation: Operation,
    pub children: Vec<OperationNode>,
}

impl OperationNode {
    pub fn leaf(operation: Operation) -> Self {
        Self {
            operation,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionWithOperations {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub operations: Vec<OperationNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Author {
        Author {
            user_id: UserId::new_v4(),
            username: "alex".to_string(),
        }
    }

    #[test]
    fn apply_covers_all_operations() {
        assert_eq!(OperationType::Add.apply(10.0, 5.0).unwrap(), 15.0);
        assert_eq!(OperationType::Subtract.apply(10.0, 5.0).unwrap(), 5.0);
        assert_eq!(OperationType::Multiply.apply(15.0, 2.0).unwrap(), 30.0);
        assert_eq!(OperationType::Divide.apply(10.0, 4.0).unwrap(), 2.5);
    }

    #[test]
    fn divide_by_zero_is_rejected() {
        let err = OperationType::Divide.apply(10.0, 0.0).unwrap_err();
        assert!(matches!(err, NumthreadError::DivisionByZero));
        assert_eq!(err.to_string(), "Cannot divide by zero");

        let err = OperationType::Divide.apply(10.0, -0.0).unwrap_err();
        assert!(matches!(err, NumthreadError::DivisionByZero));
    }

    #[test]
    fn overflow_is_rejected() {
        let err = OperationType::Multiply.apply(f64::MAX, 2.0).unwrap_err();
        assert!(matches!(err, NumthreadError::NonFiniteResult));
    }

    #[test]
    fn left_operand_inverts_apply() {
        for op in OperationType::ALL {
            let result = op.apply(12.0, 3.0).unwrap();
            assert_eq!(op.left_operand(result, 3.0), 12.0, "{op}");
        }
        assert_eq!(OperationType::Multiply.left_operand(0.0, 0.0), 0.0);
    }

    #[test]
    fn operation_type_parses_wire_names_only() {
        assert_eq!("multiply".parse::<OperationType>(), Ok(OperationType::Multiply));
        assert!("Multiply".parse::<OperationType>().is_err());
        assert!("modulo".parse::<OperationType>().is_err());
        assert_eq!(OperationType::Divide.symbol(), "÷");
    }

    #[test]
    fn operation_serializes_camel_case() {
        let author = author();
        let discussion = Discussion::new(10.0, &author);
        let op = Operation {
            id: OperationId::new_v4(),
            discussion_id: discussion.id,
            parent_id: None,
            operation_type: OperationType::Add,
            right_number: 5.0,
            left_number: 10.0,
            result: 15.0,
            created_by: author.user_id,
            created_by_username: author.username.clone(),
            created_at: Utc::now(),
        };

        let node = OperationNode::leaf(op.clone());
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["operationType"], "add");
        assert_eq!(json["discussionId"], discussion.id.to_string());
        assert!(json["parentId"].is_null());
        assert_eq!(json["result"], 15.0);
        assert_eq!(json["createdByUsername"], "alex");
        assert!(json["children"].as_array().unwrap().is_empty());

        assert_eq!(op.to_string(), "10 + 5 = 15");
    }
}
