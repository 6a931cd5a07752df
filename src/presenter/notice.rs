use std::fmt;

use thiserror::Error;

/// User action whose backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Edit,
    Delete,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "add"),
            Operation::Edit => write!(f, "edit"),
            Operation::Delete => write!(f, "delete"),
            Operation::Update => write!(f, "update"),
        }
    }
}

/// User-facing failure message. Names the operation, never the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{title}: {message}")]
pub struct Notice {
    pub operation: Operation,
    pub title: &'static str,
    pub message: &'static str,
}

impl Notice {
    pub fn failed(operation: Operation) -> Self {
        let message = match operation {
            Operation::Add | Operation::Edit => "Could not save the product",
            Operation::Delete => "Could not delete the product",
            Operation::Update => "Could not update the product",
        };
        Self {
            operation,
            title: "Error",
            message,
        }
    }
}
