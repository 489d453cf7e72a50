//! Operation kinds dispatched through the controller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// The kind of data-access operation requested by the application.
///
/// Only [`Operation::Read`] is ever cached; the mutating kinds are forwarded
/// straight to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// All operation kinds, in declaration order.
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    /// Returns the lowercase name of the operation.
    ///
    /// # Example
    ///
    /// ```
    /// use spice_core::Operation;
    ///
    /// assert_eq!(Operation::Update.as_str(), "update");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Returns true for the only cacheable operation.
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::Read)
    }

    /// Returns true for operations that mutate the remote resource.
    pub fn is_mutation(&self) -> bool {
        !self.is_read()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Operation::Read),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(SyncError::configuration(format!(
                "unknown operation '{}'",
                other
            ))),
        }
    }
}
