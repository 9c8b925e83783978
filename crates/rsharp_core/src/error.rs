//! Error types for handle operations

use crate::handle::OwnershipMode;
use thiserror::Error;

/// Result type for handle operations
pub type Result<T> = core::result::Result<T, HandleError>;

/// Errors raised by handle operations before any native call is made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The handle was disposed or stolen, or the owner it borrows from is gone
    #[error("'{operation}' on a disposed '{type_name}' handle")]
    UseAfterDispose {
        type_name: &'static str,
        operation: &'static str,
    },

    /// The operation needs an owning handle
    #[error("'{operation}' requires an owned '{type_name}' handle, found {mode}")]
    Ownership {
        type_name: &'static str,
        operation: &'static str,
        mode: OwnershipMode,
    },

    /// The operation needs mutable access through a shared reference
    #[error("'{operation}' requires mutable access, but the '{type_name}' handle is a shared reference")]
    Mutability {
        type_name: &'static str,
        operation: &'static str,
    },

    /// A destructor bound for one type was requested for another
    #[error("type confusion: destructor bound for '{found}' requested for '{expected}'")]
    TypeConfusion {
        expected: &'static str,
        found: &'static str,
    },

    /// No destructor is bound for the type
    #[error("no destructor bound for '{type_name}'")]
    Unbound { type_name: &'static str },

    /// A second owning handle was created for an address
    #[error("address {address:#x} already has an owning '{type_name}' handle")]
    AliasedOwner {
        type_name: &'static str,
        address: usize,
    },
}

impl HandleError {
    /// Create a use-after-dispose error
    pub fn use_after_dispose(type_name: &'static str, operation: &'static str) -> Self {
        HandleError::UseAfterDispose { type_name, operation }
    }

    /// Create an ownership error
    pub fn ownership(type_name: &'static str, operation: &'static str, mode: OwnershipMode) -> Self {
        HandleError::Ownership {
            type_name,
            operation,
            mode,
        }
    }

    /// Create a mutability error
    pub fn mutability(type_name: &'static str, operation: &'static str) -> Self {
        HandleError::Mutability { type_name, operation }
    }

    /// The operation that raised the error, if it carries one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            HandleError::UseAfterDispose { operation, .. }
            | HandleError::Ownership { operation, .. }
            | HandleError::Mutability { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_type_and_operation() {
        let err = HandleError::ownership("Box_I32", "steal", OwnershipMode::SharedRef);
        let msg = err.to_string();
        assert!(msg.contains("Box_I32"));
        assert!(msg.contains("steal"));
        assert!(msg.contains("shared reference"));
        assert_eq!(err.operation(), Some("steal"));

        let err = HandleError::AliasedOwner {
            type_name: "String",
            address: 0x1000,
        };
        assert!(err.to_string().contains("0x1000"));
        assert_eq!(err.operation(), None);
    }
}
