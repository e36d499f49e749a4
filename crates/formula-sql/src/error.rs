//! Error types for formula-sql

use thiserror::Error;

use crate::datatype::DataType;
use crate::dialect::DialectCombo;
use crate::traversal::NodeHierarchyIndex;

/// The result type for formula compilation and node manipulation
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating or compiling a formula tree.
///
/// Compilation is all-or-nothing: the first error aborts the call and no
/// partial expression is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// A field reference is absent from the field-type environment
    #[error("Unknown field: [{name}]")]
    UnknownField { name: String },

    /// No definition is registered under this name
    #[error("Unknown function or operator: {name}")]
    UnknownFunction { name: String },

    /// The function is known, but no signature/dialect combination matches the call site
    #[error(
        "Function \"{name}\" is not implemented for {dialect} dialect and given arguments ({})",
        join_types(.arg_types)
    )]
    NoMatchingVariant {
        name: String,
        arg_types: Vec<DataType>,
        dialect: DialectCombo,
    },

    /// Argument types carry too little information to pick a single definition
    #[error("Ambiguous call to \"{name}\" with arguments ({})", join_types(.arg_types))]
    AmbiguousName {
        name: String,
        arg_types: Vec<DataType>,
    },

    /// Wrong number of children handed to a node rebuild
    #[error("{node} expects {expected} children, got {actual}")]
    Arity {
        node: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Conditional branches do not share a common type
    #[error("Branches have incompatible types: {}", join_types(.types))]
    BranchTypeMismatch { types: Vec<DataType> },

    /// A return-type strategy could not be evaluated for the given arguments
    #[error("Cannot determine return type of \"{name}\": {reason}")]
    ReturnTypeUndetermined { name: String, reason: String },

    /// Two substitution indices overlap (one is a prefix of the other)
    #[error("Overlapping substitution indices {outer} and {inner}")]
    OverlappingSubstitution {
        outer: NodeHierarchyIndex,
        inner: NodeHierarchyIndex,
    },

    /// A hierarchical index does not resolve to a node
    #[error("No node at index {index}")]
    IndexNotFound { index: NodeHierarchyIndex },

    /// The requested dialect combo cannot be compiled for
    #[error("Unsupported dialect: {dialect}")]
    UnsupportedDialect { dialect: String },

    /// An argument is structurally valid but semantically rejected
    #[error("Invalid argument for \"{name}\": {message}")]
    InvalidArgument { name: String, message: String },

    /// A window-configuration node was used where a value is expected
    #[error("{kind} cannot be used as a value expression")]
    NotAnExpression { kind: &'static str },
}

impl Error {
    /// Create an unknown field error
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Error::UnknownField { name: name.into() }
    }

    /// Create an unknown function error
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Error::UnknownFunction { name: name.into() }
    }

    /// Create a no-matching-variant error
    pub fn no_matching_variant(
        name: impl Into<String>,
        arg_types: &[DataType],
        dialect: DialectCombo,
    ) -> Self {
        Error::NoMatchingVariant {
            name: name.into(),
            arg_types: arg_types.to_vec(),
            dialect,
        }
    }

    /// Create an arity error
    pub fn arity(node: &'static str, expected: usize, actual: usize) -> Self {
        Error::Arity {
            node,
            expected,
            actual,
        }
    }

    /// Create a return-type error
    pub fn return_type(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ReturnTypeUndetermined {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an index-not-found error
    pub fn index_not_found(index: NodeHierarchyIndex) -> Self {
        Error::IndexNotFound { index }
    }

    /// Create an unsupported dialect error
    pub fn unsupported_dialect(dialect: impl std::fmt::Display) -> Self {
        Error::UnsupportedDialect {
            dialect: dialect.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }
}

fn join_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn test_no_matching_variant_message() {
        let err = Error::no_matching_variant(
            "rsum",
            &[DataType::Integer, DataType::ConstString],
            Dialect::ClickHouse19_13.into(),
        );
        assert_eq!(
            err.to_string(),
            "Function \"rsum\" is not implemented for CLICKHOUSE_19_13 dialect and given arguments (INTEGER|CONST_STRING)"
        );
    }

    #[test]
    fn test_index_display() {
        let err = Error::index_not_found(NodeHierarchyIndex::from(vec![0, 2]));
        assert_eq!(err.to_string(), "No node at index 0.2");
    }
}
