// ⚠️ Error Taxonomy - Entity Model
// Every failure here is a programmer/schema error: local, synchronous, never retryable.
// Absent attributes are NOT errors on the safe path (use maybe_get).

use thiserror::Error;

use crate::attributes::ValueKind;

pub type Result<T> = std::result::Result<T, EntityError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    /// `get` called for an attribute the entity does not carry
    #[error("attribute '{attribute}' not found on {entity_type} entity {id}")]
    AttributeNotFound {
        attribute: String,
        entity_type: String,
        id: i64,
    },

    /// Stored (or raw) value does not match the declared kind of its name
    #[error("type mismatch for attribute '{attribute}': expected {expected}, found {found}")]
    TypeMismatch {
        attribute: String,
        expected: ValueKind,
        found: String,
    },

    /// Entity's concrete shape does not implement the requested view
    #[error("entity of shape {source_shape} cannot be projected to {target}")]
    Projection {
        source_shape: String,
        target: &'static str,
    },

    /// Same attribute name declared with two different value kinds
    #[error("attribute '{name}' already registered as {registered}, cannot register as {requested}")]
    RegistrationConflict {
        name: String,
        registered: ValueKind,
        requested: ValueKind,
    },

    /// `build()` called before an id was assigned
    #[error("cannot build {entity_type} entity: id not set")]
    MissingId { entity_type: String },

    /// Untyped load referenced a name the vocabulary never declared
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("invalid vocabulary config: {0}")]
    InvalidConfig(String),
}

impl EntityError {
    pub(crate) fn type_mismatch(
        attribute: &str,
        expected: ValueKind,
        found: impl Into<String>,
    ) -> Self {
        EntityError::TypeMismatch {
            attribute: attribute.to_string(),
            expected,
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_attribute() {
        let err = EntityError::AttributeNotFound {
            attribute: "rating".to_string(),
            entity_type: "rating".to_string(),
            id: 42,
        };
        assert_eq!(err.to_string(), "attribute 'rating' not found on rating entity 42");

        let err = EntityError::type_mismatch("rating", ValueKind::Integer, "real");
        assert_eq!(
            err.to_string(),
            "type mismatch for attribute 'rating': expected integer, found real"
        );
    }

    #[test]
    fn test_projection_message() {
        let err = EntityError::Projection {
            source_shape: "basic".to_string(),
            target: "Rating",
        };
        assert!(err.to_string().contains("basic"));
        assert!(err.to_string().contains("Rating"));
    }
}
