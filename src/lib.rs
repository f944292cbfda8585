// Recommender Entity Model - Core Library
// Typed entity-attribute records shared by data sources, algorithms and evaluation

pub mod error;
pub mod attributes;  // Typed names, values, definitions
pub mod vocabulary;  // Canonical registry of types and names
pub mod entity;      // Immutable records
pub mod builder;     // Builders that freeze into entities
pub mod entities;    // Façade: factories, combinators, views

// Re-export commonly used types
pub use error::{EntityError, Result};
pub use attributes::{
    Attribute, AttributeDefinition, AttributeName, AttributeType, AttributeValue,
    TypedName, ValueKind,
};
pub use vocabulary::{CommonVocabulary, EntityType, Vocabulary, VocabularyConfig};
pub use entity::{Entity, Shape};
pub use builder::{EntityBuilder, RatingBuilder};
pub use entities::{Interaction, Rating, View};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
