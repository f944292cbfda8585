// 📚 Vocabulary - Canonical registry of entity types and attribute names
// One canonical instance per name, even under concurrent first use.
//
// A Vocabulary is an explicit object: components that produce entities share
// one by reference. `Vocabulary::global()` is the lazily created process-wide
// instance used by the `EntityType::of` / `TypedName::create` shortcuts.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::attributes::{AttributeDefinition, AttributeName, AttributeType, TypedName, ValueKind};
use crate::error::{EntityError, Result};

static GLOBAL: Lazy<Vocabulary> = Lazy::new(Vocabulary::new);

// ============================================================================
// ENTITY TYPE
// ============================================================================

/// Interned category tag ("user", "item", "rating", ...).
///
/// Equal iff the names are equal. Canonical instances share one allocation,
/// so the common comparison is a pointer check.
#[derive(Clone)]
pub struct EntityType(Arc<str>);

impl EntityType {
    /// Canonical instance from the global vocabulary.
    pub fn of(name: &str) -> Self {
        Vocabulary::global().entity_type(name)
    }

    fn new(name: &str) -> Self {
        EntityType(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityType({})", self.name())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// COMMON VOCABULARY
// ============================================================================

/// Types and attributes every vocabulary starts with.
#[derive(Debug, Clone)]
pub struct CommonVocabulary {
    pub user_type: EntityType,
    pub item_type: EntityType,
    pub rating_type: EntityType,

    /// "user": the user an event or rating belongs to
    pub user_id: TypedName<i64>,
    /// "item": the item an event or rating refers to
    pub item_id: TypedName<i64>,
    /// "rating": the rating value
    pub rating: TypedName<f64>,
    /// "timestamp": event time in epoch seconds
    pub timestamp: TypedName<i64>,
}

pub const USER_TYPE: &str = "user";
pub const ITEM_TYPE: &str = "item";
pub const RATING_TYPE: &str = "rating";

pub const USER_ID: &str = "user";
pub const ITEM_ID: &str = "item";
pub const RATING: &str = "rating";
pub const TIMESTAMP: &str = "timestamp";

// ============================================================================
// CONFIG
// ============================================================================

/// Declarative vocabulary, typically read from a JSON file at startup.
///
/// ```json
/// { "entity_types": ["movie"],
///   "attributes": [{ "name": "genre", "type": "text" }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    #[serde(default)]
    pub entity_types: Vec<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl VocabularyConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| EntityError::InvalidConfig(e.to_string()))
    }
}

// ============================================================================
// VOCABULARY
// ============================================================================

pub struct Vocabulary {
    types: RwLock<HashMap<Box<str>, EntityType>>,
    names: RwLock<HashMap<Box<str>, AttributeName>>,
    definitions: RwLock<HashMap<Box<str>, AttributeDefinition>>,
    common: CommonVocabulary,
}

impl Vocabulary {
    /// Create a vocabulary seeded with the common types and attributes.
    pub fn new() -> Self {
        let common = CommonVocabulary {
            user_type: EntityType::new(USER_TYPE),
            item_type: EntityType::new(ITEM_TYPE),
            rating_type: EntityType::new(RATING_TYPE),
            user_id: TypedName::from_erased(AttributeName::new(USER_ID, i64::KIND)),
            item_id: TypedName::from_erased(AttributeName::new(ITEM_ID, i64::KIND)),
            rating: TypedName::from_erased(AttributeName::new(RATING, f64::KIND)),
            timestamp: TypedName::from_erased(AttributeName::new(TIMESTAMP, i64::KIND)),
        };

        let seeded_types = [&common.user_type, &common.item_type, &common.rating_type];
        let types: HashMap<Box<str>, EntityType> = seeded_types
            .into_iter()
            .map(|t| (Box::from(t.name()), t.clone()))
            .collect();

        let seeded = [
            (common.user_id.erased(), "User identifier"),
            (common.item_id.erased(), "Item identifier"),
            (common.rating.erased(), "Rating value"),
            (common.timestamp.erased(), "Event time in epoch seconds"),
        ];
        let names: HashMap<Box<str>, AttributeName> = seeded
            .iter()
            .map(|(n, _)| (Box::from(n.name()), (*n).clone()))
            .collect();
        let definitions: HashMap<Box<str>, AttributeDefinition> = seeded
            .iter()
            .map(|(n, desc)| {
                let def = AttributeDefinition::new(n.name(), n.kind()).with_description(*desc);
                (Box::from(n.name()), def)
            })
            .collect();

        Vocabulary {
            types: RwLock::new(types),
            names: RwLock::new(names),
            definitions: RwLock::new(definitions),
            common,
        }
    }

    /// Build a vocabulary from a declarative config.
    pub fn from_config(config: &VocabularyConfig) -> Result<Self> {
        let vocab = Vocabulary::new();
        vocab.apply_config(config)?;
        Ok(vocab)
    }

    /// The process-wide vocabulary.
    pub fn global() -> &'static Vocabulary {
        &GLOBAL
    }

    pub fn common(&self) -> &CommonVocabulary {
        &self.common
    }

    /// Declare every type and attribute of `config`.
    ///
    /// The whole config is checked against the current registrations first;
    /// a rejected config registers nothing. A conflicting registration made
    /// concurrently by another thread can still fail the second pass part way.
    pub fn apply_config(&self, config: &VocabularyConfig) -> Result<()> {
        self.check_config(config)?;
        for name in &config.entity_types {
            self.entity_type(name);
        }
        for def in &config.attributes {
            self.declare_definition(def)?;
        }
        Ok(())
    }

    fn check_config(&self, config: &VocabularyConfig) -> Result<()> {
        if config.entity_types.iter().any(|name| name.trim().is_empty()) {
            return Err(EntityError::InvalidConfig("empty entity type name".to_string()));
        }

        // Names declared earlier in the same config count as registered
        let mut pending: HashMap<&str, AttributeName> = HashMap::new();
        for def in &config.attributes {
            if def.name.trim().is_empty() {
                return Err(EntityError::InvalidConfig("empty attribute name".to_string()));
            }
            match pending.get(def.name.as_str()).cloned().or_else(|| self.lookup(&def.name)) {
                Some(existing) => {
                    check_kind(&existing, def.kind)?;
                }
                None => {
                    pending.insert(def.name.as_str(), AttributeName::new(&def.name, def.kind));
                }
            }
        }
        Ok(())
    }

    /// Canonical entity type for `name`, created on first use.
    pub fn entity_type(&self, name: &str) -> EntityType {
        if let Some(existing) = self.types.read().get(name) {
            return existing.clone();
        }

        let mut types = self.types.write();
        match types.entry(Box::from(name)) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                debug!(entity_type = name, "registered entity type");
                e.insert(EntityType::new(name)).clone()
            }
        }
    }

    /// Canonical typed key for `name`, created on first use.
    ///
    /// Fails with `RegistrationConflict` if `name` is already registered with
    /// a kind other than `T::KIND`.
    pub fn typed_name<T: AttributeType>(&self, name: &str) -> Result<TypedName<T>> {
        self.declare(name, T::KIND).map(TypedName::from_erased)
    }

    /// Untyped form of [`Vocabulary::typed_name`].
    pub fn declare(&self, name: &str, kind: ValueKind) -> Result<AttributeName> {
        if let Some(existing) = self.names.read().get(name) {
            return check_kind(existing, kind);
        }

        let mut names = self.names.write();
        match names.entry(Box::from(name)) {
            Entry::Occupied(e) => check_kind(e.get(), kind),
            Entry::Vacant(e) => {
                debug!(attribute = name, kind = %kind, "registered attribute");
                Ok(e.insert(AttributeName::new(name, kind)).clone())
            }
        }
    }

    /// Declare an attribute and keep its definition for later inspection.
    pub fn declare_definition(&self, def: &AttributeDefinition) -> Result<AttributeName> {
        if def.name.trim().is_empty() {
            return Err(EntityError::InvalidConfig("empty attribute name".to_string()));
        }
        let name = self.declare(&def.name, def.kind)?;
        self.definitions
            .write()
            .entry(Box::from(def.name.as_str()))
            .or_insert_with(|| def.clone());
        Ok(name)
    }

    pub fn lookup(&self, name: &str) -> Option<AttributeName> {
        self.names.read().get(name).cloned()
    }

    pub fn lookup_type(&self, name: &str) -> Option<EntityType> {
        self.types.read().get(name).cloned()
    }

    pub fn definition(&self, name: &str) -> Option<AttributeDefinition> {
        self.definitions.read().get(name).cloned()
    }

    /// All registered entity types, sorted by name.
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut all: Vec<EntityType> = self.types.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// All registered attribute names, sorted.
    pub fn attribute_names(&self) -> Vec<AttributeName> {
        let mut all: Vec<AttributeName> = self.names.read().values().cloned().collect();
        all.sort();
        all
    }

    pub fn attribute_count(&self) -> usize {
        self.names.read().len()
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vocabulary")
            .field("entity_types", &self.types.read().len())
            .field("attributes", &self.names.read().len())
            .finish()
    }
}

fn check_kind(existing: &AttributeName, requested: ValueKind) -> Result<AttributeName> {
    if existing.kind() == requested {
        Ok(existing.clone())
    } else {
        warn!(
            attribute = existing.name(),
            registered = %existing.kind(),
            requested = %requested,
            "rejected conflicting attribute registration"
        );
        Err(EntityError::RegistrationConflict {
            name: existing.name().to_string(),
            registered: existing.kind(),
            requested,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
