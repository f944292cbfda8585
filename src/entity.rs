// 🧱 Entity - Immutable typed record
// Identity (type + id) plus a frozen map of attribute values.
// No setters: derive a modified entity through `entities::copy_builder`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::attributes::{AttributeName, AttributeType, AttributeValue, TypedName, ValueKind};
use crate::error::{EntityError, Result};
use crate::vocabulary::{EntityType, ITEM_ID, RATING, RATING_TYPE, USER_ID};

pub(crate) type AttributeMap = BTreeMap<AttributeName, AttributeValue>;

// ============================================================================
// SHAPE (concrete variant)
// ============================================================================

/// The concrete variant of an entity, fixed when it is built. Views are
/// granted by shape, see [`crate::entities::project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Type and id only
    Bare,
    /// Attributes without a recognized domain shape
    Basic,
    /// Carries integer `user` and `item` attributes
    Interaction,
    /// A `rating` entity with `user`, `item` and a real `rating` value
    Rating,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Bare => "bare",
            Shape::Basic => "basic",
            Shape::Interaction => "interaction",
            Shape::Rating => "rating",
        }
    }

    fn classify(entity_type: &EntityType, attributes: &AttributeMap) -> Shape {
        if attributes.is_empty() {
            return Shape::Bare;
        }

        let has = |name: &str, kind: ValueKind| {
            attributes.get(name).map(AttributeValue::kind) == Some(kind)
        };

        if !(has(USER_ID, ValueKind::Integer) && has(ITEM_ID, ValueKind::Integer)) {
            Shape::Basic
        } else if entity_type.name() == RATING_TYPE && has(RATING, ValueKind::Real) {
            Shape::Rating
        } else {
            Shape::Interaction
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Debug)]
struct EntityData {
    entity_type: EntityType,
    id: i64,
    attributes: AttributeMap,
    shape: Shape,
}

/// Immutable record. Cloning shares the same instance; every `build()`
/// produces a new one.
#[derive(Clone)]
pub struct Entity {
    data: Arc<EntityData>,
}

impl Entity {
    /// An entity with no attributes.
    pub fn bare(entity_type: EntityType, id: i64) -> Self {
        Entity::from_parts(entity_type, id, AttributeMap::new())
    }

    pub(crate) fn from_parts(entity_type: EntityType, id: i64, attributes: AttributeMap) -> Self {
        let shape = Shape::classify(&entity_type, &attributes);
        Entity {
            data: Arc::new(EntityData {
                entity_type,
                id,
                attributes,
                shape,
            }),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.data.entity_type
    }

    pub fn id(&self) -> i64 {
        self.data.id
    }

    pub fn shape(&self) -> Shape {
        self.data.shape
    }

    /// Typed value for `name`; fails with `AttributeNotFound` if absent.
    pub fn get<T: AttributeType>(&self, name: &TypedName<T>) -> Result<&T> {
        self.checked_get(name)?
            .ok_or_else(|| EntityError::AttributeNotFound {
                attribute: name.name().to_string(),
                entity_type: self.entity_type().name().to_string(),
                id: self.id(),
            })
    }

    /// Typed value for `name`, or `None` if absent. Never fails.
    ///
    /// A stored value of another kind (only possible when `name` comes from a
    /// different vocabulary) is logged at debug level and reported as absent.
    pub fn maybe_get<T: AttributeType>(&self, name: &TypedName<T>) -> Option<&T> {
        match self.checked_get(name) {
            Ok(value) => value,
            Err(e) => {
                debug!(entity_type = %self.entity_type(), id = self.id(), error = %e, "typed read failed");
                None
            }
        }
    }

    /// Like `maybe_get`, but a stored value of another kind is a `TypeMismatch`.
    pub fn checked_get<T: AttributeType>(&self, name: &TypedName<T>) -> Result<Option<&T>> {
        match self.data.attributes.get(name.name()) {
            None => Ok(None),
            Some(value) => T::from_value(value).map(Some).ok_or_else(|| {
                EntityError::type_mismatch(name.name(), T::KIND, value.kind().as_str())
            }),
        }
    }

    /// Erased value lookup by name.
    pub fn value(&self, name: &str) -> Option<&AttributeValue> {
        self.data.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.data.attributes.contains_key(name)
    }

    /// The attribute names actually present, in name order.
    pub fn typed_attribute_names(&self) -> impl Iterator<Item = &AttributeName> + '_ {
        self.data.attributes.keys()
    }

    /// Name/value pairs, in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&AttributeName, &AttributeValue)> + '_ {
        self.data.attributes.iter()
    }

    pub fn attribute_count(&self) -> usize {
        self.data.attributes.len()
    }

    /// True if both handles point at the same built instance.
    pub fn same_instance(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Value equality: same type, id, and attribute name/value pairs.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
            || (self.data.id == other.data.id
                && self.data.entity_type == other.data.entity_type
                && self.data.attributes == other.data.attributes)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.data.entity_type.name())
            .field("id", &self.data.id)
            .field("shape", &self.data.shape)
            .field("attributes", &self.data.attributes)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.data.entity_type, self.data.id)?;
        if !self.data.attributes.is_empty() {
            let pairs: Vec<String> = self
                .attributes()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            write!(f, " {{{}}}", pairs.join(", "))?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::Vocabulary;

    fn rating_entity(vocab: &Vocabulary) -> Entity {
        let common = vocab.common();
        let mut attributes = AttributeMap::new();
        attributes.insert(common.user_id.erased().clone(), AttributeValue::Integer(3));
        attributes.insert(common.item_id.erased().clone(), AttributeValue::Integer(7));
        attributes.insert(common.rating.erased().clone(), AttributeValue::Real(4.5));
        Entity::from_parts(common.rating_type.clone(), 42, attributes)
    }

    #[test]
    fn test_bare_entity() {
        let vocab = Vocabulary::new();
        let e = Entity::bare(vocab.entity_type("user"), 9);
        assert_eq!(e.id(), 9);
        assert_eq!(e.entity_type().name(), "user");
        assert_eq!(e.shape(), Shape::Bare);
        assert_eq!(e.typed_attribute_names().count(), 0);
        assert_eq!(e.to_string(), "user#9");
    }

    #[test]
    fn test_get_and_maybe_get() {
        let vocab = Vocabulary::new();
        let e = rating_entity(&vocab);
        let common = vocab.common();

        assert_eq!(e.get(&common.rating).unwrap(), &4.5);
        assert_eq!(e.maybe_get(&common.item_id), Some(&7));
        assert_eq!(e.maybe_get(&common.timestamp), None);
        assert!(matches!(
            e.get(&common.timestamp),
            Err(EntityError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_read_through_conflicting_name_is_type_mismatch() {
        let vocab = Vocabulary::new();
        let e = rating_entity(&vocab);

        // Same name, declared as an integer elsewhere
        let other = TypedName::<i64>::from_erased(AttributeName::new("rating", ValueKind::Integer));
        assert_eq!(
            e.get(&other).unwrap_err(),
            EntityError::TypeMismatch {
                attribute: "rating".to_string(),
                expected: ValueKind::Integer,
                found: "real".to_string(),
            }
        );
        assert!(e.checked_get(&other).is_err());
        assert_eq!(e.maybe_get(&other), None);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_mismatched_reads_stay_below_warn() {
        let vocab = Vocabulary::new();
        let e = rating_entity(&vocab);
        let other = TypedName::<i64>::from_erased(AttributeName::new("rating", ValueKind::Integer));

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..1000 {
                assert_eq!(e.maybe_get(&other), None);
            }
        });
        assert!(captured.0.lock().is_empty());
    }

    #[test]
    fn test_shape_classification() {
        let vocab = Vocabulary::new();
        assert_eq!(rating_entity(&vocab).shape(), Shape::Rating);

        let common = vocab.common();
        let mut attributes = AttributeMap::new();
        attributes.insert(common.user_id.erased().clone(), AttributeValue::Integer(3));
        attributes.insert(common.item_id.erased().clone(), AttributeValue::Integer(7));
        let click = Entity::from_parts(vocab.entity_type("click"), 1, attributes.clone());
        assert_eq!(click.shape(), Shape::Interaction);

        // A rating-typed entity without a rating value is only an interaction
        let partial = Entity::from_parts(common.rating_type.clone(), 2, attributes);
        assert_eq!(partial.shape(), Shape::Interaction);

        let mut attributes = AttributeMap::new();
        attributes.insert(AttributeName::new("name", ValueKind::Text), AttributeValue::Text("x".into()));
        let user = Entity::from_parts(common.user_type.clone(), 3, attributes);
        assert_eq!(user.shape(), Shape::Basic);
    }

    #[test]
    fn test_value_equality_and_instance_identity() {
        let vocab = Vocabulary::new();
        let a = rating_entity(&vocab);
        let b = rating_entity(&vocab);
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));

        let shared = a.clone();
        assert!(shared.same_instance(&a));
    }

    #[test]
    fn test_display_lists_attributes_in_name_order() {
        let vocab = Vocabulary::new();
        let e = rating_entity(&vocab);
        assert_eq!(e.to_string(), "rating#42 {item=7, rating=4.5, user=3}");
    }
}
