// 🧩 Entities Façade - Factories, combinators, projection
// Everything here is stateless: the closures capture only their parameter and
// may be applied concurrently across partitions of a dataset.
//
// Views (`Rating`, `Interaction`) are capability casts over an existing
// entity: they borrow its storage and are granted by the entity's shape.

pub mod interaction;
pub mod rating;

pub use interaction::Interaction;
pub use rating::Rating;

use crate::attributes::{Attribute, AttributeType, TypedName};
use crate::builder::EntityBuilder;
use crate::entity::Entity;
use crate::error::{EntityError, Result};
use crate::vocabulary::EntityType;

// ============================================================================
// VIEWS
// ============================================================================

/// A typed interface over an entity, obtained by a checked cast.
pub trait View<'a>: Sized {
    /// Name used in projection errors.
    const NAME: &'static str;

    /// The view, if the entity's shape implements it.
    fn from_entity(entity: &'a Entity) -> Option<Self>;
}

/// The base capability: every entity is an entity.
impl<'a> View<'a> for &'a Entity {
    const NAME: &'static str = "Entity";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        Some(entity)
    }
}

/// Reinterpret `entity` as view `V`, failing with `Projection` if its shape
/// does not implement `V`. Nothing is copied.
pub fn project<'a, V: View<'a>>(entity: &'a Entity) -> Result<V> {
    V::from_entity(entity).ok_or_else(|| EntityError::Projection {
        source_shape: entity.shape().to_string(),
        target: V::NAME,
    })
}

/// Reusable projecting function for pipeline-style mapping.
///
/// A plain function pointer: nothing is allocated, and for `&Entity` it
/// returns its input unchanged.
pub fn projection<'a, V: View<'a>>() -> fn(&'a Entity) -> Result<V> {
    project::<V>
}

pub(crate) fn typed_value<'a, T: AttributeType>(entity: &'a Entity, name: &str) -> Option<&'a T> {
    entity.value(name).and_then(T::from_value)
}

// ============================================================================
// FACTORIES
// ============================================================================

/// Create a new bare entity.
pub fn create(entity_type: EntityType, id: i64) -> Entity {
    Entity::bare(entity_type, id)
}

/// Create a builder with no id and no attributes.
pub fn new_builder(entity_type: EntityType) -> EntityBuilder {
    EntityBuilder::new(entity_type)
}

/// Create a builder with its id already set.
pub fn new_builder_with_id(entity_type: EntityType, id: i64) -> EntityBuilder {
    EntityBuilder::new(entity_type).with_id(id)
}

/// Create a builder initialized to build a copy of `entity`.
///
/// Override some attributes and `build()` to derive a modified entity;
/// `entity` itself is untouched.
pub fn copy_builder(entity: &Entity) -> EntityBuilder {
    let mut builder = new_builder_with_id(entity.entity_type().clone(), entity.id());
    for (name, value) in entity.attributes() {
        builder.set_value(name.clone(), value.clone());
    }
    builder
}

// ============================================================================
// PREDICATES
// ============================================================================

/// Matches entities of type `entity_type`.
pub fn type_predicate(entity_type: EntityType) -> impl Fn(&Entity) -> bool + Clone + Send + Sync {
    move |e: &Entity| e.entity_type() == &entity_type
}

/// Matches entities with id `id`.
pub fn id_predicate(id: i64) -> impl Fn(&Entity) -> bool + Clone + Send + Sync {
    move |e: &Entity| e.id() == id
}

/// Matches entities carrying attribute `name`.
pub fn attribute_predicate(name: &str) -> impl Fn(&Entity) -> bool + Clone + Send + Sync {
    let name = name.to_string();
    move |e: &Entity| e.has_attribute(&name)
}

/// Matches entities whose `name` attribute equals `value`.
pub fn attribute_value_predicate<T: AttributeType>(
    name: &TypedName<T>,
    value: T,
) -> impl Fn(&Entity) -> bool + Clone + Send + Sync {
    let name = name.clone();
    move |e: &Entity| e.maybe_get(&name) == Some(&value)
}

/// Adapt a predicate to possibly-absent entities: absent never matches.
pub fn optional_predicate<P>(predicate: P) -> impl Fn(Option<&Entity>) -> bool + Clone + Send + Sync
where
    P: Fn(&Entity) -> bool + Clone + Send + Sync,
{
    move |e: Option<&Entity>| e.is_some_and(|e| predicate(e))
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Maps an entity to its value for `attribute`, or `None` when missing.
pub fn attribute_value_function<T: AttributeType>(
    attribute: &Attribute<T>,
) -> impl Fn(&Entity) -> Option<T> + Clone + Send + Sync {
    let name = attribute.name().clone();
    move |e: &Entity| e.maybe_get(&name).cloned()
}

/// Like `attribute_value_function`, substituting the attribute's default.
pub fn attribute_or_default_function<T: AttributeType>(
    attribute: &Attribute<T>,
) -> impl Fn(&Entity) -> Option<T> + Clone + Send + Sync {
    let attribute = attribute.clone();
    move |e: &Entity| attribute.extract_or_default(e)
}

// ============================================================================
// TESTS
// ============================================================================
