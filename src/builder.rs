// 🛠️ Entity Builders - Mutable accumulators that freeze into entities
// A builder is owned by one caller until build(); build() snapshots the
// current state, so it may be called again after further edits.

use tracing::trace;

use crate::attributes::{AttributeName, AttributeType, AttributeValue, TypedName};
use crate::entity::{AttributeMap, Entity};
use crate::error::{EntityError, Result};
use crate::vocabulary::{CommonVocabulary, EntityType, Vocabulary};

// ============================================================================
// ENTITY BUILDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct EntityBuilder {
    entity_type: EntityType,
    id: Option<i64>,
    attributes: AttributeMap,
}

impl EntityBuilder {
    pub fn new(entity_type: EntityType) -> Self {
        EntityBuilder {
            entity_type,
            id: None,
            attributes: AttributeMap::new(),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Assign the record id. Uniqueness is the caller's concern.
    pub fn set_id(&mut self, id: i64) -> &mut Self {
        self.id = Some(id);
        self
    }

    /// Record `value` under `name`, replacing any previous value.
    pub fn set_attribute<T: AttributeType>(&mut self, name: &TypedName<T>, value: T) -> &mut Self {
        self.set_value(name.erased().clone(), value.into_value())
    }

    /// Builder: consuming form of `set_id`
    pub fn with_id(mut self, id: i64) -> Self {
        self.set_id(id);
        self
    }

    /// Builder: consuming form of `set_attribute`
    pub fn with_attribute<T: AttributeType>(mut self, name: &TypedName<T>, value: T) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn clear_attribute(&mut self, name: &str) -> &mut Self {
        self.attributes.remove(name);
        self
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Untyped bulk-load path: resolve `name` in `vocab` and coerce `raw` to
    /// its declared kind.
    ///
    /// Fails with `UnknownAttribute` for undeclared names and `TypeMismatch`
    /// when `raw` cannot represent the declared kind. Nothing is recorded on
    /// failure.
    pub fn set_untyped(
        &mut self,
        vocab: &Vocabulary,
        name: &str,
        raw: &serde_json::Value,
    ) -> Result<&mut Self> {
        let key = resolve(vocab, name)?;
        let value = AttributeValue::from_json(name, key.kind(), raw)?;
        Ok(self.set_value(key, value))
    }

    /// Untyped bulk-load path for raw text cells.
    pub fn set_untyped_text(&mut self, vocab: &Vocabulary, name: &str, raw: &str) -> Result<&mut Self> {
        let key = resolve(vocab, name)?;
        let value = AttributeValue::parse_text(name, key.kind(), raw)?;
        Ok(self.set_value(key, value))
    }

    pub(crate) fn set_value(&mut self, name: AttributeName, value: AttributeValue) -> &mut Self {
        // Replace the stored key as well as the value
        self.attributes.remove(name.name());
        self.attributes.insert(name, value);
        self
    }

    /// Freeze the current id and attributes into a new entity.
    pub fn build(&self) -> Result<Entity> {
        let id = self.id.ok_or_else(|| EntityError::MissingId {
            entity_type: self.entity_type.name().to_string(),
        })?;

        let entity = Entity::from_parts(self.entity_type.clone(), id, self.attributes.clone());
        trace!(
            entity_type = %self.entity_type,
            id,
            attributes = entity.attribute_count(),
            shape = %entity.shape(),
            "built entity"
        );
        Ok(entity)
    }
}

fn resolve(vocab: &Vocabulary, name: &str) -> Result<AttributeName> {
    vocab
        .lookup(name)
        .ok_or_else(|| EntityError::UnknownAttribute(name.to_string()))
}

// ============================================================================
// RATING BUILDER
// ============================================================================

/// Typed builder for `rating` entities. `build()` insists on user, item and
/// rating so the result always has the rating shape.
#[derive(Debug, Clone)]
pub struct RatingBuilder {
    inner: EntityBuilder,
    common: CommonVocabulary,
}

impl RatingBuilder {
    pub fn new(vocab: &Vocabulary) -> Self {
        let common = vocab.common().clone();
        RatingBuilder {
            inner: EntityBuilder::new(common.rating_type.clone()),
            common,
        }
    }

    pub fn set_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_id(id);
        self
    }

    pub fn set_user_id(&mut self, user: i64) -> &mut Self {
        self.inner.set_attribute(&self.common.user_id, user);
        self
    }

    pub fn set_item_id(&mut self, item: i64) -> &mut Self {
        self.inner.set_attribute(&self.common.item_id, item);
        self
    }

    pub fn set_rating(&mut self, rating: f64) -> &mut Self {
        self.inner.set_attribute(&self.common.rating, rating);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: i64) -> &mut Self {
        self.inner.set_attribute(&self.common.timestamp, timestamp);
        self
    }

    pub fn build(&self) -> Result<Entity> {
        let id = self.inner.id().ok_or_else(|| EntityError::MissingId {
            entity_type: self.inner.entity_type().name().to_string(),
        })?;

        let required = [
            self.common.user_id.name(),
            self.common.item_id.name(),
            self.common.rating.name(),
        ];
        if let Some(missing) = required.iter().find(|name| !self.inner.has_attribute(name)) {
            return Err(EntityError::AttributeNotFound {
                attribute: missing.to_string(),
                entity_type: self.inner.entity_type().name().to_string(),
                id,
            });
        }
        self.inner.build()
    }
}

impl Default for RatingBuilder {
    fn default() -> Self {
        Self::new(Vocabulary::global())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::ValueKind;
    use crate::entity::Shape;
    use serde_json::json;

    #[test]
    fn test_build_requires_id() {
        let vocab = Vocabulary::new();
        let builder = EntityBuilder::new(vocab.entity_type("item"));
        assert_eq!(
            builder.build().unwrap_err(),
            EntityError::MissingId {
                entity_type: "item".to_string()
            }
        );
    }

    #[test]
    fn test_set_attribute_overwrites() {
        let vocab = Vocabulary::new();
        let common = vocab.common();
        let mut builder = EntityBuilder::new(vocab.entity_type("rating"));
        builder
            .set_id(1)
            .set_attribute(&common.rating, 3.0)
            .set_attribute(&common.rating, 4.0);

        let e = builder.build().unwrap();
        assert_eq!(e.get(&common.rating).unwrap(), &4.0);
        assert_eq!(e.attribute_count(), 1);
    }

    #[test]
    fn test_build_twice_yields_independent_entities() {
        let vocab = Vocabulary::new();
        let common = vocab.common();
        let mut builder = EntityBuilder::new(vocab.entity_type("item")).with_id(5);
        builder.set_attribute(&common.timestamp, 10);

        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first, second);
        assert!(!first.same_instance(&second));

        builder.set_attribute(&common.timestamp, 20);
        let third = builder.build().unwrap();
        assert_eq!(first.get(&common.timestamp).unwrap(), &10);
        assert_eq!(third.get(&common.timestamp).unwrap(), &20);
    }

    #[test]
    fn test_clear_attribute() {
        let vocab = Vocabulary::new();
        let common = vocab.common();
        let mut builder = EntityBuilder::new(vocab.entity_type("item"))
            .with_id(5)
            .with_attribute(&common.timestamp, 10);
        builder.clear_attribute("timestamp");
        let e = builder.build().unwrap();
        assert_eq!(e.shape(), Shape::Bare);
    }

    #[test]
    fn test_set_untyped_coerces_to_declared_kind() {
        let vocab = Vocabulary::new();
        let mut builder = EntityBuilder::new(vocab.entity_type("rating"));
        builder.set_id(8);
        builder.set_untyped(&vocab, "user", &json!(3)).unwrap();
        builder.set_untyped(&vocab, "item", &json!("7")).unwrap();
        builder.set_untyped_text(&vocab, "rating", "4").unwrap();

        let e = builder.build().unwrap();
        assert_eq!(e.get(&vocab.common().rating).unwrap(), &4.0);
        assert_eq!(e.shape(), Shape::Rating);
    }

    #[test]
    fn test_set_untyped_rejects_bad_values() {
        let vocab = Vocabulary::new();
        let mut builder = EntityBuilder::new(vocab.entity_type("rating"));

        let err = builder.set_untyped(&vocab, "rating", &json!("four")).unwrap_err();
        assert!(matches!(
            err,
            EntityError::TypeMismatch { expected: ValueKind::Real, .. }
        ));

        let err = builder.set_untyped(&vocab, "mood", &json!("happy")).unwrap_err();
        assert_eq!(err, EntityError::UnknownAttribute("mood".to_string()));

        assert!(!builder.has_attribute("rating"));
    }

    #[test]
    fn test_rating_builder() {
        let vocab = Vocabulary::new();
        let mut builder = RatingBuilder::new(&vocab);
        builder.set_id(42).set_user_id(3).set_item_id(7);

        let err = builder.build().unwrap_err();
        assert!(matches!(err, EntityError::AttributeNotFound { ref attribute, .. } if attribute == "rating"));

        builder.set_rating(4.5).set_timestamp(1000);
        let e = builder.build().unwrap();
        assert_eq!(e.shape(), Shape::Rating);
        assert_eq!(e.entity_type(), &vocab.common().rating_type);
    }

    #[test]
    fn test_rating_builder_reports_missing_id_before_attributes() {
        let vocab = Vocabulary::new();
        let mut builder = RatingBuilder::new(&vocab);
        builder.set_user_id(3);

        assert_eq!(
            builder.build().unwrap_err(),
            EntityError::MissingId {
                entity_type: "rating".to_string()
            }
        );

        builder.set_id(42);
        let err = builder.build().unwrap_err();
        assert!(matches!(err, EntityError::AttributeNotFound { id: 42, ref attribute, .. } if attribute == "item"));
    }
}
