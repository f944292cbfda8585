// ⭐ Rating View - user's rating of an item
// Granted only to entities of the rating shape; accessors read the entity's
// own attribute map.

use chrono::{DateTime, TimeZone, Utc};

use super::{typed_value, Interaction, View};
use crate::entity::{Entity, Shape};
use crate::vocabulary::{ITEM_ID, RATING, TIMESTAMP, USER_ID};

#[derive(Debug, Clone, Copy)]
pub struct Rating<'a> {
    entity: &'a Entity,
    user: &'a i64,
    item: &'a i64,
    value: &'a f64,
    timestamp: Option<&'a i64>,
}

impl<'a> Rating<'a> {
    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    pub fn id(&self) -> i64 {
        self.entity.id()
    }

    pub fn user_id(&self) -> i64 {
        *self.user
    }

    pub fn item_id(&self) -> i64 {
        *self.item
    }

    pub fn value(&self) -> f64 {
        *self.value
    }

    /// Epoch seconds, if recorded
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp.copied()
    }

    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Every rating is also a user-item interaction.
    pub fn as_interaction(&self) -> Interaction<'a> {
        Interaction::from_parts(self.entity, self.user, self.item, self.timestamp)
    }
}

impl<'a> View<'a> for Rating<'a> {
    const NAME: &'static str = "Rating";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        if entity.shape() != Shape::Rating {
            return None;
        }
        Some(Rating {
            entity,
            user: typed_value(entity, USER_ID)?,
            item: typed_value(entity, ITEM_ID)?,
            value: typed_value(entity, RATING)?,
            timestamp: typed_value(entity, TIMESTAMP),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RatingBuilder;
    use crate::entities::{copy_builder, project};
    use crate::vocabulary::Vocabulary;

    #[test]
    fn test_rating_view_reads_entity_values() {
        let vocab = Vocabulary::new();
        let e = RatingBuilder::new(&vocab)
            .set_id(42)
            .set_user_id(3)
            .set_item_id(7)
            .set_rating(4.5)
            .set_timestamp(1000)
            .build()
            .unwrap();

        let r: Rating = project(&e).unwrap();
        assert_eq!(r.id(), 42);
        assert_eq!(r.user_id(), 3);
        assert_eq!(r.item_id(), 7);
        assert_eq!(r.value(), 4.5);
        assert_eq!(r.timestamp(), Some(1000));
        assert_eq!(r.timestamp_utc().unwrap().timestamp(), 1000);
        assert!(r.entity().same_instance(&e));
        assert_eq!(r.as_interaction().item_id(), 7);
    }

    #[test]
    fn test_derived_rating_keeps_the_view() {
        let vocab = Vocabulary::new();
        let original = RatingBuilder::new(&vocab)
            .set_id(1)
            .set_user_id(3)
            .set_item_id(7)
            .set_rating(2.0)
            .build()
            .unwrap();

        let derived = copy_builder(&original)
            .with_attribute(&vocab.common().rating, 5.0)
            .build()
            .unwrap();
        let r: Rating = project(&derived).unwrap();
        assert_eq!(r.value(), 5.0);
        assert_eq!(r.timestamp(), None);
    }
}
