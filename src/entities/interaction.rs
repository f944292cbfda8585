// 🔗 Interaction View - a user-item event (clicks, plays, ratings)

use super::{typed_value, View};
use crate::entity::{Entity, Shape};
use crate::vocabulary::{ITEM_ID, TIMESTAMP, USER_ID};

#[derive(Debug, Clone, Copy)]
pub struct Interaction<'a> {
    entity: &'a Entity,
    user: &'a i64,
    item: &'a i64,
    timestamp: Option<&'a i64>,
}

impl<'a> Interaction<'a> {
    pub(crate) fn from_parts(
        entity: &'a Entity,
        user: &'a i64,
        item: &'a i64,
        timestamp: Option<&'a i64>,
    ) -> Self {
        Interaction {
            entity,
            user,
            item,
            timestamp,
        }
    }

    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    pub fn user_id(&self) -> i64 {
        *self.user
    }

    pub fn item_id(&self) -> i64 {
        *self.item
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp.copied()
    }
}

impl<'a> View<'a> for Interaction<'a> {
    const NAME: &'static str = "Interaction";

    fn from_entity(entity: &'a Entity) -> Option<Self> {
        if !matches!(entity.shape(), Shape::Interaction | Shape::Rating) {
            return None;
        }
        Some(Interaction::from_parts(
            entity,
            typed_value(entity, USER_ID)?,
            typed_value(entity, ITEM_ID)?,
            typed_value(entity, TIMESTAMP),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{new_builder_with_id, project, projection, Rating};
    use crate::error::EntityError;
    use crate::vocabulary::Vocabulary;

    #[test]
    fn test_click_is_an_interaction_but_not_a_rating() {
        let vocab = Vocabulary::new();
        let common = vocab.common();
        let click = new_builder_with_id(vocab.entity_type("click"), 5)
            .with_attribute(&common.user_id, 3)
            .with_attribute(&common.item_id, 9)
            .build()
            .unwrap();

        let i: Interaction = project(&click).unwrap();
        assert_eq!((i.user_id(), i.item_id(), i.timestamp()), (3, 9, None));
        assert!(matches!(
            project::<Rating>(&click),
            Err(EntityError::Projection { .. })
        ));
    }

    #[test]
    fn test_projection_function_over_a_sequence() {
        let vocab = Vocabulary::new();
        let common = vocab.common();
        let events: Vec<_> = (0..3)
            .map(|n| {
                new_builder_with_id(vocab.entity_type("play"), n)
                    .with_attribute(&common.user_id, 1)
                    .with_attribute(&common.item_id, 100 + n)
                    .with_attribute(&common.timestamp, 10 * n)
                    .build()
                    .unwrap()
            })
            .collect();

        let to_interaction = projection::<Interaction>();
        let items: Vec<i64> = events
            .iter()
            .map(|e| to_interaction(e).map(|i| i.item_id()))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(items, vec![100, 101, 102]);
    }
}
