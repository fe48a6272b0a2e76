//! Access guards shared by the ops modules.
//!
//! Every guard that gates on membership or settlement party answers a failed
//! check with `KeyNotFound` and the same message as a genuinely missing row,
//! so callers can never probe whether a group or settlement exists.

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{EngineError, ResultEngine, group_members, groups, settlements, users};

use super::Engine;

impl Engine {
    pub(super) async fn find_group_by_id(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Option<groups::Model>> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn is_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<bool> {
        let row =
            group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
                .one(db)
                .await?;
        Ok(row.is_some())
    }

    /// Requires the group to exist and the user to be one of its members.
    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if !self.is_group_member(db, group_id, user_id).await? {
            return Err(EngineError::KeyNotFound("group not exists".to_string()));
        }
        Ok(model)
    }

    /// Requires the user to be the group creator (membership writes only).
    pub(super) async fn require_group_creator(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if model.created_by != user_id {
            return Err(EngineError::KeyNotFound("group not exists".to_string()));
        }
        Ok(model)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }

    /// The group's member usernames in ascending order.
    ///
    /// This ordering is the canonical one: the split calculator pins the
    /// rounding remainder to its first entry and the matcher inherits it as
    /// the tie-break.
    pub(super) async fn group_member_ids(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<String>> {
        let rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_members::Column::UserId)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    /// Loads a settlement the user is a party to (debtor or creditor).
    ///
    /// Non-parties get the same `KeyNotFound` as a missing id.
    pub(super) async fn require_settlement_party(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
        user_id: &str,
    ) -> ResultEngine<settlements::Model> {
        let model = settlements::Entity::find_by_id(settlement_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
        if model.paid_by != user_id && model.paid_to != user_id {
            return Err(EngineError::KeyNotFound("settlement not exists".to_string()));
        }
        Ok(model)
    }
}
