//! Group and membership operations.
//!
//! Group administration proper (invites, approvals) lives outside the engine;
//! these are the narrow operations the settlement core needs: create a group,
//! maintain its member set, and answer "who are the members of group G".

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{EngineError, Group, ResultEngine, group_members, groups};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Creates a group; the creator becomes its first member.
    pub async fn new_group(
        &self,
        name: &str,
        user_id: &str,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<String> {
        let name = normalize_required_name(name, "group name")?;
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;

            let duplicate = groups::Entity::find()
                .filter(groups::Column::CreatedBy.eq(user_id.to_string()))
                .filter(groups::Column::Name.eq(name.clone()))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            let group = Group::new(name, user_id, created_at);
            let group_id = group.id.clone();
            groups::ActiveModel::from(&group).insert(&db_tx).await?;

            group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
            }
            .insert(&db_tx)
            .await?;

            Ok(group_id)
        })
    }

    /// Lists the groups the user belongs to, sorted by name.
    pub async fn groups_for_user(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let memberships = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(memberships.len());
            for membership in memberships {
                if let Some(model) = self.find_group_by_id(&db_tx, &membership.group_id).await? {
                    out.push(Group::from(model));
                }
            }
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        })
    }

    /// Adds a member (creator-only).
    pub async fn add_group_member(
        &self,
        group_id: &str,
        member_username: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group_creator(&db_tx, group_id, user_id).await?;
            self.require_user_exists(&db_tx, member_username).await?;

            if self.is_group_member(&db_tx, group_id, member_username).await? {
                return Err(EngineError::ExistingKey(member_username.to_string()));
            }

            group_members::ActiveModel {
                group_id: ActiveValue::Set(group_id.to_string()),
                user_id: ActiveValue::Set(member_username.to_string()),
            }
            .insert(&db_tx)
            .await?;
            Ok(())
        })
    }

    /// Removes a member (creator-only). The creator cannot be removed.
    pub async fn remove_group_member(
        &self,
        group_id: &str,
        member_username: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_creator(&db_tx, group_id, user_id).await?;
            if member_username == group.created_by {
                return Err(EngineError::InvalidAmount(
                    "cannot remove group creator".to_string(),
                ));
            }

            group_members::Entity::delete_by_id((
                group_id.to_string(),
                member_username.to_string(),
            ))
            .exec(&db_tx)
            .await?;
            Ok(())
        })
    }

    /// Lists a group's member usernames in ascending order (members only).
    pub async fn group_members(&self, group_id: &str, user_id: &str) -> ResultEngine<Vec<String>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;
            self.group_member_ids(&db_tx, group_id).await
        })
    }
}
