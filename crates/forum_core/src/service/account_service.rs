//! Account lifecycle operations.
//!
//! # Responsibility
//! - Create accounts idempotently keyed by email.
//! - Materialize persisted accounts into the identity registry.
//! - Guarantee the reassignment sentinel account exists.

use crate::config::CoreConfig;
use crate::model::user::{NewUser, User, UserId};
use crate::model::now_epoch_ms;
use crate::registry::{EntityKind, EntityRegistry};
use crate::repo::{UserRecord, UserRepository};
use crate::service::{DomainError, DomainResult};
use log::info;

/// Service for account creation and lookup.
pub struct AccountService<U: UserRepository> {
    repo: U,
    config: CoreConfig,
}

impl<U: UserRepository> AccountService<U> {
    pub fn new(repo: U, config: CoreConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Creates an account, or returns the existing one when the email is
    /// already registered. Validation failures surface before any mutation.
    pub fn create_user(
        &self,
        registry: &mut EntityRegistry,
        request: &NewUser,
    ) -> DomainResult<UserId> {
        request.validate(&self.config)?;

        if let Some(record) = self.repo.find_user_by_email(&request.email)? {
            let id = self.materialize_user(registry, record)?;
            info!("event=user_create module=account_service status=exists uuid={id}");
            return Ok(id);
        }

        let user = User::new(request, now_epoch_ms());
        let id = self.persist_new_user(registry, user)?;
        info!("event=user_create module=account_service status=created uuid={id}");
        Ok(id)
    }

    /// Resolves an account by id, registry first, store second.
    pub fn load_user(
        &self,
        registry: &mut EntityRegistry,
        id: UserId,
    ) -> DomainResult<Option<UserId>> {
        if registry.user(id).is_some() {
            return Ok(Some(id));
        }
        match self.repo.find_user(id)? {
            Some(record) => Ok(Some(self.materialize_user(registry, record)?)),
            None => Ok(None),
        }
    }

    pub fn load_user_by_email(
        &self,
        registry: &mut EntityRegistry,
        email: &str,
    ) -> DomainResult<Option<UserId>> {
        match self.repo.find_user_by_email(email)? {
            Some(record) => Ok(Some(self.materialize_user(registry, record)?)),
            None => Ok(None),
        }
    }

    /// Resolves the sentinel account that orphaned posts are reassigned to,
    /// creating it on first use. The sentinel is born deleted so it can never
    /// author new content.
    pub fn ensure_deleted_sentinel(&self, registry: &mut EntityRegistry) -> DomainResult<UserId> {
        if let Some(record) = self.repo.find_user_by_email(&self.config.deleted_user_email)? {
            return self.materialize_user(registry, record);
        }

        let request = NewUser::member(
            &self.config.deleted_user_name,
            &self.config.deleted_user_email,
            &self.config.deleted_user_major,
            1,
        );
        let mut user = User::new(&request, now_epoch_ms());
        user.is_deleted = true;
        let id = self.persist_new_user(registry, user)?;
        info!("event=sentinel_create module=account_service status=created uuid={id}");
        Ok(id)
    }

    /// One-line profile summary for a materialized account.
    pub fn account_info(&self, registry: &EntityRegistry, id: UserId) -> DomainResult<String> {
        let user = registry
            .user(id)
            .ok_or(DomainError::NotFound(EntityKind::User, id))?;
        Ok(user.account_info())
    }

    fn persist_new_user(&self, registry: &mut EntityRegistry, user: User) -> DomainResult<UserId> {
        let record = user_to_record(&user);
        let id = registry.register_user(user);
        if let Err(err) = self.repo.create_user(&record) {
            registry.unregister(EntityKind::User, id);
            return Err(err.into());
        }
        Ok(id)
    }

    fn materialize_user(
        &self,
        registry: &mut EntityRegistry,
        record: UserRecord,
    ) -> DomainResult<UserId> {
        let id = record.uuid;
        if registry.user(id).is_some() {
            return Ok(id);
        }
        registry.register_user(user_from_record(&record));

        let forums = self.repo.list_forum_ids(id)?;
        let posts = self.repo.list_post_ids(id)?;
        let reactions = self.repo.list_reaction_ids(id)?;
        if let Some(user) = registry.user_mut(id) {
            user.forums = forums.into_iter().collect();
            user.posts = posts;
            user.reactions = reactions;
        }
        Ok(id)
    }
}

pub(crate) fn user_from_record(record: &UserRecord) -> User {
    User {
        id: record.uuid,
        username: record.username.clone(),
        email: record.email.clone(),
        major: record.major.clone(),
        year: record.year,
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        is_deleted: record.is_deleted,
        is_admin: record.is_admin,
        created_at: record.created_at,
        posts: Vec::new(),
        forums: Default::default(),
        reactions: Vec::new(),
    }
}

pub(crate) fn user_to_record(user: &User) -> UserRecord {
    UserRecord {
        uuid: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        major: user.major.clone(),
        year: user.year,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_deleted: user.is_deleted,
        is_admin: user.is_admin,
        created_at: user.created_at,
    }
}
