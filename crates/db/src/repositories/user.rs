//! User repository.

use std::collections::HashMap;

use crate::entities::{User, user};
use crate::map_db_err;
use eventhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
};

/// User repository for database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserRepository;

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Find a user by ID.
    pub async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find_by_id(id).one(conn).await.map_err(map_db_err)
    }

    /// Get a user by ID, returning an error if not found.
    pub async fn get_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<user::Model> {
        self.find_by_id(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {id}")))
    }

    /// Find a user by email address.
    pub async fn find_by_email<C: ConnectionTrait>(
        &self,
        conn: &C,
        email: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(conn)
            .await
            .map_err(map_db_err)
    }

    /// All users, oldest first.
    pub async fn find_all<C: ConnectionTrait>(&self, conn: &C) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .all(conn)
            .await
            .map_err(map_db_err)
    }

    /// Load several users, keyed by ID. Unknown IDs are skipped.
    pub async fn find_by_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[String],
    ) -> AppResult<HashMap<String, user::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = User::find()
            .filter(user::Column::Id.is_in(ids.iter().cloned()))
            .all(conn)
            .await
            .map_err(map_db_err)?;

        Ok(users.into_iter().map(|u| (u.id.clone(), u)).collect())
    }

    /// Create a new user.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: user::ActiveModel,
    ) -> AppResult<user::Model> {
        model.insert(conn).await.map_err(map_db_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_user(id: &str, name: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{name}@example.com"),
            avatar_url: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "alice");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .into_connection();

        let result = UserRepository::new()
            .find_by_id(&db, "user1")
            .await
            .unwrap();

        assert_eq!(result, Some(user));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = UserRepository::new().get_by_id(&db, "missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_ids_keys_by_id() {
        let alice = create_test_user("user1", "alice");
        let bob = create_test_user("user2", "bob");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[alice, bob]])
            .into_connection();

        let users = UserRepository::new()
            .find_by_ids(&db, &["user1".to_string(), "user2".to_string()])
            .await
            .unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users["user2"].name, "bob");
    }
}
