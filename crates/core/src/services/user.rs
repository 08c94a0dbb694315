//! User service.

use std::sync::Arc;

use chrono::Utc;
use eventhub_common::{AppError, AppResult, IdGenerator};
use eventhub_db::{entities::user, repositories::UserRepository};
use sea_orm::{DatabaseConnection, Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A member as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

impl From<user::Model> for MemberView {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            avatar_url: model.avatar_url,
            created_at: model.created_at,
        }
    }
}

/// Input for creating a member.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            user_repo: UserRepository::new(),
            id_gen: IdGenerator::new(),
        }
    }

    /// All members, oldest first.
    pub async fn list(&self) -> AppResult<Vec<MemberView>> {
        let users = self.user_repo.find_all(self.db.as_ref()).await?;
        Ok(users.into_iter().map(MemberView::from).collect())
    }

    /// Get a member by ID.
    pub async fn get(&self, id: &str) -> AppResult<MemberView> {
        self.user_repo
            .get_by_id(self.db.as_ref(), id)
            .await
            .map(MemberView::from)
    }

    /// Register a member. Email addresses are unique.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<MemberView> {
        input.validate()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name cannot be blank".to_string()));
        }
        let email = input.email.trim().to_lowercase();

        if self
            .user_repo
            .find_by_email(self.db.as_ref(), &email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!("Email already registered: {email}")));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            email: Set(email),
            avatar_url: Set(input.avatar_url),
            created_at: Set(Utc::now().into()),
        };

        let user = self.user_repo.create(self.db.as_ref(), model).await?;
        tracing::info!(user_id = %user.id, "Registered member");

        Ok(user.into())
    }
}
