use sea_orm::*;

use crate::auth_utils::{hash_password, verify_password};
use crate::deadline::DEFAULT_DUE_SOON_DAYS;
use crate::entities::{prelude::*, user, user_settings};
use crate::errors::AppError;

/// Account lookups, registration and password checks.
pub struct UserService;

impl UserService {
    pub async fn find_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> Result<Option<user::Model>, AppError> {
        User::find_by_id(id).one(db).await.map_err(AppError::Database)
    }

    pub async fn find_by_username(
        db: &DatabaseConnection,
        username: &str,
    ) -> Result<Option<user::Model>, AppError> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await
            .map_err(AppError::Database)
    }

    /// Registers an account together with its settings row. Both go in
    /// one transaction so no account ever exists without a lookahead
    /// window. The unique index on `username` rejects duplicates.
    pub async fn create(
        db: &DatabaseConnection,
        username: &str,
        password: &str,
    ) -> Result<user::Model, AppError> {
        let password_hash = hash_password(password)?;

        let txn = db.begin().await.map_err(AppError::Database)?;

        let new_user = user::ActiveModel {
            username: Set(username.to_owned()),
            password_hash: Set(password_hash),
            ..Default::default()
        };
        let created = new_user.insert(&txn).await.map_err(AppError::Database)?;

        let settings = user_settings::ActiveModel {
            user_id: Set(created.id),
            due_soon_days: Set(DEFAULT_DUE_SOON_DAYS),
            ..Default::default()
        };
        settings.insert(&txn).await.map_err(AppError::Database)?;

        txn.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    /// Checks a username/password pair. Unknown usernames and wrong
    /// passwords both answer `Unauthorized`.
    pub async fn authenticate(
        db: &DatabaseConnection,
        username: &str,
        password: &str,
    ) -> Result<user::Model, AppError> {
        let user = Self::find_by_username(db, username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }
}
