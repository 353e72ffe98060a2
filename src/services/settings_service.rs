use sea_orm::*;

use crate::entities::{prelude::*, user_settings};
use crate::errors::AppError;

/// Per-user preferences, currently just the due-soon lookahead window.
pub struct SettingsService;

impl SettingsService {
    /// Loads the settings row for a user. Registration creates it, so
    /// a missing row surfaces as `MissingSettings` instead of a
    /// silent default.
    pub async fn for_user(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<user_settings::Model, AppError> {
        UserSettings::find()
            .filter(user_settings::Column::UserId.eq(user_id))
            .one(db)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::MissingSettings(user_id))
    }

    pub async fn update_window(
        db: &DatabaseConnection,
        user_id: i32,
        due_soon_days: i32,
    ) -> Result<user_settings::Model, AppError> {
        let settings = Self::for_user(db, user_id).await?;

        let mut active: user_settings::ActiveModel = settings.into();
        active.due_soon_days = Set(due_soon_days);
        active.update(db).await.map_err(AppError::Database)
    }
}
