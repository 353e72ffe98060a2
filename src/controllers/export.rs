use std::io::Cursor;

use chrono::Local;
use rocket::http::ContentType;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::State;
use sea_orm::DatabaseConnection;

use crate::controllers::tasks::{task_view, tasks_in_deadline_order};
use crate::errors::AppError;
use crate::guards::auth::AuthenticatedUser;
use crate::services::settings_service::SettingsService;

/// A CSV file served as a download.
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

impl<'r> Responder<'r, 'static> for CsvExport {
    fn respond_to(self, _request: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(ContentType::CSV)
            .raw_header(
                "Content-Disposition",
                format!("attachment; filename={}", self.filename),
            )
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}

/// All of the user's tasks in dashboard order. The Priority column
/// carries the effective value, so the file matches what the dashboard
/// showed at export time.
#[get("/csv")]
pub async fn export_csv(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
) -> Result<CsvExport, AppError> {
    let settings = SettingsService::for_user(db.inner(), user.user.id).await?;
    let tasks = tasks_in_deadline_order(db.inner(), user.user.id).await?;
    let now = Local::now().naive_local();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Module", "Title", "Due Date", "Due Time", "Status", "Priority"])
        .map_err(|e| AppError::Internal(e.to_string()))?;

    for task in &tasks {
        let view = task_view(task, settings.due_soon_days, now);
        writer
            .write_record([
                &view.module_name,
                &view.title,
                &view.due_date_display,
                &view.due_time,
                &view.status,
                &view.priority,
            ])
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(CsvExport {
        filename: format!("tasks_{}.csv", Local::now().format("%Y%m%d_%H%M")),
        body,
    })
}

pub fn routes() -> Vec<rocket::Route> {
    routes![export_csv]
}
