use chrono::{Local, NaiveDateTime, Utc};
use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::{context, Template};
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::controllers::FlashContext;
use crate::csrf::CsrfToken;
use crate::deadline::{
    deadline_state, effective_priority, filter_tasks, module_summaries, summarize, DeadlineState,
    TaskFilter,
};
use crate::entities::task::{TaskPriority, TaskStatus};
use crate::entities::{prelude::*, task};
use crate::errors::AppError;
use crate::guards::auth::AuthenticatedUser;
use crate::services::settings_service::SettingsService;
use crate::validation::{parse_due_date, parse_due_time, TaskFormValidation};

/// Create/edit form payload. Status is deliberately absent: it only
/// moves through the dedicated status route.
#[derive(FromForm, Deserialize)]
pub struct TaskForm<'r> {
    pub module_name: &'r str,
    pub title: &'r str,
    #[field(default = "")]
    pub description: &'r str,
    pub due_date: &'r str,
    #[field(default = "")]
    pub due_time: &'r str,
    #[field(default = "Medium")]
    pub priority: &'r str,
    #[field(default = "")]
    pub csrf_token: &'r str,
}

#[derive(FromForm, Deserialize)]
pub struct StatusForm<'r> {
    pub status: &'r str,
}

/// A task row as the templates and the CSV export see it: stored
/// fields plus everything derived for display.
#[derive(Clone, Serialize)]
pub struct TaskView {
    pub id: i32,
    pub module_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    /// Effective priority label (stored value plus the deadline bump).
    pub priority: String,
    pub priority_stored: String,
    /// True when the shown priority differs from the stored one.
    pub priority_auto: bool,
    pub deadline_state: DeadlineState,
    pub due_date_display: String,
    pub due_time: String,
    pub deadline_display: String,
    /// ISO `YYYY-MM-DD`, kept for the date picker.
    pub due_date_value: String,
    pub created_at_display: String,
}

pub fn task_view(task: &task::Model, due_soon_days: i32, now: NaiveDateTime) -> TaskView {
    let effective = effective_priority(task, due_soon_days, now);
    let due_date_display = task.due_date.format("%d/%m/%Y").to_string();
    let due_time = task.due_time.format("%H:%M").to_string();

    TaskView {
        id: task.id,
        module_name: task.module_name.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status.as_str().to_string(),
        priority: effective.as_str().to_string(),
        priority_stored: task.priority.as_str().to_string(),
        priority_auto: effective != task.priority,
        deadline_state: deadline_state(task, due_soon_days, now),
        deadline_display: format!("{} {}", due_date_display, due_time),
        due_date_display,
        due_time,
        due_date_value: task.due_date.format("%Y-%m-%d").to_string(),
        created_at_display: task.created_at.format("%d/%m/%Y %H:%M").to_string(),
    }
}

/// Warning-banner buckets, completed tasks excluded.
#[derive(Default, Serialize)]
pub struct AttentionLists {
    pub overdue: Vec<TaskView>,
    pub due_today: Vec<TaskView>,
    pub due_soon: Vec<TaskView>,
}

/// Stored form values for re-rendering the task form on edit.
#[derive(Serialize)]
pub struct TaskFormValues {
    pub id: i32,
    pub module_name: String,
    pub title: String,
    pub description: String,
    pub due_date_value: String,
    pub due_time_value: String,
    pub priority: String,
}

impl TaskFormValues {
    fn from_model(task: &task::Model) -> Self {
        TaskFormValues {
            id: task.id,
            module_name: task.module_name.clone(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due_date_value: task.due_date.format("%Y-%m-%d").to_string(),
            due_time_value: task.due_time.format("%H:%M").to_string(),
            priority: task.priority.as_str().to_string(),
        }
    }
}

/// Loads the user's tasks in deadline order.
pub(crate) async fn tasks_in_deadline_order(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<task::Model>, AppError> {
    Task::find()
        .filter(task::Column::UserId.eq(user_id))
        .order_by_asc(task::Column::DueDate)
        .order_by_asc(task::Column::DueTime)
        .all(db)
        .await
        .map_err(AppError::Database)
}

/// The task list with stats, module progress, attention banner and
/// optional filters. Stats and the banner always cover *all* tasks;
/// the filters narrow only the listed rows.
#[get("/dashboard?<module>&<priority>&<q>")]
pub async fn dashboard(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    flash: Option<FlashMessage<'_>>,
    module: Option<String>,
    priority: Option<String>,
    q: Option<String>,
) -> Result<Template, AppError> {
    let settings = SettingsService::for_user(db.inner(), user.user.id).await?;
    let window = settings.due_soon_days;
    let tasks = tasks_in_deadline_order(db.inner(), user.user.id).await?;
    let now = Local::now().naive_local();

    let stats = summarize(&tasks, window, now);
    let module_summary = module_summaries(&tasks);
    let unique_modules: Vec<String> = module_summary
        .iter()
        .map(|m| m.module_name.clone())
        .collect();

    let mut attention = AttentionLists::default();
    for t in &tasks {
        match deadline_state(t, window, now) {
            DeadlineState::Overdue => attention.overdue.push(task_view(t, window, now)),
            DeadlineState::DueToday => attention.due_today.push(task_view(t, window, now)),
            DeadlineState::DueSoon => attention.due_soon.push(task_view(t, window, now)),
            _ => {}
        }
    }

    // An out-of-set priority label in the query string is a caller
    // error, not something to coerce.
    let priority_filter = match priority.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(label) => Some(label.parse::<TaskPriority>()?),
        None => None,
    };
    let filter = TaskFilter {
        module: module.as_deref(),
        priority: priority_filter,
        query: q.as_deref(),
    };
    let visible: Vec<TaskView> = filter_tasks(&tasks, &filter, window, now)
        .into_iter()
        .map(|t| task_view(t, window, now))
        .collect();

    Ok(Template::render("dashboard", context! {
        title: "Dashboard",
        username: user.user.username.clone(),
        flash: FlashContext::from_message(flash),
        tasks: visible,
        stats: stats,
        module_summary: module_summary,
        unique_modules: unique_modules,
        attention: attention,
        due_soon_days: window,
        filter_module: module.unwrap_or_default(),
        filter_priority: priority.unwrap_or_default(),
        filter_q: q.unwrap_or_default(),
    }))
}

#[get("/create")]
pub fn create_form(
    user: AuthenticatedUser,
    csrf: CsrfToken,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    Template::render("task_form", context! {
        title: "New task",
        username: user.user.username.clone(),
        csrf_token: csrf.token(),
        flash: FlashContext::from_message(flash),
        form_action: "/tasks/create",
        task: None::<TaskFormValues>,
    })
}

#[post("/create", data = "<form>")]
pub async fn create(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    csrf: CsrfToken,
    form: Form<TaskForm<'_>>,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    if !csrf.verify(form.csrf_token) {
        return Err(Flash::error(
            Redirect::to("/tasks/create"),
            "Your session expired. Please submit the form again.",
        ));
    }

    let module_name = form.module_name.trim();
    let title = form.title.trim();
    let description = form.description.trim();
    let due_date = form.due_date.trim();

    if module_name.is_empty() || title.is_empty() || due_date.is_empty() {
        return Err(Flash::error(
            Redirect::to("/tasks/create"),
            "Module, Title and Due Date are required.",
        ));
    }
    if let Err(messages) = TaskFormValidation::new(module_name, title, description).validate_form()
    {
        return Err(Flash::error(
            Redirect::to("/tasks/create"),
            messages.join(" "),
        ));
    }

    let parsed = (parse_due_date(due_date), parse_due_time(form.due_time.trim()));
    let (due_date, due_time) = match parsed {
        (Ok(date), Ok(time)) => (date, time),
        _ => {
            return Err(Flash::error(
                Redirect::to("/tasks/create"),
                "Invalid deadline. Please use the date/time pickers.",
            ))
        }
    };
    let priority = form.priority.trim().parse::<TaskPriority>().map_err(|_| {
        Flash::error(Redirect::to("/tasks/create"), "Invalid priority value.")
    })?;

    let new_task = task::ActiveModel {
        user_id: Set(user.user.id),
        module_name: Set(module_name.to_owned()),
        title: Set(title.to_owned()),
        description: Set(if description.is_empty() {
            None
        } else {
            Some(description.to_owned())
        }),
        due_date: Set(due_date),
        due_time: Set(due_time),
        status: Set(TaskStatus::ToDo),
        priority: Set(priority),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };

    new_task.insert(db.inner()).await.map_err(|_| {
        Flash::error(Redirect::to("/tasks/create"), "Could not save the task.")
    })?;

    Ok(Flash::success(Redirect::to("/dashboard"), "Task added!"))
}

#[get("/edit/<id>")]
pub async fn edit_form(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    csrf: CsrfToken,
    flash: Option<FlashMessage<'_>>,
    id: i32,
) -> Result<Template, Flash<Redirect>> {
    let task_item = Task::find_by_id(id)
        .filter(task::Column::UserId.eq(user.user.id))
        .one(db.inner())
        .await
        .map_err(|_| Flash::error(Redirect::to("/dashboard"), "Could not load the task."))?
        .ok_or_else(|| {
            Flash::error(
                Redirect::to("/dashboard"),
                "Task not found or you don't have permission to edit it.",
            )
        })?;

    Ok(Template::render("task_form", context! {
        title: "Edit task",
        username: user.user.username.clone(),
        csrf_token: csrf.token(),
        flash: FlashContext::from_message(flash),
        form_action: format!("/tasks/edit/{}", task_item.id),
        task: Some(TaskFormValues::from_model(&task_item)),
    }))
}

#[post("/edit/<id>", data = "<form>")]
pub async fn edit(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    csrf: CsrfToken,
    id: i32,
    form: Form<TaskForm<'_>>,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let form_url = format!("/tasks/edit/{}", id);

    if !csrf.verify(form.csrf_token) {
        return Err(Flash::error(
            Redirect::to(form_url),
            "Your session expired. Please submit the form again.",
        ));
    }

    let existing = Task::find_by_id(id)
        .filter(task::Column::UserId.eq(user.user.id))
        .one(db.inner())
        .await
        .map_err(|_| Flash::error(Redirect::to("/dashboard"), "Could not load the task."))?
        .ok_or_else(|| {
            Flash::error(
                Redirect::to("/dashboard"),
                "Task not found or you don't have permission to edit it.",
            )
        })?;

    let module_name = form.module_name.trim();
    let title = form.title.trim();
    let description = form.description.trim();
    let due_date = form.due_date.trim();

    if module_name.is_empty() || title.is_empty() || due_date.is_empty() {
        return Err(Flash::error(
            Redirect::to(form_url),
            "Module, Title and Due Date are required to edit a task.",
        ));
    }
    if let Err(messages) = TaskFormValidation::new(module_name, title, description).validate_form()
    {
        return Err(Flash::error(Redirect::to(form_url), messages.join(" ")));
    }

    let parsed = (parse_due_date(due_date), parse_due_time(form.due_time.trim()));
    let (due_date, due_time) = match parsed {
        (Ok(date), Ok(time)) => (date, time),
        _ => {
            return Err(Flash::error(
                Redirect::to(form_url),
                "Invalid deadline. Please use the date/time pickers.",
            ))
        }
    };
    let priority = form
        .priority
        .trim()
        .parse::<TaskPriority>()
        .map_err(|_| Flash::error(Redirect::to(form_url.clone()), "Invalid priority value."))?;

    let mut active_model: task::ActiveModel = existing.into();
    active_model.module_name = Set(module_name.to_owned());
    active_model.title = Set(title.to_owned());
    active_model.description = Set(if description.is_empty() {
        None
    } else {
        Some(description.to_owned())
    });
    active_model.due_date = Set(due_date);
    active_model.due_time = Set(due_time);
    active_model.priority = Set(priority);

    active_model
        .update(db.inner())
        .await
        .map_err(|_| Flash::error(Redirect::to(form_url), "Could not save the task."))?;

    Ok(Flash::success(
        Redirect::to("/dashboard"),
        "Task updated successfully!",
    ))
}

/// Moves a task to any of the three statuses. Unknown labels are
/// rejected without touching the row.
#[post("/status/<id>", data = "<form>")]
pub async fn update_status(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    id: i32,
    form: Form<StatusForm<'_>>,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let status = form.status.trim().parse::<TaskStatus>().map_err(|_| {
        Flash::error(Redirect::to("/dashboard"), "Invalid status value.")
    })?;

    let existing = Task::find_by_id(id)
        .filter(task::Column::UserId.eq(user.user.id))
        .one(db.inner())
        .await
        .map_err(|_| Flash::error(Redirect::to("/dashboard"), "Could not load the task."))?
        .ok_or_else(|| {
            Flash::error(
                Redirect::to("/dashboard"),
                "Task not found or you don't have permission to edit it.",
            )
        })?;

    let mut active_model: task::ActiveModel = existing.into();
    active_model.status = Set(status);

    active_model
        .update(db.inner())
        .await
        .map_err(|_| Flash::error(Redirect::to("/dashboard"), "Could not update the status."))?;

    Ok(Flash::success(Redirect::to("/dashboard"), "Status updated."))
}

#[post("/delete/<id>")]
pub async fn delete(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let result = Task::delete_many()
        .filter(task::Column::Id.eq(id))
        .filter(task::Column::UserId.eq(user.user.id))
        .exec(db.inner())
        .await
        .map_err(|_| Flash::error(Redirect::to("/dashboard"), "Could not delete the task."))?;

    if result.rows_affected == 0 {
        return Err(Flash::error(
            Redirect::to("/dashboard"),
            "Task not found or you don't have permission to delete it.",
        ));
    }

    Ok(Flash::success(Redirect::to("/dashboard"), "Task deleted."))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![create_form, create, edit_form, edit, update_status, delete]
}
