use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::{context, Template};
use sea_orm::*;
use serde::Deserialize;

use crate::controllers::FlashContext;
use crate::csrf::CsrfToken;
use crate::errors::AppError;
use crate::guards::auth::AuthenticatedUser;
use crate::services::settings_service::SettingsService;
use crate::validation::SettingsFormValidation;

#[derive(FromForm, Deserialize)]
pub struct SettingsForm<'r> {
    pub due_soon_days: i32,
    #[field(default = "")]
    pub csrf_token: &'r str,
}

#[get("/")]
pub async fn settings_form(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    csrf: CsrfToken,
    flash: Option<FlashMessage<'_>>,
) -> Result<Template, AppError> {
    let settings = SettingsService::for_user(db.inner(), user.user.id).await?;

    Ok(Template::render("settings", context! {
        title: "Settings",
        username: user.user.username.clone(),
        csrf_token: csrf.token(),
        flash: FlashContext::from_message(flash),
        due_soon_days: settings.due_soon_days,
    }))
}

/// Updates the due-soon lookahead window. Takes effect on the next
/// dashboard render; nothing stored on tasks changes.
#[post("/", data = "<form>")]
pub async fn update_settings(
    db: &State<DatabaseConnection>,
    user: AuthenticatedUser,
    csrf: CsrfToken,
    form: Form<SettingsForm<'_>>,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    if !csrf.verify(form.csrf_token) {
        return Err(Flash::error(
            Redirect::to("/settings"),
            "Your session expired. Please submit the form again.",
        ));
    }

    if let Err(messages) = SettingsFormValidation::new(form.due_soon_days).validate_form() {
        return Err(Flash::error(Redirect::to("/settings"), messages.join(" ")));
    }

    SettingsService::update_window(db.inner(), user.user.id, form.due_soon_days)
        .await
        .map_err(|_| {
            Flash::error(Redirect::to("/settings"), "Could not save your settings.")
        })?;

    Ok(Flash::success(
        Redirect::to("/settings"),
        "Settings saved.",
    ))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![settings_form, update_settings]
}
