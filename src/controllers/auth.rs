use rocket::form::Form;
use rocket::http::{Cookie, CookieJar};
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use sea_orm::*;
use serde::Deserialize;

use rocket_dyn_templates::{context, Template};

use crate::controllers::FlashContext;
use crate::errors::AppError;
use crate::services::user_service::UserService;
use crate::validation::RegisterFormValidation;

#[derive(FromForm, Deserialize)]
pub struct RegisterForm<'r> {
    pub username: &'r str,
    pub password: &'r str,
}

#[derive(FromForm, Deserialize)]
pub struct LoginForm<'r> {
    pub username: &'r str,
    pub password: &'r str,
}

#[get("/register")]
pub fn register_form(flash: Option<FlashMessage<'_>>) -> Template {
    Template::render("register", context! {
        title: "Register",
        flash: FlashContext::from_message(flash),
    })
}

/// Creates the account and its default settings row, then sends the
/// user to the login page.
#[post("/register", data = "<form>")]
pub async fn register(
    db: &State<DatabaseConnection>,
    form: Form<RegisterForm<'_>>,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let username = form.username.trim();
    let password = form.password.trim();

    if let Err(messages) = RegisterFormValidation::new(username, password).validate_form() {
        return Err(Flash::error(
            Redirect::to("/auth/register"),
            messages.join(" "),
        ));
    }

    match UserService::create(db.inner(), username, password).await {
        Ok(_) => Ok(Flash::success(
            Redirect::to("/auth/login"),
            "Account created! Please log in.",
        )),
        Err(AppError::Database(err))
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
        {
            Err(Flash::error(
                Redirect::to("/auth/register"),
                "Username already exists. Please choose another one.",
            ))
        }
        Err(_) => Err(Flash::error(
            Redirect::to("/auth/register"),
            "Could not create the account. Please try again.",
        )),
    }
}

#[get("/login")]
pub fn login_form(flash: Option<FlashMessage<'_>>) -> Template {
    Template::render("login", context! {
        title: "Log in",
        flash: FlashContext::from_message(flash),
    })
}

/// Verifies the credentials and opens a session via the private
/// `user_id` cookie.
#[post("/login", data = "<form>")]
pub async fn login(
    db: &State<DatabaseConnection>,
    form: Form<LoginForm<'_>>,
    cookies: &CookieJar<'_>,
) -> Result<Redirect, Flash<Redirect>> {
    match UserService::authenticate(db.inner(), form.username.trim(), form.password.trim()).await {
        Ok(user) => {
            cookies.add_private(Cookie::new("user_id", user.id.to_string()));
            Ok(Redirect::to("/dashboard"))
        }
        Err(AppError::Unauthorized) => Err(Flash::error(
            Redirect::to("/auth/login"),
            "Invalid username or password.",
        )),
        Err(_) => Err(Flash::error(
            Redirect::to("/auth/login"),
            "Could not log you in. Please try again.",
        )),
    }
}

#[post("/logout")]
pub fn logout(cookies: &CookieJar<'_>) -> Flash<Redirect> {
    cookies.remove_private(Cookie::from("user_id"));
    Flash::success(Redirect::to("/auth/login"), "You are logged out.")
}

pub fn routes() -> Vec<rocket::Route> {
    routes![register_form, register, login_form, login, logout]
}
