#[macro_use]
extern crate rocket;

use migration::{Migrator, MigratorTrait};
use rocket::fs::{relative, FileServer};
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::Build;
use rocket_dyn_templates::Template;

pub mod auth_utils;
pub mod controllers;
pub mod csrf;
pub mod db;
pub mod deadline;
pub mod entities;
pub mod errors;
pub mod guards;
pub mod services;
pub mod validation;

/// Builds the Rocket instance. Kept separate from `main` so the
/// integration tests can construct the same app.
pub async fn build_rocket() -> rocket::Rocket<Build> {
    dotenvy::dotenv().ok();

    let db = db::set_up_db().await.expect("Failed to connect to DB");

    // Pending migrations run at startup, so a fresh database file is
    // usable immediately.
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    rocket::build()
        .manage(db)
        .attach(Template::fairing())
        .register("/", catchers![unauthorized])
        .mount("/", routes![index, controllers::tasks::dashboard])
        .mount("/auth", controllers::auth::routes())
        .mount("/tasks", controllers::tasks::routes())
        .mount("/settings", controllers::settings::routes())
        .mount("/export", controllers::export::routes())
        .mount("/static", FileServer::from(relative!("static")))
}

/// Logged-in users land on the dashboard, everyone else on the login
/// page. The guard on the dashboard still does the real check.
#[get("/")]
fn index(cookies: &CookieJar<'_>) -> Redirect {
    if cookies.get_private("user_id").is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/auth/login")
    }
}

/// Auth-gated pages answer 401 from the request guard; browsers get
/// sent to the login form instead of a bare error page.
#[catch(401)]
fn unauthorized() -> Redirect {
    Redirect::to("/auth/login")
}
