use std::sync::{Mutex, Once};

use chrono::{Duration, Local, NaiveDate, NaiveTime, Utc};
use coursework_planner::build_rocket;
use coursework_planner::entities::task::{self, TaskPriority, TaskStatus};
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

// Ensure environment setup runs only once per test binary.
static INIT: Once = Once::new();

// Serializes rocket construction: every Client runs the migrations on
// the shared test database, and SQLite does not enjoy two connections
// creating the same tables at once.
static BUILD_LOCK: Mutex<()> = Mutex::new(());

pub fn setup() -> Client {
    INIT.call_once(|| {
        // Each test binary gets its own throwaway SQLite file, so the
        // suites never touch the dev database or each other.
        let db_path =
            std::env::temp_dir().join(format!("coursework_test_{}.db", std::process::id()));
        let _ = std::fs::remove_file(&db_path);
        std::env::set_var(
            "DATABASE_URL",
            format!("sqlite://{}?mode=rwc", db_path.display()),
        );
    });

    let _guard = BUILD_LOCK.lock().unwrap();
    let rocket = rocket::async_test(async { build_rocket().await });

    Client::tracked(rocket).expect("valid rocket instance")
}

/// Runs async SeaORM calls from blocking test code.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    rocket::tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Registers a fresh account and logs it in on this client. Usernames
/// must be unique per test since the binary shares one database.
pub fn register_and_login(client: &Client, username: &str, password: &str) {
    let response = client
        .post("/auth/register")
        .header(ContentType::Form)
        .body(format!("username={}&password={}", username, password))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);

    login(client, username, password);
}

pub fn login(client: &Client, username: &str, password: &str) {
    let response = client
        .post("/auth/login")
        .header(ContentType::Form)
        .body(format!("username={}&password={}", username, password))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert!(client.cookies().get_private("user_id").is_some());
}

pub fn logout(client: &Client) {
    let response = client.post("/auth/logout").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
}

/// The id behind the session cookie of the currently logged-in user.
pub fn logged_in_user_id(client: &Client) -> i32 {
    client
        .cookies()
        .get_private("user_id")
        .expect("logged in")
        .value()
        .parse()
        .expect("numeric user id")
}

/// Fetches a page so the CSRF guard sets its cookie, then returns the
/// token value to echo back in the form body.
pub fn csrf_token(client: &Client, form_url: &str) -> String {
    let response = client.get(form_url).dispatch();
    assert_eq!(response.status(), Status::Ok);
    client
        .cookies()
        .get("csrf_token")
        .expect("csrf cookie set by form page")
        .value()
        .to_string()
}

/// Inserts a task directly, bypassing the form, for tests that need
/// exact dates and statuses. Due time is end of day.
pub fn insert_task(
    client: &Client,
    user_id: i32,
    module: &str,
    title: &str,
    due_date: NaiveDate,
    status: TaskStatus,
    priority: TaskPriority,
) -> task::Model {
    let db = client
        .rocket()
        .state::<DatabaseConnection>()
        .expect("managed db");

    block_on(async {
        task::ActiveModel {
            user_id: Set(user_id),
            module_name: Set(module.to_owned()),
            title: Set(title.to_owned()),
            description: Set(None),
            due_date: Set(due_date),
            due_time: Set(NaiveTime::from_hms_opt(23, 59, 0).unwrap()),
            status: Set(status),
            priority: Set(priority),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert task")
    })
}

/// Today plus `days`, in the server's local timezone (the dashboard
/// evaluates deadlines against local time).
pub fn today_plus(days: i64) -> NaiveDate {
    Local::now().date_naive() + Duration::days(days)
}
