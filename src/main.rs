#[rocket::launch]
async fn rocket() -> _ {
    coursework_planner::build_rocket().await
}
