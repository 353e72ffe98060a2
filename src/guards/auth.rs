use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sea_orm::*;

use crate::entities::prelude::*;
use crate::entities::user;

/// Request guard for the signed-in user. Adding it to a handler's
/// arguments is the whole login requirement: the session cookie is
/// decrypted, the account re-fetched, and anything stale or missing
/// bounces to the 401 catcher.
pub struct AuthenticatedUser {
    pub user: user::Model,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let db = match request.guard::<&State<DatabaseConnection>>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        // The private cookie is encrypted and authenticated, so a
        // parseable value here was set by us.
        let user_id = request
            .cookies()
            .get_private("user_id")
            .and_then(|c| c.value().parse::<i32>().ok());

        match user_id {
            Some(id) => match User::find_by_id(id).one(db.inner()).await {
                // Re-fetch on every request: a deleted account ends
                // the session even with a valid cookie.
                Ok(Some(user)) => Outcome::Success(AuthenticatedUser { user }),
                _ => Outcome::Error((Status::Unauthorized, ())),
            },
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
