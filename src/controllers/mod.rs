use rocket::request::FlashMessage;
use serde::Serialize;

pub mod auth;
pub mod export;
pub mod settings;
pub mod tasks;

/// One-shot flash message reshaped for template rendering.
#[derive(Serialize)]
pub struct FlashContext {
    pub kind: String,
    pub message: String,
}

impl FlashContext {
    pub fn from_message(flash: Option<FlashMessage<'_>>) -> Option<Self> {
        flash.map(|f| FlashContext {
            kind: f.kind().to_string(),
            message: f.message().to_string(),
        })
    }
}
