pub mod prelude;

pub mod task;
pub mod user;
pub mod user_settings;
