mod auth;
pub mod dashboard;
mod public;
mod sync_permission;

pub use auth::*;
pub use public::*;
pub use sync_permission::*;

pub async fn health_check() -> &'static str {
    "OK"
}
