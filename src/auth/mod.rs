use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod session;
pub mod tokens;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
