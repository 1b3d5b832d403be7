//! User route definitions

use axum::{routing::get, Router};

use crate::handlers::user::{
    create_user, delete_user, get_user, list_roles, list_users, update_user,
};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/roles", get(list_roles))
}
