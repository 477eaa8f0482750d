pub mod audit;
pub mod auth;
pub mod entries;
pub mod forms;
pub mod projects;
pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/me", get(auth::me))
        // Users
        .route("/api/v1/users", get(users::list).post(users::create))
        .route(
            "/api/v1/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
        .route("/api/v1/projects/{id}/assign", post(projects::assign))
        .route("/api/v1/projects/{id}/assignments", get(projects::assignments))
        // Forms
        .route(
            "/api/v1/forms/{project_id}",
            get(forms::get)
                .post(forms::put)
                .put(forms::put)
                .delete(forms::delete),
        )
        .route("/api/v1/forms/{project_id}/render", get(forms::render))
        // Entries
        .route("/api/v1/entries", get(entries::list).post(entries::create))
        .route("/api/v1/entries/export", get(entries::export))
        .route(
            "/api/v1/entries/{id}",
            get(entries::get)
                .put(entries::update)
                .delete(entries::delete),
        )
        .route("/api/v1/entries/{id}/form", get(entries::edit_form))
        // Audit
        .route("/api/v1/audit", get(audit::list))
}
