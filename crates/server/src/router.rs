use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(handlers::register_handler))
        .route("/auth/login", post(handlers::login_handler))
        .route("/auth/me", get(handlers::get_me_handler))
        .route("/users", get(handlers::list_users_handler))
        .route("/users/{id}", delete(handlers::delete_user_handler))
        .route(
            "/forms",
            get(handlers::list_forms_handler).post(handlers::create_form_handler),
        )
        .route(
            "/forms/{id}",
            get(handlers::get_form_handler)
                .put(handlers::update_form_handler)
                .delete(handlers::delete_form_handler),
        )
        .route(
            "/forms/{id}/fields",
            get(handlers::list_form_fields_handler).post(handlers::create_field_handler),
        )
        .route("/fields", get(handlers::list_fields_handler))
        .route(
            "/fields/{id}",
            get(handlers::get_field_handler)
                .put(handlers::update_field_handler)
                .delete(handlers::delete_field_handler),
        )
        .route(
            "/submissions",
            get(handlers::list_submissions_handler)
                .post(handlers::create_submission_handler)
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/submissions/mine", get(handlers::my_submissions_handler))
        .route(
            "/submissions/{id}",
            get(handlers::get_submission_handler)
                .put(handlers::update_submission_handler)
                .delete(handlers::delete_submission_handler),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
