// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, catalog, quiz, session},
    state::AppState,
    utils::session::{admin_middleware, session_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (session, catalog, attempt, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (catalog and session store).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            axum::http::HeaderValue::from_static("http://localhost:3000"),
            axum::http::HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let session_routes = Router::new()
        .route("/", post(session::create_session))
        // Routes below need an existing session
        .merge(
            Router::new()
                .route("/me", get(session::current_session))
                .route("/login", post(session::login))
                .route("/logout", post(session::logout))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    session_middleware,
                )),
        );

    let catalog_routes = Router::new()
        .route("/departments", get(catalog::list_departments))
        .route("/subcategories", get(catalog::list_subcategories))
        .route("/quizzes", get(catalog::list_quizzes))
        .route("/notes", get(catalog::list_notes))
        .route("/notes/{id}", get(catalog::get_note));

    let attempt_routes = Router::new()
        .route("/", get(quiz::get_attempt))
        .route("/select", post(quiz::select_quiz))
        .route("/start", post(quiz::start_attempt))
        .route("/answers/{display_index}", put(quiz::answer_question))
        .route("/submit", post(quiz::submit_attempt))
        .route("/review", post(quiz::review_attempt))
        .route("/reveal", post(quiz::reveal_answers))
        .route("/hide", post(quiz::hide_answers))
        .route("/restart", post(quiz::restart_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let admin_routes = Router::new()
        .route("/quizzes", post(admin::create_quiz))
        .route("/quizzes/upload", post(admin::upload_quiz))
        .route(
            "/quizzes/{title}",
            get(admin::get_quiz)
                .put(admin::update_quiz)
                .delete(admin::delete_quiz),
        )
        .route("/notes", post(admin::create_note))
        .route(
            "/notes/{id}",
            put(admin::update_note).delete(admin::delete_note),
        )
        .route("/warnings", get(admin::list_warnings))
        // Double middleware protection: Session first, then Admin check
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .nest("/api/session", session_routes)
        .nest("/api/catalog", catalog_routes)
        .nest("/api/attempt", attempt_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (Router::layer wraps outward: CORS is outermost, Trace inside it)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
