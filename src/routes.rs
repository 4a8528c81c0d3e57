// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, announcements, auth, materials, practice_exam, results, usage},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, materials, ai, results, announcements, admin).
/// * Applies global middleware (Trace, CORS) and rate limiting on the
///   expensive AI generation route.
/// * Injects global state (pool, config, AI client).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(5)
        .finish()
        .unwrap();
    let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let material_routes = Router::new()
        .route(
            "/",
            post(materials::create_material).get(materials::list_materials),
        )
        .route(
            "/{id}",
            get(materials::get_material).delete(materials::delete_material),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let ai_routes = Router::new()
        .route(
            "/check-usage",
            get(usage::check_usage).post(usage::update_usage),
        )
        .route(
            "/practice-exam",
            get(practice_exam::get_exams).post(practice_exam::create_exam),
        )
        .route("/practice-exam/{id}", delete(practice_exam::delete_exam))
        .route("/practice-exam/submit", post(practice_exam::submit_exam))
        // The generation route hits the paid AI API, so it gets its own
        // rate limit on top of the quota gate.
        .merge(
            Router::new()
                .route(
                    "/practice-exam/generate-from-materials",
                    post(practice_exam::generate_from_materials),
                )
                .layer(GovernorLayer::new(governor_conf)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let results_routes = Router::new()
        .route("/leaderboard", get(results::leaderboard))
        .merge(
            Router::new()
                .route("/history", get(results::history))
                .route("/analytics", get(results::my_analytics))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let announcement_routes = Router::new().route("/", get(announcements::list_announcements));

    let admin_routes = Router::new()
        .route("/students", get(admin::list_students))
        .route("/students/{id}", delete(admin::delete_student))
        .route("/announcements", post(admin::create_announcement))
        .route(
            "/announcements/{id}",
            put(admin::update_announcement).delete(admin::delete_announcement),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/materials", material_routes)
        .nest("/api/ai", ai_routes)
        .nest("/api/results", results_routes)
        .nest("/api/announcements", announcement_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
