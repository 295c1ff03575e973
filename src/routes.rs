// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, dashboard, events, fees, reports, results, staff, students},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, back_office_middleware},
};

/// Assembles the main application router.
///
/// * `/api/auth` is public apart from `/me`.
/// * Everything readable under `/api` and `/reports` needs an admin or principal.
/// * Every create/update/delete lives under `/api/admin` and needs an admin.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let back_office_routes = Router::new()
        .route("/dashboard", get(dashboard::overview))
        .route("/students", get(students::list_students))
        .route("/students/{id}", get(students::get_student))
        .route("/students/{id}/fees", get(fees::list_student_fees))
        .route("/staff", get(staff::list_staff))
        .route("/staff/{id}", get(staff::get_staff))
        .route("/fees", get(fees::list_fee_summaries))
        .route("/results", get(results::list_results))
        .route("/results/toppers", get(results::get_toppers))
        .route("/results/{id}", get(results::get_result))
        .route("/events", get(events::list_events))
        // Auth first, then the role check
        .layer(middleware::from_fn(back_office_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/students", post(students::create_student))
        .route(
            "/students/{id}",
            put(students::update_student).delete(students::delete_student),
        )
        .route("/staff", post(staff::create_staff))
        .route(
            "/staff/{id}",
            put(staff::update_staff).delete(staff::delete_staff),
        )
        .route("/fees", post(fees::create_fee))
        .route("/fees/{id}", put(fees::update_fee).delete(fees::delete_fee))
        .route("/results", post(results::create_result))
        .route(
            "/results/{id}",
            put(results::update_result).delete(results::delete_result),
        )
        .route("/events", post(events::create_event))
        .route("/events/{id}", delete(events::delete_event))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let report_routes = Router::new()
        .route("/results", get(reports::results_page))
        .layer(middleware::from_fn(back_office_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", back_office_routes)
        .nest("/reports", report_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
