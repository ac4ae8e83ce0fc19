// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{analytics, attempt, auth, leaderboard, quiz, session},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public routes: auth, quiz listing, leaderboard.
/// * Everything else requires a bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/mine", get(quiz::list_my_quizzes))
                .route(
                    "/{id}",
                    get(quiz::get_quiz)
                        .put(quiz::update_quiz)
                        .delete(quiz::delete_quiz),
                )
                .route_layer(auth_layer.clone()),
        );

    let session_routes = Router::new()
        .route("/", post(session::start_session))
        .route(
            "/{id}",
            get(session::get_session).delete(session::abandon_session),
        )
        .route("/{id}/select", post(session::select_option))
        .route("/{id}/next", post(session::next_question))
        .route("/{id}/prev", post(session::prev_question))
        .route("/{id}/submit", post(session::submit_session))
        .route_layer(auth_layer.clone());

    let attempt_routes = Router::new()
        .route("/me", get(attempt::list_my_attempts))
        .route_layer(auth_layer.clone());

    let analytics_routes = Router::new()
        .route("/", get(analytics::get_analytics))
        .route_layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/analytics", analytics_routes)
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::in_memory(Config::in_memory("route-test-secret")))
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/attempts/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_listing_is_open() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/quizzes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_quiz_creation_requires_token() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/quizzes")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_leaderboard() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/leaderboard?quiz=all")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
