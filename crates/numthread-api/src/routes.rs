use crate::{auth, handlers, AppState};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

pub fn create_router(state: AppState) -> Router {
    let protected = from_fn_with_state(state.clone(), auth::require_auth);

    let api = Router::new()
        // Auth
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // Discussions
        .route(
            "/discussions",
            get(handlers::list_discussions)
                .merge(post(handlers::create_discussion).route_layer(protected.clone())),
        )
        .route("/discussions/{id}", get(handlers::get_discussion))
        // Operations
        .route(
            "/operations",
            post(handlers::create_operation).route_layer(protected),
        )
        .route(
            "/operations/discussion/{discussion_id}",
            get(handlers::list_operations),
        )
        .route("/operations/{id}", get(handlers::get_operation))
        .method_not_allowed_fallback(handlers::route_not_found);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest("/api", api)
        .fallback(handlers::route_not_found)
        .method_not_allowed_fallback(handlers::route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors_layer(&state.settings.server.frontend_url)),
        )
        .with_state(state)
}

/// Allows the configured frontend origin, with credentials.
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(err) => {
            warn!(frontend_url, error = %err, "Invalid frontend origin, cross-origin requests disabled");
            cors
        }
    }
}
