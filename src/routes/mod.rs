pub mod api;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::handlers::not_found;
use crate::state::AppState;
use crate::websocket::websocket_handler;
use api::create_api_routes;

/// Assemble the full application: WebSocket gateway, API and Swagger UI.
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config);

    Router::new()
        .route("/ws", get(websocket_handler))
        .nest("/api", create_api_routes())
        .fallback(not_found)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config.cors_origin_list();
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(values))
}
