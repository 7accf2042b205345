use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use recipe_ai_harness::{Harness, ModelRef, RelayBuilder, RelayOptions};
use recipe_core::{RecipeQuery, StreamEvent, UPSTREAM_FAILURE_MESSAGE, build_prompt};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::CorsOrigins;

pub const HEALTH_MESSAGE: &str = "Smart Recipe Generator backend is running ✅";

/// Shared, immutable per-process state. Requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    harness: Harness,
    model: ModelRef,
    relay_options: RelayOptions,
}

impl AppState {
    pub fn new(harness: Harness, model: ModelRef, relay_options: RelayOptions) -> Self {
        Self {
            harness,
            model,
            relay_options,
        }
    }
}

/// Builds the application router with tracing and CORS layers.
pub fn build_router(state: AppState, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/recipeStream", get(recipe_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}

pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, ACCEPT, CACHE_CONTROL]);
    match origins {
        CorsOrigins::Any => layer.allow_origin(AllowOrigin::any()),
        CorsOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "skipping CORS origin that is not a valid header value");
                        None
                    }
                })
                .collect();
            layer
                .allow_origin(AllowOrigin::list(values))
                .allow_credentials(true)
        }
    }
}

async fn health() -> &'static str {
    HEALTH_MESSAGE
}

async fn recipe_stream(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let query = RecipeQuery::from_pairs(pairs);
    debug!(?query, "recipe stream requested");
    let request = query.into_request();
    info!(
        ingredients = request.ingredients.len(),
        cooking_time = ?request.cooking_time,
        "building recipe prompt"
    );
    let relay = state
        .harness
        .relay(state.model.clone())
        .prompt(build_prompt(&request))
        .options(state.relay_options.clone());

    (
        [("x-accel-buffering", "no")],
        Sse::new(relay_events(relay)).keep_alive(KeepAlive::default()),
    )
}

/// Streams relay events as SSE `data:` frames. The stream ends right after
/// the terminal event; dropping it (client disconnect) stops the relay.
fn relay_events(relay: RelayBuilder) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    async_stream::stream! {
        match relay.start_stream().await {
            Ok(mut relay) => {
                while let Some(event) = relay.next_event().await {
                    yield Ok(sse_event(&event));
                }
            }
            Err(err) => {
                error!(error = %err, "failed to start relay");
                yield Ok(sse_event(&StreamEvent::error(UPSTREAM_FAILURE_MESSAGE)));
            }
        }
    }
}

fn sse_event(event: &StreamEvent) -> Event {
    match Event::default().json_data(event) {
        Ok(frame) => frame,
        Err(err) => {
            error!(error = %err, "failed to encode stream event");
            Event::default().data(format!(
                r#"{{"action":"error","message":"{UPSTREAM_FAILURE_MESSAGE}"}}"#
            ))
        }
    }
}
