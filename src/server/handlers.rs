//! Component route handlers.
//!
//! Per-request failures never escape as faults: a missing or broken
//! config becomes `{}`, a missing view becomes a redirect or a 404, and a
//! view that fails to render becomes a 500.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde_json::{Map, Value};

use super::AppState;
use crate::components::ComponentKey;

type QueryParams = Query<BTreeMap<String, String>>;

/// `GET /{component}`
pub async fn component_view(
    State(state): State<AppState>,
    Path(component): Path<String>,
    Query(query): QueryParams,
) -> Response {
    let Ok(key) = ComponentKey::new(&component, None) else {
        return redirect_to_entrypoint(&state);
    };

    let params = route_params(&component, None);
    match render_component(&state, &key, params, query).await {
        Some(response) => response,
        // Redirecting the entrypoint to itself would loop
        None if component == state.settings.entrypoint_component() => not_found(),
        None => redirect_to_entrypoint(&state),
    }
}

/// `GET /{component}/{subcomponent}`
///
/// A subcomponent directory that does not exist is not this route's
/// request; it goes to the catch-all instead.
pub async fn subcomponent_view(
    State(state): State<AppState>,
    Path((component, subcomponent)): Path<(String, String)>,
    Query(query): QueryParams,
) -> Response {
    let Ok(key) = ComponentKey::new(&component, Some(&subcomponent)) else {
        return redirect_to_entrypoint(&state);
    };
    if state.cache.resolver().subcomponent_dir(&key).is_none() {
        crate::debug_event!("http", "declined", "{key}: no such subcomponent");
        return redirect_to_entrypoint(&state);
    }

    let params = route_params(&component, Some(&subcomponent));
    render_component(&state, &key, params, query)
        .await
        .unwrap_or_else(not_found)
}

/// `GET /{component}/config/objects.json`
pub async fn component_config(
    State(state): State<AppState>,
    Path(component): Path<String>,
) -> Response {
    match ComponentKey::new(&component, None) {
        Ok(key) => Json(state.cache.resolve_and_cache(&key).await).into_response(),
        Err(e) => {
            crate::debug_event!("http", "rejected", "{e}");
            not_found()
        }
    }
}

/// `GET /{component}/{subcomponent}/config/objects.json`
pub async fn subcomponent_config(
    State(state): State<AppState>,
    Path((component, subcomponent)): Path<(String, String)>,
) -> Response {
    match ComponentKey::new(&component, Some(&subcomponent)) {
        Ok(key) => Json(state.cache.resolve_and_cache(&key).await).into_response(),
        Err(e) => {
            crate::debug_event!("http", "rejected", "{e}");
            not_found()
        }
    }
}

/// Catch-all: send the client to the entrypoint.
pub async fn fallback(State(state): State<AppState>) -> Response {
    redirect_to_entrypoint(&state)
}

/// Refresh the config, then render the view if there is one.
///
/// `None` means the view is missing.
async fn render_component(
    state: &AppState,
    key: &ComponentKey,
    params: Value,
    query: BTreeMap<String, String>,
) -> Option<Response> {
    let document = state.cache.resolve_and_cache(key).await;

    let resolver = state.cache.resolver();
    let view = resolver.resolve_view(&resolver.view_base(key))?;

    let mut context = document.into_map();
    context.insert("params".to_string(), params);
    context.insert(
        "query".to_string(),
        Value::Object(query.into_iter().map(|(k, v)| (k, Value::String(v))).collect()),
    );

    let response = match state.renderer.render(&view, &Value::Object(context)).await {
        Ok(rendered) => {
            if rendered.content_type.starts_with("text/html") {
                Html(rendered.body).into_response()
            } else {
                ([(header::CONTENT_TYPE, rendered.content_type)], rendered.body).into_response()
            }
        }
        Err(e) => {
            tracing::error!("[http] {key}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    };
    Some(response)
}

fn route_params(component: &str, subcomponent: Option<&str>) -> Value {
    let mut params = Map::new();
    params.insert("component".to_string(), Value::String(component.to_string()));
    if let Some(sub) = subcomponent {
        params.insert("subcomponent".to_string(), Value::String(sub.to_string()));
    }
    Value::Object(params)
}

fn redirect_to_entrypoint(state: &AppState) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.settings.entrypoint_path())],
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
