use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::RecipebotError;
use crate::graph::{edges, labels};
use crate::server::types::{ChatRequest, ConnectedQuery, NewProduct, NewRecipe, NewUsesProduct};
use crate::server::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)))
}

pub async fn handle_root() -> &'static str {
    "Recipe chatbot backend is running."
}

pub async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "recipebot",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

pub async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ChatRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let Some(message) = request.user_message() else {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    };

    match state.chat.reply(message).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "reply": reply }))).into_response(),
        Err(RecipebotError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, msg),
        Err(e) if e.is_bad_request() => error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Azure OpenAI API Error: {}. Please verify your AZURE_OPENAI_DEPLOYMENT and AZURE_OPENAI_API_VERSION.",
                e
            ),
        ),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong with the AI service. Check server logs for details.",
        ),
    }
}

pub async fn handle_add_product(State(state): State<AppState>, body: Bytes) -> Response {
    let product: NewProduct = match parse_body(&body) {
        Ok(p) => p,
        Err(response) => return response,
    };
    if !product.is_valid() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Name, category, and partition key (pk) are required for a product.",
        );
    }

    let properties = product.into_properties(&state.partition_key);
    match state.graph.add_vertex(labels::PRODUCT, properties).await {
        Ok(vertex) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Product added successfully", "product": vertex })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Error adding product: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add product to graph.")
        }
    }
}

pub async fn handle_add_recipe(State(state): State<AppState>, body: Bytes) -> Response {
    let recipe: NewRecipe = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    if !recipe.is_valid() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Name and partition key (pk) are required for a recipe.",
        );
    }

    let properties = recipe.into_properties(&state.partition_key);
    match state.graph.add_vertex(labels::RECIPE, properties).await {
        Ok(vertex) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Recipe added successfully", "recipe": vertex })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Error adding recipe: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add recipe to graph.")
        }
    }
}

pub async fn handle_add_uses_product(State(state): State<AppState>, body: Bytes) -> Response {
    let request: NewUsesProduct = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let (Some(recipe_id), Some(product_id)) = (&request.recipe_id, &request.product_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Both recipeId and productId are required.");
    };

    match state
        .graph
        .add_edge(recipe_id, product_id, edges::USES_PRODUCT, request.edge_properties())
        .await
    {
        Ok(edge) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Uses product relationship added successfully", "edge": edge })),
        )
            .into_response(),
        Err(e) => {
            log::error!("Error adding usesProduct edge: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to add usesProduct relationship to graph.",
            )
        }
    }
}

pub async fn handle_connected(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ConnectedQuery>,
) -> Response {
    let Some(edge) = query.edge.as_deref().filter(|e| !e.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Query parameter 'edge' is required.");
    };

    match state
        .graph
        .get_connected_vertices_by_name(&id, edge, &query.direction)
        .await
    {
        Ok(vertices) => (StatusCode::OK, Json(json!({ "vertices": vertices }))).into_response(),
        Err(e @ RecipebotError::InvalidDirection(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            log::error!("Error fetching connected vertices for {}: {}", id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch connected vertices.",
            )
        }
    }
}
