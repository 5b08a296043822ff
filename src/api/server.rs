//! API Server module
//!
//! This module provides the HTTP API for a garden.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::GardenError;
use crate::models::ThoughtFilter;
use crate::Garden;

/// Request carrying free text, used for planting and watering
#[derive(Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Request to move a thought
#[derive(Serialize, Deserialize)]
pub struct PositionRequest {
    pub x: f32,
    pub y: f32,
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
        }
    }
}

/// API responses
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn status_for(error: &GardenError) -> StatusCode {
    match error {
        GardenError::NotFound(_) => StatusCode::NOT_FOUND,
        GardenError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GardenError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
        GardenError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GardenError::Analysis(_) | GardenError::Watering(_) | GardenError::ImageGeneration(_) => {
            StatusCode::BAD_GATEWAY
        }
        GardenError::Storage(_) | GardenError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Helper function to map Garden results to Axum responses
fn map_garden_result<T: Serialize>(result: Result<T, GardenError>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "request failed");
            }
            (status, Json(ApiResponse::<T>::error(e.to_string()))).into_response()
        }
    }
}

/// Builds the router with all API routes
pub fn router(garden: Garden) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/thoughts", get(list_thoughts).post(plant_thought))
        .route(
            "/api/thoughts/:id",
            get(get_thought).delete(delete_thought),
        )
        .route("/api/thoughts/:id/water", post(water_thought))
        .route("/api/thoughts/:id/position", post(move_thought))
        .route("/api/thoughts/:id/viewed", post(view_thought))
        .route("/api/thoughts/:id/repaint", post(repaint_thought))
        .route("/api/events", get(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(garden)
}

/// Starts the API server
pub async fn serve(garden: Garden, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(garden);

    let listener = TcpListener::bind(config.address).await?;
    tracing::info!("garden listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn list_thoughts(
    State(garden): State<Garden>,
    Query(filter): Query<ThoughtFilter>,
) -> impl IntoResponse {
    map_garden_result(garden.list(filter).await)
}

async fn plant_thought(
    State(garden): State<Garden>,
    Json(request): Json<TextRequest>,
) -> impl IntoResponse {
    map_garden_result(garden.plant(&request.text).await)
}

async fn get_thought(State(garden): State<Garden>, Path(id): Path<String>) -> impl IntoResponse {
    map_garden_result(garden.get(&id).await)
}

async fn delete_thought(
    State(garden): State<Garden>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    map_garden_result(garden.delete(&id).await)
}

async fn water_thought(
    State(garden): State<Garden>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> impl IntoResponse {
    map_garden_result(garden.water(&id, &request.text).await)
}

async fn move_thought(
    State(garden): State<Garden>,
    Path(id): Path<String>,
    Json(request): Json<PositionRequest>,
) -> impl IntoResponse {
    map_garden_result(garden.relocate(&id, request.x, request.y).await)
}

async fn view_thought(State(garden): State<Garden>, Path(id): Path<String>) -> impl IntoResponse {
    map_garden_result(garden.mark_viewed(&id).await)
}

async fn repaint_thought(
    State(garden): State<Garden>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    map_garden_result(garden.repaint(&id).await)
}

/// Server-sent change feed. Each event is named after the change and
/// carries the thought id; clients refetch what they need.
async fn events_handler(
    State(garden): State<Garden>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = garden.subscribe();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        let event = match receiver.recv().await {
            Ok(change) => Event::default().event(change.name()).data(change.id()),
            // Some messages were missed; tell the client to reload everything
            Err(RecvError::Lagged(skipped)) => {
                Event::default().event("resync").data(skipped.to_string())
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok(event), receiver))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garden::tests::test_garden;
    use crate::models::{Category, ThoughtCard};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt; // for `collect` and `frame`
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt; // for `oneshot`

    #[derive(Deserialize)]
    struct Envelope<T> {
        success: bool,
        data: Option<T>,
        error: Option<String>,
    }

    // Helper to make requests and deserialize the response envelope
    async fn request_json<T: DeserializeOwned>(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Envelope<T>) {
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let envelope = serde_json::from_slice(&body_bytes).unwrap_or_else(|e| {
            panic!(
                "unparseable body ({}): {}",
                e,
                String::from_utf8_lossy(&body_bytes)
            )
        });
        (status, envelope)
    }

    #[tokio::test]
    async fn test_thought_lifecycle_over_http() {
        let app = router(test_garden("sprout", true));

        let (status, planted) = request_json::<ThoughtCard>(
            &app,
            "POST",
            "/api/thoughts",
            Some(json!({ "text": "I need to finish the report" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(planted.success);
        let planted = planted.data.unwrap();
        assert_eq!(planted.category(), Category::Todo);
        let id = planted.id().to_string();

        let (status, watered) = request_json::<ThoughtCard>(
            &app,
            "POST",
            &format!("/api/thoughts/{}/water", id),
            Some(json!({ "text": "outline is done" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(watered.data.unwrap().updates().len(), 1);

        let (_, moved) = request_json::<ThoughtCard>(
            &app,
            "POST",
            &format!("/api/thoughts/{}/position", id),
            Some(json!({ "x": 55.0, "y": 60.0 })),
        )
        .await;
        assert_eq!(moved.data.unwrap().position().x, 55.0);

        let (_, listed) = request_json::<Vec<ThoughtCard>>(
            &app,
            "GET",
            "/api/thoughts?category=todo&stage=sprout",
            None,
        )
        .await;
        assert_eq!(listed.data.unwrap().len(), 1);

        let (_, listed) =
            request_json::<Vec<ThoughtCard>>(&app, "GET", "/api/thoughts?category=idea", None)
                .await;
        assert!(listed.data.unwrap().is_empty());

        let (status, _) =
            request_json::<()>(&app, "DELETE", &format!("/api/thoughts/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) =
            request_json::<()>(&app, "DELETE", &format!("/api/thoughts/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = router(test_garden("sprout", false));

        let (status, missing) =
            request_json::<ThoughtCard>(&app, "GET", "/api/thoughts/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!missing.success);
        assert!(missing.error.unwrap().contains("nope"));

        let (status, _) = request_json::<ThoughtCard>(
            &app,
            "POST",
            "/api/thoughts",
            Some(json!({ "text": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, planted) = request_json::<ThoughtCard>(
            &app,
            "POST",
            "/api/thoughts",
            Some(json!({ "text": "fix the bike" })),
        )
        .await;
        let id = planted.data.unwrap().id().to_string();
        let (status, _) = request_json::<ThoughtCard>(
            &app,
            "POST",
            &format!("/api/thoughts/{}/repaint", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_event_feed_reports_plantings() {
        let garden = test_garden("sprout", true);
        let response = router(garden.clone())
            .oneshot(Request::builder().uri("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body();
        let thought = garden.plant("learn the cello").await.unwrap();

        let frame = tokio::time::timeout(std::time::Duration::from_secs(5), body.frame())
            .await
            .expect("no event within 5s")
            .unwrap()
            .unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.contains("event: planted"), "{}", text);
        assert!(text.contains(&format!("data: {}", thought.id())), "{}", text);
    }

    #[test]
    fn test_status_mapping() {
        use std::time::Duration;
        assert_eq!(
            status_for(&GardenError::Overloaded("busy".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&GardenError::Timeout(Duration::from_secs(20))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&GardenError::Analysis("bad".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&GardenError::Config("no key".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
