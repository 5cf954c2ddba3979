//! HTTP server for the reshaping API.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                               |
//! |--------|----------------|-------------------------------------------|
//! | GET    | `/health`      | Health check                              |
//! | POST   | `/api/reshape` | Upload a scored CSV for reshaping         |
//! | GET    | `/api/logs`    | SSE stream for real-time logs             |
//!
//! The reshape endpoint takes multipart form data: a `file` part with the
//! scored CSV, an optional `shape` part (`flat`, `melted` or `both`,
//! default `both`), and an optional `id_column` part naming the original-row
//! identifier column for melted output.

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, ReshapeResponse};
use crate::models::OutputShape;
use crate::transform::pipeline::{process_bytes, ProcessOptions};

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/reshape", post(reshape_csv))
        .route("/api/logs", get(sse_logs))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 predexplain server running on http://localhost:{}", port);
    println!("   POST /api/reshape - Upload scored CSV");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "predexplain",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "reshape": "POST /api/reshape",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload and reshape endpoint
async fn reshape_csv(
    mut multipart: Multipart,
) -> Result<Json<ReshapeResponse>, (StatusCode, Json<Value>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut shape = OutputShape::Both;
    let mut id_column: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        bad_request(format!("Multipart error: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| bad_request(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            "shape" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?;
                shape = text.parse().map_err(bad_request)?;
            }
            "id_column" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?;
                if !text.trim().is_empty() {
                    id_column = Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided".to_string()))?;

    println!(
        "📄 NEW UPLOAD: {} ({} bytes, shape: {})",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        shape
    );

    let options = ProcessOptions {
        shape,
        id_column,
        skip_validation: false,
    };

    let result = process_bytes(&bytes, options).map_err(|e| {
        eprintln!("❌ Reshape error: {}", e);
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(error_response(&e.to_string())),
        )
    })?;

    println!(
        "📊 DONE: {} flat rows, {} melted rows, {} valid, {} invalid",
        result.flat.as_ref().map(|f| f.records.len()).unwrap_or(0),
        result.melted.as_ref().map(|m| m.len()).unwrap_or(0),
        result.valid_count,
        result.invalid_count
    );

    Ok(Json(ReshapeResponse::from(result)))
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(error_response(&message)))
}
