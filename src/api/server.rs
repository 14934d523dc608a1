//! HTTP entry point: one multipart upload in, one extraction result out.

use std::net::SocketAddr;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::id_card_processor::IdCardProcessor;
use crate::models::UploadedImage;
use crate::utils::IdCardError;

/// Multipart field carrying the card photo.
pub const IMAGE_FIELD: &str = "image";

const UPLOAD_REQUIRED: &str = "Please upload an image file.";

#[derive(Clone)]
pub struct AppState {
    pub processor: IdCardProcessor,
}

pub fn create_router(processor: IdCardProcessor, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ProcessIDCard", post(process_id_card_handler))
        .route("/api/ProcessIDCard", post(process_id_card_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(AppState { processor })
}

/// Bind and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, router: Router) -> Result<(), IdCardError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn health_handler() -> &'static str {
    "ok"
}

/// POST /ProcessIDCard
///
/// # Responses
/// - 200: `{"Name": .., "Barcode": .., "ImageBase64": ..}`; stage misses are sentinel strings
/// - 400: missing or empty `image` field, or an unreadable multipart body
/// - 413: upload over the configured size limit
/// - 500: the upload could not be staged for processing
async fn process_id_card_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Response {
    log::info!("Processing ID Card");

    let Ok(multipart) = multipart else {
        log::warn!("Rejected request without a multipart body");
        return upload_required();
    };

    let upload = match read_image_field(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            log::warn!("Rejected request without a usable '{}' field", IMAGE_FIELD);
            return upload_required();
        }
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            log::warn!("Rejected oversized upload: {}", e.body_text());
            return (StatusCode::PAYLOAD_TOO_LARGE, e.body_text()).into_response();
        }
        Err(e) => {
            log::warn!("Failed to read multipart body: {}", e.body_text());
            return upload_required();
        }
    };

    match state.processor.process(upload).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) if e.is_client_error() => upload_required(),
        Err(e) => {
            log::error!("Error processing ID card: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// First file part named `image` wins. Plain form values and other fields are skipped.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<UploadedImage>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(UploadedImage::new(bytes.to_vec(), content_type, file_name).ok());
    }
    Ok(None)
}

fn upload_required() -> Response {
    (StatusCode::BAD_REQUEST, UPLOAD_REQUIRED).into_response()
}
