//! Upload endpoint

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    Json,
};

use crate::error::{Error, Result};
use crate::processing::ProcessingJob;
use crate::server::state::AppState;
use crate::types::{TaskId, UploadResponse};

/// Declared request size, if the client sent one
fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// POST /upload/ - Store a file and schedule it for processing
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let limit = state.store().max_upload_size();
    if let Some(declared) = content_length(&headers) {
        if declared > limit {
            tracing::warn!("Rejected upload: {} bytes exceeds limit of {}", declared, limit);
            return Err(Error::TooLarge { declared, limit });
        }
    }

    // Claim a queue slot before anything touches the disk
    let slot = state.queue().reserve()?;

    let field = loop {
        let next = multipart
            .next_field()
            .await
            .map_err(|e| Error::bad_request(format!("Failed to read multipart field: {}", e)))?;
        match next {
            Some(field) if field.file_name().is_some() => break field,
            Some(_) => continue,
            None => return Err(Error::bad_request("No file provided")),
        }
    };

    let filename = field.file_name().unwrap_or_default().to_string();
    let path = state.store().path_for(&filename)?;
    let size = state.store().persist_field(field, &path).await?;

    let task_id = TaskId::new();
    state.registry().create(task_id, &path)?;
    slot.submit(ProcessingJob {
        task_id,
        path: path.clone(),
    });

    tracing::info!(
        task_id = %task_id,
        "Accepted upload {} ({} bytes) as {}",
        filename,
        size,
        path.display()
    );

    Ok(Json(UploadResponse::accepted(task_id)))
}
