//! Merge route - multipart upload to a single PDF download.

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::Response,
};
use axum_extra::extract::{
    Multipart,
    multipart::{Field, MultipartRejection},
};
use pdf_merger_core::{
    BlobKey, BlobScope, Error, FILE_FIELD, OUTPUT_FILENAME, UploadLimits, UploadedItem,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::helpers::{ResultExt, RouteResult};
use crate::state::AppState;

/// Merge every `files[]` part, in upload order, into one PDF download.
///
/// Parts are streamed into a request-scoped blob scope, so temp-dir storage
/// is removed once the response is built or the request is abandoned.
pub async fn merge_files(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> RouteResult<Response> {
    let request_id = Uuid::new_v4();
    let span = info_span!("merge", %request_id);
    merge_upload(state, multipart).instrument(span).await
}

async fn merge_upload(
    state: Arc<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> RouteResult<Response> {
    let mut multipart = multipart.map_err(|e| Error::FormDecode(e.to_string()))?;
    let limits = &state.config.limits;

    let mut scope = state.blob_store.scope()?;
    let mut uploads: Vec<(String, BlobKey)> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::FormDecode(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Ignoring form field {:?}", field.name());
            continue;
        }
        // Plain form values under the file field carry no upload
        let Some(filename) = field.file_name().map(str::to_string) else {
            debug!("Ignoring {} value without a filename", FILE_FIELD);
            continue;
        };
        if uploads.len() >= limits.max_files {
            return Err(Error::TooManyFiles {
                limit: limits.max_files,
            }
            .into());
        }

        let key = store_field(&mut *scope, &mut field, &filename, limits).await?;
        uploads.push((filename, key));
    }

    info!(
        "Received {} files into {} storage",
        uploads.len(),
        state.blob_store.name()
    );

    let mut items = Vec::with_capacity(uploads.len());
    for (filename, key) in uploads {
        let content = scope.open(key).map_err(|e| Error::FileOpen {
            filename: filename.clone(),
            reason: e.to_string(),
        })?;
        items.push(UploadedItem::new(filename, content));
    }

    let merged = state.orchestrator.merge(items).await?;
    drop(scope);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{OUTPUT_FILENAME}\""),
        )
        .body(Body::from(merged))
        .or_internal_error()
}

/// Stream one part into a new blob, enforcing the per-file size limit.
async fn store_field(
    scope: &mut dyn BlobScope,
    field: &mut Field,
    filename: &str,
    limits: &UploadLimits,
) -> RouteResult<BlobKey> {
    let open_failed = |e: &dyn std::fmt::Display| Error::FileOpen {
        filename: filename.to_string(),
        reason: e.to_string(),
    };

    let (key, mut writer) = scope.create()?;
    let mut written: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| Error::FormDecode(e.to_string()))?
    {
        written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        if written > limits.max_file_bytes {
            return Err(Error::FileTooLarge {
                filename: filename.to_string(),
                limit: limits.max_file_bytes,
            }
            .into());
        }
        writer.write_all(&chunk).map_err(|e| open_failed(&e))?;
    }

    writer.flush().map_err(|e| open_failed(&e))?;
    debug!("Stored {} ({} bytes)", filename, written);
    Ok(key)
}
