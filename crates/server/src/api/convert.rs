//! Upload conversion endpoint.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::Limited;
use phono_core::converter::output_file_name;
use phono_core::{
    ConversionRequest, ConvertError, ConvertedOutput, ErrorClass, Outcome, RawParams,
};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tempfile::SpooledTempFile;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;
use crate::metrics::UPLOADS_REJECTED_TOTAL;
use crate::state::AppState;

/// Multipart field carrying the uploaded audio.
pub const INPUT_FILE_FIELD: &str = "input-file";

/// Multipart field naming the output format.
pub const FORMAT_FIELD: &str = "format";

/// Bytes read from the converted output per response chunk.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the reader thread and the response body.
const STREAM_CHANNEL_DEPTH: usize = 4;

/// POST /api/v1/convert/{input}
///
/// Converts an uploaded file. `{input}` is the input file name or format name
/// and selects the upload limit and the decoder.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Path(input): Path<String>,
    request: Request,
) -> Response {
    let input_format = match state.registry().resolve_input_format(&input) {
        Ok(format) => format.clone(),
        Err(e) => return error_response(&ConvertError::from(e)),
    };
    let limit = state.limits().limit_for(input_format.name());

    let request = match limit {
        Some(limit_bytes) => {
            if declared_length(&request).is_some_and(|len| len > limit_bytes) {
                return size_exceeded(input_format.name(), limit_bytes);
            }
            let limit = usize::try_from(limit_bytes).unwrap_or(usize::MAX);
            request.map(|body| Body::new(Limited::new(body, limit)))
        }
        None => request,
    };

    let mut multipart = match Multipart::from_request(request, &state).await {
        Ok(multipart) => multipart,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    // Parse multipart form
    let mut upload: Option<SpooledTempFile> = None;
    let mut upload_name: Option<String> = None;
    let mut output_format: Option<String> = None;
    let mut params = RawParams::new();

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e, input_format.name(), limit),
        };
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            INPUT_FILE_FIELD => {
                upload_name = field.file_name().map(|s| s.to_string());
                let mut spool = state.upload_spool();
                loop {
                    match field.chunk().await {
                        Ok(Some(chunk)) => {
                            if let Err(e) = spool.write_all(&chunk) {
                                warn!(error = %e, "Failed to spool upload");
                                return error_response(&ConvertError::resource(e.to_string()));
                            }
                        }
                        Ok(None) => break,
                        Err(e) => return multipart_error(e, input_format.name(), limit),
                    }
                }
                upload = Some(spool);
            }
            "" => {}
            _ => {
                let value = match field.text().await {
                    Ok(text) => text,
                    Err(e) => return multipart_error(e, input_format.name(), limit),
                };
                if name == FORMAT_FIELD {
                    output_format = Some(value);
                } else {
                    params.insert(name, value);
                }
            }
        }
    }

    let Some(mut upload) = upload else {
        return bad_request(format!("missing required field: {}", INPUT_FILE_FIELD));
    };
    let Some(output_format) = output_format.filter(|f| !f.is_empty()) else {
        return bad_request(format!("missing required field: {}", FORMAT_FIELD));
    };
    if let Err(e) = upload.seek(SeekFrom::Start(0)) {
        return error_response(&ConvertError::resource(e.to_string()));
    }

    let file_name = output_file_name(
        upload_name.as_deref().unwrap_or(&input),
        input_format.default_extension(),
    );
    let request = ConversionRequest::new(upload, file_name, output_format, params);
    debug!(job_id = %request.job_id, "Conversion request received");

    match state.service().convert_async(request).await {
        Outcome::Success(output) => output_response(output),
        Outcome::ValidationFailure(e)
        | Outcome::PipelineFailure(e)
        | Outcome::ResourceFailure(e) => error_response(&e),
    }
}

fn declared_length(request: &Request) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn multipart_error(
    error: axum::extract::multipart::MultipartError,
    format: &str,
    limit: Option<u64>,
) -> Response {
    match limit {
        Some(limit_bytes) if error.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            size_exceeded(format, limit_bytes)
        }
        _ => bad_request(error.body_text()),
    }
}

fn size_exceeded(format: &str, limit_bytes: u64) -> Response {
    UPLOADS_REJECTED_TOTAL.with_label_values(&[format]).inc();
    error_response(&ConvertError::SizeExceeded {
        format: format.to_string(),
        limit_bytes,
    })
}

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

/// Maps a failed job onto a status code. Only request faults expose their message.
pub fn error_response(error: &ConvertError) -> Response {
    let (status, message) = match error.class() {
        ErrorClass::Validation => match error {
            ConvertError::SizeExceeded { .. } => (StatusCode::PAYLOAD_TOO_LARGE, error.to_string()),
            _ => (StatusCode::BAD_REQUEST, error.to_string()),
        },
        ErrorClass::Pipeline => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "conversion failed".to_string(),
        ),
        ErrorClass::Resource => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        ),
    };

    (status, Json(ErrorResponse { error: message })).into_response()
}

fn output_response(output: ConvertedOutput) -> Response {
    let content_type = output.content_type();
    let content_length = output.byte_len();
    let disposition = content_disposition(output.file_name());

    let mut response = Response::new(stream_output(output));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if ascii == file_name {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(file_name)
        )
    }
}

/// Streams the output from a blocking reader. The output is released when the
/// reader finishes or the client goes away.
fn stream_output(mut output: ConvertedOutput) -> Body {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(STREAM_CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            match output.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                        debug!("Client disconnected before the output was fully sent");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read converted output");
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        }
        // Release before the body ends.
        drop(output);
        drop(tx);
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    Body::from_stream(stream)
}
