use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        DefaultBodyLimit, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument, warn};

use super::dto::{PhotoUpload, SummaryResponse, UploadForm};
use super::services::{accepted_filename, parse_weight, process_upload, remaining};
use super::views::{self, ResultPage, UploadPage};
use crate::config::UploadResponse;
use crate::error::AppError;
use crate::images::services::{mime_from_ext, sanitize_filename};
use crate::state::AppState;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(upload))
        .route("/uploads/:filename", get(serve_upload))
        .route("/api/summary", get(summary))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let records = state.store.list_all().await?;
    let consumed = state.store.daily_total().await?;
    let budget = state.config.daily_budget_kcal;
    Ok(Html(views::upload_page(&UploadPage {
        consumed,
        budget,
        remaining: remaining(budget, consumed),
        records: &records,
    })))
}

/// POST / (multipart): `photo` file, optional `weight` in grams.
#[instrument(skip(state, headers, mp))]
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mp: Multipart,
) -> Result<Response, AppError> {
    let limit = state.config.max_upload_bytes;
    if content_length(&headers).is_some_and(|len| len > limit) {
        warn!(limit, "upload rejected by content-length");
        return Err(AppError::PayloadTooLarge { limit });
    }

    let form = read_form(mp, limit).await?;

    let Some(photo) = form.photo else {
        debug!("no photo field");
        return Ok(Redirect::to("/").into_response());
    };
    let Some(filename) = accepted_filename(&photo.filename, &state.config.allowed_extensions)
    else {
        warn!(original = %photo.filename, "upload rejected by filename");
        return Ok(Redirect::to("/").into_response());
    };
    let weight = parse_weight(form.weight.as_deref())?;

    let receipt = process_upload(&state, &filename, photo, weight).await?;

    Ok(match state.config.upload_response {
        UploadResponse::Result => Html(views::result_page(&ResultPage {
            food: receipt.record.food_name.as_deref(),
            calories: receipt.record.calories,
            consumed: receipt.consumed,
            remaining: receipt.remaining,
        }))
        .into_response(),
        UploadResponse::Redirect => Redirect::to("/").into_response(),
    })
}

#[instrument(skip(state))]
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let key = sanitize_filename(&filename);
    if key.is_empty() {
        return Err(AppError::NotFound);
    }
    let Some(body) = state.storage.get_object(&key).await? else {
        return Err(AppError::NotFound);
    };
    Ok(([(header::CONTENT_TYPE, mime_from_ext(&key))], body).into_response())
}

#[instrument(skip(state))]
pub async fn summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let records = state.store.list_all().await?;
    let consumed = state.store.daily_total().await?;
    let budget = state.config.daily_budget_kcal;
    Ok(Json(SummaryResponse {
        consumed_kcal: consumed,
        budget_kcal: budget,
        remaining_kcal: remaining(budget, consumed),
        records: records.into_iter().map(Into::into).collect(),
    }))
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

async fn read_form(mut mp: Multipart, limit: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e, limit)),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("photo") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                form.photo = Some(PhotoUpload { filename, body });
            }
            Some("weight") => {
                let text = field.text().await.map_err(|e| multipart_error(e, limit))?;
                form.weight = Some(text);
            }
            _ => {}
        }
    }
    Ok(form)
}

fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::MalformedUpload(e.body_text())
    }
}
