use anyhow::Context;
use tracing::{info, warn};

use super::dto::PhotoUpload;
use super::repo_types::Record;
use crate::error::AppError;
use crate::images::services::{is_allowed, sanitize_filename};
use crate::nutrition::DEFAULT_WEIGHT_G;
use crate::state::AppState;

/// Outcome of a stored upload.
#[derive(Debug)]
pub struct UploadReceipt {
    pub record: Record,
    pub consumed: f64,
    pub remaining: f64,
}

/// Blank or missing weight means the default portion.
pub fn parse_weight(raw: Option<&str>) -> Result<f64, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_WEIGHT_G),
        Some(v) => v,
    };
    match raw.parse::<f64>() {
        Ok(w) if w.is_finite() && w >= 0.0 => Ok(w),
        _ => Err(AppError::InvalidWeight(raw.to_string())),
    }
}

/// Sanitized storage key for an acceptable upload, `None` when the file
/// field should bounce back to the form.
pub fn accepted_filename(original: &str, allowed: &[String]) -> Option<String> {
    if original.is_empty() {
        return None;
    }
    let name = sanitize_filename(original);
    if name.is_empty() || !is_allowed(&name, allowed) {
        return None;
    }
    Some(name)
}

pub fn remaining(budget: f64, consumed: f64) -> f64 {
    (budget - consumed).max(0.0)
}

/// Store the file, recognize it, compute calories, persist the record.
///
/// If anything after the file write fails the file is removed again, so a
/// failed request leaves neither a file nor a row behind.
pub async fn process_upload(
    st: &AppState,
    filename: &str,
    photo: PhotoUpload,
    weight_g: f64,
) -> anyhow::Result<UploadReceipt> {
    let path = st
        .storage
        .put_object(filename, photo.body)
        .await
        .with_context(|| format!("store upload {}", filename))?;

    let record = match recognize_and_insert(st, filename, &path, weight_g).await {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = st.storage.delete_object(filename).await {
                warn!(error = %cleanup, %filename, "failed to remove upload after error");
            }
            return Err(e);
        }
    };

    let consumed = st.store.daily_total().await?;
    let remaining = remaining(st.config.daily_budget_kcal, consumed);

    info!(
        %filename,
        food = record.food_name.as_deref().unwrap_or("-"),
        calories = record.calories,
        consumed,
        "upload recorded"
    );
    Ok(UploadReceipt {
        record,
        consumed,
        remaining,
    })
}

async fn recognize_and_insert(
    st: &AppState,
    filename: &str,
    path: &std::path::Path,
    weight_g: f64,
) -> anyhow::Result<Record> {
    let food = st
        .recognizer
        .recognize(path)
        .await
        .with_context(|| format!("{} recognizer on {}", st.recognizer.name(), filename))?;

    let calories = st
        .config
        .calorie_mode
        .compute(&st.foods, food.as_deref(), weight_g);

    st.store.insert(filename, food.as_deref(), calories).await
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::config::{AppConfig, ALLOWED_EXTENSIONS};
    use crate::recognition::Recognizer;

    fn allowed() -> Vec<String> {
        ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    fn photo(name: &str) -> PhotoUpload {
        PhotoUpload {
            filename: name.into(),
            body: Bytes::from_static(b"\x89PNG"),
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl Recognizer for FailingRecognizer {
        async fn recognize(&self, _image: &Path) -> anyhow::Result<Option<String>> {
            anyhow::bail!("corrupt image")
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn weight_parsing() {
        assert_eq!(parse_weight(None).unwrap(), 100.0);
        assert_eq!(parse_weight(Some("  ")).unwrap(), 100.0);
        assert_eq!(parse_weight(Some("200")).unwrap(), 200.0);
        assert_eq!(parse_weight(Some(" 50.5 ")).unwrap(), 50.5);
        assert_eq!(parse_weight(Some("0")).unwrap(), 0.0);
        assert!(parse_weight(Some("-1")).is_err());
        assert!(parse_weight(Some("lots")).is_err());
        assert!(parse_weight(Some("NaN")).is_err());
        assert!(parse_weight(Some("inf")).is_err());
    }

    #[test]
    fn filename_acceptance() {
        let allowed = allowed();
        assert_eq!(accepted_filename("apple.jpg", &allowed).as_deref(), Some("apple.jpg"));
        assert_eq!(
            accepted_filename("../../etc/passwd.png", &allowed).as_deref(),
            Some("etc_passwd.png")
        );
        assert_eq!(accepted_filename("", &allowed), None);
        assert_eq!(accepted_filename("notes.txt", &allowed), None);
        assert_eq!(accepted_filename("..png", &allowed), None);
        assert_eq!(accepted_filename("photo", &allowed), None);
    }

    #[test]
    fn remaining_never_negative() {
        assert_eq!(remaining(2000.0, 104.0), 1896.0);
        assert_eq!(remaining(2000.0, 2500.0), 0.0);
    }

    #[tokio::test]
    async fn stores_file_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let st = AppState::fake(dir.path()).await;

        let receipt = process_upload(&st, "apple.jpg", photo("apple.jpg"), 200.0)
            .await
            .unwrap();

        assert_eq!(receipt.record.food_name.as_deref(), Some("apple"));
        assert_eq!(receipt.record.calories, 104.0);
        assert_eq!(receipt.consumed, 104.0);
        assert_eq!(receipt.remaining, 1896.0);
        assert!(dir.path().join("apple.jpg").exists());
    }

    #[tokio::test]
    async fn recognizer_failure_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = AppState::fake(dir.path()).await;
        st.recognizer = Arc::new(FailingRecognizer);

        let err = process_upload(&st, "apple.jpg", photo("apple.jpg"), 100.0)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("corrupt image"));
        assert!(!dir.path().join("apple.jpg").exists());
        assert!(st.store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fixed_mode_ignores_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = AppState::fake(dir.path()).await;
        st.config = Arc::new(AppConfig {
            calorie_mode: crate::config::CalorieMode::Fixed(100.0),
            ..(*st.config).clone()
        });

        let receipt = process_upload(&st, "apple.jpg", photo("apple.jpg"), 500.0)
            .await
            .unwrap();
        assert_eq!(receipt.record.calories, 100.0);
    }
}
