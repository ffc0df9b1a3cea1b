use bytes::Bytes;
use serde::Serialize;

use super::repo::sql_timestamp;
use super::repo_types::Record;

/// Raw `photo` field from the multipart form.
#[derive(Debug)]
pub struct PhotoUpload {
    pub filename: String,
    pub body: Bytes,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub photo: Option<PhotoUpload>,
    pub weight: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordItem {
    pub id: i64,
    pub filename: String,
    pub food_name: Option<String>,
    pub calories: f64,
    pub date: String,
}

impl From<Record> for RecordItem {
    fn from(r: Record) -> Self {
        Self {
            id: r.id,
            date: sql_timestamp(r.date).unwrap_or_default(),
            filename: r.filename,
            food_name: r.food_name,
            calories: r.calories,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub consumed_kcal: f64,
    pub budget_kcal: f64,
    pub remaining_kcal: f64,
    pub records: Vec<RecordItem>,
}
