use sqlx::FromRow;
use time::PrimitiveDateTime;

/// One accepted upload. `date` is UTC, assigned by the database.
#[derive(Debug, Clone, FromRow)]
pub struct Record {
    pub id: i64,
    pub filename: String,
    pub food_name: Option<String>, // None when the recognizer saw nothing
    pub calories: f64,
    pub date: PrimitiveDateTime,
}
