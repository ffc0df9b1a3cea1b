use std::path::PathBuf;

use anyhow::{bail, Context};

pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const DAILY_BUDGET_KCAL: f64 = 2000.0;
pub const RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerConfig {
    /// Always answers with the same label.
    Constant { label: String },
    /// External detector: `program args... <image-path>`, JSON labels on stdout.
    Detector { program: String, args: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalorieMode {
    Lookup,
    Fixed(f64),
}

/// What a successful POST / answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadResponse {
    Result,
    Redirect,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub daily_budget_kcal: f64,
    pub retention_days: i64,
    pub recognizer: RecognizerConfig,
    pub calorie_mode: CalorieMode,
    pub upload_response: UploadResponse,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://diet.db".into(),
            upload_dir: PathBuf::from("uploads"),
            host: "0.0.0.0".into(),
            port: 5000,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            daily_budget_kcal: DAILY_BUDGET_KCAL,
            retention_days: RETENTION_DAYS,
            recognizer: RecognizerConfig::Constant {
                label: "apple".into(),
            },
            calorie_mode: CalorieMode::Lookup,
            upload_response: UploadResponse::Result,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match var("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a port: {v}"))?,
            None => defaults.port,
        };

        let recognizer = match var("RECOGNIZER").as_deref().unwrap_or("constant") {
            "constant" => RecognizerConfig::Constant {
                label: var("RECOGNIZER_LABEL").unwrap_or_else(|| "apple".into()),
            },
            "detector" => {
                let cmd = var("DETECTOR_CMD")
                    .context("DETECTOR_CMD must be set when RECOGNIZER=detector")?;
                let mut parts = cmd.split_whitespace().map(str::to_string);
                let Some(program) = parts.next() else {
                    bail!("DETECTOR_CMD is empty");
                };
                RecognizerConfig::Detector {
                    program,
                    args: parts.collect(),
                }
            }
            other => bail!("unknown RECOGNIZER: {other}"),
        };

        let calorie_mode = match var("CALORIE_MODE").as_deref().unwrap_or("lookup") {
            "lookup" => CalorieMode::Lookup,
            "fixed" => {
                let kcal = match var("FIXED_CALORIES") {
                    Some(v) => v
                        .parse::<f64>()
                        .with_context(|| format!("FIXED_CALORIES is not a number: {v}"))?,
                    None => 100.0,
                };
                CalorieMode::Fixed(kcal)
            }
            other => bail!("unknown CALORIE_MODE: {other}"),
        };

        let upload_response = match var("UPLOAD_RESPONSE").as_deref().unwrap_or("result") {
            "result" => UploadResponse::Result,
            "redirect" => UploadResponse::Redirect,
            other => bail!("unknown UPLOAD_RESPONSE: {other}"),
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            host: var("APP_HOST").unwrap_or(defaults.host),
            port,
            recognizer,
            calorie_mode,
            upload_response,
            ..defaults
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
