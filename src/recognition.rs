use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context};
use axum::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::config::RecognizerConfig;

/// Maps an image on disk to a food label.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> anyhow::Result<Option<String>>;
    fn name(&self) -> &'static str;
}

pub fn from_config(cfg: &RecognizerConfig) -> Arc<dyn Recognizer> {
    match cfg {
        RecognizerConfig::Constant { label } => Arc::new(ConstantRecognizer::new(label.clone())),
        RecognizerConfig::Detector { program, args } => {
            Arc::new(DetectorRecognizer::new(program.clone(), args.clone()))
        }
    }
}

/// Placeholder that answers the same label for every image.
#[derive(Clone, Debug)]
pub struct ConstantRecognizer {
    label: String,
}

impl ConstantRecognizer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl Recognizer for ConstantRecognizer {
    async fn recognize(&self, _image: &Path) -> anyhow::Result<Option<String>> {
        Ok(Some(self.label.clone()))
    }

    fn name(&self) -> &'static str {
        "constant"
    }
}

/// Runs a general-purpose object detector as a child process.
///
/// The image path is appended to `args`. The detector prints a JSON array on
/// stdout, either plain labels or objects carrying a `label` (or `name`)
/// field, in detection order. The first label wins; there is no confidence
/// threshold and no check that the label is a food.
#[derive(Clone, Debug)]
pub struct DetectorRecognizer {
    program: String,
    args: Vec<String>,
}

impl DetectorRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detection {
    Label(String),
    Object {
        #[serde(alias = "name")]
        label: String,
    },
}

impl Detection {
    fn into_label(self) -> String {
        match self {
            Detection::Label(label) | Detection::Object { label } => label,
        }
    }
}

fn first_label(stdout: &[u8]) -> anyhow::Result<Option<String>> {
    let detections: Vec<Detection> =
        serde_json::from_slice(stdout).context("parse detector output")?;
    Ok(detections.into_iter().next().map(Detection::into_label))
}

#[async_trait]
impl Recognizer for DetectorRecognizer {
    async fn recognize(&self, image: &Path) -> anyhow::Result<Option<String>> {
        tokio::fs::metadata(image)
            .await
            .with_context(|| format!("read image {}", image.display()))?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("spawn detector {}", self.program))?;

        if !output.status.success() {
            bail!(
                "detector exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let label = first_label(&output.stdout)?;
        debug!(image = %image.display(), label = ?label, "detector finished");
        Ok(label)
    }

    fn name(&self) -> &'static str {
        "detector"
    }
}
