//! Contract of the remote inpainting service.

use serde::{Deserialize, Serialize};

use crate::{BoxFuture, ImageEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRequest {
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_url: Option<String>,
}

impl ProcessRequest {
    pub fn for_entry(entry: &ImageEntry) -> Self {
        Self {
            image_url: entry.preview.as_str().into(),
            mask_url: entry.mask.as_ref().map(|m| m.as_str().into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub success: bool,
    pub output_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never got a readable answer.
    #[error("{0}")]
    Transport(String),
    /// The service answered but refused or failed.
    #[error("{0}")]
    Rejected(String),
    #[error("request was abandoned")]
    Canceled,
}

impl From<futures::channel::oneshot::Canceled> for GatewayError {
    fn from(_: futures::channel::oneshot::Canceled) -> Self {
        Self::Canceled
    }
}

impl ProcessResponse {
    /// The processed image reference on success.
    pub fn into_output(self) -> Result<String, GatewayError> {
        match self {
            ProcessResponse {
                success: true,
                output_url: Some(url),
                ..
            } if !url.is_empty() => Ok(url),
            ProcessResponse { error: Some(e), .. } => Err(GatewayError::Rejected(e)),
            _ => Err(GatewayError::Rejected("Processing failed".into())),
        }
    }
}

/// Hands one image (and optional mask) to the service, resolving with the processed image url.
pub trait ProcessingGateway {
    fn process(&self, request: ProcessRequest) -> BoxFuture<'static, Result<String, GatewayError>>;
}
