//! Portable project files: every mask of a session keyed by file identity.

use log::info;
use serde::{Deserialize, Serialize};

use crate::{BatchSession, MaskError, MaskRef};

pub const VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMask {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub mask_data_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectFile {
    pub version: String,
    /// Epoch-ms of the export.
    pub timestamp: i64,
    pub masks: Vec<ProjectMask>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("invalid project file: missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid project file: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid project file: mask of {file_name}: {source}")]
    Mask {
        file_name: String,
        #[source]
        source: MaskError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub matched: usize,
    pub total: usize,
}

// Presence of `version` and `masks` is checked by hand to report which one is missing
#[derive(Deserialize)]
struct RawProject {
    version: Option<serde_json::Value>,
    #[serde(default)]
    timestamp: Option<i64>,
    masks: Option<Vec<ProjectMask>>,
}

impl ProjectFile {
    pub fn from_session(session: &BatchSession, now: i64) -> Self {
        Self {
            version: VERSION.into(),
            timestamp: now,
            masks: session
                .entries()
                .iter()
                .filter_map(|e| {
                    Some(ProjectMask {
                        file_name: e.source.name.clone(),
                        file_size: e.source.size,
                        file_type: e.source.mime.clone(),
                        mask_data_url: e.mask.as_ref()?.as_str().into(),
                    })
                })
                .collect(),
        }
    }

    /// Download name, e.g. `image-eraser-project-1700000000000.json`.
    pub fn file_name(&self) -> String {
        format!("image-eraser-project-{}.json", self.timestamp)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn parse(json: &str) -> Result<Self, ProjectError> {
        let raw: RawProject = serde_json::from_str(json)?;
        let version = match raw.version {
            None | Some(serde_json::Value::Null) => {
                return Err(ProjectError::MissingField("version"));
            }
            Some(serde_json::Value::String(s)) if s.is_empty() => {
                return Err(ProjectError::MissingField("version"));
            }
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
        };
        let masks = raw.masks.ok_or(ProjectError::MissingField("masks"))?;
        if version != VERSION {
            log::warn!("Project version {version} differs from {VERSION}, trying anyway");
        }
        Ok(Self {
            version,
            timestamp: raw.timestamp.unwrap_or_default(),
            masks,
        })
    }

    /// Validates every mask first and only then touches the session, so a bad file never leaves
    /// a half imported state.
    pub fn apply(&self, session: &mut BatchSession) -> Result<ImportReport, ProjectError> {
        let masks = self
            .masks
            .iter()
            .map(|m| {
                MaskRef::parse(&m.mask_data_url)
                    .map(|mask| (m, mask))
                    .map_err(|source| ProjectError::Mask {
                        file_name: m.file_name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let matched = masks
            .iter()
            .filter(|(m, mask)| session.assign_by_key(&m.file_name, m.file_size, mask) > 0)
            .count();
        info!("Imported {matched} of {} masks", masks.len());
        Ok(ImportReport {
            matched,
            total: masks.len(),
        })
    }
}
