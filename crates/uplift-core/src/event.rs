//! Upload events produced by watch handles.

use crate::InstanceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file-creation notification tagged with the instance that saw it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    pub instance_id: InstanceId,
    pub path: PathBuf,
    pub detected_at: DateTime<Utc>,
}

impl UploadEvent {
    pub fn new(instance_id: InstanceId, path: impl Into<PathBuf>) -> Self {
        Self {
            instance_id,
            path: path.into(),
            detected_at: Utc::now(),
        }
    }
}
