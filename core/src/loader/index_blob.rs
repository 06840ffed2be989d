use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matrix::CustomerId;
use crate::neighbors::{BruteForceIndex, Metric};

use super::ResourceError;

pub const INDEX_BLOB_VERSION: u32 = 1;

/// On-disk form of a trained neighbor index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBlob {
    pub version: u32,
    #[serde(default)]
    pub metric: Metric,
    pub dimension: usize,
    /// CRC-32 over the points as computed by [`index_checksum`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
    pub points: Vec<IndexBlobPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBlobPoint {
    pub id: CustomerId,
    pub values: Vec<f32>,
}

/// Checksum of indexed points in stored order: each id's UTF-8 bytes, a zero
/// separator, then every value as little-endian `f32`.
pub fn index_checksum<'a>(points: impl IntoIterator<Item = (&'a str, &'a [f32])>) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for (id, values) in points {
        hasher.update(id.as_bytes());
        hasher.update(&[0]);
        for value in values {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize()
}

pub(super) fn read_index_blob(path: &Path) -> Result<BruteForceIndex, ResourceError> {
    if !path.exists() {
        return Err(ResourceError::load(path, "index blob does not exist"));
    }

    let raw = fs::read(path)
        .map_err(|error| ResourceError::load(path, format!("failed to read index blob: {error}")))?;
    let blob: IndexBlob = serde_json::from_slice(&raw).map_err(|error| {
        ResourceError::load(path, format!("failed to decode index blob: {error}"))
    })?;

    if blob.version != INDEX_BLOB_VERSION {
        return Err(ResourceError::load(
            path,
            format!("unsupported index blob version {}", blob.version),
        ));
    }

    if let Some(expected) = blob.checksum {
        let actual = index_checksum(
            blob.points
                .iter()
                .map(|point| (point.id.as_str(), point.values.as_slice())),
        );
        if actual != expected {
            return Err(ResourceError::load(
                path,
                format!("index blob checksum mismatch: expected {expected}, got {actual}"),
            ));
        }
    }

    let points = blob
        .points
        .into_iter()
        .map(|point| (point.id, point.values))
        .collect();

    BruteForceIndex::new(blob.metric, blob.dimension, points)
        .map_err(|error| ResourceError::load(path, format!("invalid index blob: {error}")))
}
