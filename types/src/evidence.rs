//! Evidence envelopes: captured image references and the bundle submitted to the matcher.
//!
//! Image bytes never travel through the pipeline; only references with enough
//! metadata to enforce size and resolution limits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Timestamp;

/// Which image a capture request is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Front side of a government-issued identity document.
    Document,
    /// Live face capture.
    Face,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("document"),
            Self::Face => f.write_str("face"),
        }
    }
}

/// Reference to an image held by the device capture layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Provider-assigned handle (file path, blob key, content hash).
    pub id: String,
    pub kind: ImageKind,
    pub byte_len: u64,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    /// True when the reference points at no data.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() || self.byte_len == 0 || self.width == 0 || self.height == 0
    }
}

/// A paired document + face capture submitted for one match attempt.
///
/// Fields are private: a bundle cannot change after it has been built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    document: ImageRef,
    face: ImageRef,
    captured_at: Timestamp,
}

impl EvidenceBundle {
    /// Assemble a bundle. Quality validation is the capture coordinator's job;
    /// this constructor only pairs the references.
    pub fn new(document: ImageRef, face: ImageRef, captured_at: Timestamp) -> Self {
        Self {
            document,
            face,
            captured_at,
        }
    }

    pub fn document(&self) -> &ImageRef {
        &self.document
    }

    pub fn face(&self) -> &ImageRef {
        &self.face
    }

    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }
}
