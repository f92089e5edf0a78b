//! Nullable camera: scripted captures.

use async_trait::async_trait;
use rider_capture::{CaptureProvider, ProviderError};
use rider_types::{ImageKind, ImageRef};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::lock;

/// One scripted camera response.
#[derive(Clone, Debug)]
pub enum CameraStep {
    /// A well-formed 1280x720 image of the requested kind.
    Image,
    /// A specific image reference, returned as-is.
    Custom(ImageRef),
    Fail(ProviderError),
    /// Never answers; the coordinator's timeout fires.
    Hang,
}

/// A camera that replays a script, then keeps returning good images.
#[derive(Debug, Default)]
pub struct NullCamera {
    script: Mutex<VecDeque<CameraStep>>,
    captured: Mutex<Vec<ImageKind>>,
}

impl NullCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(steps: impl IntoIterator<Item = CameraStep>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Queue another step after the current script.
    pub fn push(&self, step: CameraStep) {
        lock(&self.script).push_back(step);
    }

    /// Kinds requested so far (for assertions).
    pub fn captured(&self) -> Vec<ImageKind> {
        lock(&self.captured).clone()
    }

    pub fn image(kind: ImageKind) -> ImageRef {
        ImageRef {
            id: format!("null-{kind}"),
            kind,
            byte_len: 256 * 1024,
            width: 1280,
            height: 720,
        }
    }
}

#[async_trait]
impl CaptureProvider for NullCamera {
    async fn capture_image(&self, kind: ImageKind) -> Result<ImageRef, ProviderError> {
        lock(&self.captured).push(kind);
        let step = lock(&self.script).pop_front().unwrap_or(CameraStep::Image);
        match step {
            CameraStep::Image => Ok(Self::image(kind)),
            CameraStep::Custom(image) => Ok(image),
            CameraStep::Fail(err) => Err(err),
            CameraStep::Hang => std::future::pending().await,
        }
    }
}
