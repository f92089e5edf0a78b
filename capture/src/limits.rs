//! Quality limits for captured evidence.

use std::time::Duration;

/// Size and resolution bounds applied to every captured image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureLimits {
    /// Upper bound on a single capture call, including rider interaction.
    pub timeout: Duration,
    pub max_image_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_image_bytes: 10 * 1024 * 1024,
            max_width: 4096,
            max_height: 4096,
            min_width: 320,
            min_height: 320,
        }
    }
}
