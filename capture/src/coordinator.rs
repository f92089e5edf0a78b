//! Document and face capture, validation, and bundling.

use rider_permissions::PermissionLedger;
use rider_types::{CapabilityKind, Clock, EvidenceBundle, ImageKind, ImageRef};
use std::sync::Arc;

use crate::{CaptureError, CaptureLimits, CaptureProvider, ProviderError};

/// Stateless front for the device capture provider.
pub struct CaptureCoordinator {
    provider: Arc<dyn CaptureProvider>,
    limits: CaptureLimits,
    clock: Arc<dyn Clock>,
}

impl CaptureCoordinator {
    pub fn new(
        provider: Arc<dyn CaptureProvider>,
        limits: CaptureLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            limits,
            clock,
        }
    }

    pub fn limits(&self) -> &CaptureLimits {
        &self.limits
    }

    /// Capture the identity document. Fails fast if the camera is not granted.
    pub async fn capture_document(
        &self,
        permissions: &PermissionLedger,
    ) -> Result<ImageRef, CaptureError> {
        self.capture(ImageKind::Document, permissions).await
    }

    /// Capture the live face image. Same camera gate as the document.
    pub async fn capture_face(
        &self,
        permissions: &PermissionLedger,
    ) -> Result<ImageRef, CaptureError> {
        self.capture(ImageKind::Face, permissions).await
    }

    /// Validate both references against the limits and pair them.
    pub fn build_bundle(
        &self,
        document: ImageRef,
        face: ImageRef,
    ) -> Result<EvidenceBundle, CaptureError> {
        self.validate(&document, ImageKind::Document)?;
        self.validate(&face, ImageKind::Face)?;
        Ok(EvidenceBundle::new(document, face, self.clock.now()))
    }

    async fn capture(
        &self,
        kind: ImageKind,
        permissions: &PermissionLedger,
    ) -> Result<ImageRef, CaptureError> {
        if !permissions.is_granted(CapabilityKind::Camera) {
            return Err(CaptureError::PermissionDenied(CapabilityKind::Camera));
        }

        match tokio::time::timeout(self.limits.timeout, self.provider.capture_image(kind)).await {
            Ok(Ok(image)) => {
                tracing::debug!(%kind, bytes = image.byte_len, "image captured");
                Ok(image)
            }
            Ok(Err(ProviderError::UserCancelled)) => Err(CaptureError::UserCancelled),
            Ok(Err(ProviderError::HardwareUnavailable(reason))) => {
                Err(CaptureError::HardwareUnavailable(reason))
            }
            Err(_) => {
                tracing::warn!(%kind, timeout_ms = self.limits.timeout.as_millis() as u64, "capture timed out");
                Err(CaptureError::HardwareUnavailable(format!(
                    "{kind} capture timed out after {:?}",
                    self.limits.timeout
                )))
            }
        }
    }

    fn validate(&self, image: &ImageRef, expected: ImageKind) -> Result<(), CaptureError> {
        let limits = &self.limits;
        if image.kind != expected {
            return Err(CaptureError::InvalidEvidence(format!(
                "expected a {expected} image, got {}",
                image.kind
            )));
        }
        if image.is_empty() {
            return Err(CaptureError::InvalidEvidence(format!("{expected} image is empty")));
        }
        if image.byte_len > limits.max_image_bytes {
            return Err(CaptureError::InvalidEvidence(format!(
                "{expected} image is {} bytes, limit is {}",
                image.byte_len, limits.max_image_bytes
            )));
        }
        if image.width > limits.max_width || image.height > limits.max_height {
            return Err(CaptureError::InvalidEvidence(format!(
                "{expected} image {}x{} exceeds {}x{}",
                image.width, image.height, limits.max_width, limits.max_height
            )));
        }
        if image.width < limits.min_width || image.height < limits.min_height {
            return Err(CaptureError::InvalidEvidence(format!(
                "{expected} image {}x{} is below {}x{}",
                image.width, image.height, limits.min_width, limits.min_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rider_types::SystemClock;
    use std::time::Duration;

    struct FixedProvider(Result<(), ProviderError>);

    #[async_trait]
    impl CaptureProvider for FixedProvider {
        async fn capture_image(&self, kind: ImageKind) -> Result<ImageRef, ProviderError> {
            self.0.clone()?;
            Ok(image(kind, 1024, 1280, 960))
        }
    }

    struct StuckProvider;

    #[async_trait]
    impl CaptureProvider for StuckProvider {
        async fn capture_image(&self, _kind: ImageKind) -> Result<ImageRef, ProviderError> {
            std::future::pending().await
        }
    }

    fn image(kind: ImageKind, bytes: u64, w: u32, h: u32) -> ImageRef {
        ImageRef {
            id: format!("{kind}-1"),
            kind,
            byte_len: bytes,
            width: w,
            height: h,
        }
    }

    fn coordinator(provider: impl CaptureProvider + 'static) -> CaptureCoordinator {
        CaptureCoordinator::new(
            Arc::new(provider),
            CaptureLimits::default(),
            Arc::new(SystemClock),
        )
    }

    fn camera_granted() -> PermissionLedger {
        let mut ledger = PermissionLedger::new();
        ledger.grant(CapabilityKind::Camera);
        ledger
    }

    #[tokio::test]
    async fn capture_requires_camera() {
        let c = coordinator(FixedProvider(Ok(())));
        let ledger = PermissionLedger::new();
        assert_eq!(
            c.capture_document(&ledger).await,
            Err(CaptureError::PermissionDenied(CapabilityKind::Camera))
        );
        assert_eq!(
            c.capture_face(&ledger).await,
            Err(CaptureError::PermissionDenied(CapabilityKind::Camera))
        );
    }

    #[tokio::test]
    async fn provider_errors_are_mapped() {
        let ledger = camera_granted();
        let cancelled = coordinator(FixedProvider(Err(ProviderError::UserCancelled)));
        assert_eq!(cancelled.capture_face(&ledger).await, Err(CaptureError::UserCancelled));

        let broken = coordinator(FixedProvider(Err(ProviderError::HardwareUnavailable(
            "lens busy".into(),
        ))));
        assert!(matches!(
            broken.capture_document(&ledger).await,
            Err(CaptureError::HardwareUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_capture_times_out_as_hardware_unavailable() {
        let c = CaptureCoordinator::new(
            Arc::new(StuckProvider),
            CaptureLimits {
                timeout: Duration::from_secs(5),
                ..CaptureLimits::default()
            },
            Arc::new(SystemClock),
        );
        let err = c.capture_document(&camera_granted()).await.unwrap_err();
        assert!(matches!(err, CaptureError::HardwareUnavailable(_)));
        assert!(err.costs_attempt());
    }

    #[test]
    fn bundle_validation() {
        let c = coordinator(FixedProvider(Ok(())));
        let doc = image(ImageKind::Document, 2048, 1600, 1200);
        let face = image(ImageKind::Face, 2048, 800, 800);
        let bundle = c.build_bundle(doc.clone(), face.clone()).unwrap();
        assert_eq!(bundle.document(), &doc);
        assert_eq!(bundle.face(), &face);

        let empty = image(ImageKind::Face, 0, 800, 800);
        assert!(matches!(
            c.build_bundle(doc.clone(), empty),
            Err(CaptureError::InvalidEvidence(_))
        ));

        let huge = image(ImageKind::Face, 64 * 1024 * 1024, 800, 800);
        assert!(matches!(
            c.build_bundle(doc.clone(), huge),
            Err(CaptureError::InvalidEvidence(_))
        ));

        let oversized = image(ImageKind::Face, 2048, 8000, 800);
        assert!(c.build_bundle(doc.clone(), oversized).is_err());

        let tiny = image(ImageKind::Face, 2048, 100, 100);
        assert!(c.build_bundle(doc.clone(), tiny).is_err());

        // Swapped kinds are rejected.
        assert!(c.build_bundle(face, doc).is_err());
    }

    #[test]
    fn cancel_and_permission_are_free() {
        assert!(!CaptureError::UserCancelled.costs_attempt());
        assert!(!CaptureError::PermissionDenied(CapabilityKind::Camera).costs_attempt());
        assert!(CaptureError::InvalidEvidence("x".into()).costs_attempt());
    }
}
