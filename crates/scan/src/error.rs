//! Scan pipeline error taxonomy.
//!
//! Providers report `ProviderError`. The orchestrator never lets one escape
//! on its own: every provider fault is wrapped in the `ScanError` kind for the
//! step that was running, and kept as the `source()` for diagnostics.

use thiserror::Error;

/// Device capability a provider exposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Barcode,
    Camera,
    TextRecognition,
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Capability::Barcode => "barcode scanner",
            Capability::Camera => "camera",
            Capability::TextRecognition => "text recognition",
        })
    }
}

/// Fault reported by a capture provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("timed out")]
    Timeout,

    /// Cancelled by the user on the device, or abandoned by the caller.
    #[error("cancelled")]
    Cancelled,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Failure surfaced by `ScanOrchestrator`.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The capability is absent on this device.
    #[error("{capability} is not available on this device")]
    DeviceUnavailable {
        capability: Capability,
        #[source]
        cause: Option<ProviderError>,
    },

    /// The user declined the permission prompt.
    #[error("{capability} permission denied")]
    PermissionDenied {
        capability: Capability,
        #[source]
        cause: Option<ProviderError>,
    },

    #[error("barcode scan failed")]
    ScanFailed(#[source] ProviderError),

    #[error("photo capture failed")]
    CaptureFailed(#[source] ProviderError),

    #[error("text recognizer failed to initialize")]
    OcrInitFailed(#[source] ProviderError),

    #[error("text recognition failed")]
    OcrRecognitionFailed(#[source] ProviderError),
}

/// Discriminant of `ScanError`, for matching without the payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScanErrorKind {
    DeviceUnavailable,
    PermissionDenied,
    ScanFailed,
    CaptureFailed,
    OcrInitFailed,
    OcrRecognitionFailed,
}

impl ScanError {
    pub fn kind(&self) -> ScanErrorKind {
        match self {
            ScanError::DeviceUnavailable { .. } => ScanErrorKind::DeviceUnavailable,
            ScanError::PermissionDenied { .. } => ScanErrorKind::PermissionDenied,
            ScanError::ScanFailed(_) => ScanErrorKind::ScanFailed,
            ScanError::CaptureFailed(_) => ScanErrorKind::CaptureFailed,
            ScanError::OcrInitFailed(_) => ScanErrorKind::OcrInitFailed,
            ScanError::OcrRecognitionFailed(_) => ScanErrorKind::OcrRecognitionFailed,
        }
    }

    /// The provider fault behind this error, if there was one.
    pub fn cause(&self) -> Option<&ProviderError> {
        match self {
            ScanError::DeviceUnavailable { cause, .. } | ScanError::PermissionDenied { cause, .. } => {
                cause.as_ref()
            }
            ScanError::ScanFailed(cause)
            | ScanError::CaptureFailed(cause)
            | ScanError::OcrInitFailed(cause)
            | ScanError::OcrRecognitionFailed(cause) => Some(cause),
        }
    }

    /// Whether the flow ended because the caller or user cancelled it.
    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some_and(ProviderError::is_cancelled)
    }
}
