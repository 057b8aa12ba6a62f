//! Challenge rendering.
//!
//! A codec turns the session key into something a second device can read.
//! Rendering is pure: the same input always yields the same artifact, and
//! nothing is stored.

use crate::config::{ErrorCorrection, QrConfig};
use crate::error::CodecError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use rootcause::prelude::Report;

/// Rendered challenge artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    media_type: String,
    bytes: Vec<u8>,
}

impl Challenge {
    /// Wraps rendered bytes.
    #[must_use]
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Returns the MIME type of the artifact.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Returns the artifact bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the artifact as a base64 `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Renders text into a scannable challenge.
pub trait ChallengeCodec: Send + Sync {
    /// Renders `text`.
    fn render(&self, text: &str) -> Result<Challenge, Report<CodecError>>;
}

/// QR code rendered as SVG.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodec {
    config: QrConfig,
}

impl QrCodec {
    /// Media type of rendered challenges.
    pub const MEDIA_TYPE: &'static str = "image/svg+xml";

    /// Creates a codec with the given settings.
    #[must_use]
    pub fn new(config: QrConfig) -> Self {
        Self { config }
    }
}

impl ChallengeCodec for QrCodec {
    fn render(&self, text: &str) -> Result<Challenge, Report<CodecError>> {
        let level = match self.config.error_correction {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        };

        let code = QrCode::with_error_correction_level(text.as_bytes(), level).map_err(|e| {
            CodecError::EncodingFailed {
                details: e.to_string(),
            }
        })?;

        let dimension = self.config.min_dimension;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(dimension, dimension)
            .build();

        Ok(Challenge::new(Self::MEDIA_TYPE, image.into_bytes()))
    }
}
