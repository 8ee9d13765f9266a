//! Image Encoder: turns a user-supplied image into the base64 payload the
//! analysis client sends inline to the provider.

use base64::{engine::general_purpose, Engine as _};

use crate::error::AnalysisError;

/// An encoded image, ready to be sent for analysis. Built once per selected
/// file and consumed by a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Base64 of the raw file bytes, standard alphabet, padded.
    pub data: String,
    /// MIME type such as `image/png`, sniffed from the bytes.
    pub mime_type: String,
}

impl ImagePayload {
    /// Encode raw file bytes. The whole file is read up front, never
    /// streamed. Fails if the bytes are empty or do not start with a
    /// recognizable image signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::Encoding("empty file".to_string()));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| AnalysisError::Encoding(format!("unrecognized image format: {e}")))?;

        Ok(Self {
            data: general_purpose::STANDARD.encode(bytes),
            mime_type: format.to_mime_type().to_string(),
        })
    }

    /// Split a `data:<mime>;base64,<payload>` URI into its MIME type and
    /// base64 halves, the representation browser file readers produce.
    pub fn from_data_uri(uri: &str) -> Result<Self, AnalysisError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AnalysisError::Encoding("not a data URI".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AnalysisError::Encoding("data URI has no payload".to_string()))?;

        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| AnalysisError::Encoding("data URI is not base64".to_string()))?;

        if mime_type.is_empty() || payload.is_empty() {
            return Err(AnalysisError::Encoding(
                "data URI missing mime type or payload".to_string(),
            ));
        }

        Ok(Self {
            data: payload.to_string(),
            mime_type: mime_type.to_string(),
        })
    }

    /// Decode the base64 payload back into the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, AnalysisError> {
        general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| AnalysisError::Encoding(format!("invalid base64 payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG.
    const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn sniffs_png_mime_type() {
        let payload = ImagePayload::from_bytes(TINY_PNG).unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert!(!payload.data.is_empty());
    }

    #[test]
    fn round_trips_through_base64() {
        let payload = ImagePayload::from_bytes(TINY_PNG).unwrap();
        assert_eq!(payload.decode().unwrap(), TINY_PNG);
    }

    #[test]
    fn rejects_empty_and_unrecognizable_input() {
        assert!(matches!(
            ImagePayload::from_bytes(&[]),
            Err(AnalysisError::Encoding(_))
        ));
        assert!(matches!(
            ImagePayload::from_bytes(b"definitely not an image"),
            Err(AnalysisError::Encoding(_))
        ));
    }

    #[test]
    fn splits_a_data_uri() {
        let payload = ImagePayload::from_data_uri("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.data, "aGVsbG8=");
        assert_eq!(payload.decode().unwrap(), b"hello");
    }

    #[test]
    fn rejects_malformed_data_uris() {
        for uri in [
            "image/png;base64,abcd",
            "data:image/png,abcd",
            "data:;base64,abcd",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(ImagePayload::from_data_uri(uri), Err(AnalysisError::Encoding(_))),
                "accepted {uri:?}"
            );
        }
    }
}
