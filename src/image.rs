use crate::error::{BioCaptureError, Result, ValidationError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";
const FALLBACK_MIME: &str = "application/octet-stream";

/// A captured image held in memory as a `data:<mime>;base64,<payload>` URL.
///
/// The backend expects the raw payload only, so everything that leaves the
/// process goes through [`DataUrl::payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataUrl(String);

impl DataUrl {
    /// Parse either a full data URL or a bare base64 payload.
    ///
    /// Bare payloads are validated by decoding them and get a MIME type
    /// sniffed from their leading bytes.
    pub fn parse(input: &str) -> std::result::Result<Self, ValidationError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::InvalidImage {
                details: "empty image data".to_string(),
            });
        }

        if let Some(rest) = input.strip_prefix(DATA_URL_SCHEME) {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                ValidationError::InvalidImage {
                    details: "data URL has no payload separator".to_string(),
                }
            })?;
            if !header.ends_with(BASE64_MARKER) {
                return Err(ValidationError::InvalidImage {
                    details: "only base64 data URLs are supported".to_string(),
                });
            }
            if payload.is_empty() {
                return Err(ValidationError::InvalidImage {
                    details: "data URL payload is empty".to_string(),
                });
            }
            return Ok(Self(input.to_string()));
        }

        let bytes = STANDARD
            .decode(input)
            .map_err(|e| ValidationError::InvalidImage {
                details: format!("payload is not valid base64: {}", e),
            })?;
        Ok(Self::from_payload(input, sniff_mime(&bytes)))
    }

    /// Build a data URL from an already-encoded base64 payload
    pub fn from_payload(payload: &str, mime: &str) -> Self {
        Self(with_data_url_prefix(payload, mime))
    }

    /// Encode raw image bytes
    pub fn from_bytes(bytes: &[u8], mime: Option<&str>) -> Self {
        let mime = mime.unwrap_or_else(|| sniff_mime(bytes));
        Self::from_payload(&STANDARD.encode(bytes), mime)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base64 payload with the `data:` prefix stripped
    pub fn payload(&self) -> &str {
        strip_data_url_prefix(&self.0)
    }

    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(DATA_URL_SCHEME)?;
        let header = rest.split(',').next()?;
        let mime = header.split(';').next()?;
        if mime.is_empty() {
            None
        } else {
            Some(mime)
        }
    }

    pub fn decode(&self) -> std::result::Result<Vec<u8>, ValidationError> {
        STANDARD
            .decode(self.payload())
            .map_err(|e| ValidationError::InvalidImage {
                details: format!("payload is not valid base64: {}", e),
            })
    }

    /// Approximate decoded size in bytes
    pub fn byte_len(&self) -> usize {
        let payload = self.payload();
        let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
        ((payload.len() / 4) * 3).saturating_sub(padding.min(2))
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mime_type() {
            Some(mime) => write!(f, "{} ({} bytes)", mime, self.byte_len()),
            None => write!(f, "image ({} bytes)", self.byte_len()),
        }
    }
}

/// Remove a leading `data:...,` header if present
pub fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with(DATA_URL_SCHEME) {
        match data.split_once(',') {
            Some((_, payload)) => payload,
            None => data,
        }
    } else {
        data
    }
}

/// Re-attach a data URL header to a raw base64 payload for display
pub fn with_data_url_prefix(payload: &str, mime: &str) -> String {
    format!("{}{}{},{}", DATA_URL_SCHEME, mime, BASE64_MARKER, payload)
}

/// Guess an image MIME type from magic bytes
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'B', b'M', ..] => "image/bmp",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => FALLBACK_MIME,
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file from disk (the "upload" path of a capture step)
pub async fn load_image_file<P: AsRef<Path>>(path: P) -> Result<DataUrl> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(BioCaptureError::Validation(ValidationError::InvalidImage {
            details: format!("{} is empty", path.display()),
        }));
    }

    let mime = mime_from_extension(path).unwrap_or_else(|| sniff_mime(&bytes));
    debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), mime);
    Ok(DataUrl::from_bytes(&bytes, Some(mime)))
}
