//! Handwritten signature images as submitted by the signing pad.
//!
//! The browser sends either bare base64 or a `data:image/...;base64,` URL.
//! Images are stored content-addressed by their SHA-256 digest.

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// A decoded, non-empty signature image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBlob {
  bytes: Vec<u8>,
}

impl SignatureBlob {
  /// Decode a submitted signature.
  pub fn decode(input: &str) -> Result<Self> {
    let input = input.trim();
    let payload = match input.strip_prefix("data:") {
      Some(rest) => {
        let (meta, data) = rest
          .split_once(',')
          .ok_or_else(|| Error::InvalidSignature("malformed data URL".into()))?;
        let media_type = meta.strip_suffix(";base64").ok_or_else(|| {
          Error::InvalidSignature("data URL is not base64-encoded".into())
        })?;
        if !media_type.starts_with("image/") {
          return Err(Error::InvalidSignature(format!(
            "expected an image, got {media_type:?}"
          )));
        }
        data
      }
      None => input,
    };

    let bytes = B64
      .decode(payload)
      .map_err(|e| Error::InvalidSignature(e.to_string()))?;
    if bytes.is_empty() {
      return Err(Error::InvalidSignature("signature is empty".into()));
    }
    Ok(Self { bytes })
  }

  pub fn from_bytes(bytes: Vec<u8>) -> Self { Self { bytes } }

  /// Content address: lowercase hex SHA-256 of the image bytes.
  pub fn reference(&self) -> String { hex::encode(Sha256::digest(&self.bytes)) }

  pub fn as_bytes(&self) -> &[u8] { &self.bytes }

  pub fn into_bytes(self) -> Vec<u8> { self.bytes }
}
