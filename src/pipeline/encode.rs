//! Base64 encoding of binary payloads for inline provider submission.
//!
//! Images are sent untouched: no re-encoding, no resizing. The MIME subtype
//! comes from the file extension the classifier already looked at, never
//! from sniffing the bytes a second time.

use crate::providers::ProviderRequest;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Standard (padded) base64 of `bytes`.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Build the inline-image request for `bytes` with the given image subtype.
pub fn inline_image(prompt: &str, subtype: &str, bytes: &[u8]) -> ProviderRequest {
    let data_base64 = to_base64(bytes);
    debug!(
        "Encoded image/{} {} bytes → {} bytes base64",
        subtype,
        bytes.len(),
        data_base64.len()
    );
    ProviderRequest::InlineImage {
        prompt: prompt.to_string(),
        mime_type: format!("image/{subtype}"),
        data_base64,
    }
}
