//! Logo upload validation.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use super::ValidationError;

/// Required prefix of an uploaded logo.
pub const LOGO_DATA_PREFIX: &str = "data:image/";

/// Largest decoded logo accepted, in bytes (2 MiB).
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

/// Standard alphabet, padding optional. Browsers' `FileReader` always pads,
/// but hand-built data URIs often do not.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Validate a base64 logo data-URI and return its decoded size in bytes.
///
/// `limit` is the largest decoded size accepted; pass [`MAX_LOGO_BYTES`]
/// for the standard 2 MiB cap.
pub fn validate_logo(data_uri: Option<&str>, limit: usize) -> Result<usize, ValidationError> {
    let data_uri = match data_uri {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ValidationError::MissingData),
    };

    if !data_uri.starts_with(LOGO_DATA_PREFIX) {
        return Err(ValidationError::InvalidFormat);
    }

    let (_, payload) = data_uri
        .split_once(',')
        .ok_or(ValidationError::InvalidFormat)?;

    // Line-wrapped base64 (MIME style) is accepted; whitespace anywhere in
    // the payload is ignored.
    let encoded_len = payload.bytes().filter(|b| !b.is_ascii_whitespace()).count();

    // Reject on the encoded length first so an oversized upload is never
    // decoded into memory.
    let estimated = decoded_len_estimate(encoded_len);
    if estimated > limit + 2 {
        return Err(ValidationError::TooLarge {
            size: estimated,
            limit,
        });
    }

    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let size = LENIENT
        .decode(&compact)
        .map_err(|_| ValidationError::InvalidFormat)?
        .len();

    if size > limit {
        return Err(ValidationError::TooLarge { size, limit });
    }

    Ok(size)
}

/// Upper bound of the decoded size of `encoded_len` base64 characters.
fn decoded_len_estimate(encoded_len: usize) -> usize {
    encoded_len.div_ceil(4) * 3
}
