//! Installation key decoding from the `DigitalProductId` blob.
//!
//! The key is stored as a 120-bit unsigned integer inside a larger binary
//! blob and rendered as five groups of five characters over a 24-symbol
//! alphabet. Decoding is repeated long division by 24: the byte order of the
//! inner division loop (index 14 first, index 14 most significant) is load
//! bearing; reordering it changes every decoded digit.

use crate::error::Result;
use crate::value::{FieldValue, ValueReader};
use tracing::debug;

/// Field name carrying the encoded installation key.
pub const DIGITAL_PRODUCT_ID: &str = "DigitalProductId";

/// The 24-symbol key alphabet.
pub const KEY_ALPHABET: &[u8; 24] = b"BCDFGHJKMPQRTVWXY2346789";

/// Offset of the encoded key window inside the blob.
const KEY_OFFSET: usize = 52;

/// Length of the encoded key window.
const KEY_LENGTH: usize = 15;

/// Minimum blob length for the window to exist.
const MIN_BLOB_LENGTH: usize = 67;

/// Length of the rendered key, hyphens included.
const RENDERED_LENGTH: usize = 25 + 4;

/// Rendering of an all-zero key window, meaning the key was never set.
const UNSET_KEY_SENTINEL: &str = "BBBBB-BBBBB-BBBBB-BBBBB-BBBBB";

/// Decodes the installation key from a raw `DigitalProductId` blob.
///
/// Returns `None` when the blob is too short to contain the key window or
/// when the window decodes to the unset-key sentinel.
///
/// # Arguments
///
/// * `blob` - The full raw value of the `DigitalProductId` field
///
/// # Examples
///
/// ```rust
/// use prodkey::product_key::decode_product_key;
///
/// // Too short to contain a key window.
/// assert_eq!(decode_product_key(&[0u8; 66]), None);
///
/// // All-zero window decodes to the unset-key sentinel.
/// assert_eq!(decode_product_key(&[0u8; 67]), None);
/// ```
pub fn decode_product_key(blob: &[u8]) -> Option<String> {
    if blob.len() < MIN_BLOB_LENGTH {
        return None;
    }

    let mut window = [0u8; KEY_LENGTH];
    window.copy_from_slice(&blob[KEY_OFFSET..KEY_OFFSET + KEY_LENGTH]);

    let mut rendered = [0u8; RENDERED_LENGTH];
    let mut out = RENDERED_LENGTH;

    // 25 digits, produced least significant first and written back to front.
    // Each pass divides the 120-bit value by 24; byte 14 is most significant.
    for i in (0..25u32).rev() {
        let mut remainder: u32 = 0;
        for byte in window.iter_mut().rev() {
            remainder = (remainder << 8) | u32::from(*byte);
            *byte = (remainder / 24) as u8;
            remainder %= 24;
        }

        out -= 1;
        rendered[out] = KEY_ALPHABET[remainder as usize];

        if i % 5 == 0 && i != 0 {
            out -= 1;
            rendered[out] = b'-';
        }
    }

    // The alphabet and hyphens are ASCII, so this cannot fail.
    let key = String::from_utf8_lossy(&rendered).into_owned();

    if key == UNSET_KEY_SENTINEL {
        None
    } else {
        Some(key)
    }
}

/// Reads and decodes the installation key through a value reader.
///
/// Any reader failure or type mismatch on the field degrades to `None`.
pub fn product_key(reader: &dyn ValueReader) -> Result<Option<String>> {
    match reader.value(DIGITAL_PRODUCT_ID) {
        Ok(Some(FieldValue::Bytes(blob))) => Ok(decode_product_key(&blob)),
        Ok(_) => Ok(None),
        Err(err) => {
            debug!(field = DIGITAL_PRODUCT_ID, error = %err, "Field read failed");
            Ok(None)
        }
    }
}
