use super::error::DecodeError;
use super::layout;

/// Reverse the byte order of a hex-encoded value.
///
/// The result is lowercase; applying the swap twice returns the (lowercased)
/// input.
///
/// # Examples
/// ```
/// use pingsift_core::swap_hex_byte_order;
///
/// assert_eq!(swap_hex_byte_order("0102a0ff").unwrap(), "ffa00201");
/// ```
///
/// # Errors
/// `DecodeError::InvalidHexLength` for empty, odd or wider-than-8-byte input,
/// `DecodeError::InvalidHexDigit` for non-hex characters.
pub fn swap_hex_byte_order(hex_str: &str) -> Result<String, DecodeError> {
    let mut bytes = decode_le_field(hex_str)?;
    bytes.reverse();
    Ok(hex::encode(bytes))
}

/// Interpret a little-endian hex field as an unsigned 64-bit integer.
///
/// Shorter fields are zero-extended on the most significant side.
///
/// # Examples
/// ```
/// use pingsift_core::le_hex_to_u64;
///
/// assert_eq!(le_hex_to_u64("0100000000000000").unwrap(), 1);
/// assert_eq!(le_hex_to_u64("3412").unwrap(), 0x1234);
/// ```
pub fn le_hex_to_u64(hex_str: &str) -> Result<u64, DecodeError> {
    let bytes = decode_le_field(hex_str)?;
    let mut le = [0u8; 8];
    le[..bytes.len()].copy_from_slice(&bytes);
    Ok(u64::from_le_bytes(le))
}

fn decode_le_field(hex_str: &str) -> Result<Vec<u8>, DecodeError> {
    let length = hex_str.len();
    if length == 0 || length % layout::HEX_CHARS_PER_BYTE != 0 || length > layout::MAX_LE_HEX_LEN
    {
        return Err(DecodeError::InvalidHexLength { length });
    }
    hex::decode(hex_str).map_err(|err| DecodeError::from_hex(err, length))
}
