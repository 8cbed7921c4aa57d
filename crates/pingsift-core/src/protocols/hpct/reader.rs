use std::ops::Range;

use super::error::DecodeError;
use super::layout;

/// Fixed-width field access over the probe header slice of a frame's hex.
pub struct HeaderReader<'a> {
    header: &'a str,
}

impl<'a> HeaderReader<'a> {
    /// Locate the header `header_offset` bytes into the frame.
    ///
    /// # Errors
    /// Returns `DecodeError::TruncatedHeader` when the frame ends before the
    /// header does.
    pub fn locate(frame_hex: &'a str, header_offset: usize) -> Result<Self, DecodeError> {
        let needed = header_offset
            .checked_mul(layout::HEX_CHARS_PER_BYTE)
            .and_then(|start| start.checked_add(layout::HEADER_HEX_LEN))
            .unwrap_or(usize::MAX);
        let start = needed.saturating_sub(layout::HEADER_HEX_LEN);
        let header = frame_hex
            .get(start..needed)
            .ok_or(DecodeError::TruncatedHeader {
                needed,
                actual: frame_hex.len(),
            })?;
        Ok(Self { header })
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a str, DecodeError> {
        self.header
            .get(range.clone())
            .ok_or(DecodeError::TruncatedHeader {
                needed: range.end,
                actual: self.header.len(),
            })
    }

    pub fn read_bytes<const N: usize>(&self, range: Range<usize>) -> Result<[u8; N], DecodeError> {
        let digits = self.read_slice(range)?;
        let mut out = [0u8; N];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|err| DecodeError::from_hex(err, digits.len()))?;
        Ok(out)
    }

    pub fn read_u8(&self, range: Range<usize>) -> Result<u8, DecodeError> {
        let [value] = self.read_bytes::<1>(range)?;
        Ok(value)
    }

    pub fn read_u16_be(&self, range: Range<usize>) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_bytes(range)?))
    }

    pub fn read_u32_be(&self, range: Range<usize>) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_bytes(range)?))
    }
}
