//! Byte-level wire primitives shared by the encoder and decoder.
//!
//! This module provides the low-level building blocks of the AILL wire
//! format: variable-length integers, IEEE-754 binary16 conversion, the
//! CRC-8 integrity checksum, and a cursor for offset-tracked reads.
//!
//! # Varint Encoding
//!
//! Unsigned values are encoded in 7-bit groups, least-significant group
//! first, with the high bit of each byte acting as a continuation flag.
//! The encoder always emits the minimal number of groups.
//!
//! # Endianness
//!
//! All fixed-width scalar payloads (integers, floats, timestamps) are
//! big-endian on the wire.
//!
//! # Example
//! ```
//! use aill_core::wire::{write_varint, Cursor};
//!
//! let mut buf = Vec::new();
//! write_varint(&mut buf, 300);
//! assert_eq!(buf, vec![0xAC, 0x02]);
//!
//! let mut cursor = Cursor::new(&buf);
//! assert_eq!(cursor.read_varint().unwrap(), 300);
//! ```

use crate::error::{DecodeError, Result};
use half::f16;

/// CRC-8/CCITT lookup table (polynomial 0x07, init 0x00).
const CRC8_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x07;
            } else {
                crc <<= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Compute the CRC-8/CCITT checksum over a byte slice.
///
/// This is the epoch integrity check: the encoder appends it as the final
/// byte of each utterance, computed over every preceding byte.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0x00;
    for &byte in data {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }
    crc
}

/// Append a varint-encoded unsigned value to a buffer.
///
/// Emits the minimal encoding: 7-bit groups, least-significant first,
/// continuation flag in the high bit of every byte but the last.
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let group = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            buf.push(group | 0x80);
        } else {
            buf.push(group);
            return;
        }
    }
}

/// Number of bytes the varint encoding of `value` occupies.
pub fn varint_len(value: u64) -> usize {
    let mut len = 1;
    let mut v = value >> 7;
    while v != 0 {
        len += 1;
        v >>= 7;
    }
    len
}

/// Append a float16 (IEEE-754 binary16) value to a buffer, big-endian.
///
/// The input is narrowed with round-to-nearest; callers that need exact
/// round-trips should pass values already representable in binary16
/// (see [`quantize_f16`]).
pub fn write_f16(buf: &mut Vec<u8>, value: f32) {
    buf.extend_from_slice(&f16::from_f32(value).to_be_bytes());
}

/// Round a value through binary16 precision.
///
/// Used wherever a float is stored in a node tree but transmitted as
/// float16, so that structural equality holds across a round-trip.
pub fn quantize_f16(value: f32) -> f32 {
    f16::from_f32(value).to_f32()
}

/// Read-only cursor over a byte buffer with explicit position tracking.
///
/// Every read that would run past the end fails with
/// `DecodeError::UnexpectedEndOfInput` carrying the current offset and
/// the shortfall, so parse failures are diagnosable without re-parsing.
///
/// A cursor over a sub-slice of a larger frame can carry a base offset
/// so reported positions stay absolute within the frame.
///
/// # Invariants
/// - `pos` never exceeds `data.len()`
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// Source data
    data: &'a [u8],
    /// Current byte offset within `data`
    pos: usize,
    /// Offset of `data[0]` within the enclosing frame
    base: usize,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the start of the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// Create a cursor over a sub-slice whose first byte sits at `base`
    /// in the enclosing frame.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Current byte offset, including any base offset.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Check whether all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::UnexpectedEndOfInput {
                offset: self.position(),
                needed: 1,
            }
            .into());
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        if self.pos >= self.data.len() {
            return Err(DecodeError::UnexpectedEndOfInput {
                offset: self.position(),
                needed: 1,
            }
            .into());
        }
        Ok(self.data[self.pos])
    }

    /// Read exactly `count` bytes as a slice.
    pub fn read_exact(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(DecodeError::UnexpectedEndOfInput {
                offset: self.position(),
                needed: count - self.remaining(),
            }
            .into());
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes: [u8; N] = self.read_exact(N)?.try_into().unwrap();
        Ok(bytes)
    }

    /// Read a varint-encoded unsigned value.
    ///
    /// # Errors
    /// - `DecodeError::UnexpectedEndOfInput` if a continuation byte is missing
    /// - `DecodeError::VarintOverflow` if the value exceeds 64 bits
    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.position();
        let mut value = 0u64;
        let mut shift = 0u32;

        loop {
            let byte = self.read_u8()?;

            if shift >= 64 || (shift == 63 && byte > 1) {
                return Err(DecodeError::VarintOverflow { offset: start }.into());
            }

            value |= u64::from(byte & 0x7F) << shift;

            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a big-endian float16 and widen it to f32.
    pub fn read_f16(&mut self) -> Result<f32> {
        let bytes = self.read_array::<2>()?;
        Ok(f16::from_be_bytes(bytes).to_f32())
    }

    /// Read a big-endian f32.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_array::<4>()?))
    }

    /// Read a big-endian f64.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.read_array::<8>()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_crc8_empty() {
        assert_eq!(crc8(b""), 0x00);
    }

    #[test]
    fn test_crc8_check_vector() {
        // Standard CRC-8/CCITT check value
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn test_crc8_detects_single_bit_flip() {
        let data = b"the quick brown fox";
        let original = crc8(data);

        for byte_idx in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data.to_vec();
                corrupted[byte_idx] ^= 1 << bit;
                assert_ne!(
                    crc8(&corrupted),
                    original,
                    "flip of bit {} in byte {} went undetected",
                    bit,
                    byte_idx
                );
            }
        }
    }

    #[test]
    fn test_varint_single_byte() {
        for value in [0u64, 1, 42, 127] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(buf.len(), 1);
            assert_eq!(Cursor::new(&buf).read_varint().unwrap(), value);
        }
    }

    #[test]
    fn test_varint_known_encodings() {
        let cases: &[(u64, &[u8])] = &[
            (0, &[0x00]),
            (127, &[0x7F]),
            (128, &[0x80, 0x01]),
            (300, &[0xAC, 0x02]),
            (16384, &[0x80, 0x80, 0x01]),
            (u64::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
        ];

        for (value, expected) in cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, *value);
            assert_eq!(&buf, expected, "encoding of {}", value);
            assert_eq!(Cursor::new(&buf).read_varint().unwrap(), *value);
        }
    }

    #[test]
    fn test_varint_minimality() {
        // Each value must occupy exactly ceil(bits/7) bytes
        for shift in 0..64u32 {
            let value = 1u64 << shift;
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            let expected_len = (shift as usize / 7) + 1;
            assert_eq!(buf.len(), expected_len, "length for 1<<{}", shift);
            assert_eq!(varint_len(value), expected_len);
        }
    }

    #[test]
    fn test_varint_round_trip_boundaries() {
        for value in [
            0u64,
            127,
            128,
            16383,
            16384,
            u32::MAX as u64,
            u64::MAX - 1,
            u64::MAX,
        ] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(Cursor::new(&buf).read_varint().unwrap(), value);
        }
    }

    #[test]
    fn test_varint_truncated() {
        // Continuation flag set but no following byte
        let buf = [0x80u8];
        let result = Cursor::new(&buf).read_varint();
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnexpectedEndOfInput { .. }))
        ));
    }

    #[test]
    fn test_varint_overflow() {
        // Eleven continuation groups cannot fit in 64 bits
        let buf = [0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let result = Cursor::new(&buf).read_varint();
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::VarintOverflow { offset: 0 }))
        ));
    }

    #[test]
    fn test_f16_round_trip() {
        for value in [0.0f32, 1.0, -1.0, 0.5, 1.5708, 100.0] {
            let quantized = quantize_f16(value);
            let mut buf = Vec::new();
            write_f16(&mut buf, quantized);
            assert_eq!(buf.len(), 2);
            assert_eq!(Cursor::new(&buf).read_f16().unwrap(), quantized);
        }
    }

    #[test]
    fn test_f16_big_endian() {
        // 1.0 in binary16 is 0x3C00
        let mut buf = Vec::new();
        write_f16(&mut buf, 1.0);
        assert_eq!(buf, vec![0x3C, 0x00]);
    }

    #[test]
    fn test_cursor_read_past_end() {
        let data = [0x01u8, 0x02];
        let mut cursor = Cursor::new(&data);
        cursor.read_u8().unwrap();
        cursor.read_u8().unwrap();

        let result = cursor.read_u8();
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnexpectedEndOfInput {
                offset: 2,
                needed: 1
            }))
        ));
    }

    #[test]
    fn test_cursor_read_exact_shortfall() {
        let data = [0x01u8, 0x02, 0x03];
        let mut cursor = Cursor::new(&data);
        cursor.read_u8().unwrap();

        let result = cursor.read_exact(5);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnexpectedEndOfInput {
                offset: 1,
                needed: 3
            }))
        ));
    }

    #[test]
    fn test_cursor_position_tracking() {
        let data = [0xAAu8; 10];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.remaining(), 10);

        cursor.read_exact(4).unwrap();
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.remaining(), 6);

        cursor.read_u8().unwrap();
        assert_eq!(cursor.position(), 5);
        assert!(!cursor.is_empty());

        cursor.read_exact(5).unwrap();
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_cursor_with_base_reports_absolute_offsets() {
        let data = [0x10u8, 0x20];
        let mut cursor = Cursor::with_base(&data, 100);
        assert_eq!(cursor.position(), 100);
        cursor.read_exact(2).unwrap();
        assert_eq!(cursor.position(), 102);

        let result = cursor.read_u8();
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnexpectedEndOfInput {
                offset: 102,
                needed: 1
            }))
        ));
    }

    #[test]
    fn test_cursor_peek_does_not_advance() {
        let data = [0x42u8];
        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.peek_u8().unwrap(), 0x42);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u8().unwrap(), 0x42);
    }
}
