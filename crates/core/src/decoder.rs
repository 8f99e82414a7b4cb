//! Wire decoder: single-pass validating parse of utterance bytes.
//!
//! Decoding is recursive descent over an explicit cursor with no
//! backtracking. The CRC-8 footer is verified over the whole frame
//! before any parsing starts, so a corrupted epoch never yields a
//! partial tree. Every parse error carries the absolute byte offset at
//! which it was detected.
//!
//! At each position the next byte must come from a closed marker set
//! for that position (act page, value markers, struct field position,
//! list element position). Unknown markers, unbalanced begin/end pairs,
//! and truncated input are distinct failures. Field opcodes are
//! resolved against the registry as they are read; unknown fields are
//! never skipped.

use crate::codebook::{op, CodebookRegistry, Modality, PragmaticAct, TemporalKind};
use crate::encoder::DEFAULT_MAX_DEPTH;
use crate::error::{DecodeError, Error, Result};
use crate::utterance::{FieldRef, Node, Scalar, Utterance};
use crate::wire::{self, Cursor};

/// Validating parser borrowing a shared codebook registry.
pub struct Decoder<'a> {
    registry: &'a CodebookRegistry,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a CodebookRegistry) -> Self {
        Self::with_max_depth(registry, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(registry: &'a CodebookRegistry, max_depth: usize) -> Self {
        Self {
            registry,
            max_depth,
        }
    }

    /// Parse one complete utterance from a byte buffer.
    ///
    /// # Errors
    /// - `Error::Integrity` if the recomputed CRC-8 disagrees with the
    ///   transmitted footer byte (checked before anything else)
    /// - `DecodeError` variants for structural failures, each carrying
    ///   the byte offset
    pub fn decode(&self, buf: &[u8]) -> Result<Utterance> {
        let (crc_byte, frame) = match buf.split_last() {
            Some(split) => split,
            None => {
                return Err(DecodeError::UnexpectedEndOfInput {
                    offset: 0,
                    needed: 1,
                }
                .into());
            }
        };
        let expected = wire::crc8(frame);
        if expected != *crc_byte {
            return Err(Error::Integrity {
                expected,
                actual: *crc_byte,
            });
        }

        let mut cur = Cursor::new(frame);
        let confidence = cur.read_f16()?;
        let priority = cur.read_varint()?;
        let flags = cur.read_u8()?;

        let body_len = cur.read_varint()? as usize;
        let body_start = cur.position();
        let body_bytes = cur.read_exact(body_len)?;
        let mut body = Cursor::with_base(body_bytes, body_start);

        let act_byte = body.read_u8()?;
        let act = match PragmaticAct::from_opcode(act_byte) {
            Some(act) => act,
            None => {
                return Err(DecodeError::UnknownMarker {
                    offset: body_start,
                    byte: act_byte,
                }
                .into());
            }
        };

        let payload = if body.is_empty() {
            None
        } else {
            Some(self.parse_node(&mut body, 0)?)
        };

        if !body.is_empty() {
            return Err(DecodeError::BodyLengthMismatch {
                offset: body.position(),
                declared: body_len,
                consumed: body_len - body.remaining(),
            }
            .into());
        }

        let epoch_seq = cur.read_varint()?;
        if !cur.is_empty() {
            return Err(DecodeError::TrailingBytes {
                offset: cur.position(),
                remaining: cur.remaining(),
            }
            .into());
        }

        Ok(Utterance {
            confidence,
            priority,
            flags,
            epoch_seq,
            act,
            payload,
        })
    }

    /// Parse one payload node. `depth` counts enclosing composite nodes
    /// (wrappers, structs, lists), matching the encoder's scope cap.
    fn parse_node(&self, cur: &mut Cursor<'_>, depth: usize) -> Result<Node> {
        let offset = cur.position();
        let marker = cur.read_u8()?;

        match marker {
            op::TYPE_INT8..=op::TYPE_NULL => {
                Ok(Node::Scalar(self.parse_scalar(marker, offset, cur)?))
            }
            op::BEGIN_STRUCT => {
                let depth = self.deepen(depth, offset)?;
                self.parse_struct(cur, depth)
            }
            op::BEGIN_LIST => {
                self.deepen(depth, offset)?;
                self.parse_list(cur)
            }
            op::END_STRUCT | op::END_LIST => Err(DecodeError::UnbalancedStructure {
                offset,
                byte: marker,
            }
            .into()),
            0x60..=0x6F => match TemporalKind::from_opcode(marker) {
                Some(kind) => {
                    let depth = self.deepen(depth, offset)?;
                    let value_s = if kind.carries_value() {
                        Some(cur.read_f16()?)
                    } else {
                        None
                    };
                    let inner = self.parse_node(cur, depth)?;
                    Ok(Node::Temporal {
                        kind,
                        value_s,
                        inner: Box::new(inner),
                    })
                }
                None => Err(DecodeError::UnknownMarker {
                    offset,
                    byte: marker,
                }
                .into()),
            },
            0x70..=0x7F => {
                // The whole modality page is valid in marker position
                let kind = match Modality::from_opcode(marker) {
                    Some(kind) => kind,
                    None => {
                        return Err(DecodeError::UnknownMarker {
                            offset,
                            byte: marker,
                        }
                        .into());
                    }
                };
                let depth = self.deepen(depth, offset)?;
                let horizon_s = if kind.carries_horizon() {
                    Some(cur.read_f16()?)
                } else {
                    None
                };
                let inner = self.parse_node(cur, depth)?;
                Ok(Node::Modality {
                    kind,
                    horizon_s,
                    inner: Box::new(inner),
                })
            }
            op::ESCAPE_L1 => {
                let field = self.read_escaped_ref(cur)?;
                Ok(Node::Field(field))
            }
            _ => Err(DecodeError::UnknownMarker {
                offset,
                byte: marker,
            }
            .into()),
        }
    }

    fn deepen(&self, depth: usize, offset: usize) -> Result<usize> {
        let next = depth + 1;
        if next > self.max_depth {
            return Err(DecodeError::DepthExceeded {
                offset,
                depth: next,
                limit: self.max_depth,
            }
            .into());
        }
        Ok(next)
    }

    fn parse_struct(&self, cur: &mut Cursor<'_>, depth: usize) -> Result<Node> {
        let mut fields = Vec::new();
        loop {
            let byte = cur.read_u8()?;
            let field = match byte {
                op::END_STRUCT => return Ok(Node::Struct(fields)),
                op::ESCAPE_L1 => self.read_escaped_ref(cur)?,
                opcode => {
                    let field = FieldRef::Base(opcode);
                    self.resolve(field)?;
                    field
                }
            };
            let value = self.parse_node(cur, depth)?;
            fields.push((field, value));
        }
    }

    fn parse_list(&self, cur: &mut Cursor<'_>) -> Result<Node> {
        let count = cur.read_varint()? as usize;
        let mut elements = Vec::with_capacity(count.min(256));

        for _ in 0..count {
            let offset = cur.position();
            let marker = cur.read_u8()?;
            if !(op::TYPE_INT8..=op::TYPE_NULL).contains(&marker) {
                // A premature END_LIST means the declared count was wrong
                return Err(if marker == op::END_LIST {
                    DecodeError::UnbalancedStructure {
                        offset,
                        byte: marker,
                    }
                } else {
                    DecodeError::UnknownMarker {
                        offset,
                        byte: marker,
                    }
                }
                .into());
            }
            elements.push(self.parse_scalar(marker, offset, cur)?);
        }

        let offset = cur.position();
        let end = cur.read_u8()?;
        if end != op::END_LIST {
            return Err(DecodeError::UnbalancedStructure { offset, byte: end }.into());
        }
        Ok(Node::List(elements))
    }

    /// Read the 2-byte pair following an ESCAPE_L1 and resolve it. The
    /// pair's high byte selects the namespace: 0x00 base, 0x01-0xEF
    /// domain, 0xF0-0xFF extension.
    fn read_escaped_ref(&self, cur: &mut Cursor<'_>) -> Result<FieldRef> {
        let hi = cur.read_u8()?;
        let lo = cur.read_u8()?;
        let field = match hi {
            0x00 => FieldRef::Base(lo),
            0x01..=0xEF => FieldRef::Domain {
                domain: hi,
                code: lo,
            },
            _ => FieldRef::Extension(u16::from_be_bytes([hi, lo])),
        };
        self.resolve(field)?;
        Ok(field)
    }

    fn resolve(&self, field: FieldRef) -> Result<()> {
        let (namespace, code) = field.namespace_and_code();
        self.registry.lookup(namespace, code)?;
        Ok(())
    }

    fn parse_scalar(&self, marker: u8, offset: usize, cur: &mut Cursor<'_>) -> Result<Scalar> {
        let scalar = match marker {
            op::TYPE_INT8 => Scalar::I8(cur.read_u8()? as i8),
            op::TYPE_INT16 => Scalar::I16(i16::from_be_bytes(cur.read_array::<2>()?)),
            op::TYPE_INT32 => Scalar::I32(i32::from_be_bytes(cur.read_array::<4>()?)),
            op::TYPE_INT64 => Scalar::I64(i64::from_be_bytes(cur.read_array::<8>()?)),
            op::TYPE_UINT8 => Scalar::U8(cur.read_u8()?),
            op::TYPE_UINT16 => Scalar::U16(u16::from_be_bytes(cur.read_array::<2>()?)),
            op::TYPE_UINT32 => Scalar::U32(u32::from_be_bytes(cur.read_array::<4>()?)),
            op::TYPE_UINT64 => Scalar::U64(u64::from_be_bytes(cur.read_array::<8>()?)),
            op::TYPE_FLOAT16 => Scalar::F16(cur.read_f16()?),
            op::TYPE_FLOAT32 => Scalar::F32(cur.read_f32()?),
            op::TYPE_FLOAT64 => Scalar::F64(cur.read_f64()?),
            op::TYPE_BOOL => Scalar::Bool(cur.read_u8()? != 0),
            op::TYPE_STRING => {
                let len = cur.read_varint()? as usize;
                let str_offset = cur.position();
                let bytes = cur.read_exact(len)?;
                match std::str::from_utf8(bytes) {
                    Ok(text) => Scalar::Str(text.to_string()),
                    Err(_) => {
                        return Err(DecodeError::InvalidUtf8 { offset: str_offset }.into());
                    }
                }
            }
            op::TYPE_BYTES => {
                let len = cur.read_varint()? as usize;
                Scalar::Bytes(cur.read_exact(len)?.to_vec())
            }
            op::TYPE_TIMESTAMP => Scalar::Timestamp(i64::from_be_bytes(cur.read_array::<8>()?)),
            op::TYPE_NULL => Scalar::Null,
            _ => {
                return Err(DecodeError::UnknownMarker {
                    offset,
                    byte: marker,
                }
                .into());
            }
        };
        Ok(scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    fn registry() -> CodebookRegistry {
        CodebookRegistry::with_level1_domains()
    }

    /// Hand-assemble a frame around the given act and post-act body bytes.
    fn frame(act: u8, body_after_act: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        wire::write_f16(&mut buf, 1.0);
        wire::write_varint(&mut buf, 0);
        buf.push(0);
        wire::write_varint(&mut buf, (body_after_act.len() + 1) as u64);
        buf.push(act);
        buf.extend_from_slice(body_after_act);
        wire::write_varint(&mut buf, 0);
        buf.push(wire::crc8(&buf));
        buf
    }

    #[test]
    fn test_round_trip_minimal() {
        let registry = registry();
        let mut enc = Encoder::new(&registry);
        enc.begin_utterance(0.75, 2, 0x01).unwrap();
        enc.act(PragmaticAct::Greet).unwrap();
        let buf = enc.finish(11).unwrap();

        let decoded = Decoder::new(&registry).decode(&buf).unwrap();
        assert_eq!(decoded.act, PragmaticAct::Greet);
        assert_eq!(decoded.confidence, 0.75);
        assert_eq!(decoded.priority, 2);
        assert_eq!(decoded.flags, 0x01);
        assert_eq!(decoded.epoch_seq, 11);
        assert_eq!(decoded.payload, None);
    }

    #[test]
    fn test_corrupted_byte_fails_integrity() {
        let registry = registry();
        let mut buf = frame(PragmaticAct::Assert.opcode(), &[op::TYPE_NULL]);
        buf[5] ^= 0x10;

        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(result, Err(Error::Integrity { .. })));
    }

    #[test]
    fn test_empty_buffer() {
        let registry = registry();
        let result = Decoder::new(&registry).decode(&[]);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnexpectedEndOfInput {
                offset: 0,
                needed: 1
            }))
        ));
    }

    #[test]
    fn test_truncated_body_with_valid_crc() {
        let registry = registry();
        let full = frame(
            PragmaticAct::Assert.opcode(),
            &[op::TYPE_STRING, 0x05, b'h', b'e', b'l', b'l', b'o'],
        );
        // Keep META plus a few body bytes, then re-seal with a valid CRC
        let mut cut = full[..8].to_vec();
        cut.push(wire::crc8(&cut));

        let result = Decoder::new(&registry).decode(&cut);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnexpectedEndOfInput { .. }))
        ));
    }

    #[test]
    fn test_unknown_act_byte() {
        let registry = registry();
        let buf = frame(0x42, &[]);
        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnknownMarker {
                offset: 5,
                byte: 0x42
            }))
        ));
    }

    #[test]
    fn test_unknown_marker_in_value_position() {
        let registry = registry();
        // 0xC5 sits in the reserved range
        let buf = frame(PragmaticAct::Assert.opcode(), &[0xC5]);
        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnknownMarker {
                offset: 6,
                byte: 0xC5
            }))
        ));
    }

    #[test]
    fn test_end_marker_in_value_position() {
        let registry = registry();
        let buf = frame(PragmaticAct::Assert.opcode(), &[op::END_LIST]);
        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnbalancedStructure {
                byte: 0x24,
                ..
            }))
        ));
    }

    #[test]
    fn test_list_count_disagrees_with_elements() {
        let registry = registry();
        // Declares 2 elements but closes after 1
        let buf = frame(
            PragmaticAct::Assert.opcode(),
            &[op::BEGIN_LIST, 2, op::TYPE_UINT8, 7, op::END_LIST],
        );
        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::UnbalancedStructure { .. }))
        ));
    }

    #[test]
    fn test_body_length_mismatch() {
        let registry = registry();
        // Body declares one byte more than the payload tree consumes
        let buf = frame(
            PragmaticAct::Assert.opcode(),
            &[op::TYPE_NULL, op::TYPE_NULL],
        );
        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::BodyLengthMismatch {
                declared: 3,
                consumed: 2,
                ..
            }))
        ));
    }

    #[test]
    fn test_trailing_bytes_after_utterance() {
        let registry = registry();
        let mut enc = Encoder::new(&registry);
        enc.begin_utterance(1.0, 0, 0).unwrap();
        enc.act(PragmaticAct::Acknowledge).unwrap();
        let clean = enc.finish(0).unwrap();

        // Splice an extra byte between the sequence number and the CRC
        let mut padded = clean[..clean.len() - 1].to_vec();
        padded.push(0xAA);
        padded.push(wire::crc8(&padded));

        let result = Decoder::new(&registry).decode(&padded);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::TrailingBytes {
                remaining: 1,
                ..
            }))
        ));
    }

    #[test]
    fn test_unregistered_domain_field_fails() {
        let empty = CodebookRegistry::new();
        let loaded = registry();

        let mut enc = Encoder::new(&loaded);
        enc.begin_utterance(0.9, 1, 0).unwrap();
        enc.act(PragmaticAct::Assert).unwrap();
        enc.begin_struct().unwrap();
        enc.domain_field(0x01, 0x02).unwrap();
        enc.value(Scalar::F32(0.5)).unwrap();
        enc.end_struct().unwrap();
        let buf = enc.finish(0).unwrap();

        let result = Decoder::new(&empty).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Codebook(
                crate::error::CodebookError::UnknownOpcode { .. }
            ))
        ));
    }

    #[test]
    fn test_framing_opcode_fields_round_trip() {
        let registry = registry();

        let mut enc = Encoder::new(&registry);
        enc.begin_utterance(0.5, 1, 0).unwrap();
        enc.act(PragmaticAct::Assert).unwrap();
        enc.begin_struct().unwrap();
        enc.field(op::END_STRUCT).unwrap();
        enc.value(Scalar::U8(7)).unwrap();
        enc.field(op::ESCAPE_L1).unwrap();
        enc.value(Scalar::Bool(true)).unwrap();
        enc.end_struct().unwrap();
        let buf = enc.finish(3).unwrap();

        let decoded = Decoder::new(&registry).decode(&buf).unwrap();
        assert_eq!(
            decoded.payload,
            Some(Node::Struct(vec![
                (FieldRef::Base(op::END_STRUCT), Node::Scalar(Scalar::U8(7))),
                (FieldRef::Base(op::ESCAPE_L1), Node::Scalar(Scalar::Bool(true))),
            ]))
        );
    }

    #[test]
    fn test_invalid_utf8_string() {
        let registry = registry();
        let buf = frame(
            PragmaticAct::Inform.opcode(),
            &[op::TYPE_STRING, 2, 0xFF, 0xFE],
        );
        let result = Decoder::new(&registry).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::InvalidUtf8 { offset: 8 }))
        ));
    }

    #[test]
    fn test_depth_cap_on_decode() {
        let registry = registry();
        let mut enc = Encoder::with_max_depth(&registry, 8);
        enc.begin_utterance(0.5, 0, 0).unwrap();
        enc.act(PragmaticAct::Assert).unwrap();
        enc.begin_struct().unwrap();
        enc.field(0x97).unwrap();
        enc.begin_struct().unwrap();
        enc.field(0x97).unwrap();
        enc.begin_struct().unwrap();
        enc.end_struct().unwrap();
        enc.end_struct().unwrap();
        enc.end_struct().unwrap();
        let buf = enc.finish(0).unwrap();

        // A shallow decoder rejects what a deep encoder produced
        let result = Decoder::with_max_depth(&registry, 2).decode(&buf);
        assert!(matches!(
            result,
            Err(Error::Decode(DecodeError::DepthExceeded {
                depth: 3,
                limit: 2,
                ..
            }))
        ));

        // The default depth accepts it
        assert!(Decoder::new(&registry).decode(&buf).is_ok());
    }

    #[test]
    fn test_standalone_domain_verb() {
        let registry = registry();
        let mut enc = Encoder::new(&registry);
        enc.begin_utterance(0.99, 7, 0).unwrap();
        enc.act(PragmaticAct::Command).unwrap();
        enc.value_ref(FieldRef::Domain {
            domain: 0x01,
            code: 0x93,
        })
        .unwrap();
        let buf = enc.finish(4).unwrap();

        let decoded = Decoder::new(&registry).decode(&buf).unwrap();
        assert_eq!(decoded.act, PragmaticAct::Command);
        assert_eq!(
            decoded.payload,
            Some(Node::Field(FieldRef::Domain {
                domain: 0x01,
                code: 0x93
            }))
        );
    }

    #[test]
    fn test_escaped_base_ref_round_trip() {
        let registry = registry();
        let mut enc = Encoder::new(&registry);
        enc.begin_utterance(0.5, 0, 0).unwrap();
        enc.act(PragmaticAct::Query).unwrap();
        enc.value_ref(FieldRef::Base(0x9D)).unwrap();
        let buf = enc.finish(0).unwrap();

        let decoded = Decoder::new(&registry).decode(&buf).unwrap();
        assert_eq!(decoded.payload, Some(Node::Field(FieldRef::Base(0x9D))));
    }
}
