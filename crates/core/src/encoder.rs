//! Wire encoder: builds utterances and serializes them to bytes.
//!
//! The encoder is an explicit state machine driven by builder calls that
//! mirror the tree grammar. Misuse (closing an unopened scope, a second
//! pragmatic act, finishing with scopes open) fails with an
//! `EncodeError` and never produces wire output.
//!
//! # Wire Layout
//!
//! ```text
//! +------------------+-----------------+----------+
//! | confidence (f16) | priority varint | flags u8 |   META
//! +------------------+-----------------+----------+
//! | len varint | act u8 | payload bytes ...       |   BODY
//! +------------+--------+-------------------------+
//! | epoch-seq varint | crc-8                      |   footer
//! +------------------+----------------------------+
//! ```
//!
//! The BODY length prefix covers the act byte and the payload. The CRC-8
//! is computed over every preceding byte. Field references use either
//! the compact single-byte base form (struct field position only) or the
//! escaped form `ESCAPE_L1 (hi, lo)`, where the pair's high byte selects
//! the namespace: 0x00 base, 0x01-0xEF domain, 0xF0-0xFF extension.
//!
//! Confidence is clamped to [0, 1] and quantized to float16 precision at
//! build time, so a decoded utterance compares equal to the built one.

use crate::codebook::{op, CodebookRegistry, Modality, PragmaticAct, TemporalKind};
use crate::error::{CodebookError, EncodeError, Error, Result};
use crate::utterance::{FieldRef, Node, Scalar, Utterance};
use crate::wire;

/// Default cap on payload nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Stateful utterance builder borrowing a shared codebook registry.
///
/// One utterance is built at a time: `begin_utterance` through `finish`.
/// Field opcodes are validated against the registry at build time.
pub struct Encoder<'a> {
    registry: &'a CodebookRegistry,
    max_depth: usize,
    build: Option<Build>,
}

/// In-progress utterance state.
struct Build {
    confidence: f32,
    priority: u64,
    flags: u8,
    act: Option<PragmaticAct>,
    /// Payload bytes following the act byte
    body: Vec<u8>,
    /// Open scopes, innermost last. Index 0 is always the utterance root.
    scopes: Vec<Scope>,
}

enum Scope {
    /// Top-level payload position; holds at most one node
    Root { filled: bool },
    /// Modality or temporal marker awaiting exactly one inner node
    Wrapper,
    Struct { awaiting_value: bool },
    List { declared: usize, written: usize },
}

impl Scope {
    fn name(&self) -> &'static str {
        match self {
            Scope::Root { .. } => "UTTERANCE",
            Scope::Wrapper => "WRAPPER",
            Scope::Struct { .. } => "STRUCT",
            Scope::List { .. } => "LIST",
        }
    }
}

impl<'a> Encoder<'a> {
    pub fn new(registry: &'a CodebookRegistry) -> Self {
        Self::with_max_depth(registry, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(registry: &'a CodebookRegistry, max_depth: usize) -> Self {
        Self {
            registry,
            max_depth,
            build: None,
        }
    }

    /// Open a new utterance with its META header values.
    pub fn begin_utterance(&mut self, confidence: f32, priority: u64, flags: u8) -> Result<()> {
        if self.build.is_some() {
            return Err(EncodeError::UtteranceInProgress.into());
        }
        self.build = Some(Build {
            confidence: wire::quantize_f16(confidence.clamp(0.0, 1.0)),
            priority,
            flags,
            act: None,
            body: Vec::new(),
            scopes: vec![Scope::Root { filled: false }],
        });
        Ok(())
    }

    /// Discard any in-progress build.
    pub fn abort(&mut self) {
        self.build = None;
    }

    /// Set the pragmatic act. Exactly one per utterance.
    pub fn act(&mut self, act: PragmaticAct) -> Result<()> {
        let build = self.build_mut()?;
        if build.act.is_some() {
            return Err(EncodeError::ActAlreadySet.into());
        }
        build.act = Some(act);
        Ok(())
    }

    /// Push an epistemic modality wrapper around the next node.
    ///
    /// PREDICTED carries a horizon and must go through [`predicted`](Self::predicted).
    pub fn modality(&mut self, modality: Modality) -> Result<()> {
        if modality.carries_horizon() {
            return Err(EncodeError::PredictedNeedsHorizon.into());
        }
        self.open_wrapper("MODALITY", modality.opcode(), None)
    }

    /// Push a PREDICTED modality with its prediction horizon in seconds.
    pub fn predicted(&mut self, horizon_s: f32) -> Result<()> {
        self.open_wrapper("MODALITY", Modality::Predicted.opcode(), Some(horizon_s))
    }

    /// Push a plain temporal marker (PAST, PRESENT, FUTURE) around the
    /// next node.
    pub fn temporal(&mut self, kind: TemporalKind) -> Result<()> {
        if kind.carries_value() {
            return Err(EncodeError::TemporalNeedsValue {
                kind: kind.mnemonic(),
            }
            .into());
        }
        self.open_wrapper("TEMPORAL", kind.opcode(), None)
    }

    /// Push a DURATION marker with its time value in seconds.
    pub fn duration_s(&mut self, seconds: f32) -> Result<()> {
        self.open_wrapper("TEMPORAL", TemporalKind::Duration.opcode(), Some(seconds))
    }

    /// Push an ELAPSED marker with its time value in seconds.
    pub fn elapsed_s(&mut self, seconds: f32) -> Result<()> {
        self.open_wrapper("TEMPORAL", TemporalKind::Elapsed.opcode(), Some(seconds))
    }

    fn open_wrapper(&mut self, what: &'static str, opcode: u8, value: Option<f32>) -> Result<()> {
        let max_depth = self.max_depth;
        let build = self.build_mut()?;
        build.require_act()?;
        build.check_value_start(what, true)?;
        build.check_depth(max_depth)?;
        build.body.push(opcode);
        if let Some(value) = value {
            wire::write_f16(&mut build.body, value);
        }
        build.scopes.push(Scope::Wrapper);
        Ok(())
    }

    /// Open a struct. Follow with (field, value) pairs, then `end_struct`.
    pub fn begin_struct(&mut self) -> Result<()> {
        let max_depth = self.max_depth;
        let build = self.build_mut()?;
        build.require_act()?;
        build.check_value_start("STRUCT", true)?;
        build.check_depth(max_depth)?;
        build.body.push(op::BEGIN_STRUCT);
        build.scopes.push(Scope::Struct {
            awaiting_value: false,
        });
        Ok(())
    }

    pub fn end_struct(&mut self) -> Result<()> {
        let build = self.build_mut()?;
        match build.scopes.last() {
            Some(Scope::Struct { awaiting_value: true }) => {
                Err(EncodeError::FieldWithoutValue.into())
            }
            Some(Scope::Struct { .. }) => {
                build.scopes.pop();
                build.body.push(op::END_STRUCT);
                build.note_value_complete();
                Ok(())
            }
            other => Err(EncodeError::ScopeMismatch {
                attempted: "END_STRUCT",
                open: scope_name(other),
            }
            .into()),
        }
    }

    /// Open a list with a declared element count. Lists hold scalars only.
    pub fn begin_list(&mut self, count: usize) -> Result<()> {
        let max_depth = self.max_depth;
        let build = self.build_mut()?;
        build.require_act()?;
        build.check_value_start("LIST", true)?;
        build.check_depth(max_depth)?;
        build.body.push(op::BEGIN_LIST);
        wire::write_varint(&mut build.body, count as u64);
        build.scopes.push(Scope::List {
            declared: count,
            written: 0,
        });
        Ok(())
    }

    pub fn end_list(&mut self) -> Result<()> {
        let build = self.build_mut()?;
        match build.scopes.last() {
            Some(Scope::List { declared, written }) => {
                if written != declared {
                    return Err(EncodeError::ListCountMismatch {
                        declared: *declared,
                        written: *written,
                    }
                    .into());
                }
                build.scopes.pop();
                build.body.push(op::END_LIST);
                build.note_value_complete();
                Ok(())
            }
            other => Err(EncodeError::ScopeMismatch {
                attempted: "END_LIST",
                open: scope_name(other),
            }
            .into()),
        }
    }

    /// Name the next struct field by base codebook opcode.
    pub fn field(&mut self, opcode: u8) -> Result<()> {
        self.struct_field(FieldRef::Base(opcode))
    }

    /// Name the next struct field by (domain, index) pair.
    pub fn domain_field(&mut self, domain: u8, code: u8) -> Result<()> {
        self.struct_field(FieldRef::Domain { domain, code })
    }

    /// Name the next struct field by extension code (0xF000-0xFFFF).
    pub fn extension_field(&mut self, code: u16) -> Result<()> {
        self.struct_field(FieldRef::Extension(code))
    }

    fn struct_field(&mut self, field: FieldRef) -> Result<()> {
        let registry = self.registry;
        let build = self.build_mut()?;
        build.require_act()?;
        match build.scopes.last() {
            Some(Scope::Struct { awaiting_value: false }) => {}
            Some(Scope::Struct { awaiting_value: true }) => {
                return Err(EncodeError::FieldWithoutValue.into());
            }
            other => {
                return Err(EncodeError::ScopeMismatch {
                    attempted: "FIELD_REF",
                    open: scope_name(other),
                }
                .into());
            }
        }

        let (namespace, code) = field.namespace_and_code();
        if !registry.contains(namespace, code) {
            return Err(CodebookError::UnknownField { namespace, code }.into());
        }

        match field {
            // END_STRUCT and ESCAPE_L1 read as framing in field position,
            // so those two names go out in the escaped (0x00, opcode) form
            FieldRef::Base(opcode) if opcode == op::END_STRUCT || opcode == op::ESCAPE_L1 => {
                build.body.push(op::ESCAPE_L1);
                build.body.push(0x00);
                build.body.push(opcode);
            }
            FieldRef::Base(opcode) => build.body.push(opcode),
            FieldRef::Domain { domain, code } => {
                build.body.push(op::ESCAPE_L1);
                build.body.push(domain);
                build.body.push(code);
            }
            FieldRef::Extension(code) => {
                build.body.push(op::ESCAPE_L1);
                build.body.push((code >> 8) as u8);
                build.body.push(code as u8);
            }
        }

        if let Some(Scope::Struct { awaiting_value }) = build.scopes.last_mut() {
            *awaiting_value = true;
        }
        Ok(())
    }

    /// Append a scalar value at the current position.
    pub fn value(&mut self, scalar: Scalar) -> Result<()> {
        let build = self.build_mut()?;
        build.require_act()?;
        build.check_value_start("VALUE", false)?;
        build.write_scalar(&scalar);
        build.note_value_complete();
        Ok(())
    }

    /// Append a standalone field reference as a value, e.g. a domain verb
    /// like NAV-1.STOP. Always encoded in the escaped form.
    pub fn value_ref(&mut self, field: FieldRef) -> Result<()> {
        let registry = self.registry;
        let build = self.build_mut()?;
        build.require_act()?;
        build.check_value_start("FIELD_REF", true)?;

        let (namespace, code) = field.namespace_and_code();
        if !registry.contains(namespace, code) {
            return Err(CodebookError::UnknownField { namespace, code }.into());
        }

        let (hi, lo) = match field {
            FieldRef::Base(opcode) => (0x00, opcode),
            FieldRef::Domain { domain, code } => (domain, code),
            FieldRef::Extension(code) => ((code >> 8) as u8, code as u8),
        };
        build.body.push(op::ESCAPE_L1);
        build.body.push(hi);
        build.body.push(lo);
        build.note_value_complete();
        Ok(())
    }

    /// Close the utterance: assemble META, the BODY length prefix, the
    /// epoch sequence number, and the CRC-8, returning the wire buffer.
    ///
    /// On failure the build is preserved so the caller can close the
    /// offending scopes and finish again.
    pub fn finish(&mut self, epoch_seq: u64) -> Result<Vec<u8>> {
        let build = match self.build.take() {
            Some(build) => build,
            None => return Err(EncodeError::NoUtterance.into()),
        };

        let act = match build.act {
            Some(act) => act,
            None => {
                self.build = Some(build);
                return Err(EncodeError::MissingAct.into());
            }
        };
        if build.scopes.len() > 1 {
            let count = build.scopes.len() - 1;
            self.build = Some(build);
            return Err(EncodeError::UnclosedScopes { count }.into());
        }

        let mut out = Vec::with_capacity(build.body.len() + 16);
        wire::write_f16(&mut out, build.confidence);
        wire::write_varint(&mut out, build.priority);
        out.push(build.flags);
        wire::write_varint(&mut out, (build.body.len() + 1) as u64);
        out.push(act.opcode());
        out.extend_from_slice(&build.body);
        wire::write_varint(&mut out, epoch_seq);
        out.push(wire::crc8(&out));
        Ok(out)
    }

    /// Serialize a complete utterance tree in one call.
    ///
    /// Drives the builder internally, so tree invariants are checked the
    /// same way as incremental building. Any in-progress partial state is
    /// discarded on failure.
    pub fn encode_utterance(&mut self, utterance: &Utterance) -> Result<Vec<u8>> {
        let result = self.encode_utterance_inner(utterance);
        if result.is_err() {
            self.abort();
        }
        result
    }

    fn encode_utterance_inner(&mut self, utterance: &Utterance) -> Result<Vec<u8>> {
        self.begin_utterance(utterance.confidence, utterance.priority, utterance.flags)?;
        self.act(utterance.act)?;
        if let Some(payload) = &utterance.payload {
            self.push_node(payload)?;
        }
        self.finish(utterance.epoch_seq)
    }

    fn push_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Modality {
                kind,
                horizon_s,
                inner,
            } => {
                if kind.carries_horizon() {
                    match horizon_s {
                        Some(horizon) => self.predicted(*horizon)?,
                        None => return Err(EncodeError::PredictedNeedsHorizon.into()),
                    }
                } else {
                    self.modality(*kind)?;
                }
                self.push_node(inner)
            }
            Node::Temporal {
                kind,
                value_s,
                inner,
            } => {
                if kind.carries_value() {
                    let seconds = match value_s {
                        Some(seconds) => *seconds,
                        None => {
                            return Err(EncodeError::TemporalNeedsValue {
                                kind: kind.mnemonic(),
                            }
                            .into());
                        }
                    };
                    if *kind == TemporalKind::Duration {
                        self.duration_s(seconds)?;
                    } else {
                        self.elapsed_s(seconds)?;
                    }
                } else {
                    self.temporal(*kind)?;
                }
                self.push_node(inner)
            }
            Node::Scalar(scalar) => self.value(scalar.clone()),
            Node::Field(field) => self.value_ref(*field),
            Node::List(elements) => {
                self.begin_list(elements.len())?;
                for element in elements {
                    self.value(element.clone())?;
                }
                self.end_list()
            }
            Node::Struct(fields) => {
                self.begin_struct()?;
                for (field, value) in fields {
                    self.struct_field(*field)?;
                    self.push_node(value)?;
                }
                self.end_struct()
            }
        }
    }

    fn build_mut(&mut self) -> Result<&mut Build> {
        match self.build.as_mut() {
            Some(build) => Ok(build),
            None => Err(Error::Encode(EncodeError::NoUtterance)),
        }
    }
}

fn scope_name(scope: Option<&Scope>) -> &'static str {
    scope.map(Scope::name).unwrap_or("UTTERANCE")
}

impl Build {
    fn require_act(&self) -> Result<()> {
        if self.act.is_none() {
            return Err(EncodeError::MissingAct.into());
        }
        Ok(())
    }

    /// Check whether a value may start at the current position.
    /// `composite` marks node kinds that cannot appear as list elements.
    fn check_value_start(&self, what: &'static str, composite: bool) -> Result<()> {
        match self.scopes.last() {
            Some(Scope::Root { filled: true }) => Err(EncodeError::ScopeMismatch {
                attempted: what,
                open: "UTTERANCE",
            }
            .into()),
            Some(Scope::Root { .. }) | Some(Scope::Wrapper) => Ok(()),
            Some(Scope::Struct { awaiting_value: false }) => {
                Err(EncodeError::ValueWithoutField.into())
            }
            Some(Scope::Struct { .. }) => Ok(()),
            Some(Scope::List { .. }) if composite => Err(EncodeError::ScopeMismatch {
                attempted: what,
                open: "LIST",
            }
            .into()),
            Some(Scope::List { declared, written }) => {
                if written >= declared {
                    Err(EncodeError::ListCountMismatch {
                        declared: *declared,
                        written: *written + 1,
                    }
                    .into())
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    fn check_depth(&self, max_depth: usize) -> Result<()> {
        // scopes.len() is the nesting depth the new scope would sit at
        // (the root does not count, the new scope does)
        if self.scopes.len() > max_depth {
            return Err(EncodeError::DepthExceeded {
                depth: self.scopes.len(),
                limit: max_depth,
            }
            .into());
        }
        Ok(())
    }

    /// Mark one node complete, popping any wrapper scopes it fills.
    fn note_value_complete(&mut self) {
        loop {
            if matches!(self.scopes.last(), Some(Scope::Wrapper)) {
                self.scopes.pop();
                continue;
            }
            match self.scopes.last_mut() {
                Some(Scope::Root { filled }) => *filled = true,
                Some(Scope::Struct { awaiting_value }) => *awaiting_value = false,
                Some(Scope::List { written, .. }) => *written += 1,
                _ => {}
            }
            return;
        }
    }

    fn write_scalar(&mut self, scalar: &Scalar) {
        let body = &mut self.body;
        match scalar {
            Scalar::I8(v) => {
                body.push(op::TYPE_INT8);
                body.push(*v as u8);
            }
            Scalar::I16(v) => {
                body.push(op::TYPE_INT16);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::I32(v) => {
                body.push(op::TYPE_INT32);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::I64(v) => {
                body.push(op::TYPE_INT64);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::U8(v) => {
                body.push(op::TYPE_UINT8);
                body.push(*v);
            }
            Scalar::U16(v) => {
                body.push(op::TYPE_UINT16);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::U32(v) => {
                body.push(op::TYPE_UINT32);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::U64(v) => {
                body.push(op::TYPE_UINT64);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::F16(v) => {
                body.push(op::TYPE_FLOAT16);
                wire::write_f16(body, *v);
            }
            Scalar::F32(v) => {
                body.push(op::TYPE_FLOAT32);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::F64(v) => {
                body.push(op::TYPE_FLOAT64);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::Bool(v) => {
                body.push(op::TYPE_BOOL);
                body.push(u8::from(*v));
            }
            Scalar::Str(v) => {
                body.push(op::TYPE_STRING);
                wire::write_varint(body, v.len() as u64);
                body.extend_from_slice(v.as_bytes());
            }
            Scalar::Bytes(v) => {
                body.push(op::TYPE_BYTES);
                wire::write_varint(body, v.len() as u64);
                body.extend_from_slice(v);
            }
            Scalar::Timestamp(v) => {
                body.push(op::TYPE_TIMESTAMP);
                body.extend_from_slice(&v.to_be_bytes());
            }
            Scalar::Null => body.push(op::TYPE_NULL),
        }
    }
}
