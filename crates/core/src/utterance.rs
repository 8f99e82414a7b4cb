//! Decoded utterance trees and their human-readable rendering.
//!
//! An [`Utterance`] is the unit both codec ends agree on: the encoder
//! serializes one, the decoder returns one, and round-tripping preserves
//! structural equality. The payload is a tree of [`Node`]s rooted under
//! exactly one pragmatic act.
//!
//! Rendering is a side-effect-free traversal for logs and demos. It
//! never fails: opcodes that do not resolve against the registry degrade
//! to `UNKNOWN(0x..)` placeholders.

use crate::codebook::{CodebookRegistry, Modality, PragmaticAct, TemporalKind};
use crate::error::Namespace;

/// One complete AILL message.
///
/// `confidence` is stored float16-quantized (the encoder quantizes at
/// build time), so a decoded utterance compares equal to the built one.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Sender confidence in [0, 1], float16 precision
    pub confidence: f32,
    /// Application priority, varint on the wire
    pub priority: u64,
    /// Reserved flag bits
    pub flags: u8,
    /// Epoch sequence number, strictly monotonic per session
    pub epoch_seq: u64,
    /// The communicative intent
    pub act: PragmaticAct,
    /// Payload tree, absent for bare acts like ACKNOWLEDGE
    pub payload: Option<Node>,
}

/// A node of the payload tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Epistemic modality wrapper. `horizon_s` is present exactly for
    /// PREDICTED (float16 seconds on the wire).
    Modality {
        kind: Modality,
        horizon_s: Option<f32>,
        inner: Box<Node>,
    },
    /// Temporal marker wrapper. `value_s` is present exactly for
    /// DURATION and ELAPSED (float16 seconds on the wire).
    Temporal {
        kind: TemporalKind,
        value_s: Option<f32>,
        inner: Box<Node>,
    },
    /// A single typed value.
    Scalar(Scalar),
    /// A bare field reference, e.g. a domain verb like NAV-1.STOP.
    Field(FieldRef),
    /// A flat list of scalars with a declared element count.
    List(Vec<Scalar>),
    /// Ordered (field-reference, payload) pairs. Insertion order is
    /// significant for the wire layout, not semantically.
    Struct(Vec<(FieldRef, Node)>),
}

/// A typed scalar value.
///
/// `F16` stores the widened f32 of a float16-quantized value, mirroring
/// how confidence is handled in META.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F16(f32),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    /// Milliseconds since the Unix epoch, signed
    Timestamp(i64),
    Null,
}

/// A reference into one of the three codebook namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// Single-byte base codebook opcode
    Base(u8),
    /// Escaped (domain, index) pair
    Domain { domain: u8, code: u8 },
    /// Escaped code in the 0xF000-0xFFFF extension range
    Extension(u16),
}

impl FieldRef {
    /// The (namespace, code) pair used for registry lookups.
    pub fn namespace_and_code(&self) -> (Namespace, u16) {
        match *self {
            FieldRef::Base(opcode) => (Namespace::Base, u16::from(opcode)),
            FieldRef::Domain { domain, code } => (Namespace::Domain(domain), u16::from(code)),
            FieldRef::Extension(code) => (Namespace::Extension, code),
        }
    }
}

/// Render a decoded utterance as an indented multi-line string.
pub fn render(utterance: &Utterance, registry: &CodebookRegistry) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} conf={:.2} pri={} seq={}",
        utterance.act.mnemonic(),
        utterance.confidence,
        utterance.priority,
        utterance.epoch_seq
    ));
    if utterance.flags != 0 {
        out.push_str(&format!(" flags=0x{:02X}", utterance.flags));
    }
    out.push('\n');

    if let Some(payload) = &utterance.payload {
        render_node(payload, registry, 1, &mut out);
    }
    out
}

fn render_node(node: &Node, registry: &CodebookRegistry, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match node {
        Node::Modality {
            kind,
            horizon_s,
            inner,
        } => {
            out.push_str(&pad);
            out.push_str(kind.mnemonic());
            if let Some(horizon) = horizon_s {
                out.push_str(&format!(" horizon={}s", horizon));
            }
            out.push('\n');
            render_node(inner, registry, indent + 1, out);
        }
        Node::Temporal {
            kind,
            value_s,
            inner,
        } => {
            out.push_str(&pad);
            out.push_str(kind.mnemonic());
            if let Some(value) = value_s {
                out.push_str(&format!(" {}s", value));
            }
            out.push('\n');
            render_node(inner, registry, indent + 1, out);
        }
        Node::Scalar(scalar) => {
            out.push_str(&pad);
            out.push_str(&format_scalar(scalar));
            out.push('\n');
        }
        Node::Field(field) => {
            out.push_str(&pad);
            out.push_str(&field_name(field, registry));
            out.push('\n');
        }
        Node::List(elements) => {
            out.push_str(&pad);
            out.push_str(&format_list(elements));
            out.push('\n');
        }
        Node::Struct(fields) => {
            out.push_str(&pad);
            out.push_str("STRUCT\n");
            for (field, value) in fields {
                let name = field_name(field, registry);
                match value {
                    Node::Scalar(scalar) => {
                        out.push_str(&format!("{}  {}: {}\n", pad, name, format_scalar(scalar)));
                    }
                    Node::List(elements) => {
                        out.push_str(&format!("{}  {}: {}\n", pad, name, format_list(elements)));
                    }
                    Node::Field(inner) => {
                        out.push_str(&format!(
                            "{}  {}: {}\n",
                            pad,
                            name,
                            field_name(inner, registry)
                        ));
                    }
                    nested => {
                        out.push_str(&format!("{}  {}:\n", pad, name));
                        render_node(nested, registry, indent + 2, out);
                    }
                }
            }
        }
    }
}

fn field_name(field: &FieldRef, registry: &CodebookRegistry) -> String {
    let (namespace, code) = field.namespace_and_code();
    registry.resolve_mnemonic(namespace, code)
}

fn format_list(elements: &[Scalar]) -> String {
    let rendered: Vec<String> = elements.iter().map(format_scalar).collect();
    format!("[{}]", rendered.join(", "))
}

fn format_scalar(scalar: &Scalar) -> String {
    match scalar {
        Scalar::I8(v) => v.to_string(),
        Scalar::I16(v) => v.to_string(),
        Scalar::I32(v) => v.to_string(),
        Scalar::I64(v) => v.to_string(),
        Scalar::U8(v) => v.to_string(),
        Scalar::U16(v) => v.to_string(),
        Scalar::U32(v) => v.to_string(),
        Scalar::U64(v) => v.to_string(),
        Scalar::F16(v) => v.to_string(),
        Scalar::F32(v) => v.to_string(),
        Scalar::F64(v) => v.to_string(),
        Scalar::Bool(v) => v.to_string(),
        Scalar::Str(v) => format!("{:?}", v),
        Scalar::Bytes(v) => {
            let hex: String = v.iter().take(8).map(|b| format!("{:02X}", b)).collect();
            if v.len() > 8 {
                format!("0x{}.. ({} bytes)", hex, v.len())
            } else {
                format!("0x{}", hex)
            }
        }
        Scalar::Timestamp(v) => format!("@{}", v),
        Scalar::Null => "NULL".to_string(),
    }
}
