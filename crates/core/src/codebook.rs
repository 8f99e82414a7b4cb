//! Base codebook taxonomy and the runtime codebook registry.
//!
//! The base codebook is a fixed 256-opcode space divided into category
//! pages by the high nibble:
//!
//! ```text
//! 0x00-0x0F  frame control      0x80-0x8F  pragmatic acts
//! 0x10-0x1F  type markers       0x90-0x9F  meta
//! 0x20-0x2F  structure          0xA0-0xBF  arithmetic
//! 0x30-0x3F  quantifiers        0xC0-0xEF  reserved
//! 0x40-0x4F  logic              0xF0-0xFF  escape
//! 0x50-0x5F  relational
//! 0x60-0x6F  temporal
//! 0x70-0x7F  epistemic modality
//! ```
//!
//! Base entries are immutable static data. The [`CodebookRegistry`] adds
//! two mutable namespaces on top: domain codebooks (16-bit codes, high
//! byte selects the domain) and runtime vocabulary extensions (16-bit
//! codes with high byte 0xF0-0xFF). The registry is shared read-mostly
//! state: lookups take a read lock, `register_domain` and `extend` take
//! the write lock. It is passed to encoders and decoders explicitly.
//!
//! # Example
//! ```
//! use aill_core::codebook::CodebookRegistry;
//! use aill_core::domains::NAV1;
//! use aill_core::error::Namespace;
//!
//! let registry = CodebookRegistry::new();
//! registry.register_domain(&NAV1).unwrap();
//!
//! let entry = registry.lookup(Namespace::Domain(0x01), 0x00).unwrap();
//! assert_eq!(entry.mnemonic, "POSITION_3D");
//! assert_eq!(registry.resolve_mnemonic(Namespace::Domain(0x01), 0x00), "NAV-1.POSITION_3D");
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domains::DomainTable;
use crate::error::{CodebookError, Namespace, Result};

/// Raw opcode constants used by the codec.
pub mod op {
    pub const TYPE_INT8: u8 = 0x10;
    pub const TYPE_INT16: u8 = 0x11;
    pub const TYPE_INT32: u8 = 0x12;
    pub const TYPE_INT64: u8 = 0x13;
    pub const TYPE_UINT8: u8 = 0x14;
    pub const TYPE_UINT16: u8 = 0x15;
    pub const TYPE_UINT32: u8 = 0x16;
    pub const TYPE_UINT64: u8 = 0x17;
    pub const TYPE_FLOAT16: u8 = 0x18;
    pub const TYPE_FLOAT32: u8 = 0x19;
    pub const TYPE_FLOAT64: u8 = 0x1A;
    pub const TYPE_BOOL: u8 = 0x1B;
    pub const TYPE_STRING: u8 = 0x1C;
    pub const TYPE_BYTES: u8 = 0x1D;
    pub const TYPE_TIMESTAMP: u8 = 0x1E;
    pub const TYPE_NULL: u8 = 0x1F;

    pub const BEGIN_STRUCT: u8 = 0x20;
    pub const END_STRUCT: u8 = 0x21;
    pub const BEGIN_LIST: u8 = 0x23;
    pub const END_LIST: u8 = 0x24;

    /// Escape into the 16-bit (domain, index) field-reference form.
    pub const ESCAPE_L1: u8 = 0xF0;
}

/// Semantic category of a base-codebook page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    FrameControl,
    TypeMarker,
    Structure,
    Quantifier,
    Logic,
    Relational,
    Temporal,
    Modality,
    Pragmatic,
    Meta,
    Arithmetic,
    Escape,
}

impl Category {
    /// Category of a base opcode, or `None` for the reserved 0xC0-0xEF range.
    pub fn of(opcode: u8) -> Option<Category> {
        match opcode >> 4 {
            0x0 => Some(Category::FrameControl),
            0x1 => Some(Category::TypeMarker),
            0x2 => Some(Category::Structure),
            0x3 => Some(Category::Quantifier),
            0x4 => Some(Category::Logic),
            0x5 => Some(Category::Relational),
            0x6 => Some(Category::Temporal),
            0x7 => Some(Category::Modality),
            0x8 => Some(Category::Pragmatic),
            0x9 => Some(Category::Meta),
            0xA | 0xB => Some(Category::Arithmetic),
            0xF => Some(Category::Escape),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::FrameControl => "frame-control",
            Category::TypeMarker => "type-marker",
            Category::Structure => "structure",
            Category::Quantifier => "quantifier",
            Category::Logic => "logic",
            Category::Relational => "relational",
            Category::Temporal => "temporal",
            Category::Modality => "modality",
            Category::Pragmatic => "pragmatic",
            Category::Meta => "meta",
            Category::Arithmetic => "arithmetic",
            Category::Escape => "escape",
        }
    }
}

/// One named entry of the base codebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseEntry {
    pub opcode: u8,
    pub mnemonic: &'static str,
}

impl BaseEntry {
    pub fn category(&self) -> Option<Category> {
        Category::of(self.opcode)
    }
}

const fn e(opcode: u8, mnemonic: &'static str) -> BaseEntry {
    BaseEntry { opcode, mnemonic }
}

/// The full base codebook, sorted by opcode. Reserved slots (including
/// the whole 0xC0-0xEF range) are absent, so lookups on them fail.
pub static BASE_CODEBOOK: &[BaseEntry] = &[
    // 0x00-0x0F frame control
    e(0x00, "START_UTTERANCE"),
    e(0x01, "END_UTTERANCE"),
    e(0x02, "ABORT"),
    e(0x03, "PAUSE"),
    e(0x04, "RESUME"),
    e(0x05, "RETRANSMIT"),
    e(0x06, "ACK_EPOCH"),
    e(0x07, "NACK_EPOCH"),
    e(0x08, "SYNC_MARK"),
    e(0x09, "FRAGMENT_START"),
    e(0x0A, "FRAGMENT_CONT"),
    e(0x0B, "FRAGMENT_END"),
    e(0x0C, "ECHO_REQUEST"),
    e(0x0D, "ECHO_REPLY"),
    // 0x10-0x1F type markers
    e(0x10, "TYPE_INT8"),
    e(0x11, "TYPE_INT16"),
    e(0x12, "TYPE_INT32"),
    e(0x13, "TYPE_INT64"),
    e(0x14, "TYPE_UINT8"),
    e(0x15, "TYPE_UINT16"),
    e(0x16, "TYPE_UINT32"),
    e(0x17, "TYPE_UINT64"),
    e(0x18, "TYPE_FLOAT16"),
    e(0x19, "TYPE_FLOAT32"),
    e(0x1A, "TYPE_FLOAT64"),
    e(0x1B, "TYPE_BOOL"),
    e(0x1C, "TYPE_STRING"),
    e(0x1D, "TYPE_BYTES"),
    e(0x1E, "TYPE_TIMESTAMP"),
    e(0x1F, "TYPE_NULL"),
    // 0x20-0x2F structure
    e(0x20, "BEGIN_STRUCT"),
    e(0x21, "END_STRUCT"),
    e(0x22, "FIELD_SEP"),
    e(0x23, "BEGIN_LIST"),
    e(0x24, "END_LIST"),
    e(0x25, "BEGIN_MAP"),
    e(0x26, "END_MAP"),
    e(0x27, "BEGIN_TUPLE"),
    e(0x28, "END_TUPLE"),
    e(0x29, "FIELD_ID"),
    e(0x2A, "BEGIN_UNION"),
    e(0x2B, "END_UNION"),
    e(0x2C, "BEGIN_OPTION"),
    e(0x2D, "END_OPTION"),
    e(0x2E, "SCHEMA_REF"),
    // 0x30-0x3F quantifiers
    e(0x30, "FORALL"),
    e(0x31, "EXISTS"),
    e(0x32, "EXISTS_UNIQUE"),
    e(0x33, "EXACTLY_N"),
    e(0x34, "AT_LEAST_N"),
    e(0x35, "AT_MOST_N"),
    e(0x36, "COUNT"),
    e(0x37, "ZERO"),
    e(0x38, "ONE"),
    e(0x39, "FEW"),
    e(0x3A, "MANY"),
    e(0x3B, "ALL"),
    e(0x3C, "NONE_Q"),
    e(0x3D, "MOST"),
    e(0x3E, "PROPORTION"),
    // 0x40-0x4F logic
    e(0x40, "AND"),
    e(0x41, "OR"),
    e(0x42, "NOT"),
    e(0x43, "XOR"),
    e(0x44, "IMPLIES"),
    e(0x45, "IFF"),
    e(0x46, "NAND"),
    e(0x47, "NOR"),
    e(0x48, "IF_THEN_ELSE"),
    e(0x49, "COALESCE"),
    e(0x4A, "IS_NULL"),
    e(0x4B, "IS_TYPE"),
    // 0x50-0x5F relational
    e(0x50, "EQ"),
    e(0x51, "NEQ"),
    e(0x52, "LT"),
    e(0x53, "GT"),
    e(0x54, "LTE"),
    e(0x55, "GTE"),
    e(0x56, "APPROX"),
    e(0x57, "CONTAINS"),
    e(0x58, "SUBSET"),
    e(0x59, "SUPERSET"),
    e(0x5A, "IN_RANGE"),
    e(0x5B, "MATCHES"),
    e(0x5C, "STARTS_WITH"),
    e(0x5D, "ENDS_WITH"),
    e(0x5E, "BETWEEN"),
    // 0x60-0x6F temporal
    e(0x60, "PAST"),
    e(0x61, "PRESENT"),
    e(0x62, "FUTURE"),
    e(0x63, "DURATION"),
    e(0x64, "T_BEFORE"),
    e(0x65, "T_AFTER"),
    e(0x66, "T_DURING"),
    e(0x67, "T_SIMULTANEOUS"),
    e(0x68, "T_STARTS"),
    e(0x69, "T_FINISHES"),
    e(0x6A, "T_OVERLAPS"),
    e(0x6B, "T_MEETS"),
    e(0x6C, "T_ELAPSED"),
    e(0x6D, "T_NOW"),
    e(0x6E, "T_DEADLINE"),
    // 0x70-0x7F epistemic modality
    e(0x70, "CERTAIN"),
    e(0x71, "PROBABLE"),
    e(0x72, "POSSIBLE"),
    e(0x73, "UNLIKELY"),
    e(0x74, "UNCERTAIN"),
    e(0x75, "HYPOTHETICAL"),
    e(0x76, "COUNTERFACTUAL"),
    e(0x77, "OBLIGATORY"),
    e(0x78, "PERMITTED"),
    e(0x79, "FORBIDDEN"),
    e(0x7A, "INFERRED"),
    e(0x7B, "OBSERVED"),
    e(0x7C, "REPORTED"),
    e(0x7D, "PREDICTED"),
    e(0x7E, "DESIRED"),
    e(0x7F, "UNDESIRED"),
    // 0x80-0x8F pragmatic acts
    e(0x80, "QUERY"),
    e(0x81, "ASSERT"),
    e(0x82, "REQUEST"),
    e(0x83, "COMMAND"),
    e(0x84, "ACKNOWLEDGE"),
    e(0x85, "REJECT"),
    e(0x86, "CLARIFY"),
    e(0x87, "CORRECT"),
    e(0x88, "PROPOSE"),
    e(0x89, "ACCEPT"),
    e(0x8A, "WARN"),
    e(0x8B, "PROMISE"),
    e(0x8C, "INFORM"),
    e(0x8D, "SUGGEST"),
    e(0x8E, "GREET"),
    e(0x8F, "FAREWELL"),
    // 0x90-0x9F meta
    e(0x90, "CONFIDENCE"),
    e(0x91, "PRIORITY"),
    e(0x92, "SOURCE_AGENT"),
    e(0x93, "DEST_AGENT"),
    e(0x94, "TIMESTAMP_META"),
    e(0x95, "SEQNUM"),
    e(0x96, "HASH_REF"),
    e(0x97, "TOPIC"),
    e(0x98, "CONTEXT_REF"),
    e(0x99, "EPOCH_BOUNDARY"),
    e(0x9A, "LABEL"),
    e(0x9B, "VERSION_TAG"),
    e(0x9C, "TRACE_ID"),
    e(0x9D, "COST"),
    e(0x9E, "TTL"),
    // 0xA0-0xBF arithmetic
    e(0xA0, "ADD"),
    e(0xA1, "SUB"),
    e(0xA2, "MUL"),
    e(0xA3, "DIV"),
    e(0xA4, "MOD"),
    e(0xA5, "POW"),
    e(0xA6, "SQRT"),
    e(0xA7, "LOG"),
    e(0xA8, "LOG10"),
    e(0xA9, "LOG2"),
    e(0xAA, "ABS"),
    e(0xAB, "NEG"),
    e(0xAC, "ROUND"),
    e(0xAD, "FLOOR"),
    e(0xAE, "CEIL"),
    e(0xAF, "TRUNC"),
    e(0xB0, "MIN"),
    e(0xB1, "MAX"),
    e(0xB2, "SUM"),
    e(0xB3, "MEAN"),
    e(0xB4, "MEDIAN"),
    e(0xB5, "STDDEV"),
    e(0xB6, "VARIANCE"),
    e(0xB7, "DOT_PRODUCT"),
    e(0xB8, "CROSS_PRODUCT"),
    e(0xB9, "NORM"),
    e(0xBA, "CLAMP"),
    e(0xBB, "LERP"),
    e(0xBC, "SIN"),
    e(0xBD, "COS"),
    e(0xBE, "ATAN2"),
    e(0xBF, "DISTANCE"),
    // 0xF0-0xFF escape
    e(0xF0, "ESCAPE_L1"),
    e(0xF1, "ESCAPE_L2"),
    e(0xF2, "ESCAPE_L3"),
    e(0xF3, "LITERAL_BYTES"),
    e(0xF4, "CODEBOOK_REF"),
    e(0xF5, "EXTENSION"),
    e(0xF6, "EXT_ACK"),
    e(0xF7, "EXT_NACK"),
    e(0xF8, "CODEBOOK_DEF"),
    e(0xF9, "CODEBOOK_ACK"),
    e(0xFA, "CODEBOOK_NACK"),
    e(0xFB, "STREAM_ID"),
    e(0xFC, "XREF"),
    e(0xFD, "COMMENT"),
    e(0xFE, "NOP"),
];

/// Look up a base codebook entry by opcode.
///
/// Returns `None` for every reserved slot, including all of 0xC0-0xEF.
pub fn base_entry(opcode: u8) -> Option<&'static BaseEntry> {
    BASE_CODEBOOK
        .binary_search_by_key(&opcode, |entry| entry.opcode)
        .ok()
        .map(|idx| &BASE_CODEBOOK[idx])
}

/// Pragmatic act page (0x80-0x8F): the communicative intent of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PragmaticAct {
    Query,
    Assert,
    Request,
    Command,
    Acknowledge,
    Reject,
    Clarify,
    Correct,
    Propose,
    Accept,
    Warn,
    Promise,
    Inform,
    Suggest,
    Greet,
    Farewell,
}

impl PragmaticAct {
    pub fn opcode(self) -> u8 {
        match self {
            PragmaticAct::Query => 0x80,
            PragmaticAct::Assert => 0x81,
            PragmaticAct::Request => 0x82,
            PragmaticAct::Command => 0x83,
            PragmaticAct::Acknowledge => 0x84,
            PragmaticAct::Reject => 0x85,
            PragmaticAct::Clarify => 0x86,
            PragmaticAct::Correct => 0x87,
            PragmaticAct::Propose => 0x88,
            PragmaticAct::Accept => 0x89,
            PragmaticAct::Warn => 0x8A,
            PragmaticAct::Promise => 0x8B,
            PragmaticAct::Inform => 0x8C,
            PragmaticAct::Suggest => 0x8D,
            PragmaticAct::Greet => 0x8E,
            PragmaticAct::Farewell => 0x8F,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<PragmaticAct> {
        match opcode {
            0x80 => Some(PragmaticAct::Query),
            0x81 => Some(PragmaticAct::Assert),
            0x82 => Some(PragmaticAct::Request),
            0x83 => Some(PragmaticAct::Command),
            0x84 => Some(PragmaticAct::Acknowledge),
            0x85 => Some(PragmaticAct::Reject),
            0x86 => Some(PragmaticAct::Clarify),
            0x87 => Some(PragmaticAct::Correct),
            0x88 => Some(PragmaticAct::Propose),
            0x89 => Some(PragmaticAct::Accept),
            0x8A => Some(PragmaticAct::Warn),
            0x8B => Some(PragmaticAct::Promise),
            0x8C => Some(PragmaticAct::Inform),
            0x8D => Some(PragmaticAct::Suggest),
            0x8E => Some(PragmaticAct::Greet),
            0x8F => Some(PragmaticAct::Farewell),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        base_entry(self.opcode()).map(|entry| entry.mnemonic).unwrap_or("?")
    }
}

/// Epistemic modality page (0x70-0x7F): confidence class of a payload,
/// independent of the numeric META confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Certain,
    Probable,
    Possible,
    Unlikely,
    Uncertain,
    Hypothetical,
    Counterfactual,
    Obligatory,
    Permitted,
    Forbidden,
    Inferred,
    Observed,
    Reported,
    Predicted,
    Desired,
    Undesired,
}

impl Modality {
    pub fn opcode(self) -> u8 {
        match self {
            Modality::Certain => 0x70,
            Modality::Probable => 0x71,
            Modality::Possible => 0x72,
            Modality::Unlikely => 0x73,
            Modality::Uncertain => 0x74,
            Modality::Hypothetical => 0x75,
            Modality::Counterfactual => 0x76,
            Modality::Obligatory => 0x77,
            Modality::Permitted => 0x78,
            Modality::Forbidden => 0x79,
            Modality::Inferred => 0x7A,
            Modality::Observed => 0x7B,
            Modality::Reported => 0x7C,
            Modality::Predicted => 0x7D,
            Modality::Desired => 0x7E,
            Modality::Undesired => 0x7F,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<Modality> {
        match opcode {
            0x70 => Some(Modality::Certain),
            0x71 => Some(Modality::Probable),
            0x72 => Some(Modality::Possible),
            0x73 => Some(Modality::Unlikely),
            0x74 => Some(Modality::Uncertain),
            0x75 => Some(Modality::Hypothetical),
            0x76 => Some(Modality::Counterfactual),
            0x77 => Some(Modality::Obligatory),
            0x78 => Some(Modality::Permitted),
            0x79 => Some(Modality::Forbidden),
            0x7A => Some(Modality::Inferred),
            0x7B => Some(Modality::Observed),
            0x7C => Some(Modality::Reported),
            0x7D => Some(Modality::Predicted),
            0x7E => Some(Modality::Desired),
            0x7F => Some(Modality::Undesired),
            _ => None,
        }
    }

    /// PREDICTED is the one modality that carries a float16 prediction
    /// horizon (seconds) on the wire, directly after the marker byte.
    pub fn carries_horizon(self) -> bool {
        matches!(self, Modality::Predicted)
    }

    pub fn mnemonic(self) -> &'static str {
        base_entry(self.opcode()).map(|entry| entry.mnemonic).unwrap_or("?")
    }
}

/// Temporal markers usable as payload tags.
///
/// Only this subset of the temporal page may open a payload node; the
/// interval-relation operators (T_BEFORE and friends) are table entries
/// but not marker positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Past,
    Present,
    Future,
    Duration,
    Elapsed,
}

impl TemporalKind {
    pub fn opcode(self) -> u8 {
        match self {
            TemporalKind::Past => 0x60,
            TemporalKind::Present => 0x61,
            TemporalKind::Future => 0x62,
            TemporalKind::Duration => 0x63,
            TemporalKind::Elapsed => 0x6C,
        }
    }

    pub fn from_opcode(opcode: u8) -> Option<TemporalKind> {
        match opcode {
            0x60 => Some(TemporalKind::Past),
            0x61 => Some(TemporalKind::Present),
            0x62 => Some(TemporalKind::Future),
            0x63 => Some(TemporalKind::Duration),
            0x6C => Some(TemporalKind::Elapsed),
            _ => None,
        }
    }

    /// DURATION and ELAPSED carry a float16 time value (seconds) on the
    /// wire, directly after the marker byte.
    pub fn carries_value(self) -> bool {
        matches!(self, TemporalKind::Duration | TemporalKind::Elapsed)
    }

    pub fn mnemonic(self) -> &'static str {
        base_entry(self.opcode()).map(|entry| entry.mnemonic).unwrap_or("?")
    }
}

/// A runtime vocabulary extension: ad-hoc named code in the 0xF000-0xFFFF
/// range, registered before first use and live for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionEntry {
    pub code: u16,
    pub mnemonic: String,
    pub type_hint: String,
}

/// A resolved codebook entry, detached from the registry lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub namespace: Namespace,
    pub code: u16,
    pub mnemonic: String,
}

#[derive(Debug, Default)]
struct RegistryInner {
    domains: HashMap<u8, &'static DomainTable>,
    extensions: HashMap<u16, ExtensionEntry>,
}

/// Shared opcode resolution for encoders and decoders.
///
/// Wraps the mutable namespaces (domain codebooks, extensions) in a
/// read/write lock; the base codebook is lock-free static data. Lookups
/// return owned [`Entry`] snapshots so no guard escapes this module.
#[derive(Debug, Default)]
pub struct CodebookRegistry {
    inner: RwLock<RegistryInner>,
}

impl CodebookRegistry {
    /// Create a registry with no domain codebooks registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in Level-1 domain codebooks
    /// (NAV-1, PERCEPT-1, DIAG-1, PLAN-1) registered.
    pub fn with_level1_domains() -> Self {
        let registry = Self::new();
        for &table in crate::domains::LEVEL1_DOMAINS {
            registry
                .register_domain(table)
                .expect("built-in domain tables do not conflict");
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a domain codebook as a unit.
    ///
    /// Re-registering an identical table is a no-op. Binding a domain id
    /// to a different table, or using a reserved id (0x00, 0xF0-0xFF),
    /// fails with `DomainConflict`.
    pub fn register_domain(&self, table: &'static DomainTable) -> Result<()> {
        if table.domain_id == 0x00 || table.domain_id >= 0xF0 {
            return Err(CodebookError::DomainConflict {
                domain_id: table.domain_id,
            }
            .into());
        }

        let mut inner = self.write();
        match inner.domains.get(&table.domain_id) {
            Some(existing) if *existing == table => Ok(()),
            Some(_) => Err(CodebookError::DomainConflict {
                domain_id: table.domain_id,
            }
            .into()),
            None => {
                inner.domains.insert(table.domain_id, table);
                Ok(())
            }
        }
    }

    /// Add a vocabulary extension in the 0xF000-0xFFFF code range.
    ///
    /// Re-registering the same code with the same mnemonic is a no-op.
    /// Codes outside the extension range, or already bound to a different
    /// mnemonic, fail with `CodeCollision`.
    pub fn extend(&self, code: u16, mnemonic: &str, type_hint: &str) -> Result<()> {
        if (code >> 8) < 0xF0 {
            return Err(CodebookError::CodeCollision { code }.into());
        }

        let mut inner = self.write();
        match inner.extensions.get(&code) {
            Some(existing) if existing.mnemonic == mnemonic => Ok(()),
            Some(_) => Err(CodebookError::CodeCollision { code }.into()),
            None => {
                inner.extensions.insert(
                    code,
                    ExtensionEntry {
                        code,
                        mnemonic: mnemonic.to_string(),
                        type_hint: type_hint.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Resolve a code in the given namespace.
    ///
    /// # Errors
    /// `CodebookError::UnknownOpcode` if the code is reserved, out of
    /// range, or simply not registered.
    pub fn lookup(&self, namespace: Namespace, code: u16) -> Result<Entry> {
        let unknown = || CodebookError::UnknownOpcode { namespace, code };

        match namespace {
            Namespace::Base => {
                if code > 0xFF {
                    return Err(unknown().into());
                }
                let entry = base_entry(code as u8).ok_or_else(unknown)?;
                Ok(Entry {
                    namespace,
                    code,
                    mnemonic: entry.mnemonic.to_string(),
                })
            }
            Namespace::Domain(domain_id) => {
                if code > 0xFF {
                    return Err(unknown().into());
                }
                let inner = self.read();
                let table = inner.domains.get(&domain_id).ok_or_else(unknown)?;
                let entry = table.entry(code as u8).ok_or_else(unknown)?;
                Ok(Entry {
                    namespace,
                    code,
                    mnemonic: entry.mnemonic.to_string(),
                })
            }
            Namespace::Extension => {
                let inner = self.read();
                let entry = inner.extensions.get(&code).ok_or_else(unknown)?;
                Ok(Entry {
                    namespace,
                    code,
                    mnemonic: entry.mnemonic.clone(),
                })
            }
        }
    }

    /// Check whether a code resolves in the given namespace.
    pub fn contains(&self, namespace: Namespace, code: u16) -> bool {
        self.lookup(namespace, code).is_ok()
    }

    /// Resolve a code to a display name, never failing.
    ///
    /// Domain entries come back qualified (`NAV-1.POSITION_3D`); anything
    /// unresolvable degrades to an `UNKNOWN(0x..)` placeholder.
    pub fn resolve_mnemonic(&self, namespace: Namespace, code: u16) -> String {
        match namespace {
            Namespace::Base => match base_entry((code & 0xFF) as u8) {
                Some(entry) if code <= 0xFF => entry.mnemonic.to_string(),
                _ => format!("UNKNOWN(0x{:02X})", code),
            },
            Namespace::Domain(domain_id) => {
                let inner = self.read();
                match inner.domains.get(&domain_id) {
                    Some(table) => match table.entry((code & 0xFF) as u8) {
                        Some(entry) if code <= 0xFF => {
                            format!("{}.{}", table.name, entry.mnemonic)
                        }
                        _ => format!("{}.UNKNOWN(0x{:02X})", table.name, code),
                    },
                    None => format!("UNKNOWN(0x{:02X}{:02X})", domain_id, code & 0xFF),
                }
            }
            Namespace::Extension => {
                let inner = self.read();
                match inner.extensions.get(&code) {
                    Some(entry) => entry.mnemonic.clone(),
                    None => format!("UNKNOWN(0x{:04X})", code),
                }
            }
        }
    }

    /// Sorted ids of the currently registered domain codebooks.
    ///
    /// This is what a handshake advertises as the local codebook set.
    pub fn registered_domains(&self) -> Vec<u8> {
        let inner = self.read();
        let mut ids: Vec<u8> = inner.domains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{DomainEntry, DomainTable, NAV1};
    use crate::error::{CodebookError, Error};

    #[test]
    fn test_base_codebook_sorted_and_unique() {
        for window in BASE_CODEBOOK.windows(2) {
            assert!(
                window[0].opcode < window[1].opcode,
                "table out of order at 0x{:02X}",
                window[1].opcode
            );
        }
    }

    #[test]
    fn test_base_codebook_has_no_reserved_entries() {
        for entry in BASE_CODEBOOK {
            assert!(
                entry.category().is_some(),
                "0x{:02X} sits in the reserved range",
                entry.opcode
            );
        }
        for opcode in 0xC0..=0xEF {
            assert!(base_entry(opcode).is_none());
        }
    }

    #[test]
    fn test_base_entry_lookup() {
        assert_eq!(base_entry(0x81).map(|e| e.mnemonic), Some("ASSERT"));
        assert_eq!(base_entry(0x20).map(|e| e.mnemonic), Some("BEGIN_STRUCT"));
        assert_eq!(base_entry(0x7B).map(|e| e.mnemonic), Some("OBSERVED"));
        assert_eq!(base_entry(0xBF).map(|e| e.mnemonic), Some("DISTANCE"));
        // Per-page reserved slots are absent too
        assert!(base_entry(0x0E).is_none());
        assert!(base_entry(0x4C).is_none());
        assert!(base_entry(0xFF).is_none());
    }

    #[test]
    fn test_category_pages() {
        assert_eq!(Category::of(0x00), Some(Category::FrameControl));
        assert_eq!(Category::of(0x1C), Some(Category::TypeMarker));
        assert_eq!(Category::of(0x3A), Some(Category::Quantifier));
        assert_eq!(Category::of(0xA5), Some(Category::Arithmetic));
        assert_eq!(Category::of(0xB2), Some(Category::Arithmetic));
        assert_eq!(Category::of(0xC0), None);
        assert_eq!(Category::of(0xEF), None);
        assert_eq!(Category::of(0xF0), Some(Category::Escape));
    }

    #[test]
    fn test_pragmatic_act_opcode_round_trip() {
        for opcode in 0x80..=0x8F {
            let act = PragmaticAct::from_opcode(opcode).unwrap();
            assert_eq!(act.opcode(), opcode);
        }
        assert!(PragmaticAct::from_opcode(0x7F).is_none());
        assert!(PragmaticAct::from_opcode(0x90).is_none());
    }

    #[test]
    fn test_modality_opcode_round_trip() {
        for opcode in 0x70..=0x7F {
            let modality = Modality::from_opcode(opcode).unwrap();
            assert_eq!(modality.opcode(), opcode);
        }
        assert!(Modality::Predicted.carries_horizon());
        assert!(!Modality::Observed.carries_horizon());
    }

    #[test]
    fn test_temporal_kind_subset() {
        assert_eq!(TemporalKind::from_opcode(0x60), Some(TemporalKind::Past));
        assert_eq!(TemporalKind::from_opcode(0x6C), Some(TemporalKind::Elapsed));
        // Interval relations are not marker positions
        assert!(TemporalKind::from_opcode(0x64).is_none());
        assert!(TemporalKind::from_opcode(0x6D).is_none());
        assert!(TemporalKind::Duration.carries_value());
        assert!(!TemporalKind::Future.carries_value());
    }

    #[test]
    fn test_base_lookup_reserved_fails() {
        let registry = CodebookRegistry::new();
        let result = registry.lookup(Namespace::Base, 0xC5);
        assert!(matches!(
            result,
            Err(Error::Codebook(CodebookError::UnknownOpcode { .. }))
        ));
    }

    #[test]
    fn test_domain_registration_idempotent() {
        let registry = CodebookRegistry::new();
        registry.register_domain(&NAV1).unwrap();
        registry.register_domain(&NAV1).unwrap();
        assert!(registry.contains(Namespace::Domain(0x01), 0x00));
    }

    static NAV1_IMPOSTOR: DomainTable = DomainTable {
        domain_id: 0x01,
        name: "NAV-1",
        description: "Not the shipped table",
        entries: &[DomainEntry {
            code: 0x00,
            mnemonic: "SOMETHING_ELSE",
            value_type: "FLOAT32",
            unit: "",
            description: "conflicting table",
        }],
    };

    #[test]
    fn test_domain_registration_conflict() {
        let registry = CodebookRegistry::new();
        registry.register_domain(&NAV1).unwrap();

        let result = registry.register_domain(&NAV1_IMPOSTOR);
        assert!(matches!(
            result,
            Err(Error::Codebook(CodebookError::DomainConflict { domain_id: 0x01 }))
        ));
    }

    static RESERVED_ID_TABLE: DomainTable = DomainTable {
        domain_id: 0xF0,
        name: "BAD",
        description: "Sits in the reserved id range",
        entries: &[],
    };

    #[test]
    fn test_domain_reserved_id_rejected() {
        let registry = CodebookRegistry::new();
        let result = registry.register_domain(&RESERVED_ID_TABLE);
        assert!(matches!(
            result,
            Err(Error::Codebook(CodebookError::DomainConflict { domain_id: 0xF0 }))
        ));
    }

    #[test]
    fn test_level1_registry() {
        let registry = CodebookRegistry::with_level1_domains();
        assert_eq!(registry.registered_domains(), vec![0x01, 0x02, 0x05, 0x06]);
        assert!(registry.contains(Namespace::Domain(0x05), 0x00));
    }

    #[test]
    fn test_extend_and_lookup() {
        let registry = CodebookRegistry::new();
        registry.extend(0xF001, "SWARM_ROLE", "UINT8").unwrap();

        let entry = registry.lookup(Namespace::Extension, 0xF001).unwrap();
        assert_eq!(entry.mnemonic, "SWARM_ROLE");

        // Same code, same mnemonic: no-op
        registry.extend(0xF001, "SWARM_ROLE", "UINT8").unwrap();
    }

    #[test]
    fn test_extend_outside_range_fails() {
        let registry = CodebookRegistry::new();
        let result = registry.extend(0x1234, "NOPE", "UINT8");
        assert!(matches!(
            result,
            Err(Error::Codebook(CodebookError::CodeCollision { code: 0x1234 }))
        ));
    }

    #[test]
    fn test_extend_conflicting_mnemonic_fails() {
        let registry = CodebookRegistry::new();
        registry.extend(0xF001, "SWARM_ROLE", "UINT8").unwrap();

        let result = registry.extend(0xF001, "OTHER_NAME", "UINT8");
        assert!(matches!(
            result,
            Err(Error::Codebook(CodebookError::CodeCollision { code: 0xF001 }))
        ));
    }

    #[test]
    fn test_resolve_mnemonic_qualified() {
        let registry = CodebookRegistry::with_level1_domains();
        assert_eq!(
            registry.resolve_mnemonic(Namespace::Domain(0x01), 0x00),
            "NAV-1.POSITION_3D"
        );
        assert_eq!(registry.resolve_mnemonic(Namespace::Base, 0x81), "ASSERT");
    }

    #[test]
    fn test_resolve_mnemonic_degrades() {
        let registry = CodebookRegistry::with_level1_domains();
        assert_eq!(registry.resolve_mnemonic(Namespace::Base, 0xC5), "UNKNOWN(0xC5)");
        assert_eq!(
            registry.resolve_mnemonic(Namespace::Domain(0x01), 0xEE),
            "NAV-1.UNKNOWN(0xEE)"
        );
        assert_eq!(
            registry.resolve_mnemonic(Namespace::Domain(0x77), 0x00),
            "UNKNOWN(0x7700)"
        );
        assert_eq!(
            registry.resolve_mnemonic(Namespace::Extension, 0xFABC),
            "UNKNOWN(0xFABC)"
        );
    }
}
