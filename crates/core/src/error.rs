//! Error types for the AILL codec and channel model.
//!
//! All operations return structured errors rather than panicking.
//! Decoder errors carry the byte offset where parsing failed so corrupted
//! or malformed input can be diagnosed without re-parsing.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Codebook: registry lookup and mutation failures
/// - Encode: builder misuse detected before any wire bytes are produced
/// - Decode: structural parse failures with byte offsets
/// - Integrity: CRC-8 mismatch on a received epoch
/// - Handshake: session negotiation failures
#[derive(Debug, Error)]
pub enum Error {
    /// Codebook registry error (unknown opcode, registration conflict)
    #[error("codebook error: {0}")]
    Codebook(#[from] CodebookError),

    /// Encoder builder misuse (e.g., closing a scope that was never opened)
    #[error("malformed build: {0}")]
    Encode(#[from] EncodeError),

    /// Decoder parse error (e.g., unknown marker, truncated input)
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// CRC-8 validation failed, indicating a corrupted epoch
    #[error("integrity error: CRC-8 mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Integrity { expected: u8, actual: u8 },

    /// Handshake negotiation failure (timeout, rejection, misuse)
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
}

/// Codebook registry errors.
#[derive(Debug, Error)]
pub enum CodebookError {
    /// Opcode not present in any registered table for the namespace
    #[error("unknown opcode {code:#06x} in {namespace} namespace")]
    UnknownOpcode { namespace: Namespace, code: u16 },

    /// Field reference used by the encoder does not resolve
    #[error("unknown field {code:#06x} in {namespace} namespace")]
    UnknownField { namespace: Namespace, code: u16 },

    /// Domain id already bound to a different table, or id is reserved
    #[error("domain {domain_id:#04x} conflicts with an existing or reserved registration")]
    DomainConflict { domain_id: u8 },

    /// Extension code falls inside a reserved range or is already bound
    #[error("extension code {code:#06x} collides with a reserved range or existing entry")]
    CodeCollision { code: u16 },
}

/// Opcode namespace, used in error context and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The fixed 8-bit base codebook
    Base,
    /// A Level-1 domain codebook identified by its registry id
    Domain(u8),
    /// The runtime vocabulary extension range
    Extension,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Base => write!(f, "base"),
            Namespace::Domain(id) => write!(f, "domain {id:#04x}"),
            Namespace::Extension => write!(f, "extension"),
        }
    }
}

/// Encoder builder misuse. None of these produce wire output.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A value or marker was pushed with no utterance open
    #[error("no utterance in progress")]
    NoUtterance,

    /// begin_utterance called while a previous build is unfinished
    #[error("utterance already in progress")]
    UtteranceInProgress,

    /// The body must contain exactly one top-level pragmatic act
    #[error("pragmatic act already set for this utterance")]
    ActAlreadySet,

    /// finish called before any pragmatic act was pushed
    #[error("utterance has no pragmatic act")]
    MissingAct,

    /// A close operation did not match the innermost open scope
    #[error("cannot close {attempted}: innermost open scope is {open}")]
    ScopeMismatch {
        attempted: &'static str,
        open: &'static str,
    },

    /// finish called while struct or list scopes remain open
    #[error("{count} scope(s) still open at finish")]
    UnclosedScopes { count: usize },

    /// List closed with a different element count than declared
    #[error("list declared {declared} elements but {written} were appended")]
    ListCountMismatch { declared: usize, written: usize },

    /// A struct value was appended without a preceding field reference
    #[error("value inside struct requires a preceding field reference")]
    ValueWithoutField,

    /// A field reference was immediately followed by another field reference
    #[error("field reference has no value")]
    FieldWithoutValue,

    /// PREDICTED modality requires an explicit horizon value
    #[error("PREDICTED modality requires a horizon; use predicted()")]
    PredictedNeedsHorizon,

    /// DURATION and ELAPSED temporal markers require a time value
    #[error("{kind} temporal marker requires a time value")]
    TemporalNeedsValue { kind: &'static str },

    /// Nesting depth exceeds the configured cap
    #[error("nesting depth {depth} exceeds limit {limit}")]
    DepthExceeded { depth: usize, limit: usize },
}

/// Decoder parse errors. Every variant carries the byte offset at which
/// the failure was detected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Byte at `offset` is not a valid marker in this position
    #[error("unknown marker {byte:#04x} at offset {offset}")]
    UnknownMarker { offset: usize, byte: u8 },

    /// Begin/end markers do not balance
    #[error("unbalanced structure at offset {offset}: unexpected {byte:#04x}")]
    UnbalancedStructure { offset: usize, byte: u8 },

    /// Input ended before a complete construct could be read
    #[error("unexpected end of input at offset {offset}: need {needed} more byte(s)")]
    UnexpectedEndOfInput { offset: usize, needed: usize },

    /// Varint continuation bytes exceed the u64 range
    #[error("varint at offset {offset} overflows 64 bits")]
    VarintOverflow { offset: usize },

    /// BODY length prefix disagrees with the bytes actually consumed
    #[error("body length mismatch at offset {offset}: declared {declared}, consumed {consumed}")]
    BodyLengthMismatch {
        offset: usize,
        declared: usize,
        consumed: usize,
    },

    /// Bytes remain after the complete utterance
    #[error("{remaining} trailing byte(s) after utterance at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    /// String payload is not valid UTF-8
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// Nesting depth exceeds the configured cap
    #[error("nesting depth {depth} at offset {offset} exceeds limit {limit}")]
    DepthExceeded {
        offset: usize,
        depth: usize,
        limit: usize,
    },
}

/// Handshake session errors.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// No capability response arrived within the configured window
    #[error("handshake timed out after {timeout_ms} ms in {state} state")]
    Timeout { timeout_ms: u64, state: &'static str },

    /// Peer (or negotiation) explicitly rejected the session
    #[error("handshake rejected: {reason}")]
    Rejected { reason: &'static str },

    /// Session API called in a state that does not permit the operation
    #[error("{op} not valid in {state} state")]
    InvalidTransition {
        op: &'static str,
        state: &'static str,
    },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
