//! aill-core: wire-format codec and acoustic channel model for
//! agent-to-agent communication
//!
//! This library provides the core components of the AILL protocol:
//! - Encodes structured utterances (pragmatic act + confidence +
//!   temporal context + payload) into a compact binary wire format
//! - Decodes and validates received bytes against a namespaced,
//!   runtime-extensible codebook
//! - Simulates transport over a narrowband acoustic channel
//!   (propagation loss, modulation-dependent bit errors, FEC gain)
//! - Negotiates channel parameters through a capability handshake
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `wire`: Low-level byte primitives (varints, float16, CRC-8, cursor)
//! - `codebook`: Base opcode table, domain registry, extensions
//! - `domains`: Built-in Level-1 domain codebooks
//! - `utterance`: Decoded utterance tree and pretty-printer
//! - `encoder`: Builder-style wire encoder with scope checking
//! - `decoder`: Validating recursive-descent wire decoder
//! - `channel`: Acoustic channel model with seeded bit errors
//! - `handshake`: Capability negotiation state machine
//! - `metrics`: Observable link behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Fail fast**: Malformed builds and malformed bytes are rejected
//!   with offsets, never silently patched
//! - **Deterministic**: Seeded randomness makes runs reproducible
//! - **Observable**: Metrics and rendering for understanding behavior

pub mod channel;
pub mod codebook;
pub mod decoder;
pub mod domains;
pub mod encoder;
pub mod error;
pub mod handshake;
pub mod metrics;
pub mod utterance;
pub mod wire;

// Re-export commonly used types
pub use error::{Error, Result};
