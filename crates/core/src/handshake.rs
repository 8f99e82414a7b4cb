//! Capability handshake and parameter negotiation.
//!
//! Each session is an independent state machine driven entirely by the
//! caller: peer responses and clock readings arrive as explicit calls,
//! so a single-threaded orchestrator can run many sessions without
//! blocking.
//!
//! ```text
//! IDLE --send_probe--> PROBE_SENT --receive_capabilities-->
//! CAPABILITIES_RECEIVED --negotiate--> NEGOTIATED
//! --confirm_data_exchange--> ACTIVE
//!
//! any non-terminal state --timeout/rejection--> FAILED
//! ```
//!
//! Negotiation is min-common-denominator: conformance level and symbol
//! rate take the minimum, frame duration the maximum, domain codebooks
//! the sorted intersection. The modulation is the highest mutually
//! supported scheme the measured channel quality permits, falling back
//! to the lowest-order mutual scheme when even that exceeds the
//! quality recommendation. A session that times out or is rejected is
//! dead; retrying means opening a new session.

use std::time::{Duration, Instant};

use crate::channel::{FecRate, Modulation};
use crate::codebook::CodebookRegistry;
use crate::error::{Error, HandshakeError, Result};

/// Magic word opening every probe frame.
pub const AILL_MAGIC: u32 = 0xA111_C0DE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    ProbeSent,
    CapabilitiesReceived,
    Negotiated,
    Active,
    Failed,
}

impl HandshakeState {
    pub fn name(self) -> &'static str {
        match self {
            HandshakeState::Idle => "IDLE",
            HandshakeState::ProbeSent => "PROBE_SENT",
            HandshakeState::CapabilitiesReceived => "CAPABILITIES_RECEIVED",
            HandshakeState::Negotiated => "NEGOTIATED",
            HandshakeState::Active => "ACTIVE",
            HandshakeState::Failed => "FAILED",
        }
    }
}

/// Probe frame announcing a session to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub magic: u32,
    pub conformance_level: u8,
}

impl Probe {
    pub fn is_valid(&self) -> bool {
        self.magic == AILL_MAGIC
    }
}

/// One side's capability advertisement.
#[derive(Debug, Clone)]
pub struct AgentCapabilities {
    pub agent_id: String,
    pub conformance_level: u8,
    pub modulations: Vec<Modulation>,
    pub fec_rates: Vec<FecRate>,
    pub max_symbol_rate: u32,
    pub frame_duration_ms: u32,
    pub codebooks: Vec<u8>,
}

impl AgentCapabilities {
    /// Full-capability advertisement sharing the registry's domain
    /// codebooks.
    pub fn for_registry(agent_id: &str, registry: &CodebookRegistry) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            conformance_level: 1,
            modulations: Modulation::ALL.to_vec(),
            fec_rates: FecRate::ALL.to_vec(),
            max_symbol_rate: 400,
            frame_duration_ms: 20,
            codebooks: registry.registered_domains(),
        }
    }
}

/// Parameters both sides agreed on.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub modulation: Modulation,
    pub fec: FecRate,
    pub conformance_level: u8,
    pub symbol_rate: u32,
    pub frame_duration_ms: u32,
    pub shared_codebooks: Vec<u8>,
}

/// Handshake session state machine for the probing side.
pub struct HandshakeSession {
    local: AgentCapabilities,
    peer: Option<AgentCapabilities>,
    state: HandshakeState,
    timeout: Duration,
    started_at: Option<Instant>,
    params: Option<SessionParams>,
}

impl HandshakeSession {
    pub fn new(local: AgentCapabilities, timeout: Duration) -> Self {
        Self {
            local,
            peer: None,
            state: HandshakeState::Idle,
            timeout,
            started_at: None,
            params: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn local(&self) -> &AgentCapabilities {
        &self.local
    }

    pub fn params(&self) -> Option<&SessionParams> {
        self.params.as_ref()
    }

    /// Open the session. The timeout window starts at `now`.
    pub fn send_probe(&mut self, now: Instant) -> Result<Probe> {
        if self.state != HandshakeState::Idle {
            return Err(self.invalid("send_probe"));
        }
        self.started_at = Some(now);
        self.state = HandshakeState::ProbeSent;
        Ok(Probe {
            magic: AILL_MAGIC,
            conformance_level: self.local.conformance_level,
        })
    }

    /// Fail the session if the timeout window has closed. The deadline
    /// itself counts as expired.
    pub fn poll_timeout(&mut self, now: Instant) -> Result<()> {
        let waiting = matches!(
            self.state,
            HandshakeState::ProbeSent | HandshakeState::CapabilitiesReceived
        );
        if !waiting {
            return Ok(());
        }
        let started = match self.started_at {
            Some(started) => started,
            None => return Ok(()),
        };
        if now.duration_since(started) >= self.timeout {
            let state = self.state.name();
            self.state = HandshakeState::Failed;
            return Err(HandshakeError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
                state,
            }
            .into());
        }
        Ok(())
    }

    /// Accept the peer's capability advertisement. A response landing
    /// at or after the deadline fails the session instead.
    pub fn receive_capabilities(&mut self, peer: AgentCapabilities, now: Instant) -> Result<()> {
        if self.state != HandshakeState::ProbeSent {
            return Err(self.invalid("receive_capabilities"));
        }
        self.poll_timeout(now)?;
        self.peer = Some(peer);
        self.state = HandshakeState::CapabilitiesReceived;
        Ok(())
    }

    /// Agree on session parameters given the measured channel quality.
    pub fn negotiate(&mut self, channel_quality_db: f64) -> Result<SessionParams> {
        if self.state != HandshakeState::CapabilitiesReceived {
            return Err(self.invalid("negotiate"));
        }

        let (mutual_modulations, mutual_fec, conformance, symbol_rate, frame_duration, shared) = {
            let peer = match self.peer.as_ref() {
                Some(peer) => peer,
                None => return Err(self.invalid("negotiate")),
            };
            let local = &self.local;

            let mutual_modulations: Vec<Modulation> = Modulation::ALL
                .iter()
                .copied()
                .filter(|m| local.modulations.contains(m) && peer.modulations.contains(m))
                .collect();
            let mutual_fec: Vec<FecRate> = FecRate::ALL
                .iter()
                .copied()
                .filter(|r| local.fec_rates.contains(r) && peer.fec_rates.contains(r))
                .collect();

            let mut shared: Vec<u8> = local
                .codebooks
                .iter()
                .copied()
                .filter(|id| peer.codebooks.contains(id))
                .collect();
            shared.sort_unstable();
            shared.dedup();

            (
                mutual_modulations,
                mutual_fec,
                local.conformance_level.min(peer.conformance_level),
                local.max_symbol_rate.min(peer.max_symbol_rate),
                local.frame_duration_ms.max(peer.frame_duration_ms),
                shared,
            )
        };

        if mutual_modulations.is_empty() {
            self.state = HandshakeState::Failed;
            return Err(HandshakeError::Rejected {
                reason: "no mutually supported modulation",
            }
            .into());
        }
        if mutual_fec.is_empty() {
            self.state = HandshakeState::Failed;
            return Err(HandshakeError::Rejected {
                reason: "no mutually supported FEC rate",
            }
            .into());
        }

        let quality_cap = Modulation::for_quality(channel_quality_db);
        let modulation = mutual_modulations
            .iter()
            .rev()
            .find(|m| **m <= quality_cap)
            .copied()
            .unwrap_or(mutual_modulations[0]);
        // Most robust mutual rate; rate adaptation is out of scope
        let fec = mutual_fec[0];

        let params = SessionParams {
            modulation,
            fec,
            conformance_level: conformance,
            symbol_rate,
            frame_duration_ms: frame_duration,
            shared_codebooks: shared,
        };
        self.state = HandshakeState::Negotiated;
        self.params = Some(params.clone());
        Ok(params)
    }

    /// First successful data exchange activates the session.
    pub fn confirm_data_exchange(&mut self) -> Result<()> {
        if self.state != HandshakeState::Negotiated {
            return Err(self.invalid("confirm_data_exchange"));
        }
        self.state = HandshakeState::Active;
        Ok(())
    }

    /// Abort on an explicit peer rejection.
    pub fn reject(&mut self, reason: &'static str) -> Error {
        if !matches!(self.state, HandshakeState::Active | HandshakeState::Failed) {
            self.state = HandshakeState::Failed;
        }
        Error::Handshake(HandshakeError::Rejected { reason })
    }

    fn invalid(&self, op: &'static str) -> Error {
        Error::Handshake(HandshakeError::InvalidTransition {
            op,
            state: self.state.name(),
        })
    }
}
