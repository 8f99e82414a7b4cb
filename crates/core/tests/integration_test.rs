//! Integration tests for the full AILL pipeline.
//!
//! These tests verify end-to-end behavior: handshake -> encode ->
//! acoustic channel -> decode -> render, with metrics tracking the
//! outcome of each exchange.

use std::time::{Duration, Instant};

use aill_core::channel::{AcousticChannel, ChannelConfig, FecRate, Modulation};
use aill_core::codebook::{CodebookRegistry, Modality, PragmaticAct};
use aill_core::decoder::Decoder;
use aill_core::encoder::Encoder;
use aill_core::error::Error;
use aill_core::handshake::{AgentCapabilities, HandshakeSession, HandshakeState};
use aill_core::metrics::LinkMetrics;
use aill_core::utterance::{render, FieldRef, Scalar};

fn encode_telemetry(
    registry: &CodebookRegistry,
    x: f32,
    heading: f32,
    epoch_seq: u64,
) -> Vec<u8> {
    let mut enc = Encoder::new(registry);
    enc.begin_utterance(0.93, 5, 0).expect("begin failed");
    enc.act(PragmaticAct::Assert).unwrap();
    enc.modality(Modality::Observed).unwrap();
    enc.begin_struct().unwrap();
    enc.domain_field(0x01, 0x00).unwrap();
    enc.begin_list(3).unwrap();
    enc.value(Scalar::F32(x)).unwrap();
    enc.value(Scalar::F32(-3.8)).unwrap();
    enc.value(Scalar::F32(2.1)).unwrap();
    enc.end_list().unwrap();
    enc.domain_field(0x01, 0x02).unwrap();
    enc.value(Scalar::F32(heading)).unwrap();
    enc.end_struct().unwrap();
    enc.finish(epoch_seq).expect("finish failed")
}

/// Handshake, then stream telemetry over a clean channel.
#[test]
fn test_full_pipeline_clean_channel() {
    let registry = CodebookRegistry::with_level1_domains();
    let mut metrics = LinkMetrics::new();

    // Step 1: characterize a short, dry link
    let mut channel = AcousticChannel::new(ChannelConfig {
        snr_db: 40.0,
        distance_m: 2.0,
        rt60_ms: 50.0,
        seed: 7,
        ..ChannelConfig::default()
    });
    let report = channel.characterize();
    assert!(report.effective_snr_db > 30.0);

    // Step 2: handshake; the peer tops out at 16-QAM
    let local = AgentCapabilities::for_registry("scout", &registry);
    let mut peer = AgentCapabilities::for_registry("base", &registry);
    peer.modulations = vec![Modulation::Bpsk, Modulation::Qpsk, Modulation::Qam16];

    let t0 = Instant::now();
    let mut session = HandshakeSession::new(local, Duration::from_millis(500));
    session.send_probe(t0).expect("probe failed");
    session
        .receive_capabilities(peer, t0 + Duration::from_millis(20))
        .expect("capabilities failed");
    let params = session
        .negotiate(report.effective_snr_db)
        .expect("negotiation failed");
    assert_eq!(params.modulation, Modulation::Qam16);
    assert_eq!(params.shared_codebooks, vec![0x01, 0x02, 0x05, 0x06]);

    channel.configure(params.modulation, params.fec);

    // Step 3: exchange utterances
    let decoder = Decoder::new(&registry);
    for seq in 0..5u64 {
        let buf = encode_telemetry(&registry, 12.5 + seq as f32, 1.5, seq);
        let (received, stats) = channel.transmit(&buf);
        metrics.record_transmission(&stats);

        let decoded = decoder.decode(&received).expect("clean link corrupted data");
        assert_eq!(decoded.epoch_seq, seq);
        assert_eq!(decoded.act, PragmaticAct::Assert);
        metrics.utterances_delivered += 1;
    }

    session.confirm_data_exchange().expect("confirm failed");
    assert_eq!(session.state(), HandshakeState::Active);
    metrics.handshakes_completed += 1;
    metrics.complete();

    assert_eq!(metrics.utterances_sent, 5);
    assert_eq!(metrics.utterances_delivered, 5);
    assert_eq!(metrics.bits_flipped, 0);
    assert_eq!(metrics.delivery_rate(), 1.0);

    let text = metrics.export_text();
    assert!(text.contains("utterances_delivered=5"));
}

/// A heavily impaired link corrupts frames; the decoder's CRC check
/// catches them and nothing is silently delivered wrong.
#[test]
fn test_noisy_channel_corruption_is_detected() {
    let registry = CodebookRegistry::with_level1_domains();
    let mut metrics = LinkMetrics::new();

    let mut channel = AcousticChannel::new(ChannelConfig {
        snr_db: 10.0,
        seed: 99,
        ..ChannelConfig::default()
    });
    // Force a scheme far above what this link supports
    channel.configure(Modulation::Qam64, FecRate::ThreeQuarters);
    assert!(channel.bit_error_rate() > 0.01);

    let decoder = Decoder::new(&registry);
    for seq in 0..10u64 {
        let buf = encode_telemetry(&registry, 1.0, 0.5, seq);
        let (received, stats) = channel.transmit(&buf);
        metrics.record_transmission(&stats);

        match decoder.decode(&received) {
            Ok(_) => metrics.utterances_delivered += 1,
            Err(Error::Integrity { .. }) => metrics.utterances_corrupted += 1,
            Err(_) => metrics.utterances_invalid += 1,
        }
    }

    assert_eq!(metrics.utterances_sent, 10);
    assert_eq!(
        metrics.utterances_delivered + metrics.utterances_corrupted + metrics.utterances_invalid,
        10
    );
    assert!(
        metrics.utterances_corrupted >= 8,
        "only {} of 10 corrupted frames were caught",
        metrics.utterances_corrupted
    );
    assert!(metrics.bits_flipped > 0);
}

/// Negotiation driven by the channel's own characterization picks a
/// modulation the link can actually sustain.
#[test]
fn test_negotiation_follows_characterization() {
    let registry = CodebookRegistry::with_level1_domains();

    // Default link: 25 dB source over 5 m lands just under 10 dB
    let mut channel = AcousticChannel::new(ChannelConfig::default());
    let report = channel.characterize();
    assert_eq!(report.recommended_modulation, Modulation::Bpsk);

    let local = AgentCapabilities::for_registry("scout", &registry);
    let peer = AgentCapabilities::for_registry("base", &registry);

    let t0 = Instant::now();
    let mut session = HandshakeSession::new(local, Duration::from_millis(500));
    session.send_probe(t0).unwrap();
    session.receive_capabilities(peer, t0).unwrap();
    let params = session.negotiate(report.effective_snr_db).unwrap();
    assert_eq!(params.modulation, Modulation::Bpsk);

    channel.configure(params.modulation, params.fec);

    let buf = encode_telemetry(&registry, 0.25, 0.5, 0);
    let (received, _) = channel.transmit(&buf);
    let decoded = Decoder::new(&registry)
        .decode(&received)
        .expect("negotiated link failed to carry one utterance");

    let rendered = render(&decoded, &registry);
    assert!(rendered.contains("ASSERT"));
    assert!(rendered.contains("NAV-1.POSITION_3D"));
}

/// A session that never hears back dies exactly at its deadline.
#[test]
fn test_handshake_timeout_liveness() {
    let registry = CodebookRegistry::with_level1_domains();
    let local = AgentCapabilities::for_registry("scout", &registry);

    let t0 = Instant::now();
    let mut session = HandshakeSession::new(local, Duration::from_millis(250));
    session.send_probe(t0).unwrap();

    session
        .poll_timeout(t0 + Duration::from_millis(249))
        .expect("timed out before the deadline");
    assert_eq!(session.state(), HandshakeState::ProbeSent);

    let mut metrics = LinkMetrics::new();
    let result = session.poll_timeout(t0 + Duration::from_millis(250));
    assert!(result.is_err());
    assert_eq!(session.state(), HandshakeState::Failed);
    metrics.handshakes_failed += 1;

    assert_eq!(metrics.handshakes_failed, 1);
}

/// Epoch sequence numbers survive transport in order.
#[test]
fn test_epoch_sequence_monotonic_across_exchange() {
    let registry = CodebookRegistry::with_level1_domains();
    let mut channel = AcousticChannel::new(ChannelConfig {
        snr_db: 45.0,
        distance_m: 1.0,
        rt60_ms: 50.0,
        seed: 3,
        ..ChannelConfig::default()
    });
    let decoder = Decoder::new(&registry);

    let mut last_seq = None;
    for seq in 0..20u64 {
        let buf = encode_telemetry(&registry, 1.0, 1.0, seq);
        let (received, _) = channel.transmit(&buf);
        let decoded = decoder.decode(&received).expect("decode failed");

        if let Some(last) = last_seq {
            assert!(decoded.epoch_seq > last, "sequence regressed");
        }
        last_seq = Some(decoded.epoch_seq);
    }
    assert_eq!(last_seq, Some(19));
}

/// A vocabulary extension declared on both sides round-trips; a peer
/// without the declaration rejects the reference instead of guessing.
#[test]
fn test_extension_vocabulary_round_trip() {
    let shared = CodebookRegistry::with_level1_domains();
    shared
        .extend(0xF0A1, "SWARM_SYNC", "u32")
        .expect("extension rejected");

    let mut enc = Encoder::new(&shared);
    enc.begin_utterance(0.8, 3, 0).unwrap();
    enc.act(PragmaticAct::Propose).unwrap();
    enc.begin_struct().unwrap();
    enc.extension_field(0xF0A1).unwrap();
    enc.value(Scalar::U32(7)).unwrap();
    enc.end_struct().unwrap();
    let buf = enc.finish(1).unwrap();

    let decoded = Decoder::new(&shared).decode(&buf).expect("decode failed");
    let rendered = render(&decoded, &shared);
    assert!(rendered.contains("SWARM_SYNC"));

    // Fresh registry never learned the extension
    let stranger = CodebookRegistry::with_level1_domains();
    let result = Decoder::new(&stranger).decode(&buf);
    assert!(matches!(result, Err(Error::Codebook(_))));

    // Struct field position carries the same escaped pair
    let field = FieldRef::Extension(0xF0A1);
    assert_eq!(
        field.namespace_and_code().1,
        0xF0A1,
        "extension code must survive the field reference"
    );
}
