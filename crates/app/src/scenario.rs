//! Scenario generation for the two-agent exchange.
//!
//! Produces a deterministic script of utterances from a seed: a
//! greeting, a stream of telemetry and perception reports with task
//! proposals mixed in, battery warnings once charge runs low, and a
//! farewell.
//!
//! # Design
//!
//! The script exercises the interesting parts of the wire format:
//! - Nested structs under modality wrappers (telemetry, perception)
//! - Temporal markers with on-wire values (battery time remaining)
//! - Every scalar family that the Level-1 domains use
//!
//! Battery charge decays across the script so long runs trip the
//! low-battery warning path.

use aill_core::codebook::{Modality, PragmaticAct, TemporalKind};
use aill_core::utterance::{FieldRef, Node, Scalar, Utterance};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NAV1: u8 = 0x01;
const PERCEPT1: u8 = 0x02;
const DIAG1: u8 = 0x05;
const PLAN1: u8 = 0x06;

const LOW_BATTERY_PCT: f32 = 25.0;

/// Generate a deterministic utterance script.
///
/// Epoch sequence numbers are assigned in send order, starting at 0.
pub fn generate_script(seed: u64, count: usize) -> Vec<Utterance> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut script = Vec::with_capacity(count);
    // Whole percentages stay exact through the float16 wire type
    let mut battery: u32 = rng.gen_range(40..=60);

    for seq in 0..count as u64 {
        let utterance = if seq == 0 {
            greeting(seq)
        } else if seq + 1 == count as u64 {
            farewell(seq)
        } else {
            battery = battery.saturating_sub(rng.gen_range(1..=3));
            if (battery as f32) < LOW_BATTERY_PCT {
                battery_warning(&mut rng, seq, battery)
            } else {
                match seq % 4 {
                    1 | 3 => telemetry(&mut rng, seq),
                    2 => perception(&mut rng, seq),
                    _ => task_proposal(&mut rng, seq),
                }
            }
        };
        script.push(utterance);
    }

    script
}

fn greeting(seq: u64) -> Utterance {
    Utterance {
        confidence: 1.0,
        priority: 1,
        flags: 0,
        epoch_seq: seq,
        act: PragmaticAct::Greet,
        payload: None,
    }
}

fn farewell(seq: u64) -> Utterance {
    Utterance {
        confidence: 1.0,
        priority: 1,
        flags: 0,
        epoch_seq: seq,
        act: PragmaticAct::Farewell,
        payload: None,
    }
}

/// ASSERT(OBSERVED(position + heading + speed)).
fn telemetry(rng: &mut ChaCha8Rng, seq: u64) -> Utterance {
    let position = vec![
        Scalar::F32(rng.gen_range(-50.0..50.0)),
        Scalar::F32(rng.gen_range(-50.0..50.0)),
        Scalar::F32(rng.gen_range(0.0..5.0)),
    ];
    Utterance {
        confidence: 0.9,
        priority: 5,
        flags: 0,
        epoch_seq: seq,
        act: PragmaticAct::Assert,
        payload: Some(Node::Modality {
            kind: Modality::Observed,
            horizon_s: None,
            inner: Box::new(Node::Struct(vec![
                (
                    FieldRef::Domain {
                        domain: NAV1,
                        code: 0x00,
                    },
                    Node::List(position),
                ),
                (
                    FieldRef::Domain {
                        domain: NAV1,
                        code: 0x02,
                    },
                    Node::Scalar(Scalar::F32(rng.gen_range(0.0..6.2832))),
                ),
                (
                    FieldRef::Domain {
                        domain: NAV1,
                        code: 0x06,
                    },
                    Node::Scalar(Scalar::F32(rng.gen_range(0.0..3.0))),
                ),
            ])),
        }),
    }
}

/// INFORM(OBSERVED(detected object with class, id and position)).
fn perception(rng: &mut ChaCha8Rng, seq: u64) -> Utterance {
    let position = vec![
        Scalar::F32(rng.gen_range(-20.0..20.0)),
        Scalar::F32(rng.gen_range(-20.0..20.0)),
        Scalar::F32(rng.gen_range(0.0..2.0)),
    ];
    Utterance {
        confidence: 0.75,
        priority: 4,
        flags: 0,
        epoch_seq: seq,
        act: PragmaticAct::Inform,
        payload: Some(Node::Modality {
            kind: Modality::Observed,
            horizon_s: None,
            inner: Box::new(Node::Struct(vec![
                (
                    FieldRef::Domain {
                        domain: PERCEPT1,
                        code: 0x01,
                    },
                    Node::Scalar(Scalar::U16(rng.gen_range(1..=40))),
                ),
                (
                    FieldRef::Domain {
                        domain: PERCEPT1,
                        code: 0x07,
                    },
                    Node::Scalar(Scalar::U32(rng.gen())),
                ),
                (
                    FieldRef::Domain {
                        domain: PERCEPT1,
                        code: 0x05,
                    },
                    Node::List(position),
                ),
            ])),
        }),
    }
}

/// PROPOSE(task id + priority + estimated cost).
fn task_proposal(rng: &mut ChaCha8Rng, seq: u64) -> Utterance {
    Utterance {
        confidence: 0.8,
        priority: 3,
        flags: 0,
        epoch_seq: seq,
        act: PragmaticAct::Propose,
        payload: Some(Node::Struct(vec![
            (
                FieldRef::Domain {
                    domain: PLAN1,
                    code: 0x01,
                },
                Node::Scalar(Scalar::U32(rng.gen_range(1..=9999))),
            ),
            (
                FieldRef::Domain {
                    domain: PLAN1,
                    code: 0x03,
                },
                Node::Scalar(Scalar::U8(rng.gen_range(0..=7))),
            ),
            (
                FieldRef::Domain {
                    domain: PLAN1,
                    code: 0x0B,
                },
                Node::Scalar(Scalar::F32(rng.gen_range(1.0..100.0))),
            ),
        ])),
    }
}

/// WARN(PRESENT(battery level with estimated runtime)).
fn battery_warning(rng: &mut ChaCha8Rng, seq: u64, battery_pct: u32) -> Utterance {
    let runtime_s = battery_pct as f32 * rng.gen_range(20.0..40.0);
    Utterance {
        confidence: 0.95,
        priority: 7,
        flags: 0,
        epoch_seq: seq,
        act: PragmaticAct::Warn,
        payload: Some(Node::Temporal {
            kind: TemporalKind::Present,
            value_s: None,
            inner: Box::new(Node::Struct(vec![
                (
                    FieldRef::Domain {
                        domain: DIAG1,
                        code: 0x00,
                    },
                    Node::Scalar(Scalar::F16(battery_pct as f32)),
                ),
                (
                    FieldRef::Domain {
                        domain: DIAG1,
                        code: 0x05,
                    },
                    Node::Scalar(Scalar::F32(runtime_s)),
                ),
            ])),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aill_core::codebook::CodebookRegistry;
    use aill_core::decoder::Decoder;
    use aill_core::encoder::Encoder;

    #[test]
    fn test_script_shape() {
        let script = generate_script(42, 12);
        assert_eq!(script.len(), 12);
        assert_eq!(script[0].act, PragmaticAct::Greet);
        assert_eq!(script[11].act, PragmaticAct::Farewell);
    }

    #[test]
    fn test_determinism() {
        let script1 = generate_script(12345, 20);
        let script2 = generate_script(12345, 20);
        assert_eq!(script1, script2);
    }

    #[test]
    fn test_different_seeds() {
        let script1 = generate_script(1, 20);
        let script2 = generate_script(2, 20);
        assert_ne!(script1, script2);
    }

    #[test]
    fn test_epoch_seqs_are_send_ordered() {
        let script = generate_script(7, 15);
        for (i, utterance) in script.iter().enumerate() {
            assert_eq!(utterance.epoch_seq, i as u64);
        }
    }

    #[test]
    fn test_long_runs_trip_the_battery_warning() {
        // Charge starts at most at 60% and drains every step
        let script = generate_script(9, 40);
        assert!(script.iter().any(|u| u.act == PragmaticAct::Warn));
    }

    #[test]
    fn test_script_encodes_and_round_trips() {
        let registry = CodebookRegistry::with_level1_domains();
        let mut encoder = Encoder::new(&registry);
        let decoder = Decoder::new(&registry);

        for utterance in generate_script(3, 25) {
            let buf = encoder.encode_utterance(&utterance).expect("encode failed");
            let decoded = decoder.decode(&buf).expect("decode failed");
            assert_eq!(decoded.act, utterance.act);
            assert_eq!(decoded.epoch_seq, utterance.epoch_seq);
            assert_eq!(decoded.payload, utterance.payload);
        }
    }
}
