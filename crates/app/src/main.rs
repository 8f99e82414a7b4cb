//! aill-sim: scripted two-agent AILL exchange over a modeled acoustic
//! link.
//!
//! The run proceeds in three phases, printing as it goes:
//! 1. Characterize the configured channel
//! 2. Handshake and negotiate modulation + FEC from the measurement
//! 3. Encode the scenario script, push each utterance through the
//!    channel, decode on the far side, and tally metrics

mod config;
mod scenario;

use std::time::{Duration, Instant};

use aill_core::channel::AcousticChannel;
use aill_core::codebook::CodebookRegistry;
use aill_core::decoder::Decoder;
use aill_core::encoder::Encoder;
use aill_core::handshake::{AgentCapabilities, HandshakeSession};
use aill_core::metrics::LinkMetrics;
use aill_core::utterance::render;
use aill_core::Error;

use config::Config;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {}", message);
            eprintln!("run with --help for usage");
            std::process::exit(1);
        }
    };

    if config.print_config {
        config.print();
    }

    if let Err(err) = run(&config) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> aill_core::Result<()> {
    let registry = CodebookRegistry::with_level1_domains();
    let mut metrics = LinkMetrics::new();

    // Measure the link first; negotiation works from the report
    let mut channel = AcousticChannel::new(config.channel);
    let report = channel.characterize();

    println!("=== Channel ===");
    println!("Effective SNR: {:.1} dB", report.effective_snr_db);
    println!(
        "Losses: {:.1} dB distance, {:.2} dB absorption, {:.1} dB reverb",
        report.attenuation_db, report.absorption_db, report.reverb_penalty_db
    );
    println!(
        "Propagation delay: {:.2} ms",
        report.propagation_delay_s * 1000.0
    );
    println!("Guard interval: {:.1} ms", report.guard_interval_ms);
    println!(
        "Recommended: {} (estimated BER {:.2e})",
        report.recommended_modulation.name(),
        report.estimated_ber
    );
    println!();

    // Handshake: scout probes, base answers right away
    let local = AgentCapabilities::for_registry("scout", &registry);
    let peer = AgentCapabilities::for_registry("base", &registry);
    let mut session =
        HandshakeSession::new(local, Duration::from_millis(config.handshake_timeout_ms));

    let t0 = Instant::now();
    let probe = session.send_probe(t0)?;
    println!("=== Handshake ===");
    println!("Probe sent (magic 0x{:08X})", probe.magic);

    let params = match session
        .receive_capabilities(peer, Instant::now())
        .and_then(|_| session.negotiate(report.effective_snr_db))
    {
        Ok(params) => params,
        Err(err) => {
            metrics.handshakes_failed += 1;
            metrics.complete();
            metrics.print_result();
            return Err(err);
        }
    };
    println!(
        "Negotiated: {} at FEC {}, {} sym/s, {} shared codebook(s)",
        params.modulation.name(),
        params.fec.name(),
        params.symbol_rate,
        params.shared_codebooks.len()
    );
    channel.configure(params.modulation, params.fec);
    println!("Throughput: {:.0} bit/s effective", channel.throughput_bps());
    println!();

    // Scripted exchange, sequence numbers in send order
    let script = scenario::generate_script(config.channel.seed, config.utterances);
    let mut encoder = Encoder::new(&registry);
    let decoder = Decoder::new(&registry);
    let mut confirmed = false;

    println!("=== Exchange ===");
    for utterance in &script {
        let buf = encoder.encode_utterance(utterance)?;
        let (received, stats) = channel.transmit(&buf);
        metrics.record_transmission(&stats);

        match decoder.decode(&received) {
            Ok(tree) => {
                metrics.utterances_delivered += 1;
                if !confirmed {
                    session.confirm_data_exchange()?;
                    metrics.handshakes_completed += 1;
                    confirmed = true;
                }
                println!(
                    "scout -> base ({} bytes): {}",
                    buf.len(),
                    render(&tree, &registry)
                );
            }
            Err(Error::Integrity { expected, actual }) => {
                metrics.utterances_corrupted += 1;
                println!(
                    "scout -> base ({} bytes): dropped, CRC 0x{:02X} != 0x{:02X} ({} bits flipped)",
                    buf.len(),
                    actual,
                    expected,
                    stats.bits_flipped
                );
            }
            Err(err) => {
                metrics.utterances_invalid += 1;
                println!("scout -> base ({} bytes): dropped, {}", buf.len(), err);
            }
        }
    }

    metrics.complete();
    if config.print_metrics {
        metrics.print_summary();
    }
    metrics.print_result();
    Ok(())
}
