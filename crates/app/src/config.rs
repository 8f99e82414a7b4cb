//! Configuration for the aill-sim application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized defaults that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using intelligent defaults.
//! All defaults are printed so runs are reproducible.

use aill_core::channel::ChannelConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Complete configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Acoustic link parameters (seed included)
    pub channel: ChannelConfig,

    /// Handshake timeout in milliseconds
    pub handshake_timeout_ms: u64,

    /// Number of scripted utterances to exchange
    pub utterances: usize,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no arguments provided, generates randomized defaults using a
    /// time-based seed. If --seed is provided, uses that seed for all
    /// randomness (fully deterministic).
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut seed: Option<u64> = None;
        let mut snr_db: Option<f64> = None;
        let mut distance_m: Option<f64> = None;
        let mut rt60_ms: Option<f64> = None;
        let mut temperature_c: Option<f64> = None;
        let mut humidity_pct: Option<f64> = None;
        let mut handshake_timeout_ms: Option<u64> = None;
        let mut utterances: Option<usize> = None;
        let mut print_config = false;
        let mut print_metrics = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--snr" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--snr requires a number".to_string());
                    }
                    snr_db = Some(args[i].parse().map_err(|_| "invalid snr")?);
                }
                "--distance" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--distance requires a number".to_string());
                    }
                    distance_m = Some(args[i].parse().map_err(|_| "invalid distance")?);
                }
                "--rt60" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--rt60 requires a number".to_string());
                    }
                    rt60_ms = Some(args[i].parse().map_err(|_| "invalid rt60")?);
                }
                "--temp" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--temp requires a number".to_string());
                    }
                    temperature_c = Some(args[i].parse().map_err(|_| "invalid temp")?);
                }
                "--humidity" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--humidity requires a number".to_string());
                    }
                    humidity_pct = Some(args[i].parse().map_err(|_| "invalid humidity")?);
                }
                "--timeout" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--timeout requires a number".to_string());
                    }
                    handshake_timeout_ms = Some(args[i].parse().map_err(|_| "invalid timeout")?);
                }
                "--utterances" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--utterances requires a number".to_string());
                    }
                    utterances = Some(args[i].parse().map_err(|_| "invalid utterances")?);
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|t| t.as_millis() as u64)
                .unwrap_or(0)
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = Config {
            channel: ChannelConfig {
                snr_db: snr_db.unwrap_or_else(|| rng.gen_range(12.0..35.0)),
                distance_m: distance_m.unwrap_or_else(|| rng.gen_range(1.0..15.0)),
                rt60_ms: rt60_ms.unwrap_or_else(|| rng.gen_range(80.0..500.0)),
                temperature_c: temperature_c.unwrap_or_else(|| rng.gen_range(5.0..35.0)),
                humidity_pct: humidity_pct.unwrap_or_else(|| rng.gen_range(20.0..80.0)),
                seed,
            },
            handshake_timeout_ms: handshake_timeout_ms.unwrap_or_else(|| rng.gen_range(300..=1500)),
            utterances: utterances.unwrap_or(12),
            print_config,
            print_metrics,
        };

        Ok(config)
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Seed: {}", self.channel.seed);
        println!("Utterances: {}", self.utterances);
        println!("Handshake timeout: {} ms", self.handshake_timeout_ms);
        println!();
        println!("=== Acoustic Channel ===");
        println!("Source SNR: {:.1} dB", self.channel.snr_db);
        println!("Distance: {:.1} m", self.channel.distance_m);
        println!("RT60: {:.0} ms", self.channel.rt60_ms);
        println!("Temperature: {:.1} C", self.channel.temperature_c);
        println!("Humidity: {:.0}%", self.channel.humidity_pct);
        println!();
    }
}

fn print_help() {
    println!("aill-sim: Two-agent AILL exchange over a modeled acoustic link");
    println!();
    println!("USAGE:");
    println!("    aill-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --seed <N>           Random seed for determinism");
    println!("    --utterances <N>     Scripted utterances to exchange (default: 12)");
    println!("    --timeout <MS>       Handshake timeout (default: random 300-1500)");
    println!();
    println!("    --snr <DB>           Source SNR (default: random 12-35)");
    println!("    --distance <M>       Agent separation (default: random 1-15)");
    println!("    --rt60 <MS>          Room reverberation time (default: random 80-500)");
    println!("    --temp <C>           Air temperature (default: random 5-35)");
    println!("    --humidity <PCT>     Relative humidity (default: random 20-80)");
    println!();
    println!("    --print-config       Print resolved configuration");
    println!("    --no-metrics         Don't print metrics summary");
    println!("    --help, -h           Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    aill-sim                            # Run with random defaults");
    println!("    aill-sim --seed 42                  # Deterministic run");
    println!("    aill-sim --snr 35 --distance 2      # Clean short link");
    println!("    aill-sim --snr 12 --distance 20     # Marginal long link");
    println!();
}
