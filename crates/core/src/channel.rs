//! Acoustic channel model: propagation loss, modulation-dependent bit
//! errors, and FEC coding gain.
//!
//! The model maps a configured link (SNR at the source, distance, room
//! reverberation, air temperature and humidity) to an effective SNR,
//! then to a bit-error rate for the active modulation scheme:
//!
//! ```text
//! effective SNR = configured SNR
//!               - distance attenuation   20*log10(d) re 1 m
//!               - atmospheric absorption temperature/humidity scaled
//!               - reverberation penalty  min(6 dB, (RT60-100ms)*0.01)
//!               floored at -10 dB
//! ```
//!
//! The negotiated FEC rate adds a fixed coding gain to the effective
//! SNR before the BER closed forms are evaluated; no real decoding is
//! simulated. Bit flips are injected per bit from a seeded ChaCha8
//! stream, so a given configuration corrupts the same bits every run.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// OFDM-style framing constants for throughput estimation.
pub const SUBCARRIERS: u32 = 32;
pub const FRAMES_PER_SECOND: u32 = 400;
pub const FRAMING_EFFICIENCY: f64 = 0.7;

/// Effective SNR never drops below this, however bad the link.
pub const SNR_FLOOR_DB: f64 = -10.0;

/// Absorption in dB per meter at 20 C and 50% relative humidity.
const ATMOSPHERIC_BASE_DB_PER_M: f64 = 0.05;

/// Modulation schemes in increasing spectral-efficiency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Modulation {
    Bpsk,
    Qpsk,
    Qam16,
    Qam64,
}

impl Modulation {
    pub const ALL: [Modulation; 4] = [
        Modulation::Bpsk,
        Modulation::Qpsk,
        Modulation::Qam16,
        Modulation::Qam64,
    ];

    pub fn bits_per_symbol(self) -> u32 {
        match self {
            Modulation::Bpsk => 1,
            Modulation::Qpsk => 2,
            Modulation::Qam16 => 4,
            Modulation::Qam64 => 6,
        }
    }

    /// Minimum SNR at which the scheme is considered usable.
    pub fn min_snr_db(self) -> f64 {
        match self {
            Modulation::Bpsk => 0.0,
            Modulation::Qpsk => 10.0,
            Modulation::Qam16 => 20.0,
            Modulation::Qam64 => 30.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modulation::Bpsk => "BPSK",
            Modulation::Qpsk => "QPSK",
            Modulation::Qam16 => "16-QAM",
            Modulation::Qam64 => "64-QAM",
        }
    }

    /// Highest-order scheme the given channel quality supports.
    pub fn for_quality(snr_db: f64) -> Modulation {
        if snr_db >= 30.0 {
            Modulation::Qam64
        } else if snr_db >= 20.0 {
            Modulation::Qam16
        } else if snr_db >= 10.0 {
            Modulation::Qpsk
        } else {
            Modulation::Bpsk
        }
    }

    /// AWGN bit-error rate at the given linear SNR.
    pub fn ber(self, snr_linear: f64) -> f64 {
        match self {
            Modulation::Bpsk | Modulation::Qpsk => q_function((2.0 * snr_linear).sqrt()),
            Modulation::Qam16 => 0.375 * q_function((4.0 * snr_linear / 5.0).sqrt()),
            Modulation::Qam64 => (7.0 / 24.0) * q_function((6.0 * snr_linear / 21.0).sqrt()),
        }
    }
}

/// Convolutional code rates modeled as a fixed coding gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FecRate {
    Half,
    TwoThirds,
    ThreeQuarters,
}

impl FecRate {
    pub const ALL: [FecRate; 3] = [FecRate::Half, FecRate::TwoThirds, FecRate::ThreeQuarters];

    /// Fraction of transmitted bits that carry payload.
    pub fn rate(self) -> f64 {
        match self {
            FecRate::Half => 0.5,
            FecRate::TwoThirds => 2.0 / 3.0,
            FecRate::ThreeQuarters => 0.75,
        }
    }

    /// Coding gain in dB added to the effective SNR.
    pub fn coding_gain_db(self) -> f64 {
        match self {
            FecRate::Half => 5.5,
            FecRate::TwoThirds => 4.0,
            FecRate::ThreeQuarters => 3.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FecRate::Half => "1/2",
            FecRate::TwoThirds => "2/3",
            FecRate::ThreeQuarters => "3/4",
        }
    }
}

/// Gaussian tail probability Q(x) via the Abramowitz-Stegun erfc
/// approximation (7.1.26), accurate to about 1.5e-7.
pub fn q_function(x: f64) -> f64 {
    if x < 0.0 {
        return 1.0 - q_function(-x);
    }
    let t = 1.0 / (1.0 + 0.3275911 * x / std::f64::consts::SQRT_2);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    0.5 * poly * (-x * x / 2.0).exp()
}

/// Speed of sound in air in m/s at the given temperature.
pub fn speed_of_sound(temperature_c: f64) -> f64 {
    331.3 + 0.606 * temperature_c
}

/// Link configuration. `seed` drives the bit-error stream.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    pub snr_db: f64,
    pub distance_m: f64,
    pub rt60_ms: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            snr_db: 25.0,
            distance_m: 5.0,
            rt60_ms: 200.0,
            temperature_c: 20.0,
            humidity_pct: 50.0,
            seed: 0,
        }
    }
}

/// Measurement report used to justify modulation choice.
#[derive(Debug, Clone, Copy)]
pub struct ChannelReport {
    pub effective_snr_db: f64,
    pub propagation_delay_s: f64,
    pub attenuation_db: f64,
    pub absorption_db: f64,
    pub reverb_penalty_db: f64,
    pub recommended_modulation: Modulation,
    pub estimated_ber: f64,
    pub guard_interval_ms: f64,
}

/// Per-transmission outcome counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelStats {
    pub bytes: usize,
    pub bits_flipped: usize,
    pub ber_applied: f64,
    pub latency_s: f64,
}

/// Simulated acoustic link between two agents.
pub struct AcousticChannel {
    config: ChannelConfig,
    modulation: Modulation,
    fec: FecRate,
    rng: ChaCha8Rng,
}

impl AcousticChannel {
    /// Open a link with the modulation recommended for its own quality
    /// and the most robust FEC rate. `configure` applies negotiated
    /// parameters afterwards.
    pub fn new(config: ChannelConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let modulation = Modulation::for_quality(effective_snr_db(&config));
        Self {
            config,
            modulation,
            fec: FecRate::Half,
            rng,
        }
    }

    pub fn configure(&mut self, modulation: Modulation, fec: FecRate) {
        self.modulation = modulation;
        self.fec = fec;
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn modulation(&self) -> Modulation {
        self.modulation
    }

    pub fn fec(&self) -> FecRate {
        self.fec
    }

    pub fn effective_snr_db(&self) -> f64 {
        effective_snr_db(&self.config)
    }

    /// BER the current modulation and FEC rate see on this link.
    pub fn bit_error_rate(&self) -> f64 {
        let coded_snr_db = self.effective_snr_db() + self.fec.coding_gain_db();
        self.modulation.ber(snr_linear(coded_snr_db))
    }

    pub fn propagation_delay_s(&self) -> f64 {
        self.config.distance_m / speed_of_sound(self.config.temperature_c)
    }

    /// Payload bits per second after FEC and framing overhead.
    pub fn throughput_bps(&self) -> f64 {
        f64::from(SUBCARRIERS)
            * f64::from(self.modulation.bits_per_symbol())
            * f64::from(FRAMES_PER_SECOND)
            * self.fec.rate()
            * FRAMING_EFFICIENCY
    }

    /// Propagation delay plus serialization time for a payload.
    pub fn transmit_latency_s(&self, payload_len: usize) -> f64 {
        let bits = (payload_len * 8) as f64;
        self.propagation_delay_s() + bits / self.throughput_bps()
    }

    /// Measure the link without transmitting. The estimated BER is for
    /// the recommended modulation before any coding gain.
    pub fn characterize(&self) -> ChannelReport {
        let effective = self.effective_snr_db();
        let recommended = Modulation::for_quality(effective);
        ChannelReport {
            effective_snr_db: effective,
            propagation_delay_s: self.propagation_delay_s(),
            attenuation_db: distance_attenuation_db(self.config.distance_m),
            absorption_db: atmospheric_absorption_db(&self.config),
            reverb_penalty_db: reverb_penalty_db(self.config.rt60_ms),
            recommended_modulation: recommended,
            estimated_ber: recommended.ber(snr_linear(effective)),
            guard_interval_ms: guard_interval_ms(self.config.rt60_ms),
        }
    }

    /// Push a payload through the link, flipping each bit independently
    /// with the current BER. Returns the received bytes and counters.
    pub fn transmit(&mut self, payload: &[u8]) -> (Vec<u8>, ChannelStats) {
        let ber = self.bit_error_rate();
        let mut received = payload.to_vec();
        let mut flipped = 0usize;

        for byte in &mut received {
            for bit in 0..8 {
                if self.rng.gen::<f64>() < ber {
                    *byte ^= 1 << bit;
                    flipped += 1;
                }
            }
        }

        let stats = ChannelStats {
            bytes: payload.len(),
            bits_flipped: flipped,
            ber_applied: ber,
            latency_s: self.transmit_latency_s(payload.len()),
        };
        (received, stats)
    }
}

fn distance_attenuation_db(distance_m: f64) -> f64 {
    if distance_m <= 0.1 {
        0.0
    } else {
        20.0 * distance_m.log10()
    }
}

fn atmospheric_absorption_db(config: &ChannelConfig) -> f64 {
    let temp_factor = (1.0 + 0.01 * (config.temperature_c - 20.0)).max(0.0);
    let humidity_factor = (1.5 - 0.01 * config.humidity_pct).max(0.0);
    ATMOSPHERIC_BASE_DB_PER_M * temp_factor * humidity_factor * config.distance_m
}

fn reverb_penalty_db(rt60_ms: f64) -> f64 {
    if rt60_ms > 100.0 {
        ((rt60_ms - 100.0) * 0.01).min(6.0)
    } else {
        0.0
    }
}

/// Guard interval recommendation by reverberation time.
fn guard_interval_ms(rt60_ms: f64) -> f64 {
    if rt60_ms < 100.0 {
        0.3
    } else if rt60_ms < 300.0 {
        0.5
    } else if rt60_ms < 600.0 {
        0.8
    } else {
        1.2
    }
}

fn effective_snr_db(config: &ChannelConfig) -> f64 {
    let snr = config.snr_db
        - distance_attenuation_db(config.distance_m)
        - atmospheric_absorption_db(config)
        - reverb_penalty_db(config.rt60_ms);
    snr.max(SNR_FLOOR_DB)
}

fn snr_linear(snr_db: f64) -> f64 {
    if snr_db <= SNR_FLOOR_DB {
        0.001
    } else {
        10f64.powf(snr_db / 10.0)
    }
}
