//! Metrics collection and reporting for a simulated link.
//!
//! Counters are updated explicitly at each pipeline stage (handshake,
//! transmit, decode) and summarized at the end of a run.
//!
//! # Thread Safety
//!
//! `LinkMetrics` is NOT thread-safe. For multi-threaded use, wrap in
//! `Arc<Mutex<LinkMetrics>>` or merge per-thread copies at the end.

use std::time::{Duration, Instant};

use crate::channel::ChannelStats;

/// Counters for one simulated exchange between two agents.
#[derive(Debug, Clone)]
pub struct LinkMetrics {
    /// When the exchange started
    pub start_time: Instant,

    /// When the exchange ended (set on completion)
    pub end_time: Option<Instant>,

    // === Handshake ===
    /// Sessions that reached ACTIVE
    pub handshakes_completed: u64,

    /// Sessions that ended FAILED
    pub handshakes_failed: u64,

    // === Utterances ===
    /// Utterances pushed into the channel
    pub utterances_sent: u64,

    /// Utterances decoded intact on the far side
    pub utterances_delivered: u64,

    /// Utterances rejected by the CRC check
    pub utterances_corrupted: u64,

    /// Utterances that failed decoding for any other reason
    pub utterances_invalid: u64,

    // === Channel ===
    /// Payload bytes pushed into the channel
    pub bytes_sent: u64,

    /// Bits the channel flipped in transit
    pub bits_flipped: u64,

    /// Sum of per-transmission latencies
    pub total_latency_s: f64,
}

impl LinkMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            handshakes_completed: 0,
            handshakes_failed: 0,
            utterances_sent: 0,
            utterances_delivered: 0,
            utterances_corrupted: 0,
            utterances_invalid: 0,
            bytes_sent: 0,
            bits_flipped: 0,
            total_latency_s: 0.0,
        }
    }

    /// Mark the exchange as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Fold one transmission's channel counters in.
    pub fn record_transmission(&mut self, stats: &ChannelStats) {
        self.utterances_sent += 1;
        self.bytes_sent += stats.bytes as u64;
        self.bits_flipped += stats.bits_flipped as u64;
        self.total_latency_s += stats.latency_s;
    }

    /// Fraction of sent utterances decoded intact.
    pub fn delivery_rate(&self) -> f64 {
        if self.utterances_sent == 0 {
            0.0
        } else {
            self.utterances_delivered as f64 / self.utterances_sent as f64
        }
    }

    /// Fraction of sent utterances the CRC check rejected.
    pub fn corruption_rate(&self) -> f64 {
        if self.utterances_sent == 0 {
            0.0
        } else {
            self.utterances_corrupted as f64 / self.utterances_sent as f64
        }
    }

    /// Mean simulated transmit latency per utterance in seconds.
    pub fn mean_latency_s(&self) -> f64 {
        if self.utterances_sent == 0 {
            0.0
        } else {
            self.total_latency_s / self.utterances_sent as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        let duration_ms = self.duration().as_millis();

        println!("\n=== Link Summary ===");
        println!("Duration: {} ms", duration_ms);
        println!();

        println!("=== Handshake ===");
        println!("Completed: {}", self.handshakes_completed);
        println!("Failed: {}", self.handshakes_failed);
        println!();

        println!("=== Utterances ===");
        println!("Sent: {}", self.utterances_sent);
        println!(
            "Delivered: {} ({:.1}%)",
            self.utterances_delivered,
            self.delivery_rate() * 100.0
        );
        println!(
            "Corrupted: {} ({:.1}%)",
            self.utterances_corrupted,
            self.corruption_rate() * 100.0
        );
        println!("Invalid: {}", self.utterances_invalid);
        println!();

        println!("=== Channel ===");
        println!("Bytes sent: {}", self.bytes_sent);
        println!("Bits flipped: {}", self.bits_flipped);
        println!(
            "Mean transmit latency: {:.2} ms",
            self.mean_latency_s() * 1000.0
        );
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.handshakes_failed > 0 {
            println!(
                "✗ Exchange failed: {} handshake(s) did not complete",
                self.handshakes_failed
            );
        } else if self.utterances_delivered == self.utterances_sent {
            println!(
                "✓ Exchange completed: {} utterances delivered in {} ms",
                self.utterances_delivered,
                self.duration().as_millis()
            );
        } else {
            println!(
                "✗ Exchange lossy: {} of {} utterances delivered ({} corrupted)",
                self.utterances_delivered, self.utterances_sent, self.utterances_corrupted
            );
        }
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             handshakes_completed={}\n\
             handshakes_failed={}\n\
             utterances_sent={}\n\
             utterances_delivered={}\n\
             utterances_corrupted={}\n\
             utterances_invalid={}\n\
             delivery_rate={:.4}\n\
             corruption_rate={:.4}\n\
             bytes_sent={}\n\
             bits_flipped={}\n\
             mean_latency_ms={:.3}\n",
            self.duration().as_millis(),
            self.handshakes_completed,
            self.handshakes_failed,
            self.utterances_sent,
            self.utterances_delivered,
            self.utterances_corrupted,
            self.utterances_invalid,
            self.delivery_rate(),
            self.corruption_rate(),
            self.bytes_sent,
            self.bits_flipped,
            self.mean_latency_s() * 1000.0,
        )
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = LinkMetrics::new();
        assert!(metrics.end_time.is_none());
        assert!(metrics.duration().as_millis() < 100); // Should be recent
    }

    #[test]
    fn test_delivery_rate() {
        let mut metrics = LinkMetrics::new();
        metrics.utterances_sent = 20;
        metrics.utterances_delivered = 18;
        metrics.utterances_corrupted = 2;

        assert_eq!(metrics.delivery_rate(), 0.9);
        assert_eq!(metrics.corruption_rate(), 0.1);
    }

    #[test]
    fn test_rates_with_nothing_sent() {
        let metrics = LinkMetrics::new();
        assert_eq!(metrics.delivery_rate(), 0.0);
        assert_eq!(metrics.corruption_rate(), 0.0);
        assert_eq!(metrics.mean_latency_s(), 0.0);
    }

    #[test]
    fn test_record_transmission() {
        let mut metrics = LinkMetrics::new();
        metrics.record_transmission(&ChannelStats {
            bytes: 48,
            bits_flipped: 3,
            ber_applied: 0.01,
            latency_s: 0.05,
        });
        metrics.record_transmission(&ChannelStats {
            bytes: 12,
            bits_flipped: 0,
            ber_applied: 0.01,
            latency_s: 0.03,
        });

        assert_eq!(metrics.utterances_sent, 2);
        assert_eq!(metrics.bytes_sent, 60);
        assert_eq!(metrics.bits_flipped, 3);
        assert!((metrics.mean_latency_s() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_export_text() {
        let mut metrics = LinkMetrics::new();
        metrics.utterances_sent = 10;
        metrics.utterances_delivered = 10;
        metrics.handshakes_completed = 1;

        let text = metrics.export_text();
        assert!(text.contains("utterances_sent=10"));
        assert!(text.contains("utterances_delivered=10"));
        assert!(text.contains("handshakes_completed=1"));
        assert!(text.contains("delivery_rate=1.0000"));
    }
}
