use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Ceiling the simulated sequence never passes on its own.
pub const SIMULATED_CEILING: f64 = 90.0;
/// Largest random increment applied per tick.
pub const SIMULATED_MAX_STEP: f64 = 5.0;

const RING_CIRCUMFERENCE: f64 = 339.3;

/// Source of progress readings shown while analysis runs. The simulated
/// implementation is cosmetic; a server-driven one can replace it without
/// touching the orchestration.
#[async_trait]
pub trait ProgressSource: Send {
    /// Resolves with the next reading in percent. May pend forever once
    /// there is nothing more to report.
    async fn next_reading(&mut self) -> f64;
}

pub struct SimulatedProgress {
    ticker: Interval,
    value: f64,
    max_step: f64,
}

impl SimulatedProgress {
    pub fn new(tick: Duration) -> Self {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            value: 0.0,
            max_step: SIMULATED_MAX_STEP,
        }
    }

    fn advance(&mut self, step: f64) -> f64 {
        self.value = (self.value + step.max(0.0)).min(SIMULATED_CEILING);
        self.value
    }
}

#[async_trait]
impl ProgressSource for SimulatedProgress {
    async fn next_reading(&mut self) -> f64 {
        if self.value >= SIMULATED_CEILING {
            std::future::pending::<()>().await;
        }
        self.ticker.tick().await;
        let step = rand::rng().random_range(0.0..self.max_step);
        self.advance(step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Recognizing,
    Measuring,
    Matching,
}

impl ProgressPhase {
    pub fn for_percent(percent: f64) -> Self {
        if percent < 30.0 {
            ProgressPhase::Recognizing
        } else if percent < 60.0 {
            ProgressPhase::Measuring
        } else {
            ProgressPhase::Matching
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            ProgressPhase::Recognizing => "얼굴형을 인식하고 있습니다...",
            ProgressPhase::Measuring => "이목구비 비율을 계산중입니다...",
            ProgressPhase::Matching => "최적의 헤어스타일을 매칭중입니다...",
        }
    }
}

/// The displayed side of progress: always within [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDisplay {
    percent: f64,
    running: bool,
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self {
            percent: 0.0,
            running: false,
        }
    }
}

impl ProgressDisplay {
    pub fn start(&mut self) {
        self.percent = 0.0;
        self.running = true;
    }

    pub fn set(&mut self, percent: f64) {
        self.percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn finish(&mut self) {
        self.stop();
        self.set(100.0);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn rounded(&self) -> u8 {
        self.percent.round() as u8
    }

    pub fn label(&self) -> String {
        format!("{}%", self.rounded())
    }

    pub fn phase(&self) -> ProgressPhase {
        ProgressPhase::for_percent(self.percent)
    }

    pub fn ring_offset(&self) -> f64 {
        RING_CIRCUMFERENCE - (RING_CIRCUMFERENCE * self.percent) / 100.0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_clamps_out_of_range_values() {
        let mut display = ProgressDisplay::default();
        display.set(150.0);
        assert_eq!(display.rounded(), 100);
        display.set(-4.0);
        assert_eq!(display.rounded(), 0);
        display.set(f64::NAN);
        assert_eq!(display.percent(), 0.0);
    }

    #[test]
    fn phases_follow_percentage_bands() {
        assert_eq!(ProgressPhase::for_percent(0.0), ProgressPhase::Recognizing);
        assert_eq!(ProgressPhase::for_percent(29.9), ProgressPhase::Recognizing);
        assert_eq!(ProgressPhase::for_percent(30.0), ProgressPhase::Measuring);
        assert_eq!(ProgressPhase::for_percent(59.9), ProgressPhase::Measuring);
        assert_eq!(ProgressPhase::for_percent(60.0), ProgressPhase::Matching);
        assert_eq!(ProgressPhase::for_percent(100.0), ProgressPhase::Matching);
    }

    #[test]
    fn ring_offset_spans_full_circle() {
        let mut display = ProgressDisplay::default();
        assert!((display.ring_offset() - 339.3).abs() < 1e-9);
        display.finish();
        assert!(display.ring_offset().abs() < 1e-9);
        assert!(!display.is_running());
        assert_eq!(display.label(), "100%");
    }

    #[tokio::test]
    async fn advance_saturates_at_ceiling() {
        let mut progress = SimulatedProgress {
            ticker: tokio::time::interval(Duration::from_millis(1)),
            value: 88.0,
            max_step: SIMULATED_MAX_STEP,
        };
        assert_eq!(progress.advance(4.9), SIMULATED_CEILING);
        assert_eq!(progress.advance(-3.0), SIMULATED_CEILING);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_sequence_never_exceeds_ceiling() {
        let mut progress = SimulatedProgress::new(Duration::from_millis(200));
        let mut last = 0.0;
        for _ in 0..200 {
            let reading = tokio::time::timeout(Duration::from_secs(1), progress.next_reading())
                .await;
            let Ok(reading) = reading else {
                break;
            };
            assert!(reading >= last);
            assert!(reading <= SIMULATED_CEILING);
            last = reading;
        }
    }
}
