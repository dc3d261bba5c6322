//! Performance monitoring
//!
//! Tracks tick processing time against the tick budget and summarizes
//! controller evaluation times for the final score.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Performance status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceStatus {
    /// Well under budget
    Excellent,
    /// Normal operation
    Good,
    /// Close to the tick budget
    Warning,
    /// Ticks take longer than the budget; real-time pacing falls behind
    Critical,
}

impl PerformanceStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, PerformanceStatus::Warning | PerformanceStatus::Critical)
    }
}

/// Performance monitor that tracks tick durations
pub struct PerformanceMonitor {
    /// Rolling window of tick durations
    tick_durations: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Target tick duration (budget)
    target_tick_duration: Duration,
    /// Threshold for excellent performance (fraction of budget)
    excellent_threshold: f32,
    /// Threshold for warning (fraction of budget)
    warning_threshold: f32,
    /// Threshold for critical (fraction of budget)
    critical_threshold: f32,
    status: PerformanceStatus,
    tick_start: Option<Instant>,
    last_entity_count: usize,
}

impl PerformanceMonitor {
    pub fn new(frequency: u32) -> Self {
        let target_tick_duration = Duration::from_secs_f32(1.0 / frequency.max(1) as f32);

        Self {
            tick_durations: VecDeque::with_capacity(120),
            max_samples: 120,
            target_tick_duration,
            excellent_threshold: 0.3,
            warning_threshold: 0.7,
            critical_threshold: 1.0,
            status: PerformanceStatus::Excellent,
            tick_start: None,
            last_entity_count: 0,
        }
    }

    /// Start timing a tick
    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// End timing a tick; returns the new status when it changed
    pub fn tick_end(&mut self, entity_count: usize) -> Option<PerformanceStatus> {
        let start = self.tick_start.take()?;
        self.last_entity_count = entity_count;
        let previous = self.status;
        self.record_tick(start.elapsed());
        (self.status != previous).then_some(self.status)
    }

    fn record_tick(&mut self, duration: Duration) {
        self.tick_durations.push_back(duration);
        while self.tick_durations.len() > self.max_samples {
            self.tick_durations.pop_front();
        }
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.tick_durations.len() < 10 {
            // Not enough data yet
            return;
        }

        let ratio = self.budget_usage_percent() / 100.0;

        self.status = if ratio < self.excellent_threshold {
            PerformanceStatus::Excellent
        } else if ratio < self.warning_threshold {
            PerformanceStatus::Good
        } else if ratio < self.critical_threshold {
            PerformanceStatus::Warning
        } else {
            PerformanceStatus::Critical
        };
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.tick_durations.iter().sum();
        sum / self.tick_durations.len() as u32
    }

    pub fn status(&self) -> PerformanceStatus {
        self.status
    }

    /// Budget usage as percentage (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        let avg = self.average_tick_duration();
        (avg.as_secs_f32() / self.target_tick_duration.as_secs_f32()) * 100.0
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, {} entities",
            self.status,
            self.budget_usage_percent(),
            self.last_entity_count
        )
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Summary statistics over controller evaluation durations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationStats {
    pub count: usize,
    pub mean: Duration,
    pub median: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl EvaluationStats {
    /// None when no samples were recorded
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let total: Duration = sorted.iter().sum();
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2
        };

        Some(Self {
            count,
            mean: total / count as u32,
            median,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_monitor_new() {
        let monitor = PerformanceMonitor::new(60);
        assert_eq!(monitor.status(), PerformanceStatus::Excellent);
    }

    #[test]
    fn test_good_performance() {
        let mut monitor = PerformanceMonitor::new(60);
        // Good is 30-70% of the ~16.67ms budget
        for _ in 0..20 {
            monitor.record_tick(Duration::from_millis(8));
        }
        assert_eq!(monitor.status(), PerformanceStatus::Good);
        assert!(!monitor.status().is_degraded());
    }

    #[test]
    fn test_critical_performance() {
        let mut monitor = PerformanceMonitor::new(60);
        for _ in 0..20 {
            monitor.record_tick(Duration::from_millis(25));
        }
        assert_eq!(monitor.status(), PerformanceStatus::Critical);
        assert!(monitor.status().is_degraded());
    }

    #[test]
    fn test_not_enough_samples() {
        let mut monitor = PerformanceMonitor::new(60);
        for _ in 0..5 {
            monitor.record_tick(Duration::from_millis(30));
        }
        assert_eq!(monitor.status(), PerformanceStatus::Excellent);
    }

    #[test]
    fn test_tick_timing() {
        let mut monitor = PerformanceMonitor::new(60);
        monitor.tick_start();
        std::thread::sleep(Duration::from_millis(1));
        monitor.tick_end(10);

        assert!(!monitor.tick_durations.is_empty());
        assert!(monitor.status_message().contains("10 entities"));
    }

    #[test]
    fn test_tick_end_without_start() {
        let mut monitor = PerformanceMonitor::new(60);
        assert!(monitor.tick_end(3).is_none());
        assert!(monitor.tick_durations.is_empty());
    }

    #[test]
    fn test_evaluation_stats_odd() {
        let samples = [
            Duration::from_micros(30),
            Duration::from_micros(10),
            Duration::from_micros(20),
        ];
        let stats = EvaluationStats::from_samples(&samples).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Duration::from_micros(10));
        assert_eq!(stats.max, Duration::from_micros(30));
        assert_eq!(stats.median, Duration::from_micros(20));
        assert_eq!(stats.mean, Duration::from_micros(20));
    }

    #[test]
    fn test_evaluation_stats_even_median() {
        let samples = [Duration::from_micros(10), Duration::from_micros(40)];
        let stats = EvaluationStats::from_samples(&samples).unwrap();
        assert_eq!(stats.median, Duration::from_micros(25));
    }

    #[test]
    fn test_evaluation_stats_empty() {
        assert!(EvaluationStats::from_samples(&[]).is_none());
    }
}
