use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduling engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings for the background loop that promotes scheduled lessons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the promotion loop when the daemon starts.
    #[serde(default = "d_true")]
    pub enabled: bool,

    /// Seconds between passes.
    #[serde(default = "d_interval_secs")]
    pub interval_secs: u64,

    /// Apply the asset gate to autonomous promotion as well.
    ///
    /// Off by default: scheduled lessons and their programs are promoted
    /// whether or not the required posters and thumbnails exist. Every
    /// such promotion is still reported as a gate bypass.
    #[serde(default)]
    pub enforce_asset_gate: bool,

    /// Upper bound on lessons promoted in one pass (`0` = unlimited).
    /// Remaining lessons are picked up on the next pass.
    #[serde(default)]
    pub max_lessons_per_pass: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: d_interval_secs(),
            enforce_asset_gate: false,
            max_lessons_per_pass: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn d_true() -> bool {
    true
}

fn d_interval_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval_is_thirty_seconds() {
        assert_eq!(SchedulerConfig::default().interval(), Duration::from_secs(30));
    }

    #[test]
    fn interval_never_zero() {
        let cfg = SchedulerConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.interval(), Duration::from_secs(1));
    }

    #[test]
    fn deserialize_missing_fields_uses_defaults() {
        let cfg: SchedulerConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.enabled);
        assert_eq!(cfg.interval_secs, 30);
        assert_eq!(cfg.max_lessons_per_pass, 0);
    }
}
