use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigSeverity};

/// Span export for `serve`.
///
/// One-shot commands never export. With no endpoint, `serve` writes JSON
/// logs only; with one, each publish pass and cascade span is also sent
/// over OTLP/gRPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Collector URL, e.g. `http://localhost:4317`. Blank means disabled.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "d_service_name")]
    pub service_name: String,

    /// Fraction of pass traces kept, in `0.0..=1.0`.
    #[serde(default = "d_sample_rate")]
    pub sample_rate: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: d_service_name(),
            sample_rate: d_sample_rate(),
        }
    }
}

fn d_service_name() -> String {
    "syllabus".into()
}

fn d_sample_rate() -> f64 {
    1.0
}

impl ObservabilityConfig {
    /// The endpoint to export to, if export is on.
    pub fn export_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub(super) fn check(&self, issues: &mut Vec<ConfigError>) {
        if !(0.0..=1.0).contains(&self.sample_rate) {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.sample_rate".into(),
                message: "sample_rate must be between 0.0 and 1.0".into(),
            });
        }

        let Some(endpoint) = self.export_endpoint() else {
            return;
        };
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.otlp_endpoint".into(),
                message: format!("'{endpoint}' must start with http:// or https://"),
            });
        }
        if self.service_name.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.service_name".into(),
                message: "service_name must not be empty when exporting".into(),
            });
        }
        if self.sample_rate == 0.0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "observability.sample_rate".into(),
                message: "export is configured but no traces will be sampled".into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues(cfg: &ObservabilityConfig) -> Vec<ConfigError> {
        let mut out = Vec::new();
        cfg.check(&mut out);
        out
    }

    #[test]
    fn defaults_do_not_export() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.export_endpoint(), None);
        assert_eq!(cfg.service_name, "syllabus");
        assert!(issues(&cfg).is_empty());
    }

    #[test]
    fn blank_endpoint_means_disabled() {
        let cfg: ObservabilityConfig = toml::from_str("otlp_endpoint = \"  \"").unwrap();
        assert_eq!(cfg.export_endpoint(), None);
        assert!(issues(&cfg).is_empty());
    }

    #[test]
    fn endpoint_is_trimmed() {
        let cfg: ObservabilityConfig =
            toml::from_str("otlp_endpoint = \" http://otel:4317 \"\nsample_rate = 0.1").unwrap();
        assert_eq!(cfg.export_endpoint(), Some("http://otel:4317"));
        assert!(issues(&cfg).is_empty());
    }

    #[test]
    fn endpoint_without_scheme_is_an_error() {
        let cfg = ObservabilityConfig {
            otlp_endpoint: Some("otel:4317".into()),
            ..ObservabilityConfig::default()
        };
        let found = issues(&cfg);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, "observability.otlp_endpoint");
        assert_eq!(found[0].severity, ConfigSeverity::Error);
    }

    #[test]
    fn exporting_without_a_service_name_is_an_error() {
        let cfg = ObservabilityConfig {
            otlp_endpoint: Some("https://collector.example.com".into()),
            service_name: " ".into(),
            ..ObservabilityConfig::default()
        };
        assert!(issues(&cfg)
            .iter()
            .any(|i| i.field == "observability.service_name"));
    }

    #[test]
    fn zero_sampling_only_warns_when_exporting() {
        let quiet = ObservabilityConfig {
            sample_rate: 0.0,
            ..ObservabilityConfig::default()
        };
        assert!(issues(&quiet).is_empty());

        let exporting = ObservabilityConfig {
            otlp_endpoint: Some("http://localhost:4317".into()),
            ..quiet
        };
        let found = issues(&exporting);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, ConfigSeverity::Warning);
    }

    #[test]
    fn out_of_range_sample_rate_is_an_error() {
        let cfg = ObservabilityConfig {
            sample_rate: 1.5,
            ..ObservabilityConfig::default()
        };
        assert_eq!(issues(&cfg)[0].field, "observability.sample_rate");
    }
}
