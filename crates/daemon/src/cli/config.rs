use sy_domain::config::{Config, ConfigSeverity};

/// Print any issues in the config. Returns `true` when there are no errors
/// (warnings alone still pass).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_alone_pass_validation() {
        let mut config = Config::default();
        config.scheduler.enabled = false;
        assert!(validate(&config, "config.toml"));
    }

    #[test]
    fn errors_fail_validation() {
        let mut config = Config::default();
        config.observability.sample_rate = 2.0;
        assert!(!validate(&config, "config.toml"));
    }

    #[test]
    fn shown_config_parses_back() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.scheduler.interval_secs, 30);
    }
}
