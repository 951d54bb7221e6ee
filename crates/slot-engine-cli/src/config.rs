//! Engine configuration layering for the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use slot_engine::config::parse_time_of_day;
use slot_engine::EngineConfig;

/// Flags that override the layered configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct EngineArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<String>,
    /// IANA timezone the working day is expressed in (e.g. "Europe/Dublin")
    #[arg(long)]
    pub timezone: Option<String>,
    /// Minutes kept clear around every busy interval
    #[arg(long)]
    pub buffer: Option<i64>,
    /// Start of the working day, HH:MM
    #[arg(long)]
    pub day_start: Option<String>,
    /// End of the working day, HH:MM
    #[arg(long)]
    pub day_end: Option<String>,
}

/// Defaults, then the TOML file, then `SLOTPLAN_*` variables, then flags.
///
/// Nested keys use a double underscore: `SLOTPLAN_POLICY__DAY_START=08:00`.
pub fn load(args: &EngineArgs) -> Result<EngineConfig> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
    if let Some(path) = args.config.as_deref() {
        if !Path::new(path).exists() {
            anyhow::bail!("Config file not found: {}", path);
        }
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("SLOTPLAN_").split("__"));

    let mut config: EngineConfig = figment
        .extract()
        .context("Failed to load engine configuration")?;
    apply_overrides(&mut config, args)?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn apply_overrides(config: &mut EngineConfig, args: &EngineArgs) -> Result<()> {
    if let Some(tz) = &args.timezone {
        config.timezone = tz.clone();
    }
    if let Some(buffer) = args.buffer {
        config.buffer_minutes = buffer;
    }
    if let Some(raw) = args.day_start.as_deref() {
        config.policy.day_start = time_of_day(raw)?;
    }
    if let Some(raw) = args.day_end.as_deref() {
        config.policy.day_end = time_of_day(raw)?;
    }
    Ok(())
}

fn time_of_day(raw: &str) -> Result<chrono::NaiveTime> {
    parse_time_of_day(raw).with_context(|| format!("Invalid time of day: '{}' (expected HH:MM)", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn flags_override_defaults() {
        let mut config = EngineConfig::default();
        let args = EngineArgs {
            timezone: Some("Asia/Tokyo".into()),
            buffer: Some(10),
            day_start: Some("08:30".into()),
            ..EngineArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.timezone, "Asia/Tokyo");
        assert_eq!(config.buffer_minutes, 10);
        assert_eq!(config.policy.day_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(config.policy.day_end, NaiveTime::from_hms_opt(21, 0, 0).unwrap());
    }

    #[test]
    fn bad_time_of_day_is_rejected() {
        let mut config = EngineConfig::default();
        let args = EngineArgs {
            day_end: Some("half past nine".into()),
            ..EngineArgs::default()
        };
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[test]
    fn toml_file_is_layered_over_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "slotplan.toml",
                "buffer_minutes = 15\ntimezone = \"Europe/Dublin\"\n\n[policy]\nday_start = \"08:00\"\nday_end = \"17:00\"\n",
            )?;
            let args = EngineArgs {
                config: Some("slotplan.toml".into()),
                ..EngineArgs::default()
            };
            let config = load(&args).map_err(|e| e.to_string())?;
            assert_eq!(config.buffer_minutes, 15);
            assert_eq!(config.timezone, "Europe/Dublin");
            assert_eq!(config.policy.day_end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
            assert_eq!(config.min_slot_minutes, 30);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("slotplan.toml", "buffer_minutes = 15\n")?;
            jail.set_env("SLOTPLAN_BUFFER_MINUTES", "45");
            jail.set_env("SLOTPLAN_POLICY__DAY_START", "07:30");
            let args = EngineArgs {
                config: Some("slotplan.toml".into()),
                ..EngineArgs::default()
            };
            let config = load(&args).map_err(|e| e.to_string())?;
            assert_eq!(config.buffer_minutes, 45);
            assert_eq!(config.policy.day_start, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
            Ok(())
        });
    }
}
