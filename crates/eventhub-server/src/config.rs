use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::info;

use eventhub_db::StoreOptions;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub store: StoreOptions,
    pub checkout_total: i64,
    pub seed_events: Vec<(String, i64)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    fn load(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let busy_timeout_ms: u64 = parse(&var, "EVENTHUB_BUSY_TIMEOUT_MS", "5000")?;
        let seed_events = match var("EVENTHUB_SEED_EVENTS") {
            Some(raw) => parse_seed(&raw).context("EVENTHUB_SEED_EVENTS")?,
            None => Vec::new(),
        };

        Ok(Self {
            host: var("EVENTHUB_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&var, "EVENTHUB_PORT", "3000")?,
            db_path: var("EVENTHUB_DB_PATH")
                .unwrap_or_else(|| "eventhub.db".into())
                .into(),
            store: StoreOptions {
                readers: parse(&var, "EVENTHUB_DB_READERS", "4")?,
                busy_timeout: Duration::from_millis(busy_timeout_ms),
            },
            checkout_total: parse(&var, "EVENTHUB_CHECKOUT_TOTAL", "0")?,
            seed_events,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

/// Parse `name:fee,name:fee`. The fee is split off the last colon so names
/// may contain colons.
pub fn parse_seed(raw: &str) -> Result<Vec<(String, i64)>> {
    let mut events = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, fee) = entry
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("expected name:fee, got {entry:?}"))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("empty event name in {entry:?}");
        }
        let fee: i64 = fee
            .trim()
            .parse()
            .with_context(|| format!("invalid fee in {entry:?}"))?;
        if fee < 0 {
            bail!("negative fee in {entry:?}");
        }
        events.push((name.to_string(), fee));
    }
    Ok(events)
}
