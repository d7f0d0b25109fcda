//! Harvester configuration, passed by value into every component that needs it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result, BATCH_LIMIT, PACING_INTERVAL_MS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Page URL template. `{page}` is replaced with the page number, otherwise
    /// a `page=<n>` query pair is appended.
    pub source_base_url: String,

    /// Selector matching one organization on a page.
    pub item_selector: String,
    pub name_selector: String,
    pub address_selector: String,
    pub website_selector: String,
    /// Selector of the "next page" link. When unset, any non-empty page counts
    /// as having a successor.
    pub next_selector: Option<String>,

    /// Records processed per batch before the harvester pauses.
    pub batch_limit: usize,
    /// Wait between two page fetches.
    pub pacing_interval: Duration,
    pub request_timeout: Duration,

    /// Directory holding the record snapshot.
    pub state_dir: PathBuf,
    /// Directory exported CSV files are written to.
    pub export_dir: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            source_base_url: "http://127.0.0.1:3000/{page}".to_string(),
            item_selector: "div.organization".to_string(),
            name_selector: ".name".to_string(),
            address_selector: ".address".to_string(),
            website_selector: "a.website".to_string(),
            next_selector: None,
            batch_limit: BATCH_LIMIT,
            pacing_interval: Duration::from_millis(PACING_INTERVAL_MS),
            request_timeout: Duration::from_secs(30),
            state_dir: PathBuf::from(".harvest"),
            export_dir: PathBuf::from("."),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from `HARVEST_*` environment variables.
    ///
    /// Every variable is optional and falls back to [`HarvestConfig::default`]:
    /// - `HARVEST_BASE_URL`
    /// - `HARVEST_ITEM_SELECTOR`, `HARVEST_NAME_SELECTOR`, `HARVEST_ADDRESS_SELECTOR`,
    ///   `HARVEST_WEBSITE_SELECTOR`, `HARVEST_NEXT_SELECTOR`
    /// - `HARVEST_BATCH_LIMIT`
    /// - `HARVEST_PACING_MS`, `HARVEST_TIMEOUT_MS`
    /// - `HARVEST_STATE_DIR`, `HARVEST_EXPORT_DIR`
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        tracing::info!(
            base_url = %config.source_base_url,
            batch_limit = config.batch_limit,
            pacing_ms = config.pacing_interval.as_millis() as u64,
            state_dir = %config.state_dir.display(),
            "harvest configuration loaded"
        );

        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = text("HARVEST_BASE_URL") {
            config.source_base_url = url;
        }
        if let Some(sel) = text("HARVEST_ITEM_SELECTOR") {
            config.item_selector = sel;
        }
        if let Some(sel) = text("HARVEST_NAME_SELECTOR") {
            config.name_selector = sel;
        }
        if let Some(sel) = text("HARVEST_ADDRESS_SELECTOR") {
            config.address_selector = sel;
        }
        if let Some(sel) = text("HARVEST_WEBSITE_SELECTOR") {
            config.website_selector = sel;
        }
        config.next_selector = text("HARVEST_NEXT_SELECTOR");

        if let Some(limit) = text("HARVEST_BATCH_LIMIT") {
            config.batch_limit = parse_number("HARVEST_BATCH_LIMIT", &limit)?;
        }
        if let Some(ms) = text("HARVEST_PACING_MS") {
            config.pacing_interval = Duration::from_millis(parse_number("HARVEST_PACING_MS", &ms)?);
        }
        if let Some(ms) = text("HARVEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(parse_number("HARVEST_TIMEOUT_MS", &ms)?);
        }
        if let Some(dir) = text("HARVEST_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Some(dir) = text("HARVEST_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_limit == 0 {
            return Err(Error::Config("batch limit must be at least 1".into()));
        }
        if self.source_base_url.trim().is_empty() {
            return Err(Error::Config("source base url is empty".into()));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = HarvestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.batch_limit, 1000);
        assert_eq!(config.pacing_interval, Duration::from_millis(1000));
    }

    #[test]
    fn env_overrides() {
        let config = HarvestConfig::from_lookup(lookup(&[
            ("HARVEST_BASE_URL", "https://example.org/list?p={page}"),
            ("HARVEST_BATCH_LIMIT", "250"),
            ("HARVEST_PACING_MS", "10"),
            ("HARVEST_NEXT_SELECTOR", "a.next"),
            ("HARVEST_NAME_SELECTOR", "  "),
        ]))
        .unwrap();
        assert_eq!(config.source_base_url, "https://example.org/list?p={page}");
        assert_eq!(config.batch_limit, 250);
        assert_eq!(config.pacing_interval, Duration::from_millis(10));
        assert_eq!(config.next_selector.as_deref(), Some("a.next"));
        assert_eq!(config.name_selector, ".name");
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = HarvestConfig::from_lookup(lookup(&[("HARVEST_BATCH_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = HarvestConfig::from_lookup(lookup(&[("HARVEST_BATCH_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
