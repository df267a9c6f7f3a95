//! Listing browser configuration.
//!
//! Every value has a design default, so `MapConfig::default()` is a working
//! configuration. Deployments override individual values through `SPACEMAP_*`
//! environment variables.
//!
//! # Example
//!
//! ```no_run
//! use spacemap_browser::config::MapConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MapConfig::from_env()?;
//! println!("Fit padding: {}", config.fit.padding);
//! # Ok(())
//! # }
//! ```

use crate::constants::{
    ACCENT_COLOR, BASE_STYLE, DEFAULT_LISTING_LIMIT, ENV_PREFIX, FIT_MAX_ZOOM, FIT_PADDING,
    FOCUS_DURATION_MS, FOCUS_ZOOM, INITIAL_LAT, INITIAL_LNG, INITIAL_ZOOM, INVERTED_LABEL_COLOR,
    MAX_FIT_PADDING, MAX_ZOOM_LEVEL, NEUTRAL_COLOR,
};
use crate::format::CurrencyFormat;
use crate::geo::Coordinates;
use serde::{Deserialize, Serialize};
use spacemap_runtime::RetryPolicy;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape
    #[error("Failed to parse {var}={value}")]
    Parse {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

fn check_zoom(name: &str, zoom: f64) -> Result<(), ConfigError> {
    if zoom.is_finite() && (0.0..=MAX_ZOOM_LEVEL).contains(&zoom) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be between 0 and {MAX_ZOOM_LEVEL}, got {zoom}")))
    }
}

/// Initial camera and base style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial center.
    pub center: Coordinates,
    /// Initial zoom.
    pub zoom: f64,
    /// Base style identifier understood by the provider.
    pub style: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            center: Coordinates::new(INITIAL_LAT, INITIAL_LNG),
            zoom: INITIAL_ZOOM,
            style: BASE_STYLE.to_string(),
        }
    }
}

/// How the viewport is fitted to the listing set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Padding around the set, in display units.
    pub padding: u32,
    /// Zoom ceiling.
    pub max_zoom: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            padding: FIT_PADDING,
            max_zoom: FIT_MAX_ZOOM,
        }
    }
}

/// Camera flight to a selected listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Close-up zoom.
    pub zoom: f64,
    /// Animation duration in milliseconds.
    pub duration_ms: u64,
}

impl FocusConfig {
    /// Animation duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            zoom: FOCUS_ZOOM,
            duration_ms: FOCUS_DURATION_MS,
        }
    }
}

/// Marker colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerPalette {
    /// Selected fill, unselected border and label.
    pub accent: String,
    /// Unselected fill.
    pub neutral: String,
    /// Label on the accent fill.
    pub inverted_label: String,
}

impl Default for MarkerPalette {
    fn default() -> Self {
        Self {
            accent: ACCENT_COLOR.to_string(),
            neutral: NEUTRAL_COLOR.to_string(),
            inverted_label: INVERTED_LABEL_COLOR.to_string(),
        }
    }
}

/// Map provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Access token handed to the provider when constructing a surface.
    pub access_token: Option<String>,
    /// Automatic retries after the runtime asset fails to load.
    ///
    /// Zero keeps the view in its loading state after the first failure.
    pub load_retries: usize,
    /// Delay before the first retry, in milliseconds.
    pub retry_initial_delay_ms: u64,
    /// Cap on the retry delay, in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl ProviderConfig {
    /// Backoff policy for asset load retries.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.load_retries)
            .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry_max_delay_ms))
            .build()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            load_retries: 0,
            retry_initial_delay_ms: 500,
            retry_max_delay_ms: 8_000,
        }
    }
}

/// Remote listing source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSourceConfig {
    /// Base URL of the REST endpoint, e.g. `https://project.example.co`.
    pub url: String,
    /// Public API key sent with every request.
    pub api_key: String,
    /// Table holding the listings.
    pub table: String,
    /// Default page size when a filter sets no limit.
    pub limit: usize,
}

impl ListingSourceConfig {
    /// Validate remote source settings.
    ///
    /// # Errors
    ///
    /// Returns error if a field is empty or the URL is not http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(invalid(format!("listings url must be http(s): {}", self.url)));
        }
        if self.api_key.is_empty() {
            return Err(invalid("listings api key cannot be empty"));
        }
        if self.table.is_empty() {
            return Err(invalid("listings table cannot be empty"));
        }
        if self.limit == 0 {
            return Err(invalid("listings limit must be > 0"));
        }
        Ok(())
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Where to serve Prometheus metrics, if anywhere.
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "spacemap_browser=debug,spacemap_runtime=info".to_string(),
            metrics_addr: None,
        }
    }
}

/// Complete listing browser configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial camera.
    pub camera: CameraConfig,
    /// Viewport fit after each synchronization.
    pub fit: FitConfig,
    /// Flight to the selected listing.
    pub focus: FocusConfig,
    /// Marker colors.
    pub palette: MarkerPalette,
    /// Rate labels.
    pub currency: CurrencyFormat,
    /// Map provider.
    pub provider: ProviderConfig,
    /// Remote listing source, when one is configured.
    pub listings: Option<ListingSourceConfig>,
    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

impl MapConfig {
    /// Load configuration from `SPACEMAP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from any key/value lookup.
    ///
    /// Keys are the environment variable names, e.g. `SPACEMAP_FIT_PADDING`.
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Self::default();

        if let Some(style) = env.string("MAP_STYLE") {
            config.camera.style = style;
        }
        if let Some(lat) = env.parse("INITIAL_LAT")? {
            config.camera.center.lat = lat;
        }
        if let Some(lng) = env.parse("INITIAL_LNG")? {
            config.camera.center.lng = lng;
        }
        if let Some(zoom) = env.parse("INITIAL_ZOOM")? {
            config.camera.zoom = zoom;
        }
        if let Some(padding) = env.parse("FIT_PADDING")? {
            config.fit.padding = padding;
        }
        if let Some(max_zoom) = env.parse("FIT_MAX_ZOOM")? {
            config.fit.max_zoom = max_zoom;
        }
        if let Some(zoom) = env.parse("FOCUS_ZOOM")? {
            config.focus.zoom = zoom;
        }
        if let Some(duration_ms) = env.parse("FOCUS_DURATION_MS")? {
            config.focus.duration_ms = duration_ms;
        }
        if let Some(accent) = env.string("ACCENT_COLOR") {
            config.palette.accent = accent;
        }
        if let Some(symbol) = env.string("CURRENCY_SYMBOL") {
            config.currency.symbol = symbol;
        }

        config.provider.access_token = env.string("ACCESS_TOKEN");
        if let Some(retries) = env.parse("PROVIDER_RETRIES")? {
            config.provider.load_retries = retries;
        }
        if let Some(delay_ms) = env.parse("PROVIDER_RETRY_DELAY_MS")? {
            config.provider.retry_initial_delay_ms = delay_ms;
        }

        if let Some(url) = env.string("LISTINGS_URL") {
            config.listings = Some(ListingSourceConfig {
                url,
                api_key: env.string("LISTINGS_KEY").unwrap_or_default(),
                table: env.string("LISTINGS_TABLE").unwrap_or_else(|| "spaces".to_string()),
                limit: env.parse("LISTINGS_LIMIT")?.unwrap_or(DEFAULT_LISTING_LIMIT),
            });
        }

        if let Some(filter) = env.string("LOG") {
            config.observability.log_filter = filter;
        }
        config.observability.metrics_addr = env.parse("METRICS_ADDR")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.camera.center.is_valid() {
            return Err(invalid(format!(
                "initial center {} is not a valid coordinate",
                self.camera.center
            )));
        }
        check_zoom("initial zoom", self.camera.zoom)?;
        if self.camera.style.is_empty() {
            return Err(invalid("map style cannot be empty"));
        }
        if self.fit.padding > MAX_FIT_PADDING {
            return Err(invalid(format!("fit padding must be <= {MAX_FIT_PADDING}")));
        }
        check_zoom("fit max zoom", self.fit.max_zoom)?;
        check_zoom("focus zoom", self.focus.zoom)?;
        if self.focus.duration_ms == 0 {
            return Err(invalid("focus duration must be > 0"));
        }
        for (name, color) in [
            ("accent", &self.palette.accent),
            ("neutral", &self.palette.neutral),
            ("inverted label", &self.palette.inverted_label),
        ] {
            if color.is_empty() {
                return Err(invalid(format!("{name} color cannot be empty")));
            }
        }
        if self.provider.retry_max_delay_ms < self.provider.retry_initial_delay_ms {
            return Err(invalid("provider retry max delay must be >= initial delay"));
        }
        if let Some(listings) = &self.listings {
            listings.validate()?;
        }
        Ok(())
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.string(key)
            .map(|value| {
                value.parse().map_err(|_| ConfigError::Parse {
                    var: format!("{ENV_PREFIX}{key}"),
                    value,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_the_design_values() {
        let config = MapConfig::default();
        assert_eq!(config.camera.center, Coordinates::new(39.8283, -98.5795));
        assert!((config.camera.zoom - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.fit.padding, 50);
        assert!((config.fit.max_zoom - 12.0).abs() < f64::EPSILON);
        assert!((config.focus.zoom - 14.0).abs() < f64::EPSILON);
        assert_eq!(config.focus.duration(), Duration::from_millis(1000));
        assert_eq!(config.palette.accent, "#0ea5e9");
        assert_eq!(config.provider.load_retries, 0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_empty_environment_yields_defaults() {
        assert_eq!(MapConfig::from_lookup(lookup(&[])), Ok(MapConfig::default()));
    }

    #[test]
    fn test_overrides_are_applied() -> Result<(), ConfigError> {
        let config = MapConfig::from_lookup(lookup(&[
            ("SPACEMAP_FIT_PADDING", "80"),
            ("SPACEMAP_FOCUS_DURATION_MS", "400"),
            ("SPACEMAP_PROVIDER_RETRIES", "2"),
            ("SPACEMAP_METRICS_ADDR", "127.0.0.1:9090"),
            ("SPACEMAP_LISTINGS_URL", "https://spaces.example.co"),
            ("SPACEMAP_LISTINGS_KEY", "anon-key"),
        ]))?;

        assert_eq!(config.fit.padding, 80);
        assert_eq!(config.focus.duration_ms, 400);
        assert_eq!(config.provider.retry_policy().max_retries, 2);
        assert_eq!(
            config.observability.metrics_addr,
            Some(SocketAddr::from(([127, 0, 0, 1], 9090)))
        );
        let listings = config.listings.ok_or_else(|| invalid("listings missing"))?;
        assert_eq!(listings.table, "spaces");
        assert_eq!(listings.limit, DEFAULT_LISTING_LIMIT);
        Ok(())
    }

    #[test]
    fn test_unparseable_value_names_the_variable() {
        let result = MapConfig::from_lookup(lookup(&[("SPACEMAP_FIT_PADDING", "wide")]));
        assert_eq!(
            result,
            Err(ConfigError::Parse {
                var: "SPACEMAP_FIT_PADDING".to_string(),
                value: "wide".to_string(),
            })
        );
    }

    #[test]
    fn test_out_of_range_zoom_is_rejected() {
        let result = MapConfig::from_lookup(lookup(&[("SPACEMAP_FOCUS_ZOOM", "30")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_remote_source_requires_key() {
        let result = MapConfig::from_lookup(lookup(&[(
            "SPACEMAP_LISTINGS_URL",
            "https://spaces.example.co",
        )]));
        assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("api key")));
    }
}
