use std::path::Path;

use serde::{Deserialize, Serialize};

/// Map defaults for the business view.
///
/// Loaded as defaults, then an optional JSON file, then environment
/// overrides (`BIZMAP_*`, plus `MAPBOX_ACCESS_TOKEN`).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    /// Zoom used when the camera flies to a selected business.
    pub business_view_zoom: f64,
    pub transition_duration_ms: u64,
    pub map_style: String,
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            longitude: -71.0589,
            latitude: 42.3601,
            zoom: 10.0,
            business_view_zoom: 15.0,
            transition_duration_ms: 2000,
            map_style: "mapbox://styles/mapbox/streets-v11".to_string(),
            access_token: None,
        }
    }
}

impl std::fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapConfig")
            .field("longitude", &self.longitude)
            .field("latitude", &self.latitude)
            .field("zoom", &self.zoom)
            .field("business_view_zoom", &self.business_view_zoom)
            .field("transition_duration_ms", &self.transition_duration_ms)
            .field("map_style", &self.map_style)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Env { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config read error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config is not valid JSON: {msg}"),
            ConfigError::Env { var, value } => write!(f, "invalid value for {var}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl MapConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| ConfigError::Io(format!("{}: {e}", p.display())))?;
                Self::from_json_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        env_f64(&lookup, "BIZMAP_LONGITUDE", &mut self.longitude)?;
        env_f64(&lookup, "BIZMAP_LATITUDE", &mut self.latitude)?;
        env_f64(&lookup, "BIZMAP_ZOOM", &mut self.zoom)?;
        env_f64(&lookup, "BIZMAP_BUSINESS_VIEW_ZOOM", &mut self.business_view_zoom)?;
        if let Some(raw) = lookup("BIZMAP_TRANSITION_DURATION_MS") {
            self.transition_duration_ms =
                raw.trim().parse().map_err(|_| ConfigError::Env {
                    var: "BIZMAP_TRANSITION_DURATION_MS",
                    value: raw.clone(),
                })?;
        }
        if let Some(style) = lookup("BIZMAP_MAP_STYLE") {
            self.map_style = style;
        }
        if let Some(token) = lookup("MAPBOX_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.access_token = Some(token);
        }
        Ok(())
    }
}

fn env_f64(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut f64,
) -> Result<(), ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => {
            *slot = v;
            Ok(())
        }
        _ => Err(ConfigError::Env { var, value: raw }),
    }
}
