//! Operator configuration: which routes are offered, which are selected by
//! default, and how routes are colored when the published color is unusable.
//!
//! Stored as a JSON object on disk; every field is optional:
//! ```json
//! {
//!   "available_routes": ["99", "R4", "20"],
//!   "default_selected_routes": ["99"],
//!   "route_colors": { "99": "#0761A5" },
//!   "default_color": "#F527B4"
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::normalize::canonical_hex_color;
use crate::route_view::ColorPalette;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Short names of the routes kept when reducing the schedule.
    pub available_routes: Vec<String>,
    /// Selection used when nothing has been saved.
    pub default_selected_routes: Vec<String>,
    /// Route short name → fallback `#RRGGBB` color.
    pub route_colors: HashMap<String, String>,
    pub default_color: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let strings = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        Self {
            available_routes: strings(&["99", "R4", "20", "9", "10", "3", "4", "7", "14", "25"]),
            default_selected_routes: strings(&["99", "R4", "20"]),
            route_colors: [
                ("99", "#0761A5"),
                ("R4", "#CE1126"),
                ("20", "#00A84F"),
                ("9", "#FDB913"),
                ("10", "#8E6BA4"),
                ("3", "#F7931E"),
                ("4", "#00B5E2"),
                ("7", "#ED1C24"),
                ("14", "#76232F"),
                ("25", "#8CC63F"),
            ]
            .into_iter()
            .map(|(route, color)| (route.to_string(), color.to_string()))
            .collect(),
            default_color: "#F527B4".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Loads the config from a JSON file at `path`, or the defaults when
    /// `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("{}: cannot read config", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("{}: invalid config", path.display()))?
            }
            None => Self::default(),
        };
        config.validated()
    }

    /// Canonicalizes every configured color to `#RRGGBB`, rejecting any that
    /// are not fully specified hex colors.
    fn validated(mut self) -> Result<Self> {
        self.default_color = match canonical_hex_color(&self.default_color) {
            Some(color) => color,
            None => bail!("default_color {:?} is not #RRGGBB", self.default_color),
        };
        for (route, color) in self.route_colors.iter_mut() {
            match canonical_hex_color(color) {
                Some(canonical) => *color = canonical,
                None => bail!("route_colors[{route:?}] = {color:?} is not #RRGGBB"),
            }
        }
        Ok(self)
    }

    pub fn palette(&self) -> ColorPalette {
        ColorPalette {
            fallbacks: self.route_colors.clone(),
            default_color: self.default_color.clone(),
        }
    }
}

/// Where to fetch the live feed, from the environment (`.env` is honored).
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub url: String,
    pub api_key: Option<String>,
}

impl FeedSource {
    pub const URL_VAR: &'static str = "VEHICLE_POSITIONS_URL";
    pub const API_KEY_VAR: &'static str = "TRANSLINK_API_KEY";
    /// Query parameter carrying the API key.
    pub const API_KEY_PARAM: &'static str = "apikey";

    pub fn from_env() -> Result<Self> {
        let url = std::env::var(Self::URL_VAR)
            .with_context(|| format!("{} must be set", Self::URL_VAR))?;
        let api_key = std::env::var(Self::API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty());
        Ok(Self { url, api_key })
    }
}
