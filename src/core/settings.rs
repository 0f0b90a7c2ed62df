use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufReader, ErrorKind, Read},
    net::Ipv4Addr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{info, warn};

use crate::{core::color::ColorPolicy, Error, Result};

pub const DEFAULT_SETTINGS_PATH: &str = "core/settings.json";
pub const DEFAULT_STRAPI_URL: &str = "http://localhost:1337";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Setting<T> {
    pub name: String,
    pub value: T,
}

impl<T> Setting<T> {
    fn new(name: &str, value: T) -> Self {
        Setting {
            name: name.to_string(),
            value,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Static,
    Sanity,
    Strapi,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Static => "static",
            SourceKind::Sanity => "sanity",
            SourceKind::Strapi => "strapi",
        })
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(SourceKind::Static),
            "sanity" => Ok(SourceKind::Sanity),
            "strapi" => Ok(SourceKind::Strapi),
            other => Err(Error::Settings(format!("unknown source \"{}\"", other))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    pub ipv4_addr: Setting<Ipv4Addr>,
    pub port: Setting<u16>,
    pub strapi_url: Setting<String>,
    pub sanity_project_id: Setting<String>,
    pub sanity_dataset: Setting<String>,
    pub sanity_api_version: Setting<String>,
    pub sanity_use_cdn: Setting<bool>,
    pub static_projects_path: Setting<String>,
    pub source_order: Setting<Vec<SourceKind>>,
    pub request_timeout_secs: Setting<u64>,
    pub cache_ttl_secs: Setting<u64>,
    pub color_policy: Setting<ColorPolicy>,
    pub key_path: Setting<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            ipv4_addr: Setting::new("Ipv4 Address", Ipv4Addr::new(127, 0, 0, 1)),
            port: Setting::new("Port", 4010),
            strapi_url: Setting::new("Strapi URL", DEFAULT_STRAPI_URL.to_string()),
            sanity_project_id: Setting::new("Sanity project id", String::new()),
            sanity_dataset: Setting::new("Sanity dataset", "production".to_string()),
            sanity_api_version: Setting::new("Sanity API version", "2024-01-01".to_string()),
            sanity_use_cdn: Setting::new("Sanity CDN", true),
            static_projects_path: Setting::new(
                "Static projects snapshot",
                "data/projects.json".to_string(),
            ),
            source_order: Setting::new(
                "Source order",
                vec![SourceKind::Static, SourceKind::Sanity, SourceKind::Strapi],
            ),
            request_timeout_secs: Setting::new("Request timeout (s)", 10),
            cache_ttl_secs: Setting::new("Project cache TTL (s)", 300),
            color_policy: Setting::new("Accent color fallback", ColorPolicy::Palette),
            key_path: Setting::new("Bake key file", "key/pass.key".to_string()),
        }
    }

    /// Reads the settings document; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", path.display());
                return Ok(Settings::new().normalized());
            }
            Err(error) => {
                warn!("Settings file {} could not be opened: {}", path.display(), error);
                return Err(error.into());
            }
        };
        let mut buffer = Vec::new();
        BufReader::new(file).read_to_end(&mut buffer)?;
        match serde_json::from_slice::<Settings>(&buffer) {
            Ok(settings) => Ok(settings.normalized()),
            Err(error) => Err(Error::Settings(format!(
                "{} is malformed: {}",
                path.display(),
                error
            ))),
        }
    }

    /// Applies `FOLIO_*` environment overrides. Read once at start-up.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("FOLIO_STRAPI_URL").or_else(|| lookup("VITE_STRAPI_URL")) {
            self.strapi_url.value = url;
        }
        if let Some(port) = lookup("FOLIO_PORT") {
            self.port.value = port
                .trim()
                .parse()
                .map_err(|_| Error::Settings(format!("FOLIO_PORT \"{}\" is not a port", port)))?;
        }
        if let Some(project_id) = lookup("FOLIO_SANITY_PROJECT_ID") {
            self.sanity_project_id.value = project_id;
        }
        if let Some(order) = lookup("FOLIO_SOURCE_ORDER") {
            self.source_order.value = order
                .split(',')
                .filter(|name| !name.trim().is_empty())
                .map(|name| name.parse::<SourceKind>())
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(self.normalized())
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.strapi_url.value.trim().trim_end_matches('/').to_string();
        self.strapi_url.value = if trimmed.is_empty() {
            DEFAULT_STRAPI_URL.to_string()
        } else {
            trimmed
        };
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.ipv4_addr.value, self.port.value)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.value)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.static_projects_path.value)
    }

    pub fn key_path(&self) -> PathBuf {
        PathBuf::from(&self.key_path.value)
    }
}
