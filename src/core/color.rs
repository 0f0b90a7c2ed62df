use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

/// Accent palette assigned by position when a project has no color of its own.
pub const PALETTE: [&str; 8] = [
    "#4338ca", // indigo
    "#0284c7", // sky
    "#c2410c", // orange
    "#059669", // emerald
    "#7c3aed", // violet
    "#be185d", // pink
    "#0891b2", // cyan
    "#dc2626", // red
];

pub const DEFAULT_FIXED_COLOR: &str = "#0000FF";

pub fn color_for_index(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(tag = "policy", content = "color", rename_all = "snake_case")]
#[serde(from = "PolicySetting")]
pub enum ColorPolicy {
    #[default]
    Palette,
    Fixed(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum PolicyKind {
    Palette,
    Fixed,
}

/// `{ "policy": "fixed" }` without a color means [`DEFAULT_FIXED_COLOR`].
#[derive(Deserialize)]
struct PolicySetting {
    policy: PolicyKind,
    #[serde(default)]
    color: Option<String>,
}

impl From<PolicySetting> for ColorPolicy {
    fn from(setting: PolicySetting) -> Self {
        match setting.policy {
            PolicyKind::Palette => ColorPolicy::Palette,
            PolicyKind::Fixed => ColorPolicy::Fixed(
                setting
                    .color
                    .unwrap_or_else(|| DEFAULT_FIXED_COLOR.to_string()),
            ),
        }
    }
}

impl ColorPolicy {
    pub fn color_for(&self, index: usize) -> String {
        match self {
            ColorPolicy::Fixed(color) if is_hex_color(color) => color.clone(),
            _ => color_for_index(index).to_string(),
        }
    }
}

/// `#rgb` or `#rrggbb`.
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn rgb(value: &str) -> Option<[f64; 3]> {
    if !is_hex_color(value) {
        return None;
    }
    let hex = &value[1..];
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok().map(|c| c as f64 / 255.0);
    if hex.len() == 3 {
        let mut out = [0.0; 3];
        for (slot, c) in out.iter_mut().zip(hex.chars()) {
            *slot = channel(&format!("{}{}", c, c))?;
        }
        Some(out)
    } else {
        Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?])
    }
}

/// Black or white, whichever reads better on top of `background` (WCAG luminance).
pub fn text_color_for(background: &str) -> &'static str {
    let Some([r, g, b]) = rgb(background) else {
        return "#000000";
    };
    let linear = |c: f64| {
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let luminance = 0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b);
    if luminance > 0.5 {
        "#000000"
    } else {
        "#FFFFFF"
    }
}

/// Colors sampled from project images, keyed by image URL.
#[derive(Clone, Debug, Default)]
pub struct ColorCache {
    colors: Arc<RwLock<HashMap<String, String>>>,
}

impl ColorCache {
    pub fn new() -> Self {
        ColorCache::default()
    }

    pub fn get(&self, image_url: &str) -> Option<String> {
        let colors = self.colors.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        colors.get(image_url).cloned()
    }

    /// Returns false when the entry was rejected.
    pub fn save(&self, image_url: &str, color: &str) -> bool {
        if image_url.is_empty() || !is_hex_color(color) {
            return false;
        }
        let mut colors = self.colors.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        colors.insert(image_url.to_string(), color.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.colors.read().map(|colors| colors.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
