use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Pt, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pt" | "pt-br" => Ok(Language::Pt),
            "en" | "en-us" => Ok(Language::En),
            other => Err(format!("unsupported language \"{}\"", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ProjectImages {
    pub thumbnail: String,
    pub gallery: Vec<String>,
}

/// A project resolved to one language, ready for rendering.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image: String,
    pub color: String,
    pub images: ProjectImages,
    pub about: String,
    pub results: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct LocalizedText<T> {
    pub pt: T,
    pub en: T,
}

/// Record shape of the static snapshot: every text field keeps both languages.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LocalizedProject {
    pub id: u64,
    pub order: usize,
    pub title: LocalizedText<String>,
    pub description: LocalizedText<String>,
    pub tags: LocalizedText<Vec<String>>,
    pub image: String,
    pub color: String,
    pub images: ProjectImages,
    pub about: LocalizedText<String>,
    pub results: LocalizedText<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProjectDetail {
    pub project: Project,
    pub next: Option<Project>,
}

/// The project following `id` in display order, wrapping around to the first.
pub fn next_after(projects: &[Project], id: u64) -> Option<&Project> {
    let position = projects.iter().position(|project| project.id == id)?;
    projects.get((position + 1) % projects.len())
}
