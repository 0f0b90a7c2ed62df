use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    core::chain::SourceChain,
    types::{Language, LocalizedProject, LocalizedText, Project},
    Error, Result,
};

/// The static fallback document served by the `static` source.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub projects: Vec<LocalizedProject>,
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    match File::open(path) {
        Ok(file) => {
            let mut buffer: Vec<u8> = Vec::new();
            let mut reader = BufReader::new(file);
            let size = reader.read_to_end(&mut buffer)?;
            info!("Snapshot size: {}", size);
            match serde_json::from_slice::<Snapshot>(&buffer) {
                Ok(snapshot) => Ok(snapshot),
                Err(err) => {
                    error!("Snapshot structure is incorrect: {}", err);
                    Err(err.into())
                }
            }
        }
        Err(err) => {
            error!("Error opening snapshot {}: {}", path.display(), err);
            Err(err.into())
        }
    }
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).map_err(|err| {
        error!("Could not create snapshot {}: {}", path.display(), err);
        err
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()?;
    Ok(())
}

/// Zips the per-language lists of the same source into snapshot records.
pub fn localize(pt: Vec<Project>, en: Vec<Project>) -> Vec<LocalizedProject> {
    let mut english: HashMap<u64, Project> = en.into_iter().map(|project| (project.id, project)).collect();
    pt.into_iter()
        .enumerate()
        .map(|(position, pt)| {
            let en = english.remove(&pt.id).unwrap_or_else(|| pt.clone());
            LocalizedProject {
                id: pt.id,
                order: position + 1,
                title: LocalizedText {
                    pt: pt.title,
                    en: en.title,
                },
                description: LocalizedText {
                    pt: pt.description,
                    en: en.description,
                },
                tags: LocalizedText {
                    pt: pt.tags,
                    en: en.tags,
                },
                image: pt.image,
                color: pt.color,
                images: pt.images,
                about: LocalizedText {
                    pt: pt.about,
                    en: en.about,
                },
                results: LocalizedText {
                    pt: pt.results,
                    en: en.results,
                },
            }
        })
        .collect()
}

/// Fetches the first remote source that has projects and writes them to
/// `path` as a snapshot. The existing snapshot is left alone on failure.
pub async fn bake(chain: &SourceChain, path: &Path) -> Result<Snapshot> {
    for source in chain.sources().filter(|source| source.is_remote()) {
        let records = match source.fetch().await {
            Ok(records) => records,
            Err(err) => {
                warn!("Bake: source {} failed: {}", source.name(), err);
                continue;
            }
        };
        let pt = chain.normalize(source, &records, Language::Pt);
        if pt.is_empty() {
            warn!("Bake: source {} returned no usable projects", source.name());
            continue;
        }
        let en = chain.normalize(source, &records, Language::En);
        let snapshot = Snapshot {
            generated_at: Utc::now(),
            projects: localize(pt, en),
        };
        write_snapshot(path, &snapshot)?;
        info!(
            "Baked {} projects from {} to {}",
            snapshot.projects.len(),
            source.name(),
            path.display()
        );
        return Ok(snapshot);
    }
    warn!("Bake: keeping existing snapshot at {}", path.display());
    Err(Error::NothingToBake)
}
