use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    core::{
        color::ColorPolicy,
        normalize::{normalize_all, NormalizeContext},
        settings::{Settings, SourceKind},
        sources::{
            http_client, ProjectSource, SanitySource, SnapshotLocation, StaticSource, StrapiSource,
        },
    },
    error::SourceError,
    types::{Language, Project},
};

/// Sources tried in priority order until one yields projects.
pub struct SourceChain {
    sources: Vec<Box<dyn ProjectSource>>,
    colors: ColorPolicy,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn ProjectSource>>, colors: ColorPolicy) -> Self {
        SourceChain { sources, colors }
    }

    /// Builds the chain in the configured order. Must run inside the actix
    /// runtime that will drive the requests.
    pub fn from_settings(settings: &Settings) -> Self {
        let client = http_client(settings.request_timeout());
        let mut sources: Vec<Box<dyn ProjectSource>> = Vec::new();
        for kind in &settings.source_order.value {
            match kind {
                SourceKind::Static => sources.push(Box::new(StaticSource::new(
                    SnapshotLocation::parse(&settings.static_projects_path.value),
                    settings.strapi_url.value.clone(),
                    client.clone(),
                ))),
                SourceKind::Sanity if settings.sanity_project_id.value.trim().is_empty() => {
                    debug!("Sanity project id not set, leaving it out of the chain");
                }
                SourceKind::Sanity => sources.push(Box::new(SanitySource::new(
                    settings.sanity_project_id.value.trim().to_string(),
                    settings.sanity_dataset.value.clone(),
                    settings.sanity_api_version.value.clone(),
                    settings.sanity_use_cdn.value,
                    client.clone(),
                ))),
                SourceKind::Strapi => sources.push(Box::new(StrapiSource::new(
                    settings.strapi_url.value.clone(),
                    client.clone(),
                ))),
            }
        }
        SourceChain::new(sources, settings.color_policy.value.clone())
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn ProjectSource> {
        self.sources.iter().map(|source| source.as_ref())
    }

    pub fn normalize(&self, source: &dyn ProjectSource, records: &[Value], lang: Language) -> Vec<Project> {
        let ctx = NormalizeContext {
            media_base: source.media_base(),
            colors: &self.colors,
        };
        normalize_all(records, lang, &ctx)
    }

    async fn attempt(&self, source: &dyn ProjectSource, lang: Language) -> Result<Vec<Project>, SourceError> {
        let records = source.fetch().await?;
        Ok(self.normalize(source, &records, lang))
    }

    /// One pass over the chain. Never fails: exhaustion yields an empty list.
    pub async fn load_projects(&self, lang: Language) -> Vec<Project> {
        for source in self.sources() {
            match self.attempt(source, lang).await {
                Ok(projects) if !projects.is_empty() => {
                    info!("Loaded {} projects from {} ({})", projects.len(), source.name(), lang);
                    return projects;
                }
                Ok(_) => warn!("Source {} returned no usable projects", source.name()),
                Err(error) => warn!("Source {} failed: {}", source.name(), error),
            }
        }
        warn!("Every source failed for {}, serving no projects", lang);
        Vec::new()
    }
}
