//! Maps raw CMS records onto the canonical [`Project`].
//!
//! Three record generations are in circulation:
//!
//! * flat records with language suffixes (`title_pt`, `title_en`, `tags_en`)
//! * the same flat fields wrapped in an `attributes` object (Strapi v4)
//! * records whose text fields are already split per language
//!   (`title: { pt, en }`), as served by Sanity and the static snapshot
//!
//! Each record is sniffed once into a [`RawShape`], which tells where its
//! fields live. Text fields are looked up per field, since one record can
//! carry more than one generation. A malformed field degrades to its empty
//! default; only a record without a usable id is dropped.

use std::{cmp::Ordering, collections::HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    core::{
        color::{is_hex_color, ColorPolicy},
        media::resolve_media_url,
    },
    types::{Language, Project, ProjectImages},
};

const LOCALIZED_FIELDS: [&str; 5] = ["title", "description", "about", "results", "tags"];
const TAG_LABEL_KEYS: [&str; 3] = ["name", "title", "label"];

/// What the normalizer needs to know about the source a record came from.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub media_base: &'a str,
    pub colors: &'a ColorPolicy,
}

type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy)]
pub enum RawShape<'a> {
    Flat(&'a Fields),
    Wrapped {
        id: Option<&'a Value>,
        attributes: &'a Fields,
    },
    Localized(&'a Fields),
}

impl<'a> RawShape<'a> {
    pub fn sniff(raw: &'a Value) -> Option<Self> {
        let fields = raw.as_object()?;
        if let Some(attributes) = fields.get("attributes").and_then(Value::as_object) {
            return Some(RawShape::Wrapped {
                id: fields.get("id").filter(|id| !id.is_null()),
                attributes,
            });
        }
        let localized = LOCALIZED_FIELDS
            .iter()
            .any(|name| fields.get(*name).is_some_and(is_language_map));
        if localized {
            Some(RawShape::Localized(fields))
        } else {
            Some(RawShape::Flat(fields))
        }
    }

    fn fields(&self) -> &'a Fields {
        match *self {
            RawShape::Flat(fields) | RawShape::Localized(fields) => fields,
            RawShape::Wrapped { attributes, .. } => attributes,
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.fields().get(name).filter(|value| is_present(value))
    }

    fn id(&self) -> Option<u64> {
        let value = match *self {
            RawShape::Wrapped { id, attributes } => id.or_else(|| attributes.get("id")),
            RawShape::Flat(fields) | RawShape::Localized(fields) => fields.get("id"),
        };
        value.and_then(as_id)
    }

    fn order(&self) -> Option<f64> {
        self.get("order").and_then(as_number)
    }

    /// `name_<lang>` first, then `name.<lang>`, then the language-neutral
    /// field. Generations mix inside one record, so every field tries all three.
    fn localized(&self, name: &str, lang: Language) -> Option<&'a Value> {
        let fields = self.fields();
        fields
            .get(&format!("{}_{}", name, lang.code()))
            .filter(|value| is_present(value))
            .or_else(|| {
                fields
                    .get(name)
                    .and_then(Value::as_object)
                    .and_then(|value| value.get(lang.code()))
                    .filter(|value| is_present(value))
            })
            .or_else(|| self.get(name).filter(|value| !is_language_map(value)))
    }

    fn text(&self, name: &str, lang: Language) -> String {
        self.localized(name, lang)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn tags(&self, lang: Language) -> Vec<String> {
        self.localized("tags", lang).map(tag_list).unwrap_or_default()
    }

    fn thumbnail(&self, base: &str) -> String {
        let nested = self.get("images").and_then(|images| images.get("thumbnail"));
        [self.get("thumbnail"), self.get("image"), nested]
            .into_iter()
            .flatten()
            .map(|media| resolve_media_url(Some(media), base))
            .find(|url| !url.is_empty())
            .unwrap_or_default()
    }

    fn gallery(&self, base: &str) -> Vec<String> {
        let gallery = self
            .get("gallery")
            .or_else(|| self.get("images").and_then(|images| images.get("gallery")));
        let entries = match gallery {
            Some(Value::Array(entries)) => entries,
            Some(Value::Object(envelope)) => match envelope.get("data") {
                Some(Value::Array(entries)) => entries,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        entries
            .iter()
            .filter(|entry| !entry.is_null())
            .map(|entry| resolve_media_url(Some(entry), base))
            .collect()
    }

    fn color(&self, index: usize, policy: &ColorPolicy) -> String {
        match self.get("color").and_then(Value::as_str).map(str::trim) {
            Some(color) if is_hex_color(color) => color.to_string(),
            _ => policy.color_for(index),
        }
    }
}

fn is_language_map(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| Language::ALL.iter().any(|lang| map.contains_key(lang.code())))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|float| *float >= 0.0 && float.fract() == 0.0 && *float <= u64::MAX as f64)
                .map(|float| float as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Splits `"UI, UX ,Branding"` into `["UI", "UX", "Branding"]`.
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn tag_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(tags) => split_tags(tags),
        Value::Array(items) => items.iter().filter_map(tag_label).collect(),
        Value::Object(envelope) => envelope.get("data").map(tag_list).unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn tag_label(item: &Value) -> Option<String> {
    let label = match item {
        Value::String(tag) => Some(tag.as_str()),
        Value::Object(relation) => {
            let fields = relation
                .get("attributes")
                .and_then(Value::as_object)
                .unwrap_or(relation);
            TAG_LABEL_KEYS
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
        }
        _ => None,
    }?;
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn normalize_shape(
    shape: RawShape<'_>,
    lang: Language,
    index: usize,
    ctx: &NormalizeContext<'_>,
) -> Option<Project> {
    let id = shape.id()?;
    let thumbnail = shape.thumbnail(ctx.media_base);
    Some(Project {
        id,
        title: shape.text("title", lang),
        description: shape.text("description", lang),
        tags: shape.tags(lang),
        image: thumbnail.clone(),
        color: shape.color(index, ctx.colors),
        images: ProjectImages {
            thumbnail,
            gallery: shape.gallery(ctx.media_base),
        },
        about: shape.text("about", lang),
        results: shape.text("results", lang),
    })
}

/// Normalizes one raw record. `None` when the record has no usable id.
pub fn normalize(
    raw: &Value,
    lang: Language,
    index: usize,
    ctx: &NormalizeContext<'_>,
) -> Option<Project> {
    normalize_shape(RawShape::sniff(raw)?, lang, index, ctx)
}

fn by_order(a: &Option<f64>, b: &Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Orders records by their `order` field (fetch order otherwise) and
/// normalizes them, dropping records without an id or with a repeated id.
pub fn normalize_all(records: &[Value], lang: Language, ctx: &NormalizeContext<'_>) -> Vec<Project> {
    let mut shapes: Vec<(Option<f64>, RawShape<'_>)> = records
        .iter()
        .enumerate()
        .filter_map(|(position, raw)| match RawShape::sniff(raw) {
            Some(shape) => Some((shape.order(), shape)),
            None => {
                warn!("Skipping record {}: not an object", position);
                None
            }
        })
        .collect();
    shapes.sort_by(|(a, _), (b, _)| by_order(a, b));

    let mut seen = HashSet::new();
    let mut projects = Vec::with_capacity(shapes.len());
    for (index, (_, shape)) in shapes.into_iter().enumerate() {
        match normalize_shape(shape, lang, index, ctx) {
            Some(project) if seen.insert(project.id) => projects.push(project),
            Some(project) => warn!("Dropping duplicate project id {}", project.id),
            None => warn!("Dropping record at position {}: no usable id", index),
        }
    }
    debug!("Normalized {} of {} records ({})", projects.len(), records.len(), lang);
    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::color_for_index;
    use serde_json::json;

    const BASE: &str = "http://localhost:1337";

    fn ctx(policy: &ColorPolicy) -> NormalizeContext<'_> {
        NormalizeContext {
            media_base: BASE,
            colors: policy,
        }
    }

    fn flat() -> Value {
        json!({
            "id": 7,
            "title_pt": "App Fintech",
            "title_en": "Fintech Mobile App",
            "description_pt": "UI/UX completo",
            "description_en": "End-to-end UI/UX",
            "tags_pt": "Product Design, Fintech, App Mobile",
            "tags_en": "Product Design, Fintech, Mobile App",
            "thumbnail": { "url": "/uploads/cover.png" },
            "gallery": [{ "url": "/uploads/1.png" }, { "url": "https://cdn.example.com/2.png" }],
            "about_pt": "Sobre",
            "about_en": "About",
            "results_pt": "Resultados",
            "results_en": "Results",
            "color": "#4338ca"
        })
    }

    fn wrapped() -> Value {
        let mut attributes = flat();
        let id = attributes.as_object_mut().unwrap().remove("id").unwrap();
        attributes["thumbnail"] = json!({ "data": { "attributes": { "url": "/uploads/cover.png" } } });
        attributes["gallery"] = json!({
            "data": [
                { "id": 1, "attributes": { "url": "/uploads/1.png" } },
                { "id": 2, "attributes": { "url": "https://cdn.example.com/2.png" } }
            ]
        });
        json!({ "id": id, "attributes": attributes })
    }

    fn localized() -> Value {
        json!({
            "id": 7,
            "title": { "pt": "App Fintech", "en": "Fintech Mobile App" },
            "description": { "pt": "UI/UX completo", "en": "End-to-end UI/UX" },
            "tags": {
                "pt": ["Product Design", "Fintech", "App Mobile"],
                "en": ["Product Design", "Fintech", "Mobile App"]
            },
            "image": "http://localhost:1337/uploads/cover.png",
            "color": "#4338ca",
            "images": {
                "thumbnail": "http://localhost:1337/uploads/cover.png",
                "gallery": ["http://localhost:1337/uploads/1.png", "https://cdn.example.com/2.png"]
            },
            "about": { "pt": "Sobre", "en": "About" },
            "results": { "pt": "Resultados", "en": "Results" }
        })
    }

    #[test]
    fn test_sniffing() {
        assert!(matches!(RawShape::sniff(&flat()), Some(RawShape::Flat(_))));
        assert!(matches!(RawShape::sniff(&wrapped()), Some(RawShape::Wrapped { .. })));
        assert!(matches!(RawShape::sniff(&localized()), Some(RawShape::Localized(_))));
        assert!(RawShape::sniff(&json!("project")).is_none());
    }

    #[test]
    fn test_all_shapes_normalize_identically() {
        let policy = ColorPolicy::Palette;
        for lang in Language::ALL {
            let outputs: Vec<String> = [flat(), wrapped(), localized()]
                .iter()
                .map(|raw| {
                    let project = normalize(raw, lang, 0, &ctx(&policy)).unwrap();
                    serde_json::to_string(&project).unwrap()
                })
                .collect();
            assert_eq!(outputs[0], outputs[1], "{}", lang);
            assert_eq!(outputs[0], outputs[2], "{}", lang);
        }
    }

    #[test]
    fn test_flat_record_fields() {
        let policy = ColorPolicy::Palette;
        let project = normalize(&flat(), Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.id, 7);
        assert_eq!(project.title, "Fintech Mobile App");
        assert_eq!(project.tags, vec!["Product Design", "Fintech", "Mobile App"]);
        assert_eq!(project.image, "http://localhost:1337/uploads/cover.png");
        assert_eq!(project.images.thumbnail, project.image);
        assert_eq!(
            project.images.gallery,
            vec!["http://localhost:1337/uploads/1.png", "https://cdn.example.com/2.png"]
        );
    }

    #[test]
    fn test_tag_string_is_split_and_trimmed() {
        let policy = ColorPolicy::Palette;
        let raw = json!({ "id": 1, "tags": "UI, UX ,Branding" });
        let project = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.tags, vec!["UI", "UX", "Branding"]);

        assert_eq!(split_tags(" , ,"), Vec::<String>::new());
        assert_eq!(split_tags("a,,b"), vec!["a", "b"]);
    }

    #[test]
    fn test_relation_tags() {
        let policy = ColorPolicy::Palette;
        let raw = json!({
            "id": 1,
            "tags": { "data": [
                { "id": 3, "attributes": { "name": "Branding" } },
                { "id": 4, "attributes": { "name": "  " } },
                { "title": "Strategy" }
            ] }
        });
        let project = normalize(&raw, Language::Pt, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.tags, vec!["Branding", "Strategy"]);
    }

    #[test]
    fn test_missing_language_falls_back_to_neutral_field() {
        let policy = ColorPolicy::Palette;
        let raw = json!({ "id": 2, "title_pt": "Identidade", "title": "Identity" });
        let project = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.title, "Identity");

        let raw = json!({ "id": 2, "title_pt": "Identidade", "title_en": "" });
        let project = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.title, "");
        assert_eq!(project.description, "");
        assert!(project.tags.is_empty());
        assert_eq!(project.image, "");
    }

    #[test]
    fn test_localized_record_missing_language() {
        let policy = ColorPolicy::Palette;
        let raw = json!({ "id": 2, "title": { "pt": "Identidade" }, "description": "Neutral" });
        let project = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.title, "");
        assert_eq!(project.description, "Neutral");
    }

    #[test]
    fn test_wrapped_record_with_language_maps() {
        let policy = ColorPolicy::Palette;
        let raw = json!({
            "id": 7,
            "attributes": {
                "title": { "pt": "App", "en": "App EN" },
                "tags": { "pt": ["a"], "en": ["b"] },
                "about_en": "About EN"
            }
        });
        let project = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(project.title, "App EN");
        assert_eq!(project.tags, vec!["b"]);
        assert_eq!(project.about, "About EN");
    }

    #[test]
    fn test_localized_record_with_suffixed_fields() {
        let policy = ColorPolicy::Palette;
        let raw = json!({
            "id": 7,
            "title": { "pt": "App", "en": "App EN" },
            "about_en": "About EN",
            "results_pt": "Resultados"
        });
        let en = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(en.title, "App EN");
        assert_eq!(en.about, "About EN");
        assert_eq!(en.results, "");

        let pt = normalize(&raw, Language::Pt, 0, &ctx(&policy)).unwrap();
        assert_eq!(pt.title, "App");
        assert_eq!(pt.about, "");
        assert_eq!(pt.results, "Resultados");
    }

    #[test]
    fn test_malformed_fields_degrade_alone() {
        let policy = ColorPolicy::Palette;
        let raw = json!({
            "id": "12",
            "title_en": 42,
            "description_en": "Still here",
            "tags": { "unexpected": true },
            "thumbnail": [1, 2, 3],
            "gallery": "not a list"
        });
        let project = normalize(&raw, Language::En, 3, &ctx(&policy)).unwrap();
        assert_eq!(project.id, 12);
        assert_eq!(project.title, "");
        assert_eq!(project.description, "Still here");
        assert!(project.tags.is_empty());
        assert_eq!(project.image, "");
        assert!(project.images.gallery.is_empty());
        assert_eq!(project.color, "#059669");
    }

    #[test]
    fn test_record_without_id_is_dropped() {
        let policy = ColorPolicy::Palette;
        for raw in [json!({ "title": "x" }), json!({ "id": "abc" }), json!({ "id": -1 })] {
            assert!(normalize(&raw, Language::En, 0, &ctx(&policy)).is_none());
        }
        let wrapped = json!({ "attributes": { "id": 5, "title": "inner id" } });
        assert_eq!(normalize(&wrapped, Language::En, 0, &ctx(&policy)).map(|p| p.id), Some(5));
    }

    #[test]
    fn test_gallery_keeps_positions() {
        let policy = ColorPolicy::Palette;
        let raw = json!({
            "id": 1,
            "gallery": [{ "url": "/a.png" }, null, {}, { "url": "/b.png" }]
        });
        let project = normalize(&raw, Language::En, 0, &ctx(&policy)).unwrap();
        assert_eq!(
            project.images.gallery,
            vec!["http://localhost:1337/a.png", "", "http://localhost:1337/b.png"]
        );
    }

    #[test]
    fn test_color_fallback() {
        let palette = ColorPolicy::Palette;
        let raw = json!({ "id": 1, "color": "" });
        assert_eq!(normalize(&raw, Language::En, 9, &ctx(&palette)).unwrap().color, "#0284c7");

        let fixed = ColorPolicy::Fixed("#0000FF".to_string());
        assert_eq!(normalize(&raw, Language::En, 9, &ctx(&fixed)).unwrap().color, "#0000FF");

        let raw = json!({ "id": 1, "color": "#ABCDEF" });
        assert_eq!(normalize(&raw, Language::En, 9, &ctx(&fixed)).unwrap().color, "#ABCDEF");
    }

    #[test]
    fn test_normalize_all_orders_and_dedupes() {
        let policy = ColorPolicy::Palette;
        let records = vec![
            json!({ "id": 1, "title": "no order" }),
            json!({ "id": 2, "title": "second", "order": 2 }),
            json!({ "id": 3, "title": "first", "order": "1" }),
            json!({ "title": "no id", "order": 0 }),
            json!({ "id": 2, "title": "duplicate", "order": 3 }),
            json!(null),
            json!({ "id": 4, "title": "also no order" }),
        ];
        let projects = normalize_all(&records, Language::En, &ctx(&policy));
        let titles: Vec<&str> = projects.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "no order", "also no order"]);
        assert_eq!(projects[0].color, color_for_index(1));
    }

    #[test]
    fn test_normalize_all_keeps_fetch_order_without_order_field() {
        let policy = ColorPolicy::Palette;
        let records = vec![json!({ "id": 9 }), json!({ "id": 3 }), json!({ "id": 5 })];
        let ids: Vec<u64> = normalize_all(&records, Language::Pt, &ctx(&policy))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }
}
