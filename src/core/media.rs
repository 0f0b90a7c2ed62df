use serde_json::Value;

const ABSOLUTE_PREFIXES: [&str; 4] = ["http://", "https://", "//", "data:"];

pub fn is_absolute(url: &str) -> bool {
    ABSOLUTE_PREFIXES
        .iter()
        .any(|prefix| url.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)))
}

/// Turns a media reference from any CMS generation into a fetchable URL.
///
/// Recognized shapes: a bare string, `{url}`, `{attributes: {url}}`,
/// `{data: {url}}`, `{data: {attributes: {url}}}` and Sanity's
/// `{asset: {url}}`. Anything else resolves to an empty string.
pub fn resolve_media_url(media: Option<&Value>, base_url: &str) -> String {
    match media.and_then(locate_url) {
        Some(url) if is_absolute(url) => url.to_string(),
        Some(url) => format!("{}{}", base_url, url),
        None => String::new(),
    }
}

fn locate_url(media: &Value) -> Option<&str> {
    if let Some(url) = media.as_str() {
        return non_empty(url);
    }
    direct_url(media)
        .or_else(|| media.get("attributes").and_then(direct_url))
        .or_else(|| media.get("asset").and_then(direct_url))
        .or_else(|| {
            let data = media.get("data")?;
            direct_url(data).or_else(|| data.get("attributes").and_then(direct_url))
        })
}

fn direct_url(value: &Value) -> Option<&str> {
    value.get("url").and_then(Value::as_str).and_then(non_empty)
}

fn non_empty(url: &str) -> Option<&str> {
    if url.trim().is_empty() {
        None
    } else {
        Some(url)
    }
}
