//! Batch-job data merge helpers.
//!
//! A batch job renders one template against many data rows. Before the job
//! starts, every image URL it will touch is collected here and handed to the
//! asset cache in one [`crate::preload::AssetCache::preload_all`] call.
//! Caps bound the work a hostile or malformed data set can enqueue.

use std::collections::{HashMap, HashSet};

use pin_core::{Element, PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};

/// Maximum total URLs collected per batch job.
pub const MAX_JOB_URLS: usize = 1000;

/// Maximum distinct URLs collected per bound field.
pub const MAX_FIELD_URLS: usize = 500;

/// Substitute `{{field}}` placeholders with row values.
///
/// Fields absent from the row keep their placeholder verbatim, which keeps
/// a broken column mapping visible in the output instead of silently
/// rendering blanks.
#[must_use]
pub fn resolve_placeholders(text: &str, row: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + PLACEHOLDER_OPEN.len()..];
        let Some(close) = after_open.find(PLACEHOLDER_CLOSE) else {
            // Unterminated placeholder, keep the tail as-is.
            result.push_str(&rest[open..]);
            return result;
        };
        let field = after_open[..close].trim();
        match row.get(field) {
            Some(value) => result.push_str(value),
            None => {
                result.push_str(&rest[open..open + PLACEHOLDER_OPEN.len() + close
                    + PLACEHOLDER_CLOSE.len()]);
            }
        }
        rest = &after_open[close + PLACEHOLDER_CLOSE.len()..];
    }
    result.push_str(rest);
    result
}

/// Collect every image URL a batch job will need.
///
/// Static image sources contribute once. Dynamic image elements resolve
/// their bound field through `mapping` (field name to data column, falling
/// back to the field name itself) against every row. Duplicates are
/// collapsed, insertion order is preserved, and two caps apply: at most
/// [`MAX_FIELD_URLS`] distinct URLs per bound field and [`MAX_JOB_URLS`]
/// overall. Excess URLs are dropped with a warning rather than failing the
/// job.
#[must_use]
pub fn collect_image_urls(
    elements: &[Element],
    rows: &[HashMap<String, String>],
    mapping: &HashMap<String, String>,
) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |url: &str, urls: &mut Vec<String>| -> bool {
        if url.is_empty() || seen.contains(url) {
            return true;
        }
        if urls.len() >= MAX_JOB_URLS {
            tracing::warn!("batch job exceeds {MAX_JOB_URLS} image URLs, dropping the rest");
            return false;
        }
        seen.insert(url.to_string());
        urls.push(url.to_string());
        true
    };

    for element in elements {
        let Some(image) = element.as_image() else {
            continue;
        };
        if !element.is_dynamic {
            if !push(&image.src, &mut urls) {
                return urls;
            }
            continue;
        }
        let Some(field) = element.dynamic_field.as_deref() else {
            continue;
        };
        let column = mapping.get(field).map_or(field, String::as_str);
        let mut field_urls: HashSet<&str> = HashSet::new();
        for row in rows {
            let Some(url) = row.get(column) else {
                continue;
            };
            if field_urls.contains(url.as_str()) {
                continue;
            }
            if field_urls.len() >= MAX_FIELD_URLS {
                tracing::warn!(
                    "field '{field}' exceeds {MAX_FIELD_URLS} distinct image URLs, \
                     dropping the rest"
                );
                break;
            }
            field_urls.insert(url);
            if !push(url, &mut urls) {
                return urls;
            }
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use pin_core::{ElementKind, ImageBody};

    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn static_image(src: &str) -> Element {
        Element::new("logo", ElementKind::Image(ImageBody::new(src)))
    }

    fn dynamic_image(field: &str) -> Element {
        let mut element = Element::new(
            format!("#{field}"),
            ElementKind::Image(ImageBody::new(format!("{{{{{field}}}}}"))),
        );
        element.is_dynamic = true;
        element.dynamic_field = Some(field.to_string());
        element
    }

    #[test]
    fn test_resolve_substitutes_known_fields() {
        let row = row(&[("title", "Gold Badge"), ("price", "4.99")]);
        assert_eq!(
            resolve_placeholders("{{title}} - ${{price}}", &row),
            "Gold Badge - $4.99"
        );
    }

    #[test]
    fn test_resolve_keeps_unknown_placeholders() {
        let row = row(&[("title", "Gold")]);
        assert_eq!(
            resolve_placeholders("{{title}} {{missing}}", &row),
            "Gold {{missing}}"
        );
    }

    #[test]
    fn test_resolve_keeps_unterminated_placeholder() {
        let row = row(&[("title", "Gold")]);
        assert_eq!(resolve_placeholders("{{title", &row), "{{title");
    }

    #[test]
    fn test_resolve_plain_text_unchanged() {
        assert_eq!(resolve_placeholders("no fields here", &row(&[])), "no fields here");
    }

    #[test]
    fn test_collect_static_and_dynamic() {
        let elements = vec![static_image("https://img.example/logo.png"), dynamic_image("photo")];
        let rows = vec![
            row(&[("photo", "https://img.example/a.png")]),
            row(&[("photo", "https://img.example/b.png")]),
            row(&[("photo", "https://img.example/a.png")]),
        ];
        let urls = collect_image_urls(&elements, &rows, &HashMap::new());
        assert_eq!(
            urls,
            vec![
                "https://img.example/logo.png",
                "https://img.example/a.png",
                "https://img.example/b.png",
            ]
        );
    }

    #[test]
    fn test_collect_resolves_through_mapping() {
        let elements = vec![dynamic_image("photo")];
        let rows = vec![row(&[("product_image", "https://img.example/p.png")])];
        let mapping = row(&[("photo", "product_image")]);
        let urls = collect_image_urls(&elements, &rows, &mapping);
        assert_eq!(urls, vec!["https://img.example/p.png"]);
    }

    #[test]
    fn test_collect_skips_empty_and_text_elements() {
        let text = Element::new("caption", ElementKind::Text(pin_core::TextBody::new("hi")));
        let elements = vec![text, static_image("")];
        assert!(collect_image_urls(&elements, &[], &HashMap::new()).is_empty());
    }

    #[test]
    fn test_per_field_cap_applies() {
        let elements = vec![dynamic_image("photo")];
        let rows: Vec<_> = (0..MAX_FIELD_URLS + 50)
            .map(|i| row(&[("photo", format!("https://img.example/{i}.png").as_str())]))
            .collect();
        let urls = collect_image_urls(&elements, &rows, &HashMap::new());
        assert_eq!(urls.len(), MAX_FIELD_URLS);
    }

    #[test]
    fn test_job_cap_applies_across_fields() {
        let elements = vec![
            dynamic_image("front"),
            dynamic_image("back"),
            dynamic_image("side"),
        ];
        let rows: Vec<_> = (0..MAX_FIELD_URLS)
            .map(|i| {
                row(&[
                    ("front", format!("https://img.example/f{i}.png").as_str()),
                    ("back", format!("https://img.example/b{i}.png").as_str()),
                    ("side", format!("https://img.example/s{i}.png").as_str()),
                ])
            })
            .collect();
        let urls = collect_image_urls(&elements, &rows, &HashMap::new());
        assert_eq!(urls.len(), MAX_JOB_URLS);
    }
}
