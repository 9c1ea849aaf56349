//! The whitelist. Anything not named here is removed.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "caption", "cite", "code", "dd", "del", "details",
    "div", "dl", "dt", "em", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "img", "input", "ins", "kbd", "li", "mark", "ol", "p", "pre", "q", "s", "samp",
    "section", "small", "span", "strong", "sub", "summary", "sup", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "u", "ul",
];

/// Attributes allowed on every allowed tag.
const GLOBAL_ATTRIBUTES: &[&str] = &["class", "id", "title"];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    (
        "a",
        &["href", "rel", "aria-label", "data-footnote-ref", "data-footnote-backref"],
    ),
    ("blockquote", &["cite"]),
    ("details", &["open"]),
    ("img", &["src", "alt", "width", "height"]),
    ("input", &["type", "checked", "disabled"]),
    ("li", &["value"]),
    ("ol", &["start"]),
    ("q", &["cite"]),
    ("section", &["data-footnotes"]),
    ("td", &["align", "colspan", "rowspan"]),
    ("th", &["align", "colspan", "rowspan"]),
];

/// Attributes holding a URI, checked against [`ALLOWED_PROTOCOLS`].
const URI_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const ALLOWED_PROTOCOLS: &[&str] = &["http", "https", "mailto"];

fn allowed_tags() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| ALLOWED_TAGS.iter().copied().collect())
}

fn tag_attributes() -> &'static HashMap<&'static str, HashSet<&'static str>> {
    static MAP: OnceLock<HashMap<&'static str, HashSet<&'static str>>> = OnceLock::new();
    MAP.get_or_init(|| {
        TAG_ATTRIBUTES
            .iter()
            .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
            .collect()
    })
}

pub fn is_allowed_tag(tag: &str) -> bool {
    allowed_tags().contains(tag)
}

pub fn is_allowed_attribute(tag: &str, attr: &str) -> bool {
    GLOBAL_ATTRIBUTES.contains(&attr)
        || tag_attributes()
            .get(tag)
            .map_or(false, |attrs| attrs.contains(attr))
}

pub fn is_uri_attribute(attr: &str) -> bool {
    URI_ATTRIBUTES.contains(&attr)
}

/// Whether a URI attribute value may be kept.
///
/// Browsers ignore tab and newline anywhere in a URL and skip leading control
/// characters and spaces, so those are removed before looking for a scheme.
/// Values without a scheme (relative paths, fragments, `//host`) are allowed.
pub fn is_allowed_uri(value: &str) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect();
    let cleaned = cleaned.trim_start_matches(|c: char| c <= ' ');

    match cleaned.find([':', '/', '?', '#']) {
        Some(at) if cleaned[at..].starts_with(':') => {
            let scheme = &cleaned[..at];
            ALLOWED_PROTOCOLS
                .iter()
                .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
        }
        _ => true,
    }
}
