//! Event stream passes. Each one is a pure `Vec<Event> -> Vec<Event>`.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{Alignment, CowStr, Event, LinkType, Tag, TagEnd};

const FOOTNOTES_OPEN: &str = "<section class=\"footnotes\">\n<ol>\n";
const FOOTNOTES_CLOSE: &str = "</ol>\n</section>\n";

/// Deepest tag nesting passed through to the HTML output.
pub const MAX_NESTING: usize = 128;

/// Drop start/end tag pairs nested deeper than [`MAX_NESTING`], keeping their
/// content in the enclosing element.
pub fn limit_nesting<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    // One entry per open tag: whether its start was emitted.
    let mut open: Vec<bool> = Vec::new();
    let mut emitted = 0usize;

    for event in events {
        match event {
            Event::Start(tag) => {
                let keep = emitted < MAX_NESTING;
                open.push(keep);
                if keep {
                    emitted += 1;
                    out.push(Event::Start(tag));
                }
            }
            Event::End(tag) => {
                if open.pop().unwrap_or(true) {
                    emitted = emitted.saturating_sub(1);
                    out.push(Event::End(tag));
                }
            }
            event => out.push(event),
        }
    }
    out
}

/// Turn raw HTML into literal text. Block HTML becomes a paragraph.
pub fn escape_raw_html<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::HtmlBlock) => Event::Start(Tag::Paragraph),
            Event::End(TagEnd::HtmlBlock) => Event::End(TagEnd::Paragraph),
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            event => event,
        })
        .collect()
}

/// Write table cells with an `align` attribute in place of the inline
/// `text-align` style, which the page's style policy would block.
pub fn align_table_cells<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut alignments: Vec<Alignment> = Vec::new();
    let mut in_head = false;
    let mut column = 0usize;

    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Table(columns)) => {
                alignments = columns;
                Event::Start(Tag::Table(Vec::new()))
            }
            Event::Start(Tag::TableHead) => {
                in_head = true;
                column = 0;
                Event::Start(Tag::TableHead)
            }
            Event::End(TagEnd::TableHead) => {
                in_head = false;
                Event::End(TagEnd::TableHead)
            }
            Event::Start(Tag::TableRow) => {
                column = 0;
                Event::Start(Tag::TableRow)
            }
            Event::Start(Tag::TableCell) => {
                let cell = if in_head { "th" } else { "td" };
                let html = match alignments.get(column).and_then(|a| align_value(*a)) {
                    Some(align) => format!("<{cell} align=\"{align}\">"),
                    None => format!("<{cell}>"),
                };
                Event::Html(html.into())
            }
            Event::End(TagEnd::TableCell) => {
                column += 1;
                Event::Html(if in_head { "</th>" } else { "</td>" }.into())
            }
            event => event,
        })
        .collect()
}

fn align_value(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

fn footnote_key(label: &str) -> String {
    label.to_lowercase()
}

/// Resolve footnote references against their definitions.
///
/// Definitions are lifted out of the body and emitted at the end, in order of
/// first reference, as an ordered list. Definitions nobody references are
/// dropped; references with no definition are left as `[^label]` text.
pub fn resolve_footnotes<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let defined: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(Tag::FootnoteDefinition(label)) => Some(footnote_key(label)),
            _ => None,
        })
        .collect();

    let mut body = Vec::with_capacity(events.len());
    let mut definitions: HashMap<String, Vec<Event<'a>>> = HashMap::new();
    let mut current: Option<(String, Vec<Event<'a>>)> = None;
    let mut depth = 0usize;

    for event in events {
        let event = match event {
            Event::FootnoteReference(label) if !defined.contains(&footnote_key(&label)) => {
                Event::Text(format!("[^{}]", &*label).into())
            }
            event => event,
        };

        match event {
            Event::Start(Tag::FootnoteDefinition(label)) => {
                depth += 1;
                if depth == 1 {
                    current = Some((footnote_key(&label), Vec::new()));
                }
                if let Some((_, buf)) = current.as_mut() {
                    buf.push(Event::Start(Tag::FootnoteDefinition(label)));
                }
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push(Event::End(TagEnd::FootnoteDefinition));
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some((key, buf)) = current.take() {
                        definitions.entry(key).or_insert(buf);
                    }
                }
            }
            event => match current.as_mut() {
                Some((_, buf)) => buf.push(event),
                None => body.push(event),
            },
        }
    }

    // Order of first reference, following references made from inside
    // definitions as well.
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    collect_references(&body, &mut order, &mut seen);
    let mut next = 0;
    while next < order.len() {
        if let Some(definition) = definitions.get(&order[next]) {
            collect_references(definition, &mut order, &mut seen);
        }
        next += 1;
    }

    if order.is_empty() {
        return body;
    }

    body.push(Event::Html(FOOTNOTES_OPEN.into()));
    for key in &order {
        if let Some(definition) = definitions.remove(key) {
            body.push(Event::Html("<li>\n".into()));
            body.extend(definition);
            body.push(Event::Html("</li>\n".into()));
        }
    }
    body.push(Event::Html(FOOTNOTES_CLOSE.into()));
    body
}

fn collect_references(events: &[Event], order: &mut Vec<String>, seen: &mut HashSet<String>) {
    for event in events {
        if let Event::FootnoteReference(label) = event {
            let key = footnote_key(label);
            if seen.insert(key.clone()) {
                order.push(key);
            }
        }
    }
}

/// Link bare `http://`, `https://` and `www.` text.
///
/// Text inside links, images and code blocks is left alone. Adjacent text
/// events are merged first so a URL split by the parser is still seen whole.
pub fn autolink<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut pending: Option<CowStr<'a>> = None;
    let mut skip = 0usize;

    for event in events {
        match event {
            Event::Text(text) if skip == 0 => {
                pending = Some(match pending.take() {
                    None => text,
                    Some(prev) => {
                        let mut joined = prev.into_string();
                        joined.push_str(&text);
                        joined.into()
                    }
                });
                continue;
            }
            _ => {}
        }

        if let Some(text) = pending.take() {
            linkify(text, &mut out);
        }

        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => skip += 1,
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                skip = skip.saturating_sub(1)
            }
            _ => {}
        }
        out.push(event);
    }

    if let Some(text) = pending.take() {
        linkify(text, &mut out);
    }
    out
}

fn linkify<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let mut rest: &str = &text;
    let mut found = Vec::new();
    let mut offset = 0;

    while let Some((start, end)) = find_url(rest) {
        found.push((offset + start, offset + end));
        offset += end;
        rest = &rest[end..];
    }

    if found.is_empty() {
        out.push(Event::Text(text));
        return;
    }

    let mut cursor = 0;
    for (start, end) in found {
        if start > cursor {
            out.push(Event::Text(text[cursor..start].to_string().into()));
        }
        let label = &text[start..end];
        let dest = if label.get(..4).map_or(false, |head| head.eq_ignore_ascii_case("www.")) {
            format!("http://{}", label)
        } else {
            label.to_string()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: dest.into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(label.to_string().into()));
        out.push(Event::End(TagEnd::Link));
        cursor = end;
    }
    if cursor < text.len() {
        out.push(Event::Text(text[cursor..].to_string().into()));
    }
}

const URL_PREFIXES: &[&str] = &["https://", "http://", "www."];

/// Byte range of the first linkable URL in `text`.
fn find_url(text: &str) -> Option<(usize, usize)> {
    let mut prev: Option<char> = None;
    for (start, c) in text.char_indices() {
        let at_boundary = !prev.map_or(false, |p| p.is_alphanumeric() || p == '/' || p == '.');
        prev = Some(c);
        if !at_boundary || !matches!(c, 'h' | 'H' | 'w' | 'W') {
            continue;
        }

        let candidate = &text[start..];
        let Some(prefix) = URL_PREFIXES.iter().find(|prefix| {
            candidate
                .get(..prefix.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
        }) else {
            continue;
        };
        // Checked before measuring so that a run of bad candidates stays linear.
        if !candidate[prefix.len()..].starts_with(|c: char| c.is_alphanumeric()) {
            continue;
        }

        let len = candidate
            .find(|c: char| c.is_whitespace() || c == '<' || c == '>')
            .unwrap_or(candidate.len());
        return Some((start, start + trim_url_end(&candidate[..len])));
    }
    None
}

/// Length of `url` after dropping trailing punctuation and unbalanced `)`.
fn trim_url_end(url: &str) -> usize {
    let open = url.matches('(').count();
    let mut close = url.matches(')').count();
    let mut end = url.len();

    while let Some(c) = url[..end].chars().next_back() {
        match c {
            '.' | ',' | ':' | ';' | '!' | '?' | '\'' | '"' | '*' | '_' | '~' => {}
            ')' if close > open => close -= 1,
            _ => break,
        }
        end -= c.len_utf8();
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{html, Options, Parser};

    fn events(source: &str) -> Vec<Event<'_>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        Parser::new_ext(source, options).collect()
    }

    fn render(events: Vec<Event>) -> String {
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    #[test]
    fn nesting_is_capped() {
        let source = ">".repeat(MAX_NESTING * 2) + " deep";
        let out = limit_nesting(events(&source));
        let html = render(out);
        assert_eq!(html.matches("<blockquote>").count(), MAX_NESTING);
        assert_eq!(html.matches("</blockquote>").count(), MAX_NESTING);
        assert!(html.contains("deep"));
    }

    #[test]
    fn shallow_documents_untouched() {
        let source = "> a\n>\n> - b\n>   - *c*\n";
        assert_eq!(limit_nesting(events(source)), events(source));
    }

    #[test]
    fn escape_turns_html_into_text() {
        let out = escape_raw_html(events("<div>\nhi\n</div>\n\ninline <i>x</i>"));
        assert!(out
            .iter()
            .all(|e| !matches!(e, Event::Html(_) | Event::InlineHtml(_))));
        let html = render(out);
        assert!(html.starts_with("<p>&lt;div&gt;"));
        assert!(html.contains("inline &lt;i&gt;x&lt;/i&gt;"));
    }

    #[test]
    fn escape_leaves_markdown_alone() {
        let source = "# h\n\n*x* `y`";
        assert_eq!(escape_raw_html(events(source)), events(source));
    }

    #[test]
    fn table_alignment_becomes_attribute() {
        let source = "| a | b | c |\n|:--|--:|---|\n| 1 | 2 | 3 |\n";
        let parsed: Vec<Event> = Parser::new_ext(source, Options::ENABLE_TABLES).collect();
        let html = render(align_table_cells(parsed));
        assert!(html.contains(r#"<th align="left">a</th><th align="right">b</th><th>c</th>"#));
        assert!(html.contains(r#"<td align="left">1</td><td align="right">2</td><td>3</td>"#));
        assert!(!html.contains("style="));
    }

    #[test]
    fn footnotes_ordered_by_first_reference() {
        let source = "a[^two] b[^one] c[^two]\n\n[^one]: first\n\n[^two]: second\n";
        let html = render(resolve_footnotes(events(source)));
        let section = html.find("<section").unwrap();
        let second = html.find("second").unwrap();
        let first = html.find("first").unwrap();
        assert!(section < second && second < first);
    }

    #[test]
    fn unreferenced_definition_dropped() {
        let html = render(resolve_footnotes(events("text\n\n[^x]: orphan\n")));
        assert!(!html.contains("orphan"));
        assert!(!html.contains("<section"));
    }

    #[test]
    fn nested_reference_in_definition() {
        let source = "a[^1]\n\n[^1]: see[^2]\n\n[^2]: deeper\n";
        let html = render(resolve_footnotes(events(source)));
        assert!(html.contains("deeper"));
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn find_url_boundaries() {
        assert_eq!(find_url("go to https://a.io now"), Some((6, 18)));
        assert_eq!(find_url("xhttps://a.io"), None);
        assert_eq!(find_url("https://"), None);
        assert_eq!(find_url("www."), None);
        assert_eq!(find_url("(see www.a.io)"), Some((5, 13)));
        assert_eq!(find_url("https://en.wikipedia.org/wiki/Rust_(language)"), Some((0, 45)));
    }

    #[test]
    fn trims_trailing_punctuation() {
        assert_eq!(trim_url_end("https://a.io/x.,;"), "https://a.io/x".len());
        assert_eq!(trim_url_end("https://a.io/x))"), "https://a.io/x".len());
    }

    #[test]
    fn autolink_skips_existing_links_and_code() {
        let source = "[https://a.io](https://b.io)\n\n```\nhttps://c.io\n```\n";
        let before = events(source);
        let after = autolink(before.clone());
        let html = render(after);
        assert_eq!(html.matches("<a ").count(), 1);
        assert!(html.contains("<code>https://c.io\n</code>"));
    }

    #[test]
    fn autolink_pathological_parens() {
        let text = format!("https://a.io/{}", ")".repeat(50_000));
        assert_eq!(find_url(&text), Some((0, "https://a.io/".len())));
    }
}
