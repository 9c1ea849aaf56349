//! Markdown to HTML conversion.
//!
//! The parser's event stream is the intermediate representation. After
//! parsing, a fixed and ordered list of passes rewrites the stream, and the
//! result is written out as HTML. The output is not safe to serve until it has
//! been through [`crate::sanitize`].

mod passes;
mod raw_html;

use pulldown_cmark::{html, Event, Options, Parser};

pub use passes::{
    align_table_cells, autolink, escape_raw_html, limit_nesting, resolve_footnotes, MAX_NESTING,
};
pub use raw_html::limit_raw_html;

/// A stream rewrite applied between parsing and HTML output.
pub type Pass = for<'a> fn(Vec<Event<'a>>) -> Vec<Event<'a>>;

/// Syntax extensions layered on top of CommonMark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Footnotes,
    TaskLists,
}

/// The fixed extension set, in the order their passes run.
pub const EXTENSIONS: &[Extension] = &[Extension::Footnotes, Extension::TaskLists];

impl Extension {
    fn options(self) -> Options {
        match self {
            Extension::Footnotes => Options::ENABLE_FOOTNOTES,
            Extension::TaskLists => Options::ENABLE_TASKLISTS,
        }
    }

    fn pass(self) -> Option<Pass> {
        match self {
            Extension::Footnotes => Some(resolve_footnotes),
            Extension::TaskLists => None,
        }
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    for extension in EXTENSIONS {
        options.insert(extension.options());
    }
    options
}

/// Passes in run order. Raw HTML is escaped or depth-limited before any pass
/// that emits generated markup of its own.
fn passes(allow_html: bool) -> Vec<Pass> {
    let mut passes: Vec<Pass> = Vec::with_capacity(EXTENSIONS.len() + 4);
    passes.push(limit_nesting);
    let raw_html: Pass = if allow_html {
        limit_raw_html
    } else {
        escape_raw_html
    };
    passes.push(raw_html);
    passes.push(align_table_cells);
    passes.extend(EXTENSIONS.iter().filter_map(|extension| extension.pass()));
    passes.push(autolink);
    passes
}

/// Convert Markdown `source` to HTML.
///
/// With `allow_html` off, any raw HTML in the source comes out as escaped
/// text. Never fails; malformed syntax degrades to literal text.
pub fn convert(source: &str, allow_html: bool) -> String {
    let mut events: Vec<Event> = Parser::new_ext(source, parser_options()).collect();
    for pass in passes(allow_html) {
        events = pass(events);
    }

    let mut output = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut output, events.into_iter());
    output
}
