//! Depth bound for raw HTML passed through to the sanitizer.
//!
//! Every raw HTML event is run through the html5ever tokenizer, and the
//! elements it leaves open are tracked across the whole document. An event
//! that would push the open-element count past [`MAX_NESTING`] is turned into
//! literal text instead.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::LocalName;
use pulldown_cmark::Event;

use super::passes::MAX_NESTING;

/// Elements that never take an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Tracks which elements a run of raw HTML leaves open.
struct OpenElements {
    stack: Vec<LocalName>,
    overflow: bool,
}

impl TokenSink for OpenElements {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let tag = match token {
            Token::TagToken(tag) => tag,
            _ => return TokenSinkResult::Continue,
        };
        if self.overflow || VOID_ELEMENTS.contains(&&*tag.name) {
            return TokenSinkResult::Continue;
        }

        match tag.kind {
            TagKind::StartTag => {
                self.stack.push(tag.name);
                self.overflow = self.stack.len() > MAX_NESTING;
            }
            // Stray end tags close nothing.
            TagKind::EndTag => {
                if let Some(index) = self.stack.iter().rposition(|open| *open == tag.name) {
                    self.stack.truncate(index);
                }
            }
        }
        TokenSinkResult::Continue
    }
}

fn tokenize(html: &str, stack: Vec<LocalName>) -> OpenElements {
    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from_slice(html));

    let sink = OpenElements {
        stack,
        overflow: false,
    };
    let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();
    tokenizer.sink
}

/// Escape raw HTML that would nest elements deeper than [`MAX_NESTING`].
///
/// Unclosed and implicitly closed elements count as open, so the bound errs
/// towards escaping.
pub fn limit_raw_html<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut open: Vec<LocalName> = Vec::new();

    for event in events {
        let event = match event {
            Event::Html(raw) | Event::InlineHtml(raw) if exceeds(&raw, &mut open) => {
                Event::Text(raw)
            }
            event => event,
        };
        out.push(event);
    }
    out
}

/// Whether `raw` overflows the open elements; if not, `open` is updated.
fn exceeds(raw: &str, open: &mut Vec<LocalName>) -> bool {
    let sink = tokenize(raw, open.clone());
    if !sink.overflow {
        *open = sink.stack;
    }
    sink.overflow
}
