//! Whitelist HTML sanitizer.
//!
//! Input is parsed as an HTML5 body fragment, every node the whitelist does
//! not allow is pruned from the tree, and what remains is written back out
//! with the html5ever serializer. Removed elements take their whole subtree
//! with them.

mod policy;

use std::io;

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{local_name, namespace_url, ns, parse_fragment, Attribute, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

pub use policy::{is_allowed_attribute, is_allowed_tag, is_allowed_uri};

/// Elements nested deeper than this are dropped with their content.
const MAX_DEPTH: usize = 256;

/// Strip everything from `html` that the whitelist does not allow.
///
/// The result re-parses to the same tree, so `sanitize` is idempotent.
pub fn sanitize(html: &str) -> String {
    let dom = parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        Vec::new(),
    )
    .one(html);

    let mut out = Vec::with_capacity(html.len());
    // Fragment nodes hang off a synthetic <html> root.
    for root in dom.document.children.borrow().iter() {
        prune(root, 0);
        if let Err(err) = write_children(root, &mut out) {
            tracing::error!(error = %err, "failed to serialize sanitized html");
            return String::new();
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn write_children(root: &Handle, out: &mut Vec<u8>) -> io::Result<()> {
    serialize(
        out,
        &SerializableHandle::from(root.clone()),
        SerializeOpts::default(),
    )
}

/// Drop the children of `parent` the whitelist rejects and recurse into the
/// elements that stay.
fn prune(parent: &Handle, depth: usize) {
    parent
        .children
        .borrow_mut()
        .retain(|child| keep_node(child, depth));

    for child in parent.children.borrow().iter() {
        if let NodeData::Element { .. } = child.data {
            prune(child, depth + 1);
        }
    }

    if let NodeData::Element { name, .. } = &parent.data {
        if name.local == local_name!("pre") {
            keep_leading_newline(parent);
        }
    }
}

fn keep_node(node: &Handle, depth: usize) -> bool {
    match &node.data {
        NodeData::Text { .. } => true,
        NodeData::Element { name, attrs, .. } => {
            depth < MAX_DEPTH && keep_element(name, &mut attrs.borrow_mut())
        }
        // comments, doctypes, processing instructions
        _ => false,
    }
}

/// Whether an element stays; its attributes are filtered in place.
fn keep_element(name: &QualName, attrs: &mut Vec<Attribute>) -> bool {
    if name.ns != ns!(html) || !policy::is_allowed_tag(&name.local) {
        return false;
    }
    let tag: &str = &name.local;
    attrs.retain(|attr| keep_attribute(tag, attr));

    if tag == "input" {
        if !is_checkbox(attrs) {
            return false;
        }
        if !attrs.iter().any(|attr| attr.name.local == local_name!("disabled")) {
            attrs.push(Attribute {
                name: QualName::new(None, ns!(), local_name!("disabled")),
                value: StrTendril::new(),
            });
        }
    }
    true
}

fn keep_attribute(tag: &str, attr: &Attribute) -> bool {
    if attr.name.ns != ns!() {
        return false;
    }
    let name: &str = &attr.name.local;
    policy::is_allowed_attribute(tag, name)
        && (!policy::is_uri_attribute(name) || policy::is_allowed_uri(&attr.value))
}

fn is_checkbox(attrs: &[Attribute]) -> bool {
    attrs
        .iter()
        .any(|attr| &*attr.name.local == "type" && attr.value.eq_ignore_ascii_case("checkbox"))
}

/// The parser eats one newline right after `<pre>`, so a leading newline is
/// doubled to survive the next parse.
fn keep_leading_newline(pre: &Handle) {
    if let Some(first) = pre.children.borrow().first() {
        if let NodeData::Text { contents } = &first.data {
            let mut contents = contents.borrow_mut();
            if contents.starts_with('\n') {
                *contents = StrTendril::from(format!("\n{}", &**contents));
            }
        }
    }
}
