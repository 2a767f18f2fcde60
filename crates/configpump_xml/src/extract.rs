//! Subtree extraction by XPath selectors.
//!
//! The extracted document keeps the source root and, for every matched
//! element, the chain of ancestors leading to it. Ancestors shared by several
//! matches are emitted once.

use crate::dom::{Document, NodeId};
use crate::error::XmlResult;
use crate::xpath::XPath;

/// Builds a document holding only the subtrees matched by `selectors`.
///
/// Returns an empty string for empty input or an empty selector list.
/// Selecting `/` or the root element returns the whole document.
pub fn extract<S: AsRef<str>>(xml: &str, selectors: &[S]) -> XmlResult<String> {
    if xml.trim().is_empty() || selectors.is_empty() {
        return Ok(String::new());
    }

    let source = Document::parse(xml)?;
    let root_selector = format!("/{}", source.root_element().name);

    let mut compiled = Vec::with_capacity(selectors.len());
    for selector in selectors {
        let selector = strip_trailing_slashes(selector.as_ref());
        compiled.push(XPath::compile(selector)?);
    }

    if compiled
        .iter()
        .any(|xpath| xpath.as_str() == "/" || xpath.as_str() == root_selector)
    {
        return Ok(source.to_pretty_string());
    }

    let mut target = Document::with_root(source.root_element().clone());
    for xpath in &compiled {
        for item in xpath.evaluate(&source) {
            let Some(matched) = item.as_element(&source) else {
                continue;
            };
            if matched == source.root() {
                return Ok(source.to_pretty_string());
            }
            merge_match(&source, matched, &mut target);
        }
    }

    Ok(target.to_pretty_string())
}

/// Drops trailing slashes; a selector made only of slashes becomes `/`.
fn strip_trailing_slashes(selector: &str) -> &str {
    let stripped = selector.trim_end_matches('/');
    if stripped.is_empty() && !selector.is_empty() {
        "/"
    } else {
        stripped
    }
}

fn merge_match(source: &Document, matched: NodeId, target: &mut Document) {
    let mut cursor = target.root();

    // Ancestors are nearest-first and end with the source root, which the
    // target root already stands in for.
    let mut chain = source.ancestors(matched);
    chain.pop();
    for &ancestor in chain.iter().rev() {
        let Some(element) = source.element(ancestor) else {
            continue;
        };
        cursor = match find_same_child(target, cursor, source, ancestor) {
            Some(existing) => existing,
            None => target.append_element(cursor, element.clone()),
        };
    }

    if find_same_child(target, cursor, source, matched).is_none() {
        target.import_subtree(cursor, source, matched);
    }
}

fn find_same_child(
    target: &Document,
    parent: NodeId,
    source: &Document,
    wanted: NodeId,
) -> Option<NodeId> {
    let wanted = source.element(wanted)?;
    target.child_elements(parent).find(|&child| {
        target
            .element(child)
            .is_some_and(|element| element.same_identity(wanted))
    })
}
