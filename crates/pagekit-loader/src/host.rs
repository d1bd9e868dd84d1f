//! Script host
//!
//! The document side of script loading: element creation, insertion,
//! removal, and delivery of each script's load/error outcome.

use pagekit_dom::{Document, DomResult, NodeId};
use smol::channel::Receiver;

use crate::{LoaderError, ScriptTag};

/// Outcome of a script element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Load,
    Error(String),
}

/// A script element that has been inserted but not yet settled
#[derive(Debug)]
pub struct PendingLoad {
    pub node: NodeId,
    /// Delivers exactly one event
    pub events: Receiver<LoadEvent>,
}

/// Document plus script execution environment
///
/// Methods take `&self`: concurrent loads on one event loop share the host,
/// so implementations keep their document behind interior mutability.
///
/// The bundled hosts keep their document in a `DomTree` arena, which never
/// frees nodes. Every inserted script and preload hint stays allocated after
/// it is removed, so a long-lived host grows with each load/unload cycle.
pub trait ScriptHost {
    /// First attached `<script>` whose `src` attribute equals `src`
    fn find_script(&self, src: &str) -> Option<NodeId>;

    /// Append `<link rel="preload" as="script" href=...>` to `<head>`
    fn insert_preload_hint(&self, href: &str) -> Result<NodeId, LoaderError>;

    /// Build a `<script>` from `tag`, append it to `<head>` and start loading it
    fn insert_script(&self, tag: &ScriptTag) -> Result<PendingLoad, LoaderError>;

    /// Detach a node. Returns false if it was not attached.
    fn remove_node(&self, node: NodeId) -> bool;
}

/// Create and attach a `<script>` element for `tag`
pub(crate) fn append_script_element(doc: &mut Document, tag: &ScriptTag) -> DomResult<NodeId> {
    let script = doc.create_element("script");
    doc.set_attribute(script, "src", &tag.src)?;
    if tag.is_async {
        doc.set_attribute(script, "async", "")?;
    }
    if tag.defer {
        doc.set_attribute(script, "defer", "")?;
    }
    for (name, value) in &tag.attributes {
        doc.set_attribute(script, name, value)?;
    }
    doc.append_to_head(script)
}

/// Create and attach a script preload hint
pub(crate) fn append_preload_link(doc: &mut Document, href: &str) -> DomResult<NodeId> {
    let link = doc.create_element("link");
    doc.set_attribute(link, "rel", "preload")?;
    doc.set_attribute(link, "as", "script")?;
    doc.set_attribute(link, "href", href)?;
    doc.append_to_head(link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptLoadOptions;

    #[test]
    fn test_append_script_element() {
        let mut doc = Document::default();
        let opts = ScriptLoadOptions::default().defer(true);
        let tag = ScriptTag::new("/app.js", &opts);

        let node = append_script_element(&mut doc, &tag).unwrap();
        assert_eq!(doc.get_attribute(node, "src"), Some("/app.js"));
        assert_eq!(doc.get_attribute(node, "async"), Some(""));
        assert_eq!(doc.get_attribute(node, "defer"), Some(""));
        assert_eq!(doc.query_by_attr("script", "src", "/app.js"), Some(node));
    }

    #[test]
    fn test_append_preload_link() {
        let mut doc = Document::default();
        let node = append_preload_link(&mut doc, "/big.js").unwrap();
        assert_eq!(doc.get_attribute(node, "rel"), Some("preload"));
        assert_eq!(doc.get_attribute(node, "as"), Some("script"));
        assert_eq!(doc.query_by_attr("link", "href", "/big.js"), Some(node));
    }
}
