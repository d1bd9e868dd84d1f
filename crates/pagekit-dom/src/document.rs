//! Document - High-level document API

use crate::{DomError, DomResult, DomTree, NodeId};

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a document with the html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let root = tree.root();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes under the document node cannot violate the hierarchy
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let elem = self
            .tree
            .get_mut(node)
            .ok_or(DomError::NotFound)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        elem.set_attr(name, value);
        Ok(())
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.tree.get(node)?.as_element()?.get_attr(name)
    }

    /// Tag name of an element node
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.tree.get(node)?.as_element().map(|e| e.tag())
    }

    pub fn append_to_head(&mut self, node: NodeId) -> DomResult<NodeId> {
        self.tree.append_child(self.head_element, node)
    }

    pub fn append_to_body(&mut self, node: NodeId) -> DomResult<NodeId> {
        self.tree.append_child(self.body_element, node)
    }

    /// Remove a node from wherever it is attached
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        if self.tree.get(node).is_none() {
            return Err(DomError::NotFound);
        }
        if !self.tree.detach(node) {
            return Err(DomError::NotAChild);
        }
        tracing::trace!(?node, "node removed");
        Ok(())
    }

    /// Whether the node is attached to this document
    pub fn contains(&self, node: NodeId) -> bool {
        self.tree.is_connected(node)
    }

    /// First attached `<tag attr="value">` in document order
    pub fn query_by_attr(&self, tag: &str, attr: &str, value: &str) -> Option<NodeId> {
        self.matching(tag, attr, value).next()
    }

    /// Every attached `<tag attr="value">` in document order
    pub fn query_all_by_attr(&self, tag: &str, attr: &str, value: &str) -> Vec<NodeId> {
        self.matching(tag, attr, value).collect()
    }

    /// Every attached element with the given tag
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .filter(|(_, node)| {
                node.as_element()
                    .is_some_and(|e| e.tag().eq_ignore_ascii_case(tag))
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn matching<'a>(
        &'a self,
        tag: &'a str,
        attr: &'a str,
        value: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.tree
            .descendants(self.tree.root())
            .filter(move |(_, node)| {
                node.as_element().is_some_and(|e| {
                    e.tag().eq_ignore_ascii_case(tag) && e.get_attr(attr) == Some(value)
                })
            })
            .map(|(id, _)| id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton() {
        let doc = Document::new("https://example.com/");
        assert_eq!(doc.url(), "https://example.com/");
        assert_eq!(doc.tag_name(doc.head()), Some("head"));
        assert_eq!(doc.tag_name(doc.body()), Some("body"));
        assert!(doc.contains(doc.head()));
    }

    #[test]
    fn test_query_by_attr_skips_detached() {
        let mut doc = Document::default();
        let script = doc.create_element("script");
        doc.set_attribute(script, "src", "/a.js").unwrap();

        assert_eq!(doc.query_by_attr("script", "src", "/a.js"), None);

        doc.append_to_head(script).unwrap();
        assert_eq!(doc.query_by_attr("script", "src", "/a.js"), Some(script));

        doc.remove(script).unwrap();
        assert_eq!(doc.query_by_attr("script", "src", "/a.js"), None);
        assert_eq!(doc.remove(script), Err(DomError::NotAChild));
    }

    #[test]
    fn test_query_all_in_order() {
        let mut doc = Document::default();
        let first = doc.create_element("script");
        let second = doc.create_element("script");
        for node in [first, second] {
            doc.set_attribute(node, "src", "/dup.js").unwrap();
        }
        doc.append_to_body(second).unwrap();
        doc.append_to_head(first).unwrap();

        assert_eq!(doc.query_all_by_attr("script", "src", "/dup.js"), vec![first, second]);
    }
}
