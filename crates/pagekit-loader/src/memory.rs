//! In-memory script host
//!
//! Keeps a `Document` and settles script loads on request, so load ordering
//! can be stepped through deterministically.

use std::cell::RefCell;
use std::collections::HashSet;

use pagekit_dom::{Document, NodeId};
use smol::channel::{self, Sender};

use crate::host::{append_preload_link, append_script_element};
use crate::{LoadEvent, LoaderError, PendingLoad, ScriptHost, ScriptTag};

/// When inserted scripts settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMode {
    /// Loads stay pending until `fire_load`/`fire_error`
    #[default]
    Manual,
    /// Loads settle as soon as the element is inserted
    Immediate,
}

#[derive(Debug)]
struct PendingScript {
    node: NodeId,
    src: String,
    sender: Sender<LoadEvent>,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    mode: HostMode,
    document: RefCell<Document>,
    pending: RefCell<Vec<PendingScript>>,
    failing: RefCell<HashSet<String>>,
    created: RefCell<Vec<String>>,
}

impl MemoryHost {
    pub fn new(mode: HostMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn manual() -> Self {
        Self::new(HostMode::Manual)
    }

    pub fn immediate() -> Self {
        Self::new(HostMode::Immediate)
    }

    pub fn mode(&self) -> HostMode {
        self.mode
    }

    /// Make every future immediate-mode load of `src` fail
    pub fn fail_url(&self, src: &str) {
        self.failing.borrow_mut().insert(src.to_string());
    }

    /// Fire `load` on the oldest pending script for `src`
    pub fn fire_load(&self, src: &str) -> bool {
        self.settle(src, LoadEvent::Load)
    }

    /// Fire `error` on the oldest pending script for `src`
    pub fn fire_error(&self, src: &str, reason: &str) -> bool {
        self.settle(src, LoadEvent::Error(reason.to_string()))
    }

    fn settle(&self, src: &str, event: LoadEvent) -> bool {
        let script = {
            let mut pending = self.pending.borrow_mut();
            let Some(idx) = pending.iter().position(|p| p.src == src) else {
                return false;
            };
            pending.remove(idx)
        };
        tracing::trace!(src, node = ?script.node, ?event, "settling script");
        // A dropped receiver means nobody is waiting any more
        let _ = script.sender.try_send(event);
        true
    }

    /// URLs with a load in flight, oldest first
    pub fn pending(&self) -> Vec<String> {
        self.pending.borrow().iter().map(|p| p.src.clone()).collect()
    }

    /// Attached `<script>` elements for `src`
    pub fn script_count(&self, src: &str) -> usize {
        self.document
            .borrow()
            .query_all_by_attr("script", "src", src)
            .len()
    }

    /// Every script element ever created, in creation order
    pub fn created_scripts(&self) -> Vec<String> {
        self.created.borrow().clone()
    }

    /// `href` of every attached preload hint
    pub fn preload_hints(&self) -> Vec<String> {
        let doc = self.document.borrow();
        doc.elements_by_tag("link")
            .into_iter()
            .filter(|&node| doc.get_attribute(node, "rel") == Some("preload"))
            .filter_map(|node| doc.get_attribute(node, "href").map(str::to_string))
            .collect()
    }

    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.document.borrow())
    }

    /// Mutate the document directly, as foreign page code might
    pub fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.document.borrow_mut())
    }
}

impl ScriptHost for MemoryHost {
    fn find_script(&self, src: &str) -> Option<NodeId> {
        self.document.borrow().query_by_attr("script", "src", src)
    }

    fn insert_preload_hint(&self, href: &str) -> Result<NodeId, LoaderError> {
        Ok(append_preload_link(&mut self.document.borrow_mut(), href)?)
    }

    fn insert_script(&self, tag: &ScriptTag) -> Result<PendingLoad, LoaderError> {
        let node = append_script_element(&mut self.document.borrow_mut(), tag)?;
        self.created.borrow_mut().push(tag.src.clone());

        let (sender, events) = channel::bounded(1);
        match self.mode {
            HostMode::Immediate => {
                let event = if self.failing.borrow().contains(&tag.src) {
                    LoadEvent::Error("simulated network failure".to_string())
                } else {
                    LoadEvent::Load
                };
                let _ = sender.try_send(event);
            }
            HostMode::Manual => {
                self.pending.borrow_mut().push(PendingScript {
                    node,
                    src: tag.src.clone(),
                    sender,
                });
            }
        }

        Ok(PendingLoad { node, events })
    }

    fn remove_node(&self, node: NodeId) -> bool {
        self.document.borrow_mut().remove(node).is_ok()
    }
}
