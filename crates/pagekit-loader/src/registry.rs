//! Loaded-script registry
//!
//! Records which URLs finished loading. Absence means "never attempted or
//! failed": failures are never recorded, so a later call retries.

use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LoadedScriptRegistry {
    entries: RefCell<HashMap<String, bool>>,
}

impl LoadedScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_loaded(&self, src: &str) {
        self.entries.borrow_mut().insert(src.to_string(), true);
    }

    /// Forget a URL. Returns whether it was recorded.
    pub fn clear(&self, src: &str) -> bool {
        self.entries.borrow_mut().remove(src).is_some()
    }

    pub fn is_loaded(&self, src: &str) -> bool {
        self.entries.borrow().get(src).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every entry
    pub fn reset(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Loaded URLs, sorted
    pub fn loaded_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, loaded)| **loaded)
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }
}
