//! Script Loader
//!
//! Deduplicated, optionally preloaded script loading over a [`ScriptHost`].
//!
//! Concurrent first-time loads of the same URL are not collapsed: each call
//! that starts before any of them has fired `load` inserts its own element.

use std::rc::Rc;

use futures_util::future::try_join_all;
use pagekit_dom::NodeId;
use smol::Timer;

use crate::{LoadEvent, LoadedScriptRegistry, LoaderError, ScriptHost, ScriptLoadOptions, ScriptTag};

/// A loaded `<script>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub node: NodeId,
    pub src: String,
    /// True when the call was satisfied by an already-loaded element
    pub cached: bool,
}

/// Loads scripts through a host, remembering which URLs completed
pub struct ScriptLoader<H: ScriptHost> {
    host: H,
    registry: Rc<LoadedScriptRegistry>,
}

impl<H: ScriptHost> ScriptLoader<H> {
    /// Create a loader with its own empty registry
    pub fn new(host: H) -> Self {
        Self::with_registry(host, Rc::new(LoadedScriptRegistry::new()))
    }

    /// Create a loader sharing an existing registry
    pub fn with_registry(host: H, registry: Rc<LoadedScriptRegistry>) -> Self {
        Self { host, registry }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn registry(&self) -> &Rc<LoadedScriptRegistry> {
        &self.registry
    }

    /// Load `src` once.
    ///
    /// With `prevent_duplicates`, a URL already marked loaded resolves to the
    /// element currently in the document without any new work. Failures are
    /// not recorded, so calling again retries from scratch.
    pub async fn load_script(
        &self,
        src: &str,
        options: &ScriptLoadOptions,
    ) -> Result<ScriptElement, LoaderError> {
        if src.trim().is_empty() {
            return Err(LoaderError::EmptySrc);
        }

        if options.prevent_duplicates && self.registry.is_loaded(src) {
            match self.host.find_script(src) {
                Some(node) => {
                    tracing::debug!(src, "script already loaded");
                    return Ok(ScriptElement {
                        node,
                        src: src.to_string(),
                        cached: true,
                    });
                }
                None => {
                    // Element was removed behind our back
                    tracing::debug!(src, "stale registry entry, reloading");
                    self.registry.clear(src);
                }
            }
        }

        if options.preload {
            self.host.insert_preload_hint(src)?;
            tracing::debug!(src, timeout_ms = options.preload_timeout, "preload hint issued");
            Timer::after(options.preload_delay()).await;
        }

        let tag = ScriptTag::new(src, options);
        let pending = self.host.insert_script(&tag)?;

        match pending.events.recv().await {
            Ok(LoadEvent::Load) => {
                self.registry.mark_loaded(src);
                tracing::info!(src, "script loaded");
                Ok(ScriptElement {
                    node: pending.node,
                    src: src.to_string(),
                    cached: false,
                })
            }
            Ok(LoadEvent::Error(reason)) => {
                if options.remove_on_unmount {
                    self.host.remove_node(pending.node);
                }
                tracing::warn!(src, %reason, "script failed to load");
                Err(LoaderError::LoadFailed {
                    src: src.to_string(),
                    reason,
                })
            }
            Err(_) => {
                tracing::warn!(src, "script host dropped the load");
                Err(LoaderError::Abandoned { src: src.to_string() })
            }
        }
    }

    /// Remove the first element for `src` and forget it was loaded.
    /// Returns whether an element was removed.
    pub fn unload_script(&self, src: &str) -> bool {
        let removed = self
            .host
            .find_script(src)
            .is_some_and(|node| self.host.remove_node(node));
        self.registry.clear(src);
        tracing::debug!(src, removed, "script unloaded");
        removed
    }

    /// Load one URL after another; stops at the first failure
    pub async fn load_scripts_sequentially<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: &ScriptLoadOptions,
    ) -> Result<Vec<ScriptElement>, LoaderError> {
        let mut loaded = Vec::with_capacity(urls.len());
        for url in urls {
            loaded.push(self.load_script(url.as_ref(), options).await?);
        }
        Ok(loaded)
    }

    /// Start every load at once; fails as soon as any load fails
    pub async fn load_scripts_parallel<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: &ScriptLoadOptions,
    ) -> Result<Vec<ScriptElement>, LoaderError> {
        try_join_all(urls.iter().map(|url| self.load_script(url.as_ref(), options))).await
    }

    /// Whether an element for `src` is in the document or the registry
    /// marks it loaded
    pub fn is_script_loaded(&self, src: &str) -> bool {
        self.host.find_script(src).is_some() || self.registry.is_loaded(src)
    }
}
