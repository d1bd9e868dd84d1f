//! Fetching script host
//!
//! Document-backed host that downloads each inserted script over HTTP.
//! Requests run on smol's blocking pool; the outcome comes back over the
//! element's event channel.

use std::cell::RefCell;

use pagekit_dom::{Document, NodeId};
use reqwest::blocking::Client;
use smol::channel;
use url::Url;

use crate::host::{append_preload_link, append_script_element};
use crate::{LoadEvent, LoaderError, PendingLoad, ScriptHost, ScriptTag};

pub struct FetchHost {
    document: RefCell<Document>,
    base: Url,
    client: Client,
}

impl FetchHost {
    /// Create a host whose document lives at `base_url`
    pub fn new(base_url: &str) -> Result<Self, LoaderError> {
        let base = Url::parse(base_url).map_err(|e| LoaderError::InvalidUrl {
            src: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .user_agent("Pagekit/0.1")
            .build()?;

        Ok(Self {
            document: RefCell::new(Document::new(base.as_str())),
            base,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a script `src` against the document URL
    pub fn resolve(&self, src: &str) -> Result<Url, LoaderError> {
        self.base.join(src).map_err(|e| LoaderError::InvalidUrl {
            src: src.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.document.borrow())
    }
}

impl ScriptHost for FetchHost {
    fn find_script(&self, src: &str) -> Option<NodeId> {
        self.document.borrow().query_by_attr("script", "src", src)
    }

    fn insert_preload_hint(&self, href: &str) -> Result<NodeId, LoaderError> {
        Ok(append_preload_link(&mut self.document.borrow_mut(), href)?)
    }

    fn insert_script(&self, tag: &ScriptTag) -> Result<PendingLoad, LoaderError> {
        let url = self.resolve(&tag.src)?;
        let node = append_script_element(&mut self.document.borrow_mut(), tag)?;

        let (sender, events) = channel::bounded(1);
        let client = self.client.clone();
        smol::spawn(async move {
            let event = smol::unblock(move || fetch_script(&client, url)).await;
            let _ = sender.send(event).await;
        })
        .detach();

        Ok(PendingLoad { node, events })
    }

    fn remove_node(&self, node: NodeId) -> bool {
        self.document.borrow_mut().remove(node).is_ok()
    }
}

fn fetch_script(client: &Client, url: Url) -> LoadEvent {
    tracing::debug!(%url, "fetching script");

    let response = match client.get(url.clone()).send() {
        Ok(response) => response,
        Err(e) => return LoadEvent::Error(e.to_string()),
    };

    let status = response.status();
    if !status.is_success() {
        return LoadEvent::Error(format!("HTTP {}", status.as_u16()));
    }

    match response.bytes() {
        Ok(body) => {
            tracing::debug!(%url, bytes = body.len(), "script fetched");
            LoadEvent::Load
        }
        Err(e) => LoadEvent::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        let host = FetchHost::new("https://example.com/pages/about").unwrap();
        let url = host.resolve("../js/app.js").unwrap();
        assert_eq!(url.as_str(), "https://example.com/js/app.js");

        let absolute = host.resolve("https://cdn.example.net/lib.js").unwrap();
        assert_eq!(absolute.host_str(), Some("cdn.example.net"));
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            FetchHost::new("not a url"),
            Err(LoaderError::InvalidUrl { .. })
        ));
    }
}
