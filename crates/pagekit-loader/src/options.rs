//! Script load options
//!
//! Per-call configuration. Field names follow the camelCase spelling used in
//! JSON option documents (`preloadTimeout`, `crossOrigin`, ...).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::LoaderError;

/// Default wait after a preload hint before the script is executed
pub const DEFAULT_PRELOAD_TIMEOUT_MS: u64 = 1500;

/// Options for a single `load_script` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptLoadOptions {
    /// Issue a `<link rel="preload">` hint before executing
    pub preload: bool,
    /// Milliseconds to wait after the hint; the wait is unconditional
    pub preload_timeout: u64,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub defer: bool,
    /// Strip the element from the document when it fails to load
    pub remove_on_unmount: bool,
    /// Short-circuit on URLs the registry already marks as loaded
    pub prevent_duplicates: bool,

    pub id: Option<String>,
    pub cross_origin: Option<String>,
    pub nonce: Option<String>,
    pub integrity: Option<String>,
    #[serde(rename = "type")]
    pub script_type: Option<String>,
    pub referrer_policy: Option<String>,
    pub no_module: bool,
    /// Any further attributes, copied onto the element verbatim
    pub attributes: BTreeMap<String, String>,
}

impl Default for ScriptLoadOptions {
    fn default() -> Self {
        Self {
            preload: false,
            preload_timeout: DEFAULT_PRELOAD_TIMEOUT_MS,
            is_async: true,
            defer: false,
            remove_on_unmount: false,
            prevent_duplicates: true,
            id: None,
            cross_origin: None,
            nonce: None,
            integrity: None,
            script_type: None,
            referrer_policy: None,
            no_module: false,
            attributes: BTreeMap::new(),
        }
    }
}

impl ScriptLoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON options document; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, LoaderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn preload_timeout_ms(mut self, ms: u64) -> Self {
        self.preload_timeout = ms;
        self
    }

    pub fn prevent_duplicates(mut self, prevent: bool) -> Self {
        self.prevent_duplicates = prevent;
        self
    }

    pub fn remove_on_unmount(mut self, remove: bool) -> Self {
        self.remove_on_unmount = remove;
        self
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn defer(mut self, defer: bool) -> Self {
        self.defer = defer;
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_timeout)
    }
}

/// Everything a host needs to build a `<script>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub is_async: bool,
    pub defer: bool,
    /// Passthrough attributes, names lower-cased
    pub attributes: Vec<(String, String)>,
}

impl ScriptTag {
    pub fn new(src: &str, options: &ScriptLoadOptions) -> Self {
        let named = [
            ("id", &options.id),
            ("crossOrigin", &options.cross_origin),
            ("nonce", &options.nonce),
            ("integrity", &options.integrity),
            ("type", &options.script_type),
            ("referrerPolicy", &options.referrer_policy),
        ];

        let mut attributes: Vec<(String, String)> = named
            .into_iter()
            .filter_map(|(name, value)| {
                value.as_ref().map(|v| (name.to_ascii_lowercase(), v.clone()))
            })
            .collect();

        if options.no_module {
            attributes.push(("nomodule".to_string(), String::new()));
        }

        for (name, value) in &options.attributes {
            let name = name.to_ascii_lowercase();
            if name == "src" {
                continue;
            }
            attributes.retain(|(existing, _)| *existing != name);
            attributes.push((name, value.clone()));
        }

        Self {
            src: src.to_string(),
            is_async: options.is_async,
            defer: options.defer,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ScriptLoadOptions::default();
        assert!(!opts.preload);
        assert_eq!(opts.preload_timeout, 1500);
        assert!(opts.is_async);
        assert!(!opts.defer);
        assert!(!opts.remove_on_unmount);
        assert!(opts.prevent_duplicates);
    }

    #[test]
    fn test_from_json_camel_case() {
        let opts = ScriptLoadOptions::from_json(
            r#"{"preload": true, "preloadTimeout": 250, "async": false, "crossOrigin": "anonymous"}"#,
        )
        .unwrap();

        assert!(opts.preload);
        assert_eq!(opts.preload_delay(), Duration::from_millis(250));
        assert!(!opts.is_async);
        assert_eq!(opts.cross_origin.as_deref(), Some("anonymous"));
        assert!(opts.prevent_duplicates);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            ScriptLoadOptions::from_json("{\"preload\": 3"),
            Err(LoaderError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_tag_lowercases_attribute_names() {
        let mut opts = ScriptLoadOptions::default();
        opts.cross_origin = Some("use-credentials".into());
        opts.referrer_policy = Some("no-referrer".into());
        opts.no_module = true;
        let opts = opts.attribute("data-Widget", "chat");

        let tag = ScriptTag::new("/w.js", &opts);
        assert!(tag.attributes.contains(&("crossorigin".to_string(), "use-credentials".to_string())));
        assert!(tag.attributes.contains(&("referrerpolicy".to_string(), "no-referrer".to_string())));
        assert!(tag.attributes.contains(&("nomodule".to_string(), String::new())));
        assert!(tag.attributes.contains(&("data-widget".to_string(), "chat".to_string())));
    }

    #[test]
    fn test_extra_attributes_cannot_override_src() {
        let opts = ScriptLoadOptions::default().attribute("SRC", "/evil.js");
        let tag = ScriptTag::new("/good.js", &opts);
        assert_eq!(tag.src, "/good.js");
        assert!(tag.attributes.iter().all(|(name, _)| name != "src"));
    }
}
