//! Fingerprinted asset lookup for templates.
//!
//! Front-end builds emit a JSON manifest mapping logical asset names to the
//! fingerprinted files they produced:
//!
//! ```json
//! { "app.css": "app-3f9a1c.css", "app.js": "app-0b7d22.js" }
//! ```
//!
//! An [`AssetManifest`] holds that mapping for the lifetime of the process.
//! It is an ordinary value: create it at startup, clone it into the handlers
//! that render pages. Clones share the same map.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Error;

#[derive(Clone, Debug, Default)]
pub struct AssetManifest {
    entries: Arc<DashMap<String, String>>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a manifest file into a new map.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let manifest = Self::new();
        manifest.load_json(std::fs::File::open(path)?)?;
        Ok(manifest)
    }

    /// Merges a JSON manifest into the map. Existing names are overwritten.
    pub fn load_json(&self, reader: impl Read) -> Result<(), Error> {
        let entries: HashMap<String, String> = serde_json::from_reader(reader)?;
        for (name, file) in entries {
            self.entries.insert(name, file);
        }
        Ok(())
    }

    pub fn insert(&self, name: impl Into<String>, file: impl Into<String>) {
        self.entries.insert(name.into(), file.into());
    }

    /// The fingerprinted file for `name`, or `name` itself when unmapped.
    pub fn resolve(&self, name: &str) -> String {
        match self.entries.get(name) {
            Some(file) if !file.is_empty() => file.value().clone(),
            _ => name.to_owned(),
        }
    }

    /// URL path of an asset under `/public/assets`.
    pub fn asset_path(&self, name: &str) -> String {
        join("/public/assets", &self.resolve(name))
    }

    /// `<link>` tag for a stylesheet under `/views/assets/css`.
    pub fn stylesheet_tag(&self, name: &str) -> String {
        let href = join("/views/assets/css", &self.resolve(name));
        format!(r#"<link rel="stylesheet" href="{href}">"#)
    }

    /// `<script>` tag for a script under `/view/assets/js`.
    pub fn script_tag(&self, name: &str) -> String {
        let src = join("/view/assets/js", &self.resolve(name));
        format!(r#"<script type="text/javascript" src="{src}"></script>"#)
    }
}

fn join(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file.trim_start_matches('/'))
}
