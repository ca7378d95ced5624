use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value as JsonValue;

use crate::consts;

pub mod schema;

pub use schema::prelude::*;

/// Settings document persisted as JSON
///
/// Keys are addressed with dotted paths (`base_roms.emerald`). The raw
/// document is the source of truth, `schema()` gives a typed view of it.
#[derive(Debug, Clone)]
pub struct Config {
    file: PathBuf,
    document: JsonValue,
    schema: Schema
}

/// Document written on first run and used to back-fill missing keys
pub fn default_document() -> anyhow::Result<JsonValue> {
    Ok(serde_json::to_value(Schema::default())?)
}

/// Build `{"a": {"b": value}}` from `"a.b"` and `value`
pub fn nested(key: &str, value: JsonValue) -> JsonValue {
    key.rsplit('.').fold(value, |value, segment| {
        let mut object = serde_json::Map::new();

        object.insert(segment.to_string(), value);

        JsonValue::Object(object)
    })
}

/// Add every key of `defaults` missing from `document`
///
/// Objects are back-filled recursively, a non-object value where the
/// defaults have an object is reset. Returns true if anything changed.
fn backfill(document: &mut JsonValue, defaults: &JsonValue) -> bool {
    let (Some(document), Some(defaults)) = (document.as_object_mut(), defaults.as_object()) else {
        return false;
    };

    let mut updated = false;

    for (key, default) in defaults {
        match document.get_mut(key) {
            None => {
                document.insert(key.clone(), default.clone());

                updated = true;
            }

            Some(value) if default.is_object() => {
                if value.is_object() {
                    updated |= backfill(value, default);
                } else {
                    *value = default.clone();

                    updated = true;
                }
            }

            Some(_) => ()
        }
    }

    updated
}

/// Deep merge `update` into `document`, objects are merged key by key
fn merge(document: &mut JsonValue, update: JsonValue) {
    match (document, update) {
        (JsonValue::Object(document), JsonValue::Object(update)) => {
            for (key, value) in update {
                match document.get_mut(&key) {
                    Some(current) => merge(current, value),
                    None => {
                        document.insert(key, value);
                    }
                }
            }
        }

        (document, update) => *document = update
    }
}

impl Config {
    /// Load settings from the launcher's default config file
    pub fn load_default() -> anyhow::Result<Self> {
        Self::load(consts::config_file()?)
    }

    /// Load settings from the file, creating it with defaults if needed
    pub fn load(file: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let file = file.into();
        let defaults = default_document()?;

        if !file.exists() {
            tracing::info!("Config file not found. Creating default config at {:?}", file);

            let mut config = Self::from_document(file, defaults);

            config.save(None)?;

            return Ok(config);
        }

        tracing::debug!("Reading config data from {:?}", file);

        let content = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read config file {:?}", file))?;

        match serde_json::from_str::<JsonValue>(&content) {
            Ok(mut document) if document.is_object() => {
                let updated = backfill(&mut document, &defaults);
                let mut config = Self::from_document(file, document);

                if updated {
                    tracing::info!("Config file updated with missing default keys");

                    config.save(None)?;
                }

                Ok(config)
            }

            Ok(_) => {
                tracing::warn!("Config file {:?} is not a JSON object. Using default config", file);

                let mut config = Self::from_document(file, defaults);

                config.save(None)?;

                Ok(config)
            }

            Err(err) => {
                tracing::warn!("Failed to parse config file {:?}: {}. Using default config", file, err);

                let mut config = Self::from_document(file, defaults);

                config.save(None)?;

                Ok(config)
            }
        }
    }

    fn from_document(file: PathBuf, document: JsonValue) -> Self {
        let schema = Schema::from(&document);

        Self {
            file,
            document,
            schema
        }
    }

    #[inline]
    pub fn file(&self) -> &Path {
        &self.file
    }

    #[inline]
    pub fn document(&self) -> &JsonValue {
        &self.document
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Look up a dotted key
    ///
    /// Returns `None` if any segment is absent or the value is null or an empty string.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        let mut value = &self.document;

        for segment in key.split('.') {
            value = value.get(segment)?;
        }

        match value {
            JsonValue::Null => None,
            JsonValue::String(string) if string.is_empty() => None,
            value => Some(value)
        }
    }

    /// Look up a dotted key, falling back to `default`
    pub fn get_or(&self, key: &str, default: JsonValue) -> JsonValue {
        self.get(key).cloned().unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(JsonValue::as_str)
    }

    /// String value of the key as a path, as it's stored
    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get_str(key).map(PathBuf::from)
    }

    /// Update a dotted key in memory, creating intermediate objects as needed
    pub fn set(&mut self, key: &str, value: JsonValue) {
        merge(&mut self.document, nested(key, value));

        self.schema = Schema::from(&self.document);
    }

    /// Resolve a relative settings path against the config file's folder
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();

        if path.is_absolute() {
            return path.to_path_buf();
        }

        match self.file.parent() {
            Some(parent) => parent.join(path),
            None => path.to_path_buf()
        }
    }

    pub fn patch_dir(&self) -> PathBuf {
        self.resolve(&self.schema.patch_dir)
    }

    pub fn box_art_dir(&self) -> PathBuf {
        self.resolve(&self.schema.box_art_dir)
    }

    pub fn patched_roms_dir(&self) -> PathBuf {
        self.resolve(&self.schema.patched_roms_dir)
    }

    /// Merge the update into the document, create the configured folders
    /// and write the whole document to disk
    pub fn save(&mut self, update: Option<JsonValue>) -> anyhow::Result<()> {
        tracing::debug!("Updating config data");

        if let Some(update) = update {
            merge(&mut self.document, update);

            self.schema = Schema::from(&self.document);
        }

        for folder in [self.patch_dir(), self.box_art_dir(), self.patched_roms_dir()] {
            fs::create_dir_all(&folder)
                .with_context(|| format!("Failed to create folder {:?}", folder))?;
        }

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.document)?;

        fs::write(&self.file, content)
            .with_context(|| format!("Failed to write config file {:?}", self.file))?;

        tracing::info!("Configuration saved to {:?}", self.file);

        Ok(())
    }
}
