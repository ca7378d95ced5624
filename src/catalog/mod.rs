//! Remote hack catalog and artifact downloads.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::consts;
use crate::rom::RomSystem;

pub mod transport;

pub use transport::{HttpTransport, ReqwestTransport};

/// One entry of the remote `hacks.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackDescriptor {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    pub base_rom_id: String,

    #[serde(default)]
    pub box_art_url: Option<String>,

    /// Patch location relative to the server url
    #[serde(rename = "patch_file")]
    pub patch_file_url: String,

    pub system: RomSystem
}

/// Whether the id can be used as a file name inside the patched ROMs folder
pub fn is_valid_id(id: &str) -> bool {
    if id.trim().is_empty() || id.contains(['/', '\\']) {
        return false;
    }

    let mut components = Path::new(id).components();

    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

/// Turn the raw `hacks.json` object into descriptors keyed by id
///
/// Entries that can't be understood (unknown system, missing patch file,
/// id that isn't a plain file name) are skipped, the rest of the catalog
/// stays usable.
pub fn parse_catalog(entries: serde_json::Map<String, JsonValue>) -> HashMap<String, HackDescriptor> {
    let mut catalog = HashMap::with_capacity(entries.len());

    for (key, entry) in entries {
        match serde_json::from_value::<HackDescriptor>(entry) {
            Ok(mut hack) => {
                if hack.id.is_empty() {
                    hack.id = key;
                }

                if !is_valid_id(&hack.id) {
                    tracing::warn!("Skipping catalog entry with invalid id {:?}", hack.id);

                    continue;
                }

                if hack.name.is_empty() {
                    hack.name = hack.id.clone();
                }

                if hack.box_art_url.as_ref().is_some_and(|url| url.is_empty()) {
                    hack.box_art_url = None;
                }

                catalog.insert(hack.id.clone(), hack);
            }

            Err(err) => tracing::warn!("Skipping catalog entry {key}: {err}")
        }
    }

    catalog
}

/// Downloads from the configured server with a filename keyed local cache
#[derive(Clone)]
pub struct CatalogClient {
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("server_url", &self.config.schema().server_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(config: Arc<Config>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport
        }
    }

    #[inline]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.schema().request_timeout)
    }

    /// Absolute url of a file relative to the server url
    pub fn url(&self, relative_url: &str) -> anyhow::Result<String> {
        let server_url = self.config.schema().server_url.trim();

        if server_url.is_empty() {
            anyhow::bail!("Server URL not configured");
        }

        Ok(format!("{}/{}", server_url.trim_end_matches('/'), relative_url.trim_start_matches('/')))
    }

    /// Fetch `hacks.json`, returning `None` on any failure
    pub fn fetch_catalog(&self) -> Option<HashMap<String, HackDescriptor>> {
        match self.try_fetch_catalog() {
            Ok(catalog) => {
                tracing::info!("Fetched {} hacks from the server", catalog.len());

                Some(catalog)
            }

            Err(err) => {
                tracing::error!("Failed to fetch hack list: {err:#}");

                None
            }
        }
    }

    fn try_fetch_catalog(&self) -> anyhow::Result<HashMap<String, HackDescriptor>> {
        let url = self.url(consts::CATALOG_FILE)?;

        tracing::debug!("Fetching hack list from {url}");

        let body = self.transport.get(&url, self.timeout())
            .with_context(|| format!("Request to {url} failed"))?;

        let entries = serde_json::from_slice::<serde_json::Map<String, JsonValue>>(&body)
            .context("Hack list is not a JSON object")?;

        Ok(parse_catalog(entries))
    }

    /// Local path a cached artifact would have
    pub fn cache_path(relative_url: &str, cache_dir: &Path) -> Option<PathBuf> {
        Path::new(relative_url)
            .file_name()
            .map(|name| cache_dir.join(name))
    }

    /// Download a patch file into the patch cache
    pub fn download_patch(&self, patch_url: &str) -> Option<PathBuf> {
        self.download(patch_url, &self.config.patch_dir())
    }

    /// Download box art into the box art cache
    pub fn download_image(&self, image_url: &str) -> Option<PathBuf> {
        self.download(image_url, &self.config.box_art_dir())
    }

    fn download(&self, relative_url: &str, cache_dir: &Path) -> Option<PathBuf> {
        match self.try_download(relative_url, cache_dir) {
            Ok(path) => Some(path),

            Err(err) => {
                tracing::error!("Failed to download {relative_url}: {err:#}");

                None
            }
        }
    }

    fn try_download(&self, relative_url: &str, cache_dir: &Path) -> anyhow::Result<PathBuf> {
        let local_path = Self::cache_path(relative_url, cache_dir)
            .ok_or_else(|| anyhow::anyhow!("No file name in {relative_url}"))?;

        if local_path.exists() {
            tracing::debug!("Using cached {:?}", local_path);

            return Ok(local_path);
        }

        let url = self.url(relative_url)?;

        tracing::info!("Downloading {url}");

        let bytes = self.transport.get(&url, self.timeout())?;

        fs::create_dir_all(cache_dir)?;

        if let Err(err) = fs::write(&local_path, bytes) {
            let _ = fs::remove_file(&local_path);

            return Err(err).with_context(|| format!("Failed to write {:?}", local_path));
        }

        tracing::info!("Downloaded to {:?}", local_path);

        Ok(local_path)
    }
}
