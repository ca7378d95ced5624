//! ROM hack entities and their install state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::action::ActionResult;
use crate::catalog::{CatalogClient, HackDescriptor};
use crate::config::Config;
use crate::error::{ErrorKind, LauncherError};
use crate::process;

pub mod system;

pub use system::{RomSystem, SystemProfile, PatcherRule};

/// Hack from the catalog bound to the current settings
///
/// Installed state is never stored: it's whether a file exists at
/// `patched_path()` right now.
#[derive(Debug, Clone)]
pub struct RomEntity {
    hack: HackDescriptor,
    catalog: Arc<CatalogClient>
}

impl RomEntity {
    pub fn new(hack: HackDescriptor, catalog: Arc<CatalogClient>) -> Self {
        Self {
            hack,
            catalog
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &HackDescriptor {
        &self.hack
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.hack.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.hack.name
    }

    #[inline]
    pub fn base_rom_id(&self) -> &str {
        &self.hack.base_rom_id
    }

    #[inline]
    pub fn system(&self) -> RomSystem {
        self.hack.system
    }

    #[inline]
    fn config(&self) -> &Config {
        self.catalog.config()
    }

    /// `<patched_roms_dir>/<id>.<system extension>`
    pub fn patched_path(&self) -> PathBuf {
        self.config()
            .patched_roms_dir()
            .join(format!("{}.{}", self.hack.id, self.hack.system.profile().rom_extension))
    }

    pub fn is_installed(&self) -> bool {
        self.patched_path().exists()
    }

    /// Cached box art, if it was downloaded before
    pub fn box_art_path(&self) -> Option<PathBuf> {
        let url = self.hack.box_art_url.as_deref()?;

        CatalogClient::cache_path(url, &self.config().box_art_dir())
            .filter(|path| path.is_file())
    }

    /// Download box art into the cache, failures are only logged
    pub fn fetch_box_art(&self) -> Option<PathBuf> {
        let url = self.hack.box_art_url.as_deref()?;

        self.catalog.download_image(url)
    }

    /// Configured base ROM, if it's set and exists on disk
    pub fn base_rom_path(&self) -> Option<PathBuf> {
        self.config()
            .get_path(&format!("base_roms.{}", self.hack.base_rom_id))
            .filter(|path| path.is_file())
    }

    /// Configured emulator for the hack's system
    pub fn emulator_path(&self) -> Option<PathBuf> {
        self.config().get_path(self.hack.system.profile().emulator_key)
    }

    /// Download the patch and apply it to the base ROM
    pub fn patch(&self) -> ActionResult {
        match self.try_patch() {
            Ok(path) => {
                tracing::info!("Installed {} to {:?}", self.hack.id, path);

                ActionResult::success(format!("'{}' installed successfully!", self.hack.name))
                    .with_patched_rom_path(path)
            }

            Err(err) => {
                tracing::error!("Failed to install {}: {}", self.hack.id, err);

                err.into()
            }
        }
    }

    fn try_patch(&self) -> Result<PathBuf, LauncherError> {
        let base_rom = self.base_rom_path()
            .ok_or_else(|| LauncherError::BaseRomMissing(self.hack.base_rom_id.clone()))?;

        let patch_file = self.catalog.download_patch(&self.hack.patch_file_url)
            .ok_or_else(|| LauncherError::DownloadFailed(self.hack.name.clone()))?;

        let output = self.patched_path();
        let result = self.apply_patch(&patch_file, &base_rom, &output);

        if let Err(err) = fs::remove_file(&patch_file) {
            tracing::warn!("Could not remove patch file {:?}: {}", patch_file, err);
        }

        if let Err(LauncherError::PatchFailed { .. } | LauncherError::OutputMissing(_)) = &result {
            if output.exists() {
                tracing::debug!("Removing partial output {:?}", output);

                if let Err(err) = fs::remove_file(&output) {
                    tracing::warn!("Could not remove partial output {:?}: {}", output, err);
                }
            }
        }

        result.map(|_| output)
    }

    fn apply_patch(&self, patch_file: &Path, base_rom: &Path, output: &Path) -> Result<(), LauncherError> {
        let extension = patch_file.extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let rule = self.hack.system.profile()
            .patcher_for(&extension)
            .ok_or_else(|| LauncherError::UnsupportedPatchType {
                name: self.hack.name.clone(),
                extension: extension.clone()
            })?;

        let patcher = self.config()
            .get_path(&format!("patchers.{}", rule.program))
            .unwrap_or_else(|| PathBuf::from(rule.program));

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        process::run(&patcher, rule.render_args(patch_file, base_rom, output))
            .map_err(|source| LauncherError::PatchFailed {
                name: self.hack.name.clone(),
                source
            })?;

        if !output.is_file() {
            tracing::error!("Patcher exited successfully but {:?} wasn't written", output);

            return Err(LauncherError::OutputMissing(self.hack.name.clone()));
        }

        Ok(())
    }

    /// Start the emulator with the patched ROM without waiting for it
    pub fn launch(&self) -> ActionResult {
        let result = self.try_launch()
            .map(|_| ActionResult::success(format!("Launching {}...", self.hack.name)));

        if let Err(err) = &result {
            tracing::error!("Failed to launch {}: {}", self.hack.id, err);
        }

        result.into()
    }

    fn try_launch(&self) -> Result<u32, LauncherError> {
        let emulator = self.emulator_path()
            .ok_or(LauncherError::EmulatorNotConfigured)?;

        if !self.is_installed() {
            return Err(LauncherError::NotInstalled(self.hack.name.clone()));
        }

        Ok(process::spawn_detached(&emulator, [self.patched_path()])?)
    }

    /// Remove the patched ROM
    pub fn delete(&self) -> ActionResult {
        if !self.is_installed() {
            return LauncherError::NothingToDelete.into();
        }

        match fs::remove_file(self.patched_path()) {
            Ok(()) => {
                tracing::info!("Deleted {:?}", self.patched_path());

                ActionResult::success(format!("Deleted {}.", self.hack.name))
            }

            Err(err) => {
                tracing::error!("Failed to delete {:?}: {}", self.patched_path(), err);

                ActionResult::failure(ErrorKind::Filesystem, format!("Error deleting {}: {}", self.hack.name, err))
            }
        }
    }
}
