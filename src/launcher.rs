//! Caller facing operations over the catalog snapshot and the settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde_json::Value as JsonValue;

use crate::action::ActionResult;
use crate::catalog::{CatalogClient, HackDescriptor, HttpTransport, ReqwestTransport};
use crate::config::Config;
use crate::error::{ErrorKind, LauncherError};
use crate::rom::{RomEntity, RomSystem};

/// Optional list filters, all of them must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HackFilter {
    /// Case-insensitive substring of the hack name
    pub search: Option<String>,

    pub system: Option<RomSystem>,
    pub base_rom: Option<String>
}

impl HackFilter {
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn system(mut self, system: RomSystem) -> Self {
        self.system = Some(system);
        self
    }

    pub fn base_rom(mut self, base_rom: impl Into<String>) -> Self {
        self.base_rom = Some(base_rom.into());
        self
    }

    pub fn matches(&self, rom: &RomEntity) -> bool {
        if let Some(query) = self.search.as_deref().filter(|query| !query.is_empty()) {
            if !rom.name().to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }

        if let Some(system) = self.system {
            if rom.system() != system {
                return false;
            }
        }

        if let Some(base_rom) = self.base_rom.as_deref().filter(|base_rom| !base_rom.is_empty()) {
            if rom.base_rom_id() != base_rom {
                return false;
            }
        }

        true
    }
}

enum TaskState {
    Running(JoinHandle<ActionResult>),
    Finished(ActionResult)
}

/// Install running on its own thread
///
/// Can't be cancelled. Poll it with `try_result()` or block with `wait()`.
pub struct InstallTask {
    id: String,
    state: TaskState
}

impl InstallTask {
    fn spawn(rom: RomEntity) -> Self {
        let id = rom.id().to_string();

        let handle = std::thread::spawn(move || {
            if rom.fetch_box_art().is_none() {
                tracing::debug!("No box art for {}", rom.id());
            }

            rom.patch()
        });

        Self {
            id,
            state: TaskState::Running(handle)
        }
    }

    fn finished(id: impl Into<String>, result: ActionResult) -> Self {
        Self {
            id: id.into(),
            state: TaskState::Finished(result)
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            TaskState::Running(handle) => handle.is_finished(),
            TaskState::Finished(_) => true
        }
    }

    fn join(id: &str, handle: JoinHandle<ActionResult>) -> ActionResult {
        handle.join().unwrap_or_else(|_| {
            tracing::error!("Install task for {} panicked", id);

            ActionResult::failure(ErrorKind::Process, format!("Installation of '{id}' stopped unexpectedly."))
        })
    }

    /// Result of the install if it has finished, never blocks
    pub fn try_result(&mut self) -> Option<&ActionResult> {
        if let TaskState::Running(handle) = &self.state {
            if !handle.is_finished() {
                return None;
            }
        }

        let state = std::mem::replace(&mut self.state, TaskState::Finished(ActionResult::success("")));

        self.state = match state {
            TaskState::Running(handle) => TaskState::Finished(Self::join(&self.id, handle)),
            finished => finished
        };

        match &self.state {
            TaskState::Finished(result) => Some(result),
            TaskState::Running(_) => None
        }
    }

    /// Block until the install is done
    pub fn wait(self) -> ActionResult {
        match self.state {
            TaskState::Running(handle) => Self::join(&self.id, handle),
            TaskState::Finished(result) => result
        }
    }
}

/// Owns the settings and the current catalog snapshot
pub struct LauncherService {
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>,
    catalog: Arc<CatalogClient>,
    roms: HashMap<String, RomEntity>
}

impl LauncherService {
    /// Service with an empty catalog, call `refresh_catalog()` to fill it
    pub fn new(config: Config, transport: Arc<dyn HttpTransport>) -> Self {
        let config = Arc::new(config);
        let catalog = Arc::new(CatalogClient::new(config.clone(), transport.clone()));

        Self {
            config,
            transport,
            catalog,
            roms: HashMap::new()
        }
    }

    /// Load the default settings file and fetch the catalog
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load_default()?;
        let transport = Arc::new(ReqwestTransport::new()?);

        let mut service = Self::new(config, transport);

        service.refresh_catalog();

        Ok(service)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the whole snapshot with a freshly fetched catalog
    ///
    /// On failure the previous snapshot is kept. Returns true if the
    /// catalog was replaced.
    pub fn refresh_catalog(&mut self) -> bool {
        match self.catalog.fetch_catalog() {
            Some(hacks) => {
                self.roms = self.build_roms(hacks.into_values());

                true
            }

            None => {
                tracing::warn!("Keeping previous catalog with {} hacks", self.roms.len());

                false
            }
        }
    }

    fn build_roms(&self, hacks: impl IntoIterator<Item = HackDescriptor>) -> HashMap<String, RomEntity> {
        hacks.into_iter()
            .map(|hack| (hack.id.clone(), RomEntity::new(hack, self.catalog.clone())))
            .collect()
    }

    pub fn get_hack(&self, id: &str) -> Option<&RomEntity> {
        self.roms.get(id)
    }

    fn list(&self, installed: bool, filter: &HackFilter) -> Vec<&RomEntity> {
        let mut roms = self.roms.values()
            .filter(|rom| rom.is_installed() == installed)
            .filter(|rom| filter.matches(rom))
            .collect::<Vec<_>>();

        roms.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));

        roms
    }

    pub fn list_installed(&self, filter: &HackFilter) -> Vec<&RomEntity> {
        self.list(true, filter)
    }

    pub fn list_available(&self, filter: &HackFilter) -> Vec<&RomEntity> {
        self.list(false, filter)
    }

    fn lookup(&self, id: &str) -> Result<&RomEntity, LauncherError> {
        self.roms.get(id).ok_or_else(|| LauncherError::NotFound(id.to_string()))
    }

    /// Start installing the hack in the background
    pub fn install(&self, id: &str) -> InstallTask {
        match self.lookup(id) {
            Ok(rom) => {
                tracing::info!("Installing {}", rom.id());

                InstallTask::spawn(rom.clone())
            }

            Err(err) => InstallTask::finished(id, err.into())
        }
    }

    pub fn play(&self, id: &str) -> ActionResult {
        match self.lookup(id) {
            Ok(rom) => rom.launch(),
            Err(err) => err.into()
        }
    }

    pub fn delete(&self, id: &str) -> ActionResult {
        match self.lookup(id) {
            Ok(rom) => rom.delete(),
            Err(err) => err.into()
        }
    }

    /// Persist the settings update and rebuild everything derived from it
    pub fn update_settings(&mut self, update: JsonValue) -> ActionResult {
        let mut config = Config::clone(&self.config);

        if let Err(err) = config.save(Some(update)) {
            tracing::error!("Failed to save settings: {err:#}");

            return ActionResult::failure(ErrorKind::Filesystem, format!("Failed to save settings: {err}"));
        }

        self.config = Arc::new(config);
        self.catalog = Arc::new(CatalogClient::new(self.config.clone(), self.transport.clone()));

        // Keep existing entries consistent with the new paths even if the refresh fails
        let hacks = self.roms.drain()
            .map(|(_, rom)| rom.descriptor().clone())
            .collect::<Vec<_>>();

        self.roms = self.build_roms(hacks);

        if !self.refresh_catalog() {
            tracing::warn!("Settings saved but the catalog could not be refreshed");
        }

        ActionResult::success("Settings updated successfully.")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use crate::catalog::tests::{FakeTransport, SERVER, test_config};

    use super::*;

    fn catalog_body() -> String {
        json!({
            "glazed1": {
                "id": "glazed1",
                "name": "Pokemon Glazed",
                "base_rom_id": "emerald",
                "patch_file": "patches/glazed.ups",
                "system": "GBA"
            },
            "unbound": {
                "id": "unbound",
                "name": "Pokemon Unbound",
                "base_rom_id": "firered",
                "patch_file": "patches/unbound.bps",
                "system": "gba"
            },
            "renegade": {
                "id": "renegade",
                "name": "Renegade Platinum",
                "base_rom_id": "platinum",
                "patch_file": "patches/renegade.xdelta",
                "system": "nds"
            }
        }).to_string()
    }

    fn service(dir: &std::path::Path) -> (LauncherService, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default()
            .with(&format!("{SERVER}hacks.json"), catalog_body()));

        let mut service = LauncherService::new(test_config(dir), transport.clone());

        assert!(service.refresh_catalog());

        (service, transport)
    }

    fn ids(roms: Vec<&RomEntity>) -> Vec<&str> {
        roms.into_iter().map(RomEntity::id).collect()
    }

    #[test]
    fn lists_partition_by_installed_state() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());

        assert!(service.list_installed(&HackFilter::default()).is_empty());
        assert_eq!(service.list_available(&HackFilter::default()).len(), 3);

        let unbound = service.get_hack("unbound").unwrap();

        fs::write(unbound.patched_path(), b"ROM").unwrap();

        assert_eq!(ids(service.list_installed(&HackFilter::default())), ["unbound"]);
        assert_eq!(ids(service.list_available(&HackFilter::default())), ["glazed1", "renegade"]);
    }

    #[test]
    fn filters_are_combined() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());

        let all = service.list_available(&HackFilter::default());

        let pokemon = service.list_available(&HackFilter::default().search("POKEMON"));
        let gba = service.list_available(&HackFilter::default().system(RomSystem::Gba));
        let both = service.list_available(&HackFilter::default().search("pokemon").system(RomSystem::Gba).base_rom("firered"));
        let none = service.list_available(&HackFilter::default().search("renegade").system(RomSystem::Gba));

        assert_eq!(ids(pokemon.clone()), ["glazed1", "unbound"]);
        assert_eq!(ids(gba.clone()), ["glazed1", "unbound"]);
        assert_eq!(ids(both.clone()), ["unbound"]);
        assert!(none.is_empty());

        for subset in [pokemon, gba, both] {
            assert!(subset.iter().all(|rom| all.iter().any(|other| other.id() == rom.id())));
        }
    }

    #[test]
    fn failed_refresh_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, _) = service(dir.path());

        let mut config = Config::clone(service.config());

        config.set("server_url", json!(""));

        service.config = Arc::new(config);
        service.catalog = Arc::new(CatalogClient::new(service.config.clone(), service.transport.clone()));

        assert!(!service.refresh_catalog());
        assert_eq!(service.list_available(&HackFilter::default()).len(), 3);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());

        let play = service.play("unknown_id");
        let delete = service.delete("unknown_id");
        let install = service.install("unknown_id");

        assert!(install.is_finished());

        for result in [play, delete, install.wait()] {
            assert!(!result.success);
            assert_eq!(result.error, Some(ErrorKind::NotFound));
            assert_eq!(result.message, "Hack with ID 'unknown_id' not found.");
        }
    }

    #[test]
    fn delete_twice() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());

        fs::write(service.get_hack("glazed1").unwrap().patched_path(), b"ROM").unwrap();

        let first = service.delete("glazed1");
        let second = service.delete("glazed1");

        assert!(first.success);
        assert!(!second.success);
        assert_ne!(second.error, Some(ErrorKind::NotFound));
    }

    #[test]
    fn settings_update_moves_patched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let (mut service, transport) = service(dir.path());

        let result = service.update_settings(json!({ "patched_roms_dir": "elsewhere" }));

        assert!(result.success);
        assert!(dir.path().join("elsewhere").is_dir());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(
            service.get_hack("glazed1").unwrap().patched_path(),
            dir.path().join("elsewhere").join("glazed1.gba")
        );
    }

    #[test]
    fn install_task_can_be_polled() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());

        let mut task = service.install("glazed1");

        while task.try_result().is_none() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let result = task.try_result().cloned().unwrap();

        assert_eq!(task.id(), "glazed1");
        assert!(!result.success);
        assert!(result.message.contains("Base ROM"));
    }
}
