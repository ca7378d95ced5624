#![cfg(unix)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use romhack_launcher::catalog::HttpTransport;
use romhack_launcher::config::Config;
use romhack_launcher::error::ErrorKind;
use romhack_launcher::{HackFilter, LauncherService};

const SERVER: &str = "https://hacks.example/assets";

#[derive(Default)]
struct Server {
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>
}

impl Server {
    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for Server {
    fn get(&self, url: &str, _timeout: Duration) -> anyhow::Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());

        self.files.get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {url}"))
    }
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);

    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    path
}

struct Setup {
    dir: tempfile::TempDir,
    server: Arc<Server>,
    service: LauncherService
}

fn glazed() -> serde_json::Value {
    json!({
        "id": "glazed1",
        "name": "Pokemon Glazed",
        "description": "Gen 5 in Hoenn",
        "author": "Gamer2020",
        "base_rom_id": "emerald",
        "box_art_url": "images/glazed.png",
        "patch_file": "patches/glazed.ups",
        "system": "GBA"
    })
}

/// Catalog with one GBA hack and a patcher script with the given body
///
/// The ups argument vector is `apply --base B --patch P --output O`,
/// so `$3` is the base ROM and `$7` the output.
fn setup(patcher_body: &str, configure_base_rom: bool) -> Setup {
    setup_with(glazed(), patcher_body, configure_base_rom)
}

fn setup_with(hack: serde_json::Value, patcher_body: &str, configure_base_rom: bool) -> Setup {
    let dir = tempfile::tempdir().unwrap();

    let catalog = json!({ "glazed1": hack });

    let mut files = HashMap::new();

    files.insert(format!("{SERVER}/hacks.json"), catalog.to_string().into_bytes());
    files.insert(format!("{SERVER}/patches/glazed.ups"), b"UPS1 patch".to_vec());

    let server = Arc::new(Server {
        files,
        ..Server::default()
    });

    let patcher = script(dir.path(), "ups.sh", patcher_body);
    let emulator = script(dir.path(), "mgba.sh", "sleep 1");

    let base_rom = dir.path().join("emerald.gba");

    fs::write(&base_rom, b"EMERALD").unwrap();

    let base_rom_setting = if configure_base_rom {
        json!(base_rom)
    } else {
        json!("")
    };

    let mut config = Config::load(dir.path().join("config.json")).unwrap();

    config.save(Some(json!({
        "server_url": SERVER,
        "emulator_path": emulator,
        "patchers": {
            "ups": patcher
        },
        "base_roms": {
            "emerald": base_rom_setting
        }
    }))).unwrap();

    let mut service = LauncherService::new(config, server.clone());

    assert!(service.refresh_catalog());

    Setup {
        dir,
        server,
        service
    }
}

#[test]
fn install_then_play() {
    let setup = setup("cp \"$3\" \"$7\"", true);

    let result = setup.service.install("glazed1").wait();
    let rom = setup.service.get_hack("glazed1").unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.patched_rom_path.as_deref(), Some(rom.patched_path().as_path()));
    assert!(rom.is_installed());
    assert_eq!(fs::read(rom.patched_path()).unwrap(), b"EMERALD");

    // Downloaded patch is removed again
    assert!(!setup.service.config().patch_dir().join("glazed.ups").exists());

    // Missing box art doesn't block installation
    assert!(setup.server.requests().contains(&format!("{SERVER}/images/glazed.png")));

    assert_eq!(setup.service.list_installed(&HackFilter::default().search("glazed")).len(), 1);
    assert!(setup.service.list_available(&HackFilter::default()).is_empty());

    let play = setup.service.play("glazed1");

    assert!(play.success, "{}", play.message);
    assert_eq!(play.message, "Launching Pokemon Glazed...");
}

#[test]
fn unconfigured_base_rom_fails_before_download() {
    let setup = setup("cp \"$3\" \"$7\"", false);

    let result = setup.service.install("glazed1").wait();

    assert!(!result.success);
    assert!(result.message.to_lowercase().contains("base rom"));
    assert!(!setup.server.requests().iter().any(|url| url.ends_with("glazed.ups")));
    assert!(!setup.service.get_hack("glazed1").unwrap().is_installed());
}

#[test]
fn unconfigured_base_rom_makes_no_request() {
    let mut hack = glazed();

    hack.as_object_mut().unwrap().remove("box_art_url");

    let setup = setup_with(hack, "cp \"$3\" \"$7\"", false);

    let result = setup.service.install("glazed1").wait();

    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::Config));
    assert_eq!(setup.server.requests(), [format!("{SERVER}/hacks.json")]);
}

#[test]
fn failing_patcher_leaves_nothing_behind() {
    let setup = setup("echo partial > \"$7\"\necho 'checksum mismatch' >&2\nexit 1", true);

    let result = setup.service.install("glazed1").wait();
    let rom = setup.service.get_hack("glazed1").unwrap();

    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::Process));
    assert!(result.message.contains("Pokemon Glazed"));
    assert!(!rom.patched_path().exists());
    assert!(!setup.service.config().patch_dir().join("glazed.ups").exists());
}

#[test]
fn unknown_id_is_distinct_from_launch_errors() {
    let setup = setup("cp \"$3\" \"$7\"", true);

    let before = fs::read_dir(setup.dir.path()).unwrap().count();

    let unknown = setup.service.play("unknown_id");
    let not_installed = setup.service.play("glazed1");

    assert!(!unknown.success);
    assert!(!not_installed.success);
    assert_eq!(unknown.error, Some(ErrorKind::NotFound));
    assert_ne!(unknown.error, not_installed.error);
    assert_ne!(unknown.message, not_installed.message);
    assert_eq!(fs::read_dir(setup.dir.path()).unwrap().count(), before);
}

#[test]
fn out_of_band_changes_are_observed() {
    let setup = setup("cp \"$3\" \"$7\"", true);
    let rom = setup.service.get_hack("glazed1").unwrap();

    fs::write(rom.patched_path(), b"ROM").unwrap();

    assert_eq!(setup.service.list_installed(&HackFilter::default()).len(), 1);

    fs::remove_file(rom.patched_path()).unwrap();

    assert!(setup.service.list_installed(&HackFilter::default()).is_empty());
}
