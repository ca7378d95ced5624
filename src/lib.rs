//! Launcher SDK for ROM hacks: catalog fetching, patching of user supplied
//! base ROMs with external patchers and launching the results in an emulator.

pub mod consts;
pub mod error;
pub mod action;
pub mod config;
pub mod catalog;
pub mod process;
pub mod rom;
pub mod launcher;

pub use action::ActionResult;
pub use error::LauncherError;
pub use launcher::{HackFilter, InstallTask, LauncherService};
pub use rom::{RomEntity, RomSystem};
