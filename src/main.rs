use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, Args as ClapArgs};
use serde_json::Value as JsonValue;

use romhack_launcher::{ActionResult, HackFilter, LauncherService, RomEntity, RomSystem};
use romhack_launcher::config::nested;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download, patch and play ROM hacks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command
}

#[derive(ClapArgs, Debug)]
struct FilterArgs {
    /// Only hacks whose name contains this text
    #[arg(short, long)]
    search: Option<String>,

    /// Only hacks for this system (gba, nds)
    #[arg(long)]
    system: Option<RomSystem>,

    /// Only hacks based on this base ROM (emerald, firered, ...)
    #[arg(long)]
    base_rom: Option<String>
}

impl From<FilterArgs> for HackFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            search: args.search,
            system: args.system,
            base_rom: args.base_rom
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed hacks
    Installed(FilterArgs),

    /// List hacks that can be installed
    Available(FilterArgs),

    /// Download and patch a hack
    Install { id: String },

    /// Start a hack in the configured emulator
    Play { id: String },

    /// Delete a patched ROM
    Delete { id: String },

    /// Read or change settings
    #[command(subcommand)]
    Settings(SettingsCommand)
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print a value, or the whole document without a key
    Get { key: Option<String> },

    /// Set a value. JSON values are stored as parsed, anything else as a string
    Set { key: String, value: String }
}

fn print_roms(roms: Vec<&RomEntity>) {
    if roms.is_empty() {
        println!("No ROM hacks found.");
    }

    for rom in roms {
        println!("{:<20} {:<4} {:<12} {}", rom.id(), rom.system(), rom.base_rom_id(), rom.name());
    }
}

fn report(result: ActionResult) -> Result<()> {
    if result.success {
        println!("{}", result.message);

        if let Some(path) = result.patched_rom_path {
            println!("{}", path.display());
        }

        Ok(())
    } else {
        anyhow::bail!(result.message)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut service = LauncherService::open()?;

    match cli.command {
        Command::Installed(filter) => print_roms(service.list_installed(&filter.into())),
        Command::Available(filter) => print_roms(service.list_available(&filter.into())),

        Command::Install { id } => {
            let task = service.install(&id);

            eprint!("Installing {id}");

            while !task.is_finished() {
                eprint!(".");

                std::io::stderr().flush()?;
                std::thread::sleep(Duration::from_millis(250));
            }

            eprintln!();

            report(task.wait())?;
        }

        Command::Play { id } => report(service.play(&id))?,
        Command::Delete { id } => report(service.delete(&id))?,

        Command::Settings(SettingsCommand::Get { key }) => {
            let value = match key {
                Some(key) => service.config().get(&key).cloned().unwrap_or(JsonValue::Null),
                None => service.config().document().clone()
            };

            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        Command::Settings(SettingsCommand::Set { key, value }) => {
            let value = serde_json::from_str(&value)
                .unwrap_or(JsonValue::String(value));

            report(service.update_settings(nested(&key, value)))?;
        }
    }

    Ok(())
}
