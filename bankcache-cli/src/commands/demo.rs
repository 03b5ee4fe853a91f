//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use bankcache_core::config::Config;
use bankcache_core::DEMO_DB_FILENAME;

use super::get_data_dir;
use crate::output;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let mut config = Config::load(&data_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&data_dir)?;
            output::success("Demo mode enabled");
            output::info("Run 'bankcache enroll --user-id demo_user --token demo' to load the demo accounts.");
            println!(
                "{}",
                format!("Demo data is kept in {}", data_dir.join(DEMO_DB_FILENAME).display()).dimmed()
            );
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&data_dir)?;
            output::warning("Demo mode disabled");
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
        }
    }
    Ok(())
}
