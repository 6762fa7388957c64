//! Init and Config commands.

use std::path::Path;

use crate::config::{CONFIG_FILE, Settings};

/// Run init command - create `roost.toml` in `home`.
pub fn run_init(home: &Path, force: bool) {
    let config_path = home.join(CONFIG_FILE);

    if config_path.exists() && !force {
        eprintln!(
            "Configuration file already exists at: {}",
            config_path.display()
        );
        eprintln!("Use --force to overwrite");
        std::process::exit(1);
    }

    match Settings::init_config_file(home, force) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            println!("Components go in: {}", home.join("components").display());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Run config command - display effective configuration.
pub fn run_config(config: &Settings) {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    match toml::to_string_pretty(config) {
        Ok(toml_str) => println!("{toml_str}"),
        Err(e) => eprintln!("Error displaying config: {e}"),
    }
}
