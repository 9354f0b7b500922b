//! Init command handler

use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings.");
        println!("Set security.secret_key (or SECRET_KEY) before deploying.");
    } else {
        println!("config.toml already exists; nothing to do.");
    }
    Ok(())
}
