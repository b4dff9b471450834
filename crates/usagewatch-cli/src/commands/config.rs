/// Configuration inspection commands
use anyhow::Result;
use std::path::Path;
use usagewatch_core::Config;

pub fn handle_config_path(path: &Path) {
    let state = if path.exists() { "" } else { " (not created, defaults apply)" };
    println!("{}{state}", path.display());
}

pub fn handle_config_show(config: &Config) -> Result<()> {
    println!("Configuration:");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");
    print!("{}", config.to_toml()?);
    println!("\n# effective usage log: {}", config.usage.log_path()?.display());
    Ok(())
}
