//! Config command: effective configuration and override location

use std::path::Path;

use anyhow::Result;

use allot_core::config::default_config_path;

use super::load_config;

pub fn cmd_config(config_path: Option<&Path>, path_only: bool) -> Result<()> {
    let location = config_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    if path_only {
        match &location {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config directory on this platform)"),
        }
        return Ok(());
    }

    let config = load_config(config_path, None, None, false)?;
    let source = match &location {
        Some(path) if path.exists() => path.display().to_string(),
        _ => "built-in defaults".to_string(),
    };

    println!();
    println!("⚙️  Optimizer configuration");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Source: {}", source);
    println!();
    println!("   Weight scale:     {}", config.scale);
    println!("   Time budget:      {} ms", config.time_budget.as_millis());
    println!(
        "   Accept feasible:  {}",
        if config.accept_feasible { "yes" } else { "no (strict)" }
    );
    println!();
    println!("   Savings floor:    {}% of income", config.policy.savings_floor_percent);
    println!("   Needs ceiling:    {}% of income", config.policy.needs_ceiling_percent);
    println!("   Wants ceiling:    {}% of income", config.policy.wants_ceiling_percent);
    println!();

    Ok(())
}
