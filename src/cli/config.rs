//! Config command.

use crate::config::LifelineConfig;

/// Prints the effective configuration.
pub fn cmd_config(config: &LifelineConfig, show: bool) {
    if !show {
        println!("Use --show to display configuration");
        return;
    }

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Data Directory: {}", config.data_dir.display());
    println!("Database: {}", config.database_path().display());
    println!();
    println!("Messages:");
    println!("  Alert Text: {}", config.messages.alert_text);
    println!("  Maps Base URL: {}", config.messages.maps_base_url);
    println!("  Fallback Name: {}", config.messages.fallback_name);
    println!();
    println!("Fan-out:");
    println!(
        "  Max Concurrent Targets: {}",
        config.fanout.max_concurrent_targets
    );
    println!();
    println!("Location:");
    println!("  Enabled: {}", config.location.enabled);
    match (config.location.latitude, config.location.longitude) {
        (Some(lat), Some(lon)) => println!("  Default Fix: {lat},{lon}"),
        _ => println!("  Default Fix: (none)"),
    }
    println!();
    println!("Logging:");
    println!(
        "  Format: {}",
        config.logging.format.as_deref().unwrap_or("pretty")
    );
    println!(
        "  Level: {}",
        config.logging.level.as_deref().unwrap_or("(default)")
    );
    println!(
        "  File: {}",
        config
            .logging
            .file
            .as_ref()
            .map_or_else(|| "(stderr)".to_string(), |p| p.display().to_string())
    );
}
