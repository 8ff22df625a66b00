//! `chatagent status` — show configuration and provider status.

use anyhow::Result;
use colored::Colorize;

use chatagent_agent::SkillStore;
use chatagent_core::config::{get_config_path, load_config, Config};
use chatagent_core::utils::expand_home;

fn check(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}

/// Masked form of an API key: first four characters, then `…`.
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}…")
}

fn api_key_status(config: &Config) -> String {
    if config.provider.is_configured() {
        format!("{} ({})", "✓".green(), mask_key(&config.provider.api_key))
    } else {
        format!("{}", "· not configured".dimmed())
    }
}

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();
    let cwd = std::env::current_dir()?;

    println!();
    println!("{}", "ChatAgent Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        check(config_path.exists())
    );

    let workspace = expand_home(&config.agent.workspace);
    println!(
        "  {:<18} {} {}",
        "Workspace:".bold(),
        workspace.display(),
        check(workspace.exists())
    );
    println!(
        "  {:<18} {}",
        "Restricted:".bold(),
        if config.tools.restrict_to_workspace { "yes" } else { "no" }
    );

    println!("  {:<18} {}", "Model:".bold(), config.agent.model);
    let max_tokens = config
        .agent
        .max_tokens
        .map(|n| n.to_string())
        .unwrap_or_else(|| "default".into());
    println!(
        "  {:<18} {} | max_tokens: {} | max_iterations: {}",
        "Parameters:".bold(),
        format!("temp: {}", config.agent.temperature).dimmed(),
        max_tokens.dimmed(),
        config.agent.max_tool_iterations.to_string().dimmed(),
    );

    println!();
    println!("  {:<18} {}", "API base:".bold(), config.provider.api_base);
    println!("  {:<18} {}", "API key:".bold(), api_key_status(&config));

    // Skills
    println!();
    let skills = SkillStore::new(crate::skill_dirs(&config, &cwd));
    let names = skills.list_available();
    println!("  {:<18} {}", "Skills:".bold(), names.len());
    for name in &names {
        println!("    • {name}");
    }

    println!();

    Ok(())
}
