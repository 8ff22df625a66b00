//! `chatagent onboard` — write the default config and skills directory.
//!
//! - Creates `~/.chatagent/config.json` with defaults
//! - Creates `~/.chatagent/skills/` with a starter `skill-creator` skill

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use chatagent_core::config::{save_config, Config};
use chatagent_core::utils::get_data_path;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "ChatAgent — Setup".cyan().bold());
    println!();

    setup(&get_data_path())?;

    println!();
    println!(
        "{}",
        "  Setup complete! Set OPENAI_API_KEY (or provider.apiKey) and run `chatagent chat`.".green()
    );
    println!();

    Ok(())
}

fn setup(data_dir: &Path) -> Result<()> {
    // 1. Config
    let config_path = data_dir.join("config.json");
    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        save_config(&Config::default(), Some(&config_path))?;
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    }

    // 2. Skills
    let skills_dir = data_dir.join("skills");
    std::fs::create_dir_all(&skills_dir)?;
    println!("  {} skills dir at {}", "✓".green(), skills_dir.display());

    let sc_dir = skills_dir.join("skill-creator");
    if sc_dir.join("SKILL.md").exists() {
        println!("  {} skill-creator already exists", "✓".green());
    } else {
        std::fs::create_dir_all(&sc_dir)?;
        std::fs::write(sc_dir.join("SKILL.md"), SKILL_CREATOR_TEMPLATE)?;
        println!("  {} created skill: skill-creator", "✓".green());
    }

    // 3. Workspace + history
    std::fs::create_dir_all(data_dir.join("workspace"))?;
    std::fs::create_dir_all(data_dir.join("history"))?;

    Ok(())
}

// ─────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────

const SKILL_CREATOR_TEMPLATE: &str = r#"---
name: skill-creator
description: Guide for creating new skills. Use when the user wants to package instructions, scripts or reference material as a reusable skill.
---

# Skill Creator

A skill is a directory containing a `SKILL.md` file:

```
my-skill/
├── SKILL.md          # required: front matter + instructions
├── references/       # optional: extra Markdown documentation
└── assets/           # optional: templates and examples
```

## SKILL.md format

Start with a front-matter block:

```
---
name: my-skill
description: One or two sentences saying what the skill does and when to use it.
---
```

Then a `# Title` heading and the instructions the assistant should follow
while the skill is active.

## Where skills live

- `./skills/` in the current project
- `~/.chatagent/skills/` for personal skills
- any directory listed in `skills.dirs` in `config.json`

Run `/skills reload` in the REPL after adding or editing a skill.
"#;

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
