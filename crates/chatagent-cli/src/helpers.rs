//! Shared CLI helpers — response printing, banner, help.

use colored::Colorize;

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    println!("{}", "Assistant".green().bold());
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

/// Print an error line in red.
pub fn print_error(message: &str) {
    eprintln!("\n{}\n", format!("Error: {message}").red());
}

/// Print the banner shown at REPL start.
pub fn print_banner(model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "ChatAgent".cyan().bold(), version.dimmed());
    println!("{} {}", "Current Model:".bold(), model.cyan());
    println!(
        "{}",
        "Type a message to start chatting, /help for commands, /exit to quit.".dimmed()
    );
    println!();
}

/// Print the REPL command list.
pub fn print_help() {
    println!();
    println!("{}", "Commands:".bold());
    for (cmd, what) in COMMANDS {
        println!("  {:<20} {}", cmd.cyan(), what);
    }
    println!();
    println!(
        "{}",
        "Anything else is sent to the agent. Sensitive tools (write_file, run_shell_command, web_fetch, google_web_search) ask before running."
            .dimmed()
    );
    println!();
}

const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show this help message"),
    ("/model [name]", "Show available models or switch model"),
    ("/clear", "Clear conversation history and reset approvals"),
    ("/reset-confirm", "Ask again before sensitive tools"),
    ("/status", "Show conversation status"),
    ("/skills [reload]", "List (or rescan) skills"),
    ("/deactivate <name>", "Deactivate an active skill"),
    ("/memory", "Show saved memories"),
    ("/exit, /quit", "Exit the program"),
];

/// Print a "thinking" placeholder while a turn runs.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
