// Operator-facing messages

use colored::*;
use std::path::Path;

/// Announce a successfully started daemon on stdout
pub fn print_started(pid: u32, session: i32) {
    println!(
        "{} authd is running as {} in session {}",
        "✓".green().bold(),
        pid.to_string().bold(),
        session
    );
}

/// Report that another daemon already serves this session
pub fn print_already_running(pid: u32, record: &Path, owner_alive: bool) {
    eprintln!(
        "{} authd appears to already be running in this session with pid {}",
        "✗".red().bold(),
        pid.to_string().bold()
    );
    if pid == 0 {
        eprintln!(
            "  {}: the record is unreadable; if no authd serves this session, remove {}",
            "hint".yellow(),
            record.display()
        );
    } else if !owner_alive {
        eprintln!(
            "  {}: pid {} is not running; if no authd serves this session, remove {}",
            "hint".yellow(),
            pid,
            record.display()
        );
    }
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}
