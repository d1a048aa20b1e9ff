//! Cargo-style status lines on stderr.
//!
//! Labels are right-aligned to 12 columns so that a sequence of steps reads
//! like `cargo build` output:
//!
//! ```text
//!    Resolving dune@2.7+pdelab
//!      Planned 7 resources, 3 steps
//! ```

use std::io::Write;

use console::Style;

/// Action label in bold green (`Resolving`, `Checking`).
pub fn status(label: &str, message: &str) {
    emit(&Style::new().green().bold(), label, message);
}

/// Informational label in bold cyan.
pub fn status_info(label: &str, message: &str) {
    emit(&Style::new().cyan().bold(), label, message);
}

/// Warning label in bold yellow.
pub fn status_warn(label: &str, message: &str) {
    emit(&Style::new().yellow().bold(), label, message);
}

fn emit(style: &Style, label: &str, message: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{:>12} {message}", style.apply_to(label));
}
