// Promstash - Shared-store metrics engine
// Copyright (C) 2026 Promstash Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Shared output formatting utilities for CLI commands.
//!
//! Status lines go to stderr so that stdout carries only command results
//! (collected families, updated values) and stays pipeable.
//!
//! # Examples
//!
//! ```rust
//! use promstash_cli::output;
//!
//! output::success("Namespace wiped");
//! output::detail("Store", "redis://127.0.0.1:6379");
//! ```

use console::style;

/// Print a success message with a green checkmark.
pub fn success(msg: &str) {
    eprintln!("{} {}", style("✅").green().bold(), msg);
}

/// Print an error message with a red cross.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("❌").red().bold(), msg);
}

/// Print a warning message.
///
/// ```rust
/// promstash_cli::output::warning("memory store: values are lost when the process exits");
/// // Output (stderr): ⚠️  memory store: values are lost when the process exits
/// ```
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠️").yellow(), msg);
}

/// Print a detail line with key-value formatting.
///
/// The value is highlighted in cyan.
pub fn detail(key: &str, value: &str) {
    eprintln!("  {}: {}", key, style(value).cyan());
}

/// Format a sample value the way the exposition format prints it
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
