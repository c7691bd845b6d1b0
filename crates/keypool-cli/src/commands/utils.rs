use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use colored::Colorize;
use keypool_core::models::QueryStatus;
use std::io::{IsTerminal, Read, Write};
use std::path::Path;

pub fn format_timestamp(timestamp: i64) -> String {
    let datetime: DateTime<Local> = match Local.timestamp_millis_opt(timestamp).single() {
        Some(dt) => dt,
        None => return "-".to_string(),
    };

    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_amount(amount: Option<f64>) -> String {
    match amount {
        Some(value) => format!("{value:.2}"),
        None => "-".to_string(),
    }
}

pub fn format_status(status: QueryStatus) -> String {
    match status {
        QueryStatus::Success => "success".green().to_string(),
        QueryStatus::Error => "error".red().to_string(),
        QueryStatus::Loading => "loading".dimmed().to_string(),
    }
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Raw key text from arguments, a file, or piped stdin, in that order.
pub fn read_key_input(keys: &[String], file: Option<&Path>) -> Result<String> {
    let mut parts: Vec<String> = keys.to_vec();
    if let Some(path) = file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keys from {}", path.display()))?;
        parts.push(content);
    }
    if parts.is_empty() && !std::io::stdin().is_terminal() {
        parts.push(read_stdin_to_string()?);
    }
    Ok(parts.join("\n"))
}

pub fn read_stdin_to_string() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    Ok(buffer)
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Some(12.345)), "12.35");
        assert_eq!(format_amount(None), "-");
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        assert_eq!(format_timestamp(i64::MAX), "-");
        assert_ne!(format_timestamp(0), "-");
    }

    #[test]
    fn test_read_key_input_joins_args_and_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.txt");
        std::fs::write(&path, "sk-b\nsk-c\n").unwrap();

        let raw = read_key_input(&["sk-a".to_string()], Some(&path)).unwrap();
        assert_eq!(raw, "sk-a\nsk-b\nsk-c\n");
    }

    #[test]
    fn test_read_key_input_missing_file() {
        let err = read_key_input(&[], Some(Path::new("/nonexistent/keys.txt"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read keys"));
    }
}
