//! Utility functions and helpers for parcopy
//!
//! This module provides common utility functions used throughout the application:
//! - Identifier validation
//! - Time and duration utilities
//! - Conversion utilities

use std::time::Duration;

/// Validation utilities
pub mod validate {
    /// Check if a string is a valid SQL identifier
    ///
    /// Table and column names are spliced into query text verbatim, so
    /// anything that is not a plain identifier is rejected up front.
    ///
    /// # Arguments
    /// * `s` - String to check
    ///
    /// # Returns
    /// * `bool` - True if valid identifier
    pub fn is_valid_identifier(s: &str) -> bool {
        if s.is_empty() {
            return false;
        }

        let first = s.chars().next().unwrap();
        if !first.is_ascii_alphabetic() && first != '_' {
            return false;
        }

        s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Check if a string is a valid table name, optionally schema-qualified
    ///
    /// # Arguments
    /// * `s` - Table name, e.g. `orders` or `public.orders`
    ///
    /// # Returns
    /// * `bool` - True if valid
    pub fn is_valid_table_name(s: &str) -> bool {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(table), None, None) => is_valid_identifier(table),
            (Some(schema), Some(table), None) => {
                is_valid_identifier(schema) && is_valid_identifier(table)
            }
            _ => false,
        }
    }
}

/// Time and duration utilities
pub mod time {
    use super::*;

    /// Format duration as human-readable string
    ///
    /// # Arguments
    /// * `duration` - Duration to format
    ///
    /// # Returns
    /// * `String` - Formatted duration (e.g., "1h 30m 45s")
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let millis = duration.subsec_millis();

        if secs == 0 {
            return format!("{}ms", millis);
        }

        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        let mut parts = Vec::new();

        if hours > 0 {
            parts.push(format!("{}h", hours));
        }
        if minutes > 0 {
            parts.push(format!("{}m", minutes));
        }
        if seconds > 0 || parts.is_empty() {
            parts.push(format!("{}s", seconds));
        }

        parts.join(" ")
    }
}

/// Conversion utilities
pub mod convert {
    /// Format bytes as human-readable size
    ///
    /// # Arguments
    /// * `bytes` - Number of bytes
    ///
    /// # Returns
    /// * `String` - Formatted size (e.g., "1.5 MB")
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifier() {
        assert!(validate::is_valid_identifier("orders"));
        assert!(validate::is_valid_identifier("_private"));
        assert!(validate::is_valid_identifier("col_2"));
        assert!(!validate::is_valid_identifier("123invalid"));
        assert!(!validate::is_valid_identifier("name; DROP TABLE x"));
        assert!(!validate::is_valid_identifier(""));
    }

    #[test]
    fn test_valid_table_name() {
        assert!(validate::is_valid_table_name("orders"));
        assert!(validate::is_valid_table_name("public.orders"));
        assert!(!validate::is_valid_table_name("a.b.c"));
        assert!(!validate::is_valid_table_name("public."));
        assert!(!validate::is_valid_table_name(".orders"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(time::format_duration(Duration::from_secs(0)), "0ms");
        assert_eq!(time::format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(time::format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(convert::format_bytes(500), "500 B");
        assert_eq!(convert::format_bytes(1024), "1.00 KB");
        assert_eq!(convert::format_bytes(128 * 1024 * 1024), "128.00 MB");
    }
}
