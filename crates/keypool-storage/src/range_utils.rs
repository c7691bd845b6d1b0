//! Range query helpers for prefix scans.

use crate::time_utils::newest_first_rank;

/// Separator between the raw key and the record id in the secret index.
pub const SECRET_SEPARATOR: char = '\u{0}';

/// Calculate the exclusive end bound for a prefix range query.
///
/// Given prefix "sk-abc\0", returns "sk-abc\u{1}" (next byte after the separator).
/// This allows efficient range scans: range(prefix..end_prefix)
pub fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Create a prefix range for redb queries.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (prefix.to_string(), prefix_end_bound(prefix))
}

/// Prefix shared by every secret-index entry of one raw key.
pub fn secret_prefix(secret: &str) -> String {
    format!("{secret}{SECRET_SEPARATOR}")
}

/// Secret-index entry for one record.
pub fn secret_index_key(secret: &str, id: &str) -> String {
    format!("{secret}{SECRET_SEPARATOR}{id}")
}

/// Ordering-index entry; a reversed timestamp makes a forward scan newest first.
pub fn created_index_key(created_at_ms: i64, id: &str) -> String {
    format!("{:020}:{id}", newest_first_rank(created_at_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end_bound() {
        assert_eq!(prefix_end_bound("key:"), "key;");
        assert_eq!(prefix_end_bound("sk-1\u{0}"), "sk-1\u{1}");
        assert_eq!(prefix_end_bound(""), "");
    }

    #[test]
    fn test_secret_prefix_does_not_match_longer_keys() {
        let (start, end) = prefix_range(&secret_prefix("sk-1"));
        let own = secret_index_key("sk-1", "id-a");
        let longer = secret_index_key("sk-10", "id-b");

        assert!(own.as_str() >= start.as_str() && own.as_str() < end.as_str());
        assert!(!(longer.as_str() >= start.as_str() && longer.as_str() < end.as_str()));
    }

    #[test]
    fn test_created_index_orders_newest_first() {
        let older = created_index_key(1_000, "a");
        let newer = created_index_key(2_000, "b");
        assert!(newer < older);
    }
}
