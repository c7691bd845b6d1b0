use crate::error::{BalanceError, Result};
use crate::models::{Provider, mask_key};
use serde::{Deserialize, Serialize};

pub const ADMIN_PAGE_SIZE: usize = 20;
pub const SHARED_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// A persisted key in the shared pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeyRecord {
    pub id: String,
    pub provider: Provider,
    pub key: String,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time in milliseconds since the epoch.
    pub created_at: i64,
}

/// Input for adding a key to the pool by hand.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKeyRecord {
    pub provider: Provider,
    pub key: String,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewKeyRecord {
    pub fn into_record(self, id: String, created_at: i64) -> Result<StoredKeyRecord> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(BalanceError::validation("API key is required"));
        }

        Ok(StoredKeyRecord {
            id,
            provider: self.provider,
            key: key.to_string(),
            balance: self.balance,
            currency: non_blank(self.currency),
            description: non_blank(self.description),
            created_at,
        })
    }
}

/// Partial edit of a stored record. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl KeyRecordPatch {
    pub fn is_empty(&self) -> bool {
        self.provider.is_none()
            && self.key.is_none()
            && self.balance.is_none()
            && self.currency.is_none()
            && self.description.is_none()
    }

    pub fn apply(self, record: &mut StoredKeyRecord) -> Result<()> {
        if let Some(key) = self.key {
            let key = key.trim();
            if key.is_empty() {
                return Err(BalanceError::validation("API key is required"));
            }
            record.key = key.to_string();
        }
        if let Some(provider) = self.provider {
            record.provider = provider;
        }
        if let Some(balance) = self.balance {
            record.balance = Some(balance);
        }
        if let Some(currency) = self.currency {
            record.currency = non_blank(Some(currency));
        }
        if let Some(description) = self.description {
            record.description = non_blank(Some(description));
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Provider and substring filter for listing the pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyFilter {
    pub provider: Option<Provider>,
    pub search: Option<String>,
}

impl KeyFilter {
    pub fn new(provider: Option<Provider>, search: Option<String>) -> Self {
        let search = search
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());
        Self { provider, search }
    }

    /// Provider must match exactly; the search term is a case-insensitive substring of the key.
    pub fn matches(&self, record: &StoredKeyRecord) -> bool {
        if self.provider.is_some_and(|provider| provider != record.provider) {
            return false;
        }
        match &self.search {
            Some(term) => record.key.to_lowercase().contains(term.as_str()),
            None => true,
        }
    }
}

/// 1-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip. Saturates for pages far past the end.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }
}

/// Query string accepted by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeyListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

impl KeyListQuery {
    pub fn filter(&self) -> KeyFilter {
        KeyFilter::new(self.provider, self.search.clone())
    }

    pub fn page_request(&self, default_size: usize) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(default_size),
        )
    }
}

/// One page of rows plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPage<T> {
    pub rows: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
}

impl<T> KeyPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> KeyPage<U> {
        KeyPage {
            rows: self.rows.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            page_count: self.page_count,
        }
    }
}

/// Row shown on the public pool page; the secret is masked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedKeyRow {
    pub id: String,
    pub provider: Provider,
    pub key_preview: String,
    pub balance: Option<f64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<StoredKeyRecord> for SharedKeyRow {
    fn from(record: StoredKeyRecord) -> Self {
        Self {
            key_preview: mask_key(&record.key),
            id: record.id,
            provider: record.provider,
            balance: record.balance,
            currency: record.currency,
            description: record.description,
            created_at: record.created_at,
        }
    }
}

/// Row shown to administrators, with the in-flight refresh marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminKeyRow {
    #[serde(flatten)]
    pub record: StoredKeyRecord,
    pub refreshing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(provider: Provider, key: &str) -> StoredKeyRecord {
        StoredKeyRecord {
            id: "id-1".to_string(),
            provider,
            key: key.to_string(),
            balance: Some(1.0),
            currency: Some("CNY".to_string()),
            description: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_filter_matches_provider_and_case_insensitive_search() {
        let filter = KeyFilter::new(Some(Provider::DeepSeek), Some("  ABC ".to_string()));
        assert!(filter.matches(&record(Provider::DeepSeek, "sk-xxabcxx")));
        assert!(!filter.matches(&record(Provider::DeepSeek, "sk-xyz")));
        assert!(!filter.matches(&record(Provider::Qwen, "sk-abc")));
    }

    #[test]
    fn test_blank_search_matches_everything() {
        let filter = KeyFilter::new(None, Some("   ".to_string()));
        assert!(filter.search.is_none());
        assert!(filter.matches(&record(Provider::OpenAI, "anything")));
    }

    #[test]
    fn test_page_request_offsets_and_clamps() {
        let page = PageRequest::new(2, 20);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.page_count(45), 3);
        assert_eq!(page.page_count(0), 0);

        let clamped = PageRequest::new(0, 1_000);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(1, 0).page_size, 1);
    }

    #[test]
    fn test_huge_page_offset_saturates() {
        let page = PageRequest::new(usize::MAX, 20);
        assert_eq!(page.offset(), usize::MAX);
        assert_eq!(page.page_count(45), 3);
    }

    #[test]
    fn test_new_record_trims_key_and_description() {
        let new = NewKeyRecord {
            provider: Provider::OpenAI,
            key: "  sk-abc  ".to_string(),
            balance: None,
            currency: Some("  ".to_string()),
            description: Some(" team ".to_string()),
        };
        let record = new.into_record("id".to_string(), 5).unwrap();
        assert_eq!(record.key, "sk-abc");
        assert_eq!(record.balance, None);
        assert_eq!(record.currency, None);
        assert_eq!(record.description.as_deref(), Some("team"));
        assert_eq!(record.created_at, 5);
    }

    #[test]
    fn test_new_record_rejects_blank_key() {
        let new = NewKeyRecord {
            provider: Provider::Qwen,
            key: "   ".to_string(),
            balance: None,
            currency: None,
            description: None,
        };
        assert!(matches!(
            new.into_record("id".to_string(), 0),
            Err(BalanceError::Validation(_))
        ));
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut stored = record(Provider::Qwen, "sk-old");
        let patch = KeyRecordPatch {
            balance: Some(9.5),
            description: Some("ops".to_string()),
            ..Default::default()
        };
        patch.apply(&mut stored).unwrap();
        assert_eq!(stored.balance, Some(9.5));
        assert_eq!(stored.description.as_deref(), Some("ops"));
        assert_eq!(stored.key, "sk-old");
    }

    #[test]
    fn test_admin_row_flattens_record() {
        let row = AdminKeyRow {
            record: record(Provider::Qwen, "sk-1"),
            refreshing: true,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["key"], "sk-1");
        assert_eq!(value["createdAt"], 0);
        assert_eq!(value["refreshing"], true);
    }
}
