//! Domain models shared by the adapters, the services and the HTTP layer.

mod balance;
mod key_record;
mod provider;

pub use balance::{NormalizedBalance, QueryResult, QueryStatus, mask_key};
pub use key_record::{
    ADMIN_PAGE_SIZE, AdminKeyRow, KeyFilter, KeyListQuery, KeyPage, KeyRecordPatch, MAX_PAGE_SIZE,
    NewKeyRecord, PageRequest, SHARED_PAGE_SIZE, SharedKeyRow, StoredKeyRecord,
};
pub use provider::Provider;
