//! Local collection store: named record arrays kept in one JSON blob.
//!
//! Every collection lives as a field of a single JSON object stored under
//! [`STORE_KEY`]. Reads parse the whole blob; saves replace one field and
//! write the whole blob back. Nothing here returns an error for storage
//! problems: failures are logged and reported through [`ReadStatus`] /
//! [`WriteStatus`] while callers get their fallback.

use crate::records::{Accounts, Collection, Record};
use crate::seed::{seed_for, Seed};
use crate::storage::StorageAdapter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;

/// Storage key of the collection blob
pub const STORE_KEY: &str = "frontend_demo_data";

/// How `generate_id` builds identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random UUID v4
    #[default]
    Uuid,
    /// `<unix-millis>-<16 hex digits>`
    Timestamp,
}

impl IdStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uuid" => Some(Self::Uuid),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

/// Outcome of a collection read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Stored array returned
    Found,
    /// No such collection (or no blob at all); fallback returned
    Missing,
    /// Collection exists but is not an array; fallback returned
    WrongType,
    /// Blob is not a JSON object; fallback returned
    Corrupted,
    /// Storage refused the read; fallback returned
    Unavailable,
}

/// Outcome of a blob write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    Failed,
}

/// A value together with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Checked<T> {
    pub value: T,
    pub status: ReadStatus,
}

/// What `ensure_seed_data` changed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeedReport {
    /// Collections that received seed records or a seed document
    pub seeded: Vec<Collection>,
    /// Collections initialized to an empty array
    pub initialized: Vec<Collection>,
    /// `None` when nothing needed writing
    pub write: Option<WriteStatus>,
}

impl SeedReport {
    pub fn changed(&self) -> bool {
        !self.seeded.is_empty() || !self.initialized.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobState {
    Ok,
    Missing,
    Corrupted,
    Unavailable,
}

pub struct CollectionStore {
    storage: Rc<dyn StorageAdapter>,
    ids: IdStrategy,
}

impl CollectionStore {
    pub fn new(storage: Rc<dyn StorageAdapter>, ids: IdStrategy) -> Self {
        Self { storage, ids }
    }

    fn read_blob(&self) -> (Map<String, Value>, BlobState) {
        let raw = match self.storage.get(STORE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (Map::new(), BlobState::Missing),
            Err(e) => {
                tracing::warn!(key = STORE_KEY, error = %e, "failed to read storage");
                return (Map::new(), BlobState::Unavailable);
            }
        };
        if raw.is_empty() {
            return (Map::new(), BlobState::Missing);
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => (map, BlobState::Ok),
            Ok(other) => {
                tracing::warn!(
                    key = STORE_KEY,
                    found = %json_kind(&other),
                    "stored blob is not an object; ignoring it"
                );
                (Map::new(), BlobState::Corrupted)
            }
            Err(e) => {
                tracing::warn!(key = STORE_KEY, error = %e, "stored blob is not valid JSON; ignoring it");
                (Map::new(), BlobState::Corrupted)
            }
        }
    }

    fn write_blob(&self, data: &Map<String, Value>) -> WriteStatus {
        let raw = match serde_json::to_string(data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = STORE_KEY, error = %e, "failed to serialize blob");
                return WriteStatus::Failed;
            }
        };
        match self.storage.set(STORE_KEY, &raw) {
            Ok(()) => {
                tracing::debug!(key = STORE_KEY, bytes = raw.len(), "blob written");
                WriteStatus::Written
            }
            Err(e) => {
                tracing::warn!(key = STORE_KEY, error = %e, "failed to write storage");
                WriteStatus::Failed
            }
        }
    }

    /// Stored array for `name`, or `fallback`
    pub fn get_collection(&self, name: &str, fallback: Vec<Value>) -> Vec<Value> {
        self.get_collection_checked(name, fallback).value
    }

    /// Like [`get_collection`](Self::get_collection), reporting how the value was obtained
    pub fn get_collection_checked(&self, name: &str, fallback: Vec<Value>) -> Checked<Vec<Value>> {
        let (mut data, state) = self.read_blob();
        let status = match state {
            BlobState::Corrupted => ReadStatus::Corrupted,
            BlobState::Unavailable => ReadStatus::Unavailable,
            BlobState::Missing => ReadStatus::Missing,
            BlobState::Ok => match data.remove(name) {
                Some(Value::Array(items)) => {
                    return Checked {
                        value: items,
                        status: ReadStatus::Found,
                    }
                }
                Some(Value::Null) | None => ReadStatus::Missing,
                Some(_) => ReadStatus::WrongType,
            },
        };
        Checked {
            value: fallback,
            status,
        }
    }

    /// Replace the whole array for `name`
    ///
    /// A corrupted blob is dropped and replaced by one holding only this
    /// collection. An unreadable blob is left alone.
    pub fn save_collection(&self, name: &str, items: Vec<Value>) -> WriteStatus {
        self.write_fields(vec![(name, Value::Array(items))])
    }

    /// Replace several arrays in one blob write; either all land or none do
    pub fn save_collections(&self, updates: Vec<(&str, Vec<Value>)>) -> WriteStatus {
        self.write_fields(
            updates
                .into_iter()
                .map(|(name, items)| (name, Value::Array(items)))
                .collect(),
        )
    }

    fn write_fields(&self, fields: Vec<(&str, Value)>) -> WriteStatus {
        let (mut data, state) = self.read_blob();
        if state == BlobState::Unavailable {
            return WriteStatus::Failed;
        }
        for (name, value) in fields {
            data.insert(name.to_string(), value);
        }
        self.write_blob(&data)
    }

    /// First record in `name` whose `id` equals `id`
    pub fn find_by_id(&self, name: &str, id: &str) -> Option<Value> {
        self.get_collection(name, Vec::new())
            .into_iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(id))
    }

    /// A fresh identifier, unique with high probability
    pub fn generate_id(&self) -> String {
        match self.ids {
            IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
            IdStrategy::Timestamp => {
                let millis = chrono::Utc::now().timestamp_millis();
                let (random, _) = uuid::Uuid::new_v4().as_u64_pair();
                format!("{}-{:016x}", millis, random)
            }
        }
    }

    /// Insert demo data into every collection that is missing or empty
    ///
    /// Safe to call on every start: collections that hold records are left
    /// untouched. A collection emptied by the user is seeded again.
    pub fn ensure_seed_data(&self) -> SeedReport {
        let (mut data, state) = self.read_blob();
        let mut report = SeedReport::default();
        if state == BlobState::Unavailable {
            report.write = Some(WriteStatus::Failed);
            return report;
        }

        for collection in Collection::ALL {
            let key = collection.as_str();
            match seed_for(collection) {
                Seed::Records(records) => {
                    let populated = matches!(data.get(key), Some(Value::Array(items)) if !items.is_empty());
                    if !populated {
                        data.insert(key.to_string(), Value::Array(records));
                        report.seeded.push(collection);
                    }
                }
                Seed::Empty => {
                    if !matches!(data.get(key), Some(Value::Array(_))) {
                        data.insert(key.to_string(), Value::Array(Vec::new()));
                        report.initialized.push(collection);
                    }
                }
                Seed::Document(doc) => {
                    if matches!(data.get(key), None | Some(Value::Null)) {
                        data.insert(key.to_string(), doc);
                        report.seeded.push(collection);
                    }
                }
            }
        }

        if report.changed() {
            report.write = Some(self.write_blob(&data));
            tracing::info!(
                seeded = report.seeded.len(),
                initialized = report.initialized.len(),
                "seed data applied"
            );
        }
        report
    }

    /// The `accounts` document, default when absent or malformed
    pub fn accounts(&self) -> Accounts {
        let (mut data, _) = self.read_blob();
        match data.remove(Collection::Accounts.as_str()) {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "accounts document is malformed");
                Accounts::default()
            }),
            _ => Accounts::default(),
        }
    }

    pub fn save_accounts(&self, accounts: &Accounts) -> WriteStatus {
        match serde_json::to_value(accounts) {
            Ok(value) => self.write_fields(vec![(Collection::Accounts.as_str(), value)]),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize accounts");
                WriteStatus::Failed
            }
        }
    }

    /// Records of `T`'s collection that match its schema
    pub fn records<T: Record>(&self) -> Vec<T> {
        let collection = T::COLLECTION;
        self.get_collection(collection.as_str(), Vec::new())
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<T>(item) {
                Ok(record) => match record.validate() {
                    Ok(()) => Some(record),
                    Err(e) => {
                        tracing::warn!(%collection, id = record.id(), error = %e, "skipping invalid record");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(%collection, error = %e, "skipping malformed record");
                    None
                }
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Project;
    use crate::storage::{FileStorage, MemoryStorage, UnavailableStorage};
    use serde_json::json;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn memory_store() -> (Rc<MemoryStorage>, CollectionStore) {
        let storage = Rc::new(MemoryStorage::new());
        let store = CollectionStore::new(storage.clone(), IdStrategy::Uuid);
        (storage, store)
    }

    #[test]
    fn test_pristine_store_returns_fallback() {
        let (_, store) = memory_store();
        let checked = store.get_collection_checked("x", Vec::new());
        assert!(checked.value.is_empty());
        assert_eq!(checked.status, ReadStatus::Missing);

        let fallback = vec![json!({"id": "f"})];
        assert_eq!(store.get_collection("x", fallback.clone()), fallback);
    }

    #[test]
    fn test_save_then_get_preserves_order() {
        let (_, store) = memory_store();
        let a = json!({"id": "a", "n": 1});
        let b = json!({"id": "b", "n": 2});
        assert_eq!(
            store.save_collection("x", vec![a.clone(), b.clone()]),
            WriteStatus::Written
        );

        let checked = store.get_collection_checked("x", Vec::new());
        assert_eq!(checked.status, ReadStatus::Found);
        assert_eq!(checked.value, vec![a, b]);
    }

    #[test]
    fn test_save_replaces_whole_collection() {
        let (_, store) = memory_store();
        store.save_collection("x", vec![json!({"id": "a"}), json!({"id": "b"})]);
        store.save_collection("y", vec![json!({"id": "c"})]);
        store.save_collection("x", vec![json!({"id": "d"})]);

        assert_eq!(store.get_collection("x", Vec::new()), vec![json!({"id": "d"})]);
        assert_eq!(store.get_collection("y", Vec::new()).len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let (_, store) = memory_store();
        store.save_collection("x", vec![json!({"id": "0"})]);

        // Two handlers start from the same snapshot
        let mut first = store.get_collection("x", Vec::new());
        let mut second = store.get_collection("x", Vec::new());
        first.push(json!({"id": "1"}));
        second.push(json!({"id": "2"}));
        store.save_collection("x", first);
        store.save_collection("x", second);

        let ids: Vec<_> = store
            .get_collection("x", Vec::new())
            .iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["0", "2"]);
    }

    #[test]
    fn test_non_array_value_falls_back() {
        let (storage, store) = memory_store();
        storage
            .set(STORE_KEY, r#"{"x": {"not": "an array"}}"#)
            .unwrap();
        let checked = store.get_collection_checked("x", vec![json!(1)]);
        assert_eq!(checked.value, vec![json!(1)]);
        assert_eq!(checked.status, ReadStatus::WrongType);
    }

    #[test]
    fn test_corrupted_blob_falls_back() {
        let (storage, store) = memory_store();
        storage.set(STORE_KEY, "this is {not json").unwrap();

        let checked = store.get_collection_checked("projects", vec![json!({"id": "fb"})]);
        assert_eq!(checked.value, vec![json!({"id": "fb"})]);
        assert_eq!(checked.status, ReadStatus::Corrupted);

        // Valid JSON that is not an object counts as corruption too
        storage.set(STORE_KEY, "[1,2,3]").unwrap();
        assert_eq!(
            store.get_collection_checked("projects", Vec::new()).status,
            ReadStatus::Corrupted
        );
    }

    #[test]
    fn test_save_over_corrupted_blob_resets_it() {
        let (storage, store) = memory_store();
        storage.set(STORE_KEY, "garbage").unwrap();

        assert_eq!(
            store.save_collection("x", vec![json!({"id": "a"})]),
            WriteStatus::Written
        );
        let raw: Value = serde_json::from_str(&storage.get(STORE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw, json!({"x": [{"id": "a"}]}));
    }

    #[test]
    fn test_seed_over_corrupted_blob_restores_defaults() {
        let (storage, store) = memory_store();
        storage.set(STORE_KEY, "{\"projects\": [oops").unwrap();

        let report = store.ensure_seed_data();
        assert_eq!(report.write, Some(WriteStatus::Written));
        assert!(report.seeded.contains(&Collection::Projects));

        let checked = store.get_collection_checked("projects", Vec::new());
        assert_eq!(checked.status, ReadStatus::Found);
        let ids: Vec<_> = checked
            .value
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["p-1"]);
        assert_eq!(store.get_collection_checked("labours", Vec::new()).status, ReadStatus::Found);
    }

    #[test]
    fn test_save_collections_writes_once() {
        let storage = Rc::new(MemoryStorage::with_quota(80));
        let store = CollectionStore::new(storage.clone(), IdStrategy::Uuid);
        store.save_collection("x", vec![json!({"id": "a"})]);
        store.save_collection("y", vec![json!({"id": "b"})]);

        // Too big as a whole: neither array changes
        let big = vec![json!({"id": "c".repeat(60)})];
        assert_eq!(
            store.save_collections(vec![("x", Vec::new()), ("y", big)]),
            WriteStatus::Failed
        );
        assert_eq!(store.get_collection("x", Vec::new()).len(), 1);
        assert_eq!(store.get_collection("y", Vec::new()), vec![json!({"id": "b"})]);

        assert_eq!(
            store.save_collections(vec![("x", Vec::new()), ("y", Vec::new())]),
            WriteStatus::Written
        );
        assert!(store.get_collection("x", Vec::new()).is_empty());
        assert!(store.get_collection("y", Vec::new()).is_empty());
    }

    #[test]
    fn test_unavailable_storage_degrades() {
        let store = CollectionStore::new(
            Rc::new(UnavailableStorage::new("disabled")),
            IdStrategy::Uuid,
        );
        let checked = store.get_collection_checked("x", vec![json!(7)]);
        assert_eq!(checked.value, vec![json!(7)]);
        assert_eq!(checked.status, ReadStatus::Unavailable);
        assert_eq!(store.save_collection("x", Vec::new()), WriteStatus::Failed);

        let report = store.ensure_seed_data();
        assert_eq!(report.write, Some(WriteStatus::Failed));
        assert!(store.find_by_id("x", "a").is_none());
    }

    #[test]
    fn test_quota_exceeded_is_a_failed_write() {
        let storage = Rc::new(MemoryStorage::with_quota(64));
        let store = CollectionStore::new(storage.clone(), IdStrategy::Uuid);
        assert_eq!(
            store.save_collection("x", vec![json!({"id": "a"})]),
            WriteStatus::Written
        );

        let big = vec![json!({"id": "b", "blob": "y".repeat(200)})];
        assert_eq!(store.save_collection("x", big), WriteStatus::Failed);
        assert_eq!(store.get_collection("x", Vec::new()), vec![json!({"id": "a"})]);
    }

    #[test]
    fn test_find_by_id() {
        let (_, store) = memory_store();
        store.save_collection(
            "vendors",
            vec![json!({"id": "v-1", "name": "A"}), json!({"id": "v-2", "name": "B"})],
        );
        assert_eq!(store.find_by_id("vendors", "v-2").unwrap()["name"], "B");
        assert!(store.find_by_id("vendors", "v-3").is_none());
        assert!(store.find_by_id("missing", "v-1").is_none());
    }

    #[test]
    fn test_generate_id_uniqueness() {
        let (_, store) = memory_store();
        let ids: HashSet<String> = (0..10_000).map(|_| store.generate_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_timestamp_ids() {
        let store = CollectionStore::new(Rc::new(MemoryStorage::new()), IdStrategy::Timestamp);
        let id = store.generate_id();
        let (millis, random) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(random.len(), 16);

        let ids: HashSet<String> = (0..10_000).map(|_| store.generate_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_seed_is_idempotent_while_populated() {
        let (_, store) = memory_store();
        let first = store.ensure_seed_data();
        assert!(first.seeded.contains(&Collection::Projects));
        assert!(first.seeded.contains(&Collection::Accounts));
        assert!(first.initialized.contains(&Collection::Payments));
        assert_eq!(first.write, Some(WriteStatus::Written));

        let lengths = |store: &CollectionStore| {
            ["projects", "users", "labours"]
                .map(|name| store.get_collection(name, Vec::new()).len())
        };
        let before = lengths(&store);
        assert_eq!(before, [1, 2, 1]);

        let second = store.ensure_seed_data();
        assert!(!second.changed());
        assert_eq!(second.write, None);
        assert_eq!(lengths(&store), before);
    }

    #[test]
    fn test_seed_keeps_user_data() {
        let (_, store) = memory_store();
        store.save_collection("projects", vec![json!({"id": "mine", "name": "Mine"})]);
        store.ensure_seed_data();

        let projects = store.get_collection("projects", Vec::new());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["id"], "mine");
    }

    #[test]
    fn test_emptied_collection_is_reseeded() {
        let (_, store) = memory_store();
        store.ensure_seed_data();
        store.save_collection("projects", Vec::new());

        let report = store.ensure_seed_data();
        assert_eq!(report.seeded, vec![Collection::Projects]);
        assert_eq!(store.get_collection("projects", Vec::new())[0]["id"], "p-1");

        // Record-less collections stay empty
        store.save_collection("payments", Vec::new());
        assert!(!store.ensure_seed_data().changed());
    }

    #[test]
    fn test_accounts_document() {
        let (_, store) = memory_store();
        assert_eq!(store.accounts(), Accounts::default());
        store.ensure_seed_data();
        assert_eq!(store.accounts().capital, 1_000_000.0);

        // accounts is not an array, so the generic getter falls back
        let checked = store.get_collection_checked("accounts", Vec::new());
        assert_eq!(checked.status, ReadStatus::WrongType);

        store.save_accounts(&Accounts { capital: 42.0 });
        assert_eq!(store.accounts().capital, 42.0);
    }

    #[test]
    fn test_records_skip_malformed_entries() {
        let (_, store) = memory_store();
        store.save_collection(
            "projects",
            vec![
                json!({"id": "p-1", "name": "Tower", "budget": "1200"}),
                json!({"id": "p-2"}),
                json!({"id": "p-3", "name": "Annex", "budget": -1}),
            ],
        );
        let projects = store.records::<Project>();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].budget, 1200.0);
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = CollectionStore::new(Rc::new(FileStorage::new(dir.path())), IdStrategy::Uuid);
            store.ensure_seed_data();
            store.save_collection("vendors", vec![json!({"id": "v-1", "name": "Acme"})]);
        }
        let store = CollectionStore::new(Rc::new(FileStorage::new(dir.path())), IdStrategy::Uuid);
        assert_eq!(store.get_collection("vendors", Vec::new()).len(), 1);
        assert!(!store.ensure_seed_data().changed());
    }
}
