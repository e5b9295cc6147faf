//! Record access for the REPL, backed by the local store or the REST API.
//!
//! Both sources speak untyped JSON records so the REPL can pass user input
//! through unchanged. Local writes are checked against the typed schemas
//! in [`crate::records`]; the remote API does its own validation.

use crate::collections::{CollectionStore, WriteStatus};
use crate::error::DataError;
use crate::records::{validate_value, Collection, Role};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// CRUD over one collection at a time
pub trait DataSource {
    fn list(&self, collection: Collection) -> Result<Vec<Value>, DataError>;

    fn get(&self, collection: Collection, id: &str) -> Result<Value, DataError> {
        self.list(collection)?
            .into_iter()
            .find(|item| record_id(item) == Some(id))
            .ok_or_else(|| DataError::not_found(collection.as_str(), id))
    }

    /// Store a new record and return it as stored
    fn create(&self, collection: Collection, record: Value) -> Result<Value, DataError>;

    /// Merge `fields` into the record with `id` and return the result
    fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, DataError>;

    fn delete(&self, collection: Collection, id: &str) -> Result<(), DataError>;

    /// Called whenever the signed-in role changes
    fn bind_role(&self, _role: Option<Role>) {}

    fn describe(&self) -> String;
}

fn reject_document(collection: Collection) -> Result<(), DataError> {
    if collection.is_document() {
        return Err(DataError::Unsupported(collection.to_string()));
    }
    Ok(())
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

// ============================================================================
// Local
// ============================================================================

pub struct LocalSource {
    store: Rc<CollectionStore>,
}

impl LocalSource {
    pub fn new(store: Rc<CollectionStore>) -> Self {
        Self { store }
    }

    fn save(&self, collection: Collection, items: Vec<Value>) -> Result<(), DataError> {
        match self.store.save_collection(collection.as_str(), items) {
            WriteStatus::Written => Ok(()),
            WriteStatus::Failed => Err(DataError::NotPersisted(collection.to_string())),
        }
    }
}

impl DataSource for LocalSource {
    fn list(&self, collection: Collection) -> Result<Vec<Value>, DataError> {
        reject_document(collection)?;
        Ok(self.store.get_collection(collection.as_str(), Vec::new()))
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Value, DataError> {
        reject_document(collection)?;
        self.store
            .find_by_id(collection.as_str(), id)
            .ok_or_else(|| DataError::not_found(collection.as_str(), id))
    }

    fn create(&self, collection: Collection, record: Value) -> Result<Value, DataError> {
        reject_document(collection)?;
        let Value::Object(mut fields) = record else {
            return Err(DataError::validation(
                collection.as_str(),
                "record must be a JSON object",
            ));
        };
        if fields.get("id").and_then(Value::as_str).map_or(true, str::is_empty) {
            fields.insert("id".to_string(), Value::String(self.store.generate_id()));
        }
        let record = Value::Object(fields);
        validate_value(collection, &record)
            .map_err(|msg| DataError::validation(collection.as_str(), msg))?;

        let mut items = self.store.get_collection(collection.as_str(), Vec::new());
        if let Some(id) = record_id(&record) {
            if items.iter().any(|item| record_id(item) == Some(id)) {
                return Err(DataError::validation(
                    collection.as_str(),
                    format!("id '{}' already exists", id),
                ));
            }
        }
        items.push(record.clone());
        self.save(collection, items)?;
        tracing::debug!(%collection, id = record_id(&record).unwrap_or(""), "record created");
        Ok(record)
    }

    fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, DataError> {
        reject_document(collection)?;
        let Value::Object(fields) = fields else {
            return Err(DataError::validation(
                collection.as_str(),
                "update must be a JSON object",
            ));
        };

        let mut items = self.store.get_collection(collection.as_str(), Vec::new());
        let slot = items
            .iter_mut()
            .find(|item| record_id(item) == Some(id))
            .ok_or_else(|| DataError::not_found(collection.as_str(), id))?;

        let mut merged = match &*slot {
            Value::Object(existing) => existing.clone(),
            _ => Map::new(),
        };
        for (key, value) in fields {
            if key != "id" {
                merged.insert(key, value);
            }
        }
        merged.insert("id".to_string(), Value::String(id.to_string()));
        let merged = Value::Object(merged);
        validate_value(collection, &merged)
            .map_err(|msg| DataError::validation(collection.as_str(), msg))?;

        *slot = merged.clone();
        self.save(collection, items)?;
        tracing::debug!(%collection, id, "record updated");
        Ok(merged)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), DataError> {
        reject_document(collection)?;
        let mut items = self.store.get_collection(collection.as_str(), Vec::new());
        let before = items.len();
        items.retain(|item| record_id(item) != Some(id));
        if items.len() == before {
            return Err(DataError::not_found(collection.as_str(), id));
        }

        if collection != Collection::Projects {
            self.save(collection, items)?;
            tracing::debug!(%collection, id, "record deleted");
            return Ok(());
        }

        // A project takes its expenses with it, in the same write
        let mut expenses = self
            .store
            .get_collection(Collection::Expenses.as_str(), Vec::new());
        let before = expenses.len();
        expenses.retain(|e| e.get("projectId").and_then(Value::as_str) != Some(id));
        let removed = before - expenses.len();
        let status = self.store.save_collections(vec![
            (Collection::Projects.as_str(), items),
            (Collection::Expenses.as_str(), expenses),
        ]);
        if status == WriteStatus::Failed {
            return Err(DataError::NotPersisted(collection.to_string()));
        }
        tracing::debug!(project = id, removed, "project and its expenses deleted");
        Ok(())
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

// ============================================================================
// Remote
// ============================================================================

/// Response body shared by every API endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Check an API response and return its `data`
fn open_envelope(status: u16, body: Value) -> Result<Value, DataError> {
    let envelope: Envelope =
        serde_json::from_value(body).map_err(|e| DataError::Decode(e.to_string()))?;
    if envelope.success {
        Ok(envelope.data)
    } else {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "request failed".to_string());
        Err(DataError::Api { status, message })
    }
}

/// Message from an error body, or the raw body when it is not an envelope
fn error_message(text: &str) -> String {
    serde_json::from_str::<Envelope>(text)
        .ok()
        .and_then(|e| e.error.or(e.message))
        .unwrap_or_else(|| text.to_string())
}

fn scope(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::SiteManager => "site",
    }
}

pub struct RemoteSource {
    base_url: String,
    agent: ureq::Agent,
    timeout: Duration,
    role: Cell<Option<Role>>,
}

impl RemoteSource {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
            timeout: Duration::from_millis(timeout_ms),
            role: Cell::new(None),
        }
    }

    fn url(&self, collection: Collection, id: Option<&str>) -> Result<String, DataError> {
        let role = self.role.get().ok_or(DataError::Unauthorized)?;
        let mut url = format!(
            "{}/{}/{}",
            self.base_url,
            scope(role),
            collection.api_resource()
        );
        if let Some(id) = id {
            url.push('/');
            url.push_str(id);
        }
        Ok(url)
    }

    fn send(&self, request: ureq::Request, body: Option<Value>) -> Result<Value, DataError> {
        let request = request
            .timeout(self.timeout)
            .set("Content-Type", "application/json");
        let resp = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match resp {
            Ok(r) => {
                let status = r.status();
                let body: Value = r
                    .into_json()
                    .map_err(|e| DataError::Decode(e.to_string()))?;
                open_envelope(status, body)
            }
            Err(ureq::Error::Status(401, _)) => Err(DataError::Unauthorized),
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                tracing::warn!(status = code, body = %text, "API error");
                Err(DataError::Api {
                    status: code,
                    message: error_message(&text),
                })
            }
            Err(e) => Err(DataError::Transport(e.to_string())),
        }
    }
}

impl DataSource for RemoteSource {
    fn list(&self, collection: Collection) -> Result<Vec<Value>, DataError> {
        reject_document(collection)?;
        let url = self.url(collection, None)?;
        match self.send(self.agent.get(&url), None)? {
            Value::Array(items) => Ok(items),
            other => Err(DataError::Decode(format!(
                "expected a list of {}, got {}",
                collection, other
            ))),
        }
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Value, DataError> {
        reject_document(collection)?;
        let url = self.url(collection, Some(id))?;
        self.send(self.agent.get(&url), None)
    }

    fn create(&self, collection: Collection, record: Value) -> Result<Value, DataError> {
        reject_document(collection)?;
        let url = self.url(collection, None)?;
        self.send(self.agent.post(&url), Some(record))
    }

    fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, DataError> {
        reject_document(collection)?;
        let url = self.url(collection, Some(id))?;
        self.send(self.agent.put(&url), Some(fields))
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), DataError> {
        reject_document(collection)?;
        let url = self.url(collection, Some(id))?;
        self.send(self.agent.delete(&url), None).map(|_| ())
    }

    fn bind_role(&self, role: Option<Role>) {
        self.role.set(role);
    }

    fn describe(&self) -> String {
        format!("remote ({})", self.base_url)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collections::IdStrategy;
    use crate::error::StorageError;
    use crate::storage::{MemoryStorage, StorageAdapter, UnavailableStorage};
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Answer one HTTP request with `status` and `body`; returns the API base URL
    pub(crate) fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        });
        format!("http://{}/api", addr)
    }

    fn local() -> (LocalSource, Rc<CollectionStore>) {
        let storage: Rc<dyn StorageAdapter> = Rc::new(MemoryStorage::new());
        let store = Rc::new(CollectionStore::new(storage, IdStrategy::Uuid));
        store.ensure_seed_data();
        (LocalSource::new(store.clone()), store)
    }

    #[test]
    fn test_create_assigns_id_and_persists() {
        let (source, store) = local();
        let created = source
            .create(
                Collection::Vendors,
                json!({"name": "Shree Cement", "phone": "9876543210"}),
            )
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(
            store.find_by_id("vendors", &id).unwrap()["name"],
            "Shree Cement"
        );
    }

    #[test]
    fn test_create_rejects_invalid_records() {
        let (source, _) = local();
        let err = source
            .create(Collection::Expenses, json!({"name": "Cement", "amount": 100}))
            .unwrap_err();
        assert!(matches!(err, DataError::Validation { .. }));

        let err = source
            .create(Collection::Users, json!(["not", "an", "object"]))
            .unwrap_err();
        assert!(matches!(err, DataError::Validation { .. }));

        let err = source
            .create(Collection::Projects, json!({"id": "p-1", "name": "Duplicate"}))
            .unwrap_err();
        assert!(matches!(err, DataError::Validation { .. }));
    }

    #[test]
    fn test_update_merges_fields() {
        let (source, store) = local();
        let updated = source
            .update(
                Collection::Labours,
                "l-1",
                json!({"dailyWage": 900, "id": "ignored"}),
            )
            .unwrap();
        assert_eq!(updated["id"], "l-1");
        assert_eq!(updated["name"], "Ravi");
        assert_eq!(updated["dailyWage"], 900);
        assert_eq!(store.find_by_id("labours", "l-1").unwrap()["dailyWage"], 900);
    }

    #[test]
    fn test_update_missing_and_invalid() {
        let (source, store) = local();
        assert!(matches!(
            source.update(Collection::Labours, "l-404", json!({"name": "X"})),
            Err(DataError::NotFound { .. })
        ));
        assert!(matches!(
            source.update(Collection::Labours, "l-1", json!({"dailyWage": -5})),
            Err(DataError::Validation { .. })
        ));
        assert_eq!(store.find_by_id("labours", "l-1").unwrap()["dailyWage"], 800);
    }

    #[test]
    fn test_delete_project_cascades_expenses() {
        let (source, store) = local();
        source
            .create(
                Collection::Expenses,
                json!({"projectId": "p-1", "name": "Cement", "amount": 5000}),
            )
            .unwrap();
        source
            .create(
                Collection::Expenses,
                json!({"projectId": "p-2", "name": "Steel", "amount": 7000}),
            )
            .unwrap();

        source.delete(Collection::Projects, "p-1").unwrap();

        assert!(store.find_by_id("projects", "p-1").is_none());
        let expenses = store.get_collection("expenses", Vec::new());
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0]["projectId"], "p-2");
    }

    /// Reads from a shared memory store, refuses every write
    struct FrozenStorage(Rc<MemoryStorage>);

    impl StorageAdapter for FrozenStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded { needed: 1, limit: 0 })
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("frozen".to_string()))
        }

        fn describe(&self) -> String {
            "frozen".to_string()
        }
    }

    #[test]
    fn test_failed_project_delete_keeps_expenses() {
        let memory = Rc::new(MemoryStorage::new());
        let writable = LocalSource::new(Rc::new(CollectionStore::new(
            memory.clone(),
            IdStrategy::Uuid,
        )));
        writable.store.ensure_seed_data();
        writable
            .create(
                Collection::Expenses,
                json!({"projectId": "p-1", "name": "Cement", "amount": 5000}),
            )
            .unwrap();

        let frozen = Rc::new(CollectionStore::new(
            Rc::new(FrozenStorage(memory)),
            IdStrategy::Uuid,
        ));
        let source = LocalSource::new(frozen.clone());
        assert!(matches!(
            source.delete(Collection::Projects, "p-1"),
            Err(DataError::NotPersisted(_))
        ));
        assert!(frozen.find_by_id("projects", "p-1").is_some());
        assert_eq!(frozen.get_collection("expenses", Vec::new()).len(), 1);
    }

    #[test]
    fn test_get_by_id() {
        let (source, _) = local();
        assert_eq!(source.get(Collection::Projects, "p-1").unwrap()["name"], "Residential Complex Phase 1");
        assert!(matches!(
            source.get(Collection::Projects, "p-404"),
            Err(DataError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_missing_record() {
        let (source, _) = local();
        assert!(matches!(
            source.delete(Collection::Vendors, "v-404"),
            Err(DataError::NotFound { .. })
        ));
    }

    #[test]
    fn test_accounts_is_not_a_list() {
        let (source, _) = local();
        assert!(matches!(
            source.list(Collection::Accounts),
            Err(DataError::Unsupported(_))
        ));
    }

    #[test]
    fn test_unavailable_storage_is_not_persisted() {
        let storage: Rc<dyn StorageAdapter> = Rc::new(UnavailableStorage::new("disabled"));
        let source = LocalSource::new(Rc::new(CollectionStore::new(storage, IdStrategy::Uuid)));
        assert!(source.list(Collection::Projects).unwrap().is_empty());
        assert!(matches!(
            source.create(Collection::Vendors, json!({"name": "Shree Cement"})),
            Err(DataError::NotPersisted(_))
        ));
    }

    #[test]
    fn test_remote_urls_follow_role() {
        let remote = RemoteSource::new("http://localhost:5000/api/", 1000);
        assert!(matches!(
            remote.url(Collection::Projects, None),
            Err(DataError::Unauthorized)
        ));

        remote.bind_role(Some(Role::Admin));
        assert_eq!(
            remote.url(Collection::Projects, None).unwrap(),
            "http://localhost:5000/api/admin/projects"
        );

        remote.bind_role(Some(Role::SiteManager));
        assert_eq!(
            remote.url(Collection::DailyReports, Some("r-1")).unwrap(),
            "http://localhost:5000/api/site/daily-reports/r-1"
        );
    }

    #[test]
    fn test_remote_unauthorized() {
        let remote = RemoteSource::new(
            &serve_once("401 Unauthorized", r#"{"success":false,"error":"Token expired"}"#),
            2000,
        );
        remote.bind_role(Some(Role::Admin));
        assert!(matches!(
            remote.list(Collection::Projects),
            Err(DataError::Unauthorized)
        ));
    }

    #[test]
    fn test_remote_api_errors() {
        let remote = RemoteSource::new(
            &serve_once("200 OK", r#"{"success":false,"error":"Project not found"}"#),
            2000,
        );
        remote.bind_role(Some(Role::SiteManager));
        match remote.get(Collection::Projects, "p-9") {
            Err(DataError::Api { status, message }) => {
                assert_eq!(status, 200);
                assert_eq!(message, "Project not found");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let remote = RemoteSource::new(
            &serve_once("500 Internal Server Error", r#"{"success":false,"message":"Database down"}"#),
            2000,
        );
        remote.bind_role(Some(Role::Admin));
        match remote.delete(Collection::Vendors, "v-1") {
            Err(DataError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Database down");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_remote_list() {
        let remote = RemoteSource::new(
            &serve_once("200 OK", r#"{"success":true,"data":[{"id":"p-1","name":"Tower A"}]}"#),
            2000,
        );
        remote.bind_role(Some(Role::Admin));
        let projects = remote.list(Collection::Projects).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["name"], "Tower A");
    }

    #[test]
    fn test_envelope() {
        assert_eq!(
            open_envelope(200, json!({"success": true, "data": [1, 2]})).unwrap(),
            json!([1, 2])
        );
        match open_envelope(200, json!({"success": false, "error": "Project not found"})) {
            Err(DataError::Api { status, message }) => {
                assert_eq!(status, 200);
                assert_eq!(message, "Project not found");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            open_envelope(200, json!("plain")),
            Err(DataError::Decode(_))
        ));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"success":false,"error":"Access denied"}"#),
            "Access denied"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
