use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON-lines activity log for one run
pub struct AuditLog {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl AuditLog {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    /// Open `<dir>/<run_id>.jsonl`, creating the directory
    pub fn create_in(dir: &Path, run_id: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Self::new(&dir.join(format!("{}.jsonl", run_id)), run_id)
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    /// Log a login attempt; the password is never recorded
    pub fn login(&mut self, email: &str, user_id: Option<&str>) -> Result<()> {
        self.log(
            "login",
            serde_json::json!({
                "email": email,
                "ok": user_id.is_some(),
                "user_id": user_id,
            }),
        )
    }

    pub fn logout(&mut self, user_id: Option<&str>, reason: &str) -> Result<()> {
        self.log(
            "logout",
            serde_json::json!({ "user_id": user_id, "reason": reason }),
        )
    }

    pub fn restore(&mut self, status: &str, user_id: Option<&str>) -> Result<()> {
        self.log(
            "restore",
            serde_json::json!({ "status": status, "user_id": user_id }),
        )
    }

    pub fn seed(&mut self, seeded: &[String], initialized: &[String]) -> Result<()> {
        self.log(
            "seed",
            serde_json::json!({ "seeded": seeded, "initialized": initialized }),
        )
    }

    /// Log a create, update or delete against a collection
    pub fn mutation(
        &mut self,
        op: &str,
        collection: &str,
        id: Option<&str>,
        user_id: Option<&str>,
        ok: bool,
    ) -> Result<()> {
        self.log(
            "mutation",
            serde_json::json!({
                "op": op,
                "collection": collection,
                "id": id,
                "user_id": user_id,
                "ok": ok,
            }),
        )
    }
}
