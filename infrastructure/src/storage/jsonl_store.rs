//! JSONL file store for session events.
//!
//! Each [`SessionEvent`] is serialized as a single JSON line (tagged by its
//! `type` field) and appended to `<dir>/<session_id>.events.jsonl` through a
//! buffered writer that is flushed after every line. The consensus report
//! goes to `<dir>/<session_id>.report.json`.
//!
//! A running scheduler holds `<dir>/<session_id>.lock`, created with
//! `create_new`, so a second process cannot append to the same log. A lock
//! left behind by a crashed process has to be removed by hand.

use mdt_application::{SessionStore, StoreError};
use mdt_domain::{ConsensusReport, SessionEvent, SessionId};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Directory-backed event store.
///
/// Thread-safe via `Mutex`; one open writer is kept per session.
pub struct JsonlSessionStore {
    dir: PathBuf,
    writers: Mutex<HashMap<SessionId, BufWriter<File>>>,
    claims: Mutex<HashSet<SessionId>>,
}

impl JsonlSessionStore {
    /// Open (and create if needed) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            writers: Mutex::new(HashMap::new()),
            claims: Mutex::new(HashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn events_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.events.jsonl", session_id))
    }

    pub fn report_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.report.json", session_id))
    }

    pub fn lock_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.lock", session_id))
    }

    /// Read a stored report, if one was written.
    pub fn load_report(&self, session_id: &SessionId) -> Result<ConsensusReport, StoreError> {
        let path = self.report_path(session_id);
        if !path.exists() {
            return Err(StoreError::NotFound(session_id.clone()));
        }
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Ids of every session with an event log, sorted.
    pub fn list_sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".events.jsonl") {
                ids.push(SessionId::new(id));
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

impl SessionStore for JsonlSessionStore {
    fn append_event(&self, session_id: &SessionId, event: &SessionEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(event)?;
        let mut writers = self.writers.lock().unwrap_or_else(|e| e.into_inner());

        if !writers.contains_key(session_id) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.events_path(session_id))?;
            writers.insert(session_id.clone(), BufWriter::new(file));
        }
        let Some(writer) = writers.get_mut(session_id) else {
            return Err(StoreError::NotFound(session_id.clone()));
        };

        writeln!(writer, "{}", line)?;
        // Flush every line so a crash loses at most the event in flight
        writer.flush()?;
        Ok(())
    }

    fn load_events(&self, session_id: &SessionId) -> Result<Vec<SessionEvent>, StoreError> {
        let path = self.events_path(session_id);
        if !path.exists() {
            return Err(StoreError::NotFound(session_id.clone()));
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut events = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(
                        "Malformed event on line {} of {}: {}",
                        index + 1,
                        path.display(),
                        e
                    );
                    return Err(e.into());
                }
            }
        }
        debug!("Loaded {} events for session {}", events.len(), session_id);
        Ok(events)
    }

    fn save_report(&self, session_id: &SessionId, report: &ConsensusReport) -> Result<(), StoreError> {
        let path = self.report_path(session_id);
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, report)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, &path)?;
        debug!("Report for session {} written to {}", session_id, path.display());
        Ok(())
    }

    fn claim(&self, session_id: &SessionId) -> Result<(), StoreError> {
        let path = self.lock_path(session_id);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(&path).unwrap_or_default();
                return Err(StoreError::Claimed(
                    session_id.clone(),
                    format!(
                        "{} held by pid {}; remove it if that process is gone",
                        path.display(),
                        holder.trim()
                    ),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        let mut claims = self.claims.lock().unwrap_or_else(|e| e.into_inner());
        claims.insert(session_id.clone());
        info!("Claimed session {} ({})", session_id, path.display());
        Ok(())
    }

    fn release(&self, session_id: &SessionId) {
        let mut claims = self.claims.lock().unwrap_or_else(|e| e.into_inner());
        if claims.remove(session_id)
            && let Err(e) = std::fs::remove_file(self.lock_path(session_id))
        {
            warn!("Could not remove lock for session {}: {}", session_id, e);
        }
    }
}

impl Drop for JsonlSessionStore {
    fn drop(&mut self) {
        if let Ok(mut writers) = self.writers.lock() {
            for writer in writers.values_mut() {
                let _ = writer.flush();
            }
        }
        if let Ok(claims) = self.claims.lock() {
            for id in claims.iter() {
                let _ = std::fs::remove_file(self.lock_path(id));
            }
        }
    }
}
