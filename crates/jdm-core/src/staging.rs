// In-memory staging of document edits and the commit/discard discipline.
// - The buffer is unset until the first operation materializes a root, either
//   fresh (create sessions) or decoded from the backing file (edit sessions).
// - Every rejected operation discards: the buffer is cleared, and for create
//   sessions the backing file is removed as well. A discarded create session
//   is closed; it refuses further operations.
// - Commit writes the whole tree and clears the buffer whatever the outcome.
//   Once a create session has written its file it behaves as an edit session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::backup;
use crate::codec;
use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::path::{self, PathExpression};
use crate::session::SessionOptions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing staged.
    Empty,
    Mutated,
    Committed,
    /// Pending edits dropped. Terminal for create sessions.
    Discarded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Written { path: PathBuf, bytes: usize },
    /// Nothing was staged, or the staged root was an empty sequence.
    Unchanged,
    /// Encoding, backup or write failed; the staged edits are gone.
    Failed { error: String },
}

impl CommitOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, CommitOutcome::Written { .. })
    }
}

/// Where an unset root comes from, and what a rejected operation tears down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flavor {
    /// Fresh root; rejection removes the backing file and closes the session.
    Create,
    /// Root decoded from the backing file; rejection clears the buffer only.
    Edit,
}

#[derive(Debug)]
pub struct StagingContent {
    path: PathBuf,
    content: Option<Value>,
    state: SessionState,
    flavor: Flavor,
    options: SessionOptions,
}

impl StagingContent {
    pub(crate) fn new(path: PathBuf, flavor: Flavor, options: SessionOptions) -> Self {
        Self {
            path,
            content: None,
            state: SessionState::Empty,
            flavor,
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The staged tree, if anything is staged.
    pub fn content(&self) -> Option<&Value> {
        self.content.as_ref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub(crate) fn add_property<V: Serialize>(&mut self, name: &str, value: V) -> Result<()> {
        self.insert_new("add", name, value)
    }

    pub(crate) fn set_property<V: Serialize>(&mut self, name: &str, value: V) -> Result<()> {
        self.stage("set", |s| {
            let value = normalize(value)?;
            match s.mapping()?.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(Error::PropertyNotFound { name: name.to_string() }),
            }
        })
    }

    /// Named append: like add, but against the document's current content.
    pub(crate) fn append_property<V: Serialize>(&mut self, name: &str, value: V) -> Result<()> {
        self.insert_new("append", name, value)
    }

    fn insert_new<V: Serialize>(&mut self, op: &'static str, name: &str, value: V) -> Result<()> {
        self.stage(op, |s| {
            let value = normalize(value)?;
            let map = s.mapping()?;
            if map.contains_key(name) {
                return Err(Error::DuplicateProperty { name: name.to_string() });
            }
            map.insert(name.to_string(), value);
            Ok(())
        })
    }

    pub(crate) fn append<V: Serialize>(&mut self, value: V) -> Result<()> {
        self.stage("push", |s| {
            let value = normalize(value)?;
            match s.materialize(|| Value::Array(Vec::new()))? {
                Value::Array(items) => {
                    items.push(value);
                    Ok(())
                }
                other => Err(Error::root_kind("sequence", other)),
            }
        })
    }

    /// Remove `key` from the root, or the entry addressed by a bracket path.
    pub(crate) fn remove_property(&mut self, key: &str) -> Result<()> {
        self.stage("remove", |s| {
            let expr = PathExpression::parse(key);
            let missing = || Error::ValueNotFound { key: key.to_string() };
            let root = s.materialize(|| Value::Object(Map::new()))?;
            let (parent, terminal) = if expr.is_nested() {
                path::resolve(root, &expr).map_err(|_| missing())?
            } else {
                (root, expr.terminal())
            };
            path::remove_entry(parent, terminal).map(drop).ok_or_else(missing)
        })
    }

    /// Stage a whole value at once. Refused (and discarded) when something is
    /// already staged.
    pub(crate) fn replace<V: Serialize>(&mut self, value: V) -> Result<()> {
        self.stage("replace", |s| {
            if s.content.is_some() {
                return Err(Error::StagingNotEmpty);
            }
            s.content = Some(normalize(value)?);
            Ok(())
        })
    }

    /// True once a create session has been discarded.
    pub fn is_closed(&self) -> bool {
        self.flavor == Flavor::Create && self.state == SessionState::Discarded
    }

    fn stage(&mut self, op: &'static str, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed {
                path: self.path.clone(),
            });
        }
        match f(self) {
            Ok(()) => {
                debug!(path = %self.path.display(), op, "staged");
                self.state = SessionState::Mutated;
                Ok(())
            }
            Err(err) => {
                self.reject(op, &err);
                Err(err)
            }
        }
    }

    fn materialize(&mut self, empty: fn() -> Value) -> Result<&mut Value> {
        let root = match self.content.take() {
            Some(root) => root,
            None => {
                let loaded = match self.flavor {
                    Flavor::Create => None,
                    Flavor::Edit => codec::load_file(&self.path)?,
                };
                debug!(
                    path = %self.path.display(),
                    from_file = loaded.is_some(),
                    "materialized root"
                );
                loaded.filter(|v| !v.is_null()).unwrap_or_else(empty)
            }
        };
        Ok(self.content.insert(root))
    }

    fn mapping(&mut self) -> Result<&mut Map<String, Value>> {
        match self.materialize(|| Value::Object(Map::new()))? {
            Value::Object(map) => Ok(map),
            other => Err(Error::root_kind("mapping", other)),
        }
    }

    fn reject(&mut self, op: &'static str, err: &Error) {
        warn!(path = %self.path.display(), op, error = %err, "operation rejected; discarding");
        self.discard();
    }

    /// Drop everything staged. A create session also removes its file.
    pub(crate) fn discard(&mut self) {
        if self.is_closed() {
            return;
        }
        self.content = None;
        self.state = SessionState::Discarded;
        if self.flavor == Flavor::Create
            && let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "failed to remove discarded document");
        }
    }

    /// Commit, absorbing encode/backup/write failures into the outcome.
    pub(crate) fn commit(&mut self) -> CommitOutcome {
        match self.try_commit() {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "commit failed; staged edits dropped"
                );
                CommitOutcome::Failed { error: err.to_string() }
            }
        }
    }

    pub(crate) fn try_commit(&mut self) -> Result<CommitOutcome> {
        let Some(content) = self.content.take() else {
            info!(path = %self.path.display(), "nothing to change");
            return Ok(CommitOutcome::Unchanged);
        };
        if matches!(&content, Value::Array(items) if items.is_empty()) {
            info!(path = %self.path.display(), "nothing to change");
            self.state = SessionState::Committed;
            return Ok(CommitOutcome::Unchanged);
        }
        match self.write(&content) {
            Ok(bytes) => {
                info!(path = %self.path.display(), bytes, "committed");
                self.state = SessionState::Committed;
                self.flavor = Flavor::Edit;
                Ok(CommitOutcome::Written {
                    path: self.path.clone(),
                    bytes,
                })
            }
            Err(err) => {
                self.discard();
                Err(err)
            }
        }
    }

    fn write(&self, content: &Value) -> Result<usize> {
        if self.options.backup_on_commit
            && fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false)
        {
            let archive = backup::zip_backup_document(&self.path).map_err(|source| Error::Backup {
                path: self.path.clone(),
                source,
            })?;
            debug!(path = %self.path.display(), archive = %archive.display(), "backed up");
        }
        codec::write_file(&self.path, content, &self.options.encode)
    }
}
