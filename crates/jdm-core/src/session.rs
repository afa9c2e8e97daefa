//! Create, edit and read sessions over one document file.
//!
//! Mutating sessions chain staged operations and end in `commit`:
//!
//! ```no_run
//! # fn main() -> jdm_core::Result<()> {
//! let mut doc = jdm_core::adapter::make("users")?;
//! doc.add_property("name", "Ann")?.add_property("age", 30)?;
//! doc.commit();
//! # Ok(())
//! # }
//! ```
//!
//! A rejected operation returns its error immediately. A create session then
//! deletes its file; an edit session only drops the pending edits.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::{self, EncodeOptions};
use crate::error::{Error, Result};
use crate::shape::{Projected, ShapeRegistry};
use crate::staging::{CommitOutcome, Flavor, SessionState, StagingContent};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub encode: EncodeOptions,
    /// Archive the previous file content into a timestamped zip before an
    /// edit session overwrites it.
    pub backup_on_commit: bool,
}

/// Builds a document that did not exist before. Either every staged operation
/// succeeds and `commit` writes the file, or the file is removed and the
/// session is closed: later operations fail with `SessionClosed`.
///
/// After a successful commit the session keeps working on the written file,
/// so a second commit extends the document instead of replacing it.
#[derive(Debug)]
pub struct CreateSession {
    staging: StagingContent,
}

impl CreateSession {
    pub fn new(path: impl Into<PathBuf>, options: SessionOptions) -> Self {
        Self {
            staging: StagingContent::new(path.into(), Flavor::Create, options),
        }
    }

    /// Add a new top-level property; `DuplicateProperty` if it is already set.
    pub fn add_property<V: Serialize>(&mut self, name: &str, value: V) -> Result<&mut Self> {
        self.staging.add_property(name, value)?;
        Ok(self)
    }

    /// Append to a sequence-rooted document.
    pub fn append<V: Serialize>(&mut self, value: V) -> Result<&mut Self> {
        self.staging.append(value)?;
        Ok(self)
    }

    /// Write `value` as the whole document in one step. Refused when
    /// properties are already staged (the session is then discarded).
    pub fn parse_from<V: Serialize>(&mut self, value: V) -> Result<CommitOutcome> {
        self.staging.replace(value)?;
        Ok(self.staging.commit())
    }

    pub fn commit(&mut self) -> CommitOutcome {
        self.staging.commit()
    }

    pub fn try_commit(&mut self) -> Result<CommitOutcome> {
        self.staging.try_commit()
    }

    /// Drop staged content, remove the file and close the session.
    pub fn discard(&mut self) {
        self.staging.discard();
    }

    pub fn is_closed(&self) -> bool {
        self.staging.is_closed()
    }

    pub fn staged(&self) -> Option<&Value> {
        self.staging.content()
    }

    pub fn state(&self) -> SessionState {
        self.staging.state()
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }
}

/// Edits an existing document. Operations work on a snapshot loaded on first
/// use; a rejected operation clears the snapshot but leaves the file alone.
#[derive(Debug)]
pub struct EditSession {
    staging: StagingContent,
}

impl EditSession {
    pub fn new(path: impl Into<PathBuf>, options: SessionOptions) -> Self {
        Self {
            staging: StagingContent::new(path.into(), Flavor::Edit, options),
        }
    }

    /// Replace an existing property; `PropertyNotFound` if it is not set.
    pub fn set_property<V: Serialize>(&mut self, name: &str, value: V) -> Result<&mut Self> {
        self.staging.set_property(name, value)?;
        Ok(self)
    }

    /// Add a property that must not exist yet; `DuplicateProperty` otherwise.
    pub fn append_property<V: Serialize>(&mut self, name: &str, value: V) -> Result<&mut Self> {
        self.staging.append_property(name, value)?;
        Ok(self)
    }

    /// Push onto the end of a sequence-rooted document.
    pub fn append<V: Serialize>(&mut self, value: V) -> Result<&mut Self> {
        self.staging.append(value)?;
        Ok(self)
    }

    /// Remove a top-level key (or sequence index), or a nested entry addressed
    /// as `key[sub][...]`; `ValueNotFound` if anything along the way is missing.
    pub fn remove_property(&mut self, key: &str) -> Result<&mut Self> {
        self.staging.remove_property(key)?;
        Ok(self)
    }

    /// A read session over the file as it is on disk; pending edits stay staged.
    pub fn read(&self) -> Result<ReadSession> {
        ReadSession::open(self.staging.path())
    }

    /// Project the staged snapshot, or the file if nothing is staged.
    pub fn project_as(&self, registry: &ShapeRegistry, shape: &str) -> Result<Projected> {
        match self.staging.content() {
            Some(content) => registry.project(content, shape),
            None => self.read()?.project_as(registry, shape),
        }
    }

    pub fn commit(&mut self) -> CommitOutcome {
        self.staging.commit()
    }

    pub fn try_commit(&mut self) -> Result<CommitOutcome> {
        self.staging.try_commit()
    }

    /// Drop pending edits; the file is untouched.
    pub fn discard(&mut self) {
        self.staging.discard();
    }

    pub fn staged(&self) -> Option<&Value> {
        self.staging.content()
    }

    pub fn state(&self) -> SessionState {
        self.staging.state()
    }

    pub fn path(&self) -> &Path {
        self.staging.path()
    }
}

/// Key of a top-level entry as seen by [`ReadSession::to_array`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

/// Eagerly loaded, read-only view of a document.
#[derive(Clone, Debug)]
pub struct ReadSession {
    path: PathBuf,
    content: Value,
}

impl ReadSession {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = codec::load_file(&path)?.unwrap_or(Value::Null);
        debug!(path = %path.display(), "loaded for reading");
        Ok(Self { path, content })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Top-level entries in document order. An empty document has none.
    pub fn to_array(&self) -> Result<Vec<(Key, Value)>> {
        match &self.content {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, v)| (Key::Index(i), v))
                .collect()),
            Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (Key::Name(k.clone()), v.clone()))
                .collect()),
            other => Err(Error::root_kind("mapping or sequence", other)),
        }
    }

    /// Top-level entries as a mapping; sequence positions become string keys.
    pub fn to_object(&self) -> Result<Map<String, Value>> {
        match &self.content {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map.clone()),
            Value::Array(items) => Ok(items
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect()),
            other => Err(Error::root_kind("mapping or sequence", other)),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        codec::to_compact_string(&self.content)
    }

    pub fn to_value(&self) -> &Value {
        &self.content
    }

    pub fn into_value(self) -> Value {
        self.content
    }

    /// Deserialize the whole document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.content.clone()).map_err(Error::Decode)
    }

    pub fn project_as(&self, registry: &ShapeRegistry, shape: &str) -> Result<Projected> {
        registry.project(&self.content, shape)
    }
}
