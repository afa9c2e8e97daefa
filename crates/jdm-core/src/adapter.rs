use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::session::{CreateSession, EditSession, ReadSession, SessionOptions};

/// What [`open`] routed to.
#[derive(Debug)]
pub enum Session {
    Create(CreateSession),
    Edit(EditSession),
}

impl Session {
    pub fn path(&self) -> &Path {
        match self {
            Session::Create(s) => s.path(),
            Session::Edit(s) => s.path(),
        }
    }

    pub fn into_create(self) -> Option<CreateSession> {
        match self {
            Session::Create(s) => Some(s),
            Session::Edit(_) => None,
        }
    }

    pub fn into_edit(self) -> Option<EditSession> {
        match self {
            Session::Edit(s) => Some(s),
            Session::Create(_) => None,
        }
    }
}

/// Append `.json` unless the text after the last `.` already is `json`. A name
/// without any `.` is compared whole, so a bare `json` is kept as is.
pub fn normalize_filename(name: impl AsRef<Path>) -> PathBuf {
    let name = name.as_ref();
    let s = name.to_string_lossy();
    if s.rsplit('.').next() == Some("json") {
        name.to_path_buf()
    } else {
        PathBuf::from(format!("{}.json", s))
    }
}

fn abort_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::FileExists { path: path.to_path_buf() });
    }
    Ok(())
}

fn abort_if_missing(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::FileMissing { path: path.to_path_buf() });
    }
    Ok(())
}

fn touch(path: &Path) -> Result<()> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Route to an edit session if the document exists, else touch an empty file
/// and route to a create session.
pub fn open(name: impl AsRef<Path>, options: SessionOptions) -> Result<Session> {
    let path = normalize_filename(name);
    if path.exists() {
        debug!(path = %path.display(), "existing document; editing");
        return Ok(Session::Edit(EditSession::new(path, options)));
    }
    touch(&path)?;
    debug!(path = %path.display(), "new document; creating");
    Ok(Session::Create(CreateSession::new(path, options)))
}

/// Create session for a document that must not exist yet; touches it.
pub fn make(name: impl AsRef<Path>) -> Result<CreateSession> {
    make_with(name, SessionOptions::default())
}

pub fn make_with(name: impl AsRef<Path>, options: SessionOptions) -> Result<CreateSession> {
    let path = normalize_filename(name);
    abort_if_exists(&path)?;
    touch(&path)?;
    Ok(CreateSession::new(path, options))
}

/// Like [`make`], but nothing is created on disk until commit.
pub fn make_safe(name: impl AsRef<Path>) -> Result<CreateSession> {
    let path = normalize_filename(name);
    abort_if_exists(&path)?;
    Ok(CreateSession::new(path, SessionOptions::default()))
}

/// Edit session for a document that must already exist.
pub fn alter(name: impl AsRef<Path>) -> Result<EditSession> {
    alter_with(name, SessionOptions::default())
}

pub fn alter_with(name: impl AsRef<Path>, options: SessionOptions) -> Result<EditSession> {
    let path = normalize_filename(name);
    abort_if_missing(&path)?;
    Ok(EditSession::new(path, options))
}

pub fn read(name: impl AsRef<Path>) -> Result<ReadSession> {
    let path = normalize_filename(name);
    abort_if_missing(&path)?;
    ReadSession::open(path)
}
