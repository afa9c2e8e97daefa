//! jdm-core: file-backed JSON document sessions
//!
//! This crate focuses on a small, well-factored surface:
//! - Create / edit / read sessions over one `.json` file, with staged edits
//!   that are either committed whole or discarded
//! - Bracket path expressions (`order[items][0]`) for nested removal
//! - Normalization of caller values into plain JSON trees, and a canonical
//!   pretty-printed on-disk format
//! - Structural projection of documents onto caller-declared shapes
//!
pub mod adapter;
pub mod backup;
pub mod codec;
pub mod error;
pub mod normalize;
pub mod path;
pub mod session;
pub mod shape;
pub mod staging;

pub use adapter::{Session, alter, make, make_safe, normalize_filename, open, read};
pub use codec::EncodeOptions;
pub use error::{Error, Result};
pub use path::PathExpression;
pub use session::{CreateSession, EditSession, Key, ReadSession, SessionOptions};
pub use shape::{FieldKind, Projected, ProjectedField, Shape, ShapeRegistry};
pub use staging::{CommitOutcome, SessionState, StagingContent};
