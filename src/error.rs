//! Attributable failures of a sync run.
//!
//! Most call sites propagate `anyhow::Error` with context; these variants
//! exist for the failures a caller may want to match on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("environment variable {0} is not set; database credentials are required")]
    MissingCredential(String),

    #[error("'{target}' references collection '{collection}', which does not exist")]
    MissingCollection { target: String, collection: String },

    #[error("unrecognized source format: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error(
        "{} already has a column named '{}'; choose another source.ordinal_field",
        .path.display(),
        .field
    )]
    OrdinalCollision { path: PathBuf, field: String },

    #[error(
        "{} has a column named '_id', which the store reserves for document identity",
        .0.display()
    )]
    IdentityCollision(PathBuf),
}
