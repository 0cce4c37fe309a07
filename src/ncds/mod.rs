//! NETCONF datastore library.
//!
//! The server talks to the datastore layer only through [`NetconfLibrary`],
//! one method per library call made while bringing the server up. [`Library`]
//! is the file-backed implementation used by the daemon.

mod file;
#[cfg(test)]
pub(crate) mod fixtures;
mod library;
mod model;
mod transapi;

use std::fmt;
use std::ops::BitOr;
use std::path::{Path, PathBuf};

pub(crate) use library::Library;
pub(crate) use model::Model;
pub(crate) use transapi::TransApi;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("library is not initialized")]
    NotInitialized,
    #[error("library is already initialized")]
    AlreadyInitialized,
    #[error("conflicting init flags {0:#06x}")]
    InvalidFlags(u32),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: invalid data model ({reason})", path.display())]
    InvalidModel { path: PathBuf, reason: String },
    #[error("module {0:?} is not registered")]
    UnknownModule(String),
    #[error("module {module:?} imports unknown module {import:?}")]
    MissingImport { module: String, import: String },
    #[error("module {module:?} augments through unknown prefix {prefix:?}")]
    UnresolvedAugment { module: String, prefix: String },
    #[error("module {module:?} does not declare feature {feature:?}")]
    UnknownFeature { module: String, feature: String },
    #[error("datastore of {0:?} has no backing file")]
    NoFilePath(String),
    #[error("{}: not a file datastore", path.display())]
    InvalidDatastore { path: PathBuf },
    #[error("datastore {0} does not exist")]
    UnknownDatastore(DatastoreId),
    #[error("data models are not consolidated")]
    NotConsolidated,
    #[error("{0:?} datastores are not supported")]
    Unsupported(DatastoreType),
    #[error("transAPI of {module:?} failed: {reason}")]
    TransApi { module: String, reason: String },
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Library initialization flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InitFlags(u32);

impl InitFlags {
    pub(crate) const NOTIF: InitFlags = InitFlags(0x0002);
    pub(crate) const NACM: InitFlags = InitFlags(0x0004);
    pub(crate) const MONITORING: InitFlags = InitFlags(0x0008);
    pub(crate) const WD: InitFlags = InitFlags(0x0010);
    pub(crate) const ALL: InitFlags = InitFlags(0x00fe);
    pub(crate) const MULTILAYER: InitFlags = InitFlags(0x0100);
    pub(crate) const SINGLELAYER: InitFlags = InitFlags(0x0200);

    pub(crate) fn contains(self, other: InitFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for InitFlags {
    type Output = InitFlags;

    fn bitor(self, rhs: InitFlags) -> InitFlags {
        InitFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DatastoreType {
    File,
    #[cfg(test)]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct DatastoreId(pub(crate) u32);

impl fmt::Display for DatastoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The calls the server makes into the datastore library, in the order it
/// makes them.
pub(crate) trait NetconfLibrary {
    /// A datastore that has been created but not yet registered.
    type Datastore;

    /// Initializes the library. Returns the number of other server
    /// instances sharing it.
    fn init(&mut self, flags: InitFlags) -> Result<u32>;

    /// Registers a standalone data model, e.g. an augmenting module.
    fn add_model(&mut self, path: &Path) -> Result<()>;

    /// Creates a datastore for the model at `model`, driven by `transapi`.
    fn new_transapi_static(
        &mut self,
        kind: DatastoreType,
        model: &Path,
        transapi: Box<dyn TransApi>,
    ) -> Result<Self::Datastore>;

    /// Sets the file backing a file datastore.
    fn file_set_path(&mut self, ds: &mut Self::Datastore, path: &Path) -> Result<()>;

    fn feature_enable(&mut self, module: &str, feature: &str) -> Result<()>;

    /// Registers the datastore and hands out its id.
    fn datastore_init(&mut self, ds: Self::Datastore) -> Result<DatastoreId>;

    /// Resolves imports, augments and features across all registered models.
    fn consolidate(&mut self) -> Result<()>;

    /// Applies the startup configuration and brings the datastore (or all
    /// datastores when `id` is `None`) online.
    fn device_init(&mut self, id: Option<DatastoreId>, force: bool) -> Result<()>;

    /// Status data reported by the datastore's transAPI.
    fn status(&self, id: DatastoreId) -> Result<Option<String>>;

    /// Releases all library state. Safe to call in any state.
    fn close(&mut self);
}
