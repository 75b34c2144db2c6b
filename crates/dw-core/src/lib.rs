//! DocWorkspace Core
//!
//! Per-user workspace residency, persistence and node operations.
//!
//! # Core Operations
//!
//! - **Residency**: [`WorkspaceManager`] keeps at most one workspace in memory
//!   per user, saving the outgoing one on every switch
//! - **Derivation**: filter, slice, join and detached concordances add nodes
//! - **Rewrite**: cast, convert and document column resets replace a node's
//!   table in place
//! - **Concordance**: keyword-in-context results cached per search in
//!   [`ConcordanceCache`], sorted and paginated per request
//!
//! # Architecture
//!
//! ```text
//! request → AnalysisService → WorkspaceManager ⇄ WorkspaceStore (JSON files)
//!                 │                   │
//!                 └─ ConcordanceCache └─ Workspace (node DAG)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dw_core::{AnalysisService, Config, UserId};
//!
//! let service = AnalysisService::from_config(&Config::load(None)?);
//! let user = UserId::new("alice")?;
//! let workspace = service.manager().create(&user, "survey", "")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod service;
pub mod store;
pub mod types;

pub use cache::{ConcordanceCache, ConcordanceKey};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConcordanceConfig, Config, LogConfig};
pub use error::{ConfigError, ErrorKind, OperationResult, StorageError, WorkspaceError, WorkspaceResult};
pub use logging::init_tracing;
pub use manager::{SharedWorkspace, WorkspaceManager};
pub use service::AnalysisService;
pub use store::{FsStore, WorkspaceStore};
pub use types::{
    CastOutcome, ConcordanceDetail, ConcordancePage, ConcordanceRequest, JoinRequest, NodeId, NodePage, Pagination,
    Record, SliceRequest, SortOrder, Sorting, UniqueValues, UserId, WorkspaceId,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
