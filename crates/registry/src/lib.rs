//! # Registry
//!
//! Bookkeeping for hosted prototype bundles.
//!
//! - [`ProjectRegistry`] maps project ids to [`ProjectRecord`]s and mirrors
//!   the map to a pretty-printed JSON document after every mutation.
//! - [`ProjectStorage`] owns the managed root directory, allocating random
//!   storage paths and extracting uploads into them.
//! - [`ProjectService`] combines the two into the add / update / delete
//!   lifecycle used by the HTTP layer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use registry::{ProjectRegistry, ProjectService, ProjectStorage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProjectRegistry::open("db.json")?;
//! let service = ProjectService::new(registry, ProjectStorage::new("projects"));
//!
//! let archive = std::fs::read("bundle.zip")?;
//! let project = service.create("Checkout flow", "", &archive)?;
//! println!("Hosted {} under {}", project.name, project.path);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod record;
pub mod service;
pub mod storage;
pub mod store;

// Re-export main types
pub use error::RegistryError;
pub use record::ProjectRecord;
pub use service::ProjectService;
pub use storage::ProjectStorage;
pub use store::{Clock, ProjectRegistry, SystemClock};
