//! # stowage
//!
//! Data-movement core of a backup/recovery client.
//!
//! ## Features
//!
//! - **Rule engine**: ordered include/exclude glob rules evaluated into an
//!   auditable [`rules::Specification`] with a per-path explanation trail
//! - **Metadata model**: per-entity state tracking across backup generations
//!   (`model::FilesystemMetadata`, `model::DatasetMetadata`)
//! - **Secret chain**: deterministic per-entity key derivation from a single
//!   device secret (`secrets::DeviceSecret`)
//! - **Recovery pipeline**: cancellable collection -> processing -> metadata
//!   application stream reconstructing files from encrypted, compressed,
//!   chunked remote crates (`ops::recovery::Recovery`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stowage::ops::recovery::{Descriptor, Providers, Recovery};
//!
//! # fn run(descriptor: Descriptor, providers: Providers) -> stowage::Result<()> {
//! let recovery = Recovery::new(descriptor, providers);
//! recovery.start(&tokio::runtime::Handle::current(), |outcome| {
//!     match outcome {
//!         None => println!("recovery complete"),
//!         Some(e) => eprintln!("recovery failed: {}", e),
//!     }
//! });
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod api;
pub mod compression;
pub mod config;
pub mod error;
pub mod model;
pub mod ops;
pub mod rules;
pub mod secrets;
pub mod staging;
pub mod tracking;

// Re-export commonly used types
pub use config::SecretsConfig;
pub use error::{Error, Result};
pub use model::{DatasetMetadata, EntityMetadata, FilesystemMetadata, TargetEntity};
pub use rules::{Rule, Specification};
pub use secrets::DeviceSecret;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
