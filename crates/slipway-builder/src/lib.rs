//! `slipway-builder`: drivers for the container daemon, the compose CLI,
//! and client-package scaffolding.
//!
//! # Architecture
//!
//! ```text
//! ImageBuilder    ← daemon API (bollard) for secret-free builds, pushes,
//!   │               and image removal; container CLI subprocess for
//!   │               secret-bearing builds
//!   ▼
//! ClientTemplater ← materializes OpenAPI client scaffolding from embedded
//!                   templates, then drives ImageBuilder to codegen+publish
//!
//! Compose         ← compose CLI subprocess with VERSION injected
//! ```
//!
//! The secret-bearing build goes through the CLI because the daemon's
//! in-process build endpoint does not accept build secrets; the split is
//! part of the contract, not an optimization.

pub mod clientgen;
pub mod compose;
pub mod context;
pub mod error;
pub mod image;

pub use clientgen::{ClientTemplater, GoClientConfig, TypescriptClientConfig};
pub use compose::{Compose, ComposeCli};
pub use error::BuilderError;
pub use image::{ImageBuilder, RegistryAuth};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, BuilderError>;
