//! # contracts-runtime
//!
//! Async facade over `contracts-core`.
//!
//! The core engine is synchronous and stateless. This crate adds what a
//! service embedding it needs:
//! - Parallel rule evaluation with deterministic, contract-ordered results
//! - A per-call timeout
//! - An optional TTL cache keyed by contract and candidate content
//! - YAML configuration with humantime durations
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use contracts_core::{Candidate, Contract};
//! use contracts_runtime::{RuntimeConfig, RuntimeOrchestrator};
//!
//! let orchestrator = RuntimeOrchestrator::new(RuntimeConfig::from_yaml_file("runtime.yaml")?)?;
//! let contract = Arc::new(Contract::from_yaml_file("product.yaml")?);
//! let result = orchestrator
//!     .validate(contract, Arc::new(Candidate::text("...")))
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod orchestrator;

pub use cache::{CacheKey, ValidationCache};
pub use config::{CacheConfig, ConfigError, ParallelConfig, RuntimeConfig, TimeoutConfig};
pub use orchestrator::{RuntimeError, RuntimeOrchestrator};
