//! Runtime orchestrator for async validation.
//!
//! Wraps `contracts_core::validate` with:
//! - Parallel fan-out of rules to the blocking pool, bounded by a semaphore
//! - Order-preserving fan-in: each rule owns the slot at its contract index
//! - A per-call timeout
//! - An optional result cache

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use contracts_core::{
    evaluate_rule, structural_phase, Candidate, Contract, RuleContext, ValidationResult, Violation,
};

use crate::cache::{CacheKey, ValidationCache};
use crate::config::{ConfigError, RuntimeConfig};

/// Errors from the runtime orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Validation timed out")]
    Timeout,

    #[error("Validation task failed: {0}")]
    TaskFailed(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// The runtime orchestrator runs validations on a tokio runtime.
///
/// # Architecture
/// - Structural phase on the blocking pool
/// - Rules fanned out one task each, at most `parallel.max_workers` at once
/// - Deterministic fan-in: rule violations are collected by rule index
/// - Sequential mode calls the core validator directly
pub struct RuntimeOrchestrator {
    /// Configuration
    config: RuntimeConfig,

    /// Result cache, when enabled
    cache: Option<ValidationCache>,

    /// Bounds concurrent rule tasks
    workers: Arc<Semaphore>,
}

impl RuntimeOrchestrator {
    /// Create a new runtime orchestrator.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.check()?;

        let cache = config
            .cache
            .enabled
            .then(|| ValidationCache::new(config.cache.max_entries, config.cache.ttl));
        let workers = Arc::new(Semaphore::new(config.parallel.max_workers.max(1)));

        Ok(Self {
            config,
            cache,
            workers,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of cached results.
    pub fn cached_results(&self) -> usize {
        self.cache.as_ref().map_or(0, ValidationCache::len)
    }

    /// Validate a candidate against a contract.
    ///
    /// # Execution Flow
    /// 1. Return a cached result if one is live
    /// 2. Run the structural phase and every rule, in parallel if configured
    /// 3. Fan-in in contract order and cache the result
    pub async fn validate(
        &self,
        contract: Arc<Contract>,
        candidate: Arc<Candidate>,
    ) -> Result<ValidationResult, RuntimeError> {
        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(&contract, &candidate));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                tracing::debug!(key = %key.to_hex(), "cache hit");
                return Ok(hit);
            }
        }

        let timeout = self.config.timeouts.validation;
        let run = async {
            if self.config.parallel.enabled {
                self.validate_parallel(contract, candidate).await
            } else {
                Self::validate_sequential(contract, candidate).await
            }
        };

        let result = match tokio::time::timeout(timeout, run).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(timeout = ?timeout, "validation timed out");
                return Err(RuntimeError::Timeout);
            }
        };

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }

    async fn validate_sequential(
        contract: Arc<Contract>,
        candidate: Arc<Candidate>,
    ) -> Result<ValidationResult, RuntimeError> {
        tokio::task::spawn_blocking(move || contracts_core::validate(&contract, &candidate))
            .await
            .map_err(|e| RuntimeError::TaskFailed(e.to_string()))
    }

    async fn validate_parallel(
        &self,
        contract: Arc<Contract>,
        candidate: Arc<Candidate>,
    ) -> Result<ValidationResult, RuntimeError> {
        // Fan-out: structural phase first, its interpretation feeds the rules
        let phase = {
            let contract = Arc::clone(&contract);
            let candidate = Arc::clone(&candidate);
            tokio::task::spawn_blocking(move || structural_phase(&contract, &candidate))
                .await
                .map_err(|e| RuntimeError::TaskFailed(e.to_string()))?
        };
        let structured = Arc::new(phase.structured);

        let mut tasks = JoinSet::new();
        for index in 0..contract.rules.len() {
            let permit = Arc::clone(&self.workers)
                .acquire_owned()
                .await
                .map_err(|e| RuntimeError::TaskFailed(e.to_string()))?;
            let contract = Arc::clone(&contract);
            let candidate = Arc::clone(&candidate);
            let structured = Arc::clone(&structured);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let ctx = RuleContext::new(
                    &candidate.text,
                    (*structured).as_ref(),
                    &contract.fields,
                );
                (index, evaluate_rule(&contract.rules[index], &ctx))
            });
        }

        // Fan-in: slots indexed by rule position, completion order is irrelevant
        let mut slots: Vec<Option<Violation>> = vec![None; contract.rules.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, violation) = joined.map_err(|e| {
                tracing::warn!(error = %e, "rule task failed");
                RuntimeError::TaskFailed(e.to_string())
            })?;
            slots[index] = violation;
        }

        let mut violations = phase.violations;
        violations.extend(slots.into_iter().flatten());
        Ok(ValidationResult::from_violations(violations))
    }
}
