//! Pipeline Wiring
//!
//! Owns the shared service graph: database, generator registry, asset
//! store, worker pool, and orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use crate::models::settings::PipelineSettings;
use crate::services::assets::AssetStore;
use crate::services::expansion::PromptOptimizer;
use crate::services::generator::GeneratorRegistry;
use crate::services::orchestrator::TaskOrchestrator;
use crate::services::scheduler::{JobScheduler, PoolConfig, WorkerPool};
use crate::services::worker::ExecutionWorker;
use crate::storage::database::Database;
use crate::utils::error::AppResult;
use crate::utils::paths::ensure_staging_dir;

/// The assembled pipeline.
pub struct Pipeline {
    db: Arc<Database>,
    orchestrator: Arc<TaskOrchestrator>,
    pool: Arc<WorkerPool>,
}

impl Pipeline {
    /// Assemble and start a pipeline. Must be called from within a tokio
    /// runtime (the worker pool spawns its executors immediately).
    pub fn start(
        db: Arc<Database>,
        generators: GeneratorRegistry,
        optimizer: Arc<dyn PromptOptimizer>,
        settings: PipelineSettings,
    ) -> AppResult<Self> {
        let staging_dir = match &settings.staging_dir {
            Some(dir) => PathBuf::from(dir),
            None => ensure_staging_dir()?,
        };
        Self::start_with(db, generators, optimizer, settings, staging_dir, None)
    }

    /// Assemble with an explicit staging directory and pool config override
    /// (used by tests to shorten the retry backoff).
    pub fn start_with(
        db: Arc<Database>,
        generators: GeneratorRegistry,
        optimizer: Arc<dyn PromptOptimizer>,
        settings: PipelineSettings,
        staging_dir: PathBuf,
        pool_config: Option<PoolConfig>,
    ) -> AppResult<Self> {
        let assets = Arc::new(AssetStore::new(Arc::clone(&db), staging_dir)?);
        let worker = Arc::new(ExecutionWorker::new(
            Arc::clone(&db),
            Arc::new(generators),
            assets,
        ));
        let pool_config = pool_config.unwrap_or(PoolConfig {
            concurrency: settings.max_workers,
            ..PoolConfig::default()
        });
        let pool = WorkerPool::start(worker, pool_config);
        let orchestrator = Arc::new(TaskOrchestrator::new(
            Arc::clone(&db),
            optimizer,
            Arc::clone(&pool) as Arc<dyn JobScheduler>,
            settings,
        ));

        Ok(Self {
            db,
            orchestrator,
            pool,
        })
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn orchestrator(&self) -> &Arc<TaskOrchestrator> {
        &self.orchestrator
    }

    /// Cooperative shutdown of the worker pool.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
