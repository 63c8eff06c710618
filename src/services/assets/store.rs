//! Asset Persistence
//!
//! Writes an acquired image to a staging file, hands it to the asset
//! collection, and cleans up the local artifact best-effort.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::acquire::AcquiredImage;
use super::naming::{extension_for, generate_filename, FilenameParts};
use crate::models::asset::{Asset, GenerationMetadata};
use crate::storage::database::Database;
use crate::utils::error::AppResult;
use crate::utils::paths::ensure_dir;

/// Persists acquired images into the asset collection.
pub struct AssetStore {
    db: Arc<Database>,
    staging_dir: PathBuf,
}

impl AssetStore {
    /// Create a store writing staging files under the given directory.
    pub fn new(db: Arc<Database>, staging_dir: PathBuf) -> AppResult<Self> {
        ensure_dir(&staging_dir)?;
        Ok(Self { db, staging_dir })
    }

    /// The staging directory in use.
    pub fn staging_dir(&self) -> &PathBuf {
        &self.staging_dir
    }

    /// Persist one acquired image.
    ///
    /// The buffer is written to a content-addressed staging file, inserted
    /// into the asset collection, and the staging file is then deleted
    /// best-effort — a failed delete is logged and swallowed, never failing
    /// the sub-task.
    pub fn save(&self, acquired: &AcquiredImage, metadata: GenerationMetadata) -> AppResult<Asset> {
        let filename = generate_filename(&FilenameParts {
            timestamp: Utc::now().timestamp(),
            subject_slug: metadata.subject_slug.clone(),
            style_id: metadata.style_id.clone(),
            model_id: metadata.model_id.clone(),
            batch_index: metadata.batch_index,
            ext: extension_for(&acquired.content_type).to_string(),
        });

        let staging_path = self.staging_dir.join(&filename);
        std::fs::write(&staging_path, &acquired.buffer)?;
        debug!(path = %staging_path.display(), "staged acquired image");

        let asset = Asset {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: metadata.task_id.clone(),
            subtask_id: metadata.subtask_id.clone(),
            filename,
            content_type: acquired.content_type.clone(),
            byte_len: acquired.buffer.len() as u64,
            data: acquired.buffer.clone(),
            metadata,
            created_at: None,
        };
        self.db.insert_asset(&asset)?;

        if let Err(e) = std::fs::remove_file(&staging_path) {
            warn!(
                path = %staging_path.display(),
                error = %e,
                "failed to remove staging file after asset hand-off"
            );
        }

        Ok(asset)
    }
}
