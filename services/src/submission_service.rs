//! Student uploads: permission gate, content fingerprinting and write-once storage.

use crate::actor::Actor;
use crate::block::{fields, AssignmentSettings, BlockContext};
use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use db::field_store::{FieldWrite, Namespace};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek};
use std::sync::Arc;
use tracing::Span;
use util::fingerprint::{canonical_path, fingerprint, Fingerprint};
use util::storage::{BlobPath, BlobStorage};

/// A stored upload, as recorded in the student's per-user state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub owner_id: i64,
    pub course_id: i64,
    pub block_id: i64,
    /// Filename as uploaded, before sanitizing for the storage path.
    pub filename: String,
    pub mimetype: String,
    pub fingerprint: Fingerprint,
    pub path: BlobPath,
    pub uploaded_at: DateTime<Utc>,
}

/// Uploads are open to students enrolled in the course until the due date passes.
pub fn upload_allowed(actor: &Actor, settings: &AssignmentSettings, now: DateTime<Utc>) -> bool {
    actor.is_enrolled_student() && !settings.past_due(now)
}

pub struct SubmissionService {
    storage: Arc<dyn BlobStorage>,
    span: Span,
}

impl SubmissionService {
    pub fn new(storage: Arc<dyn BlobStorage>, span: Span) -> Self {
        Self { storage, span }
    }

    /// Stores `upload` for `actor` and records it as their current submission.
    ///
    /// The bytes land at the canonical path for (actor, fingerprint, filename). If that
    /// path is already occupied nothing is written, and re-uploading the file that is
    /// already recorded returns the original record unchanged.
    ///
    /// Hashing and storage I/O run on the blocking pool.
    pub async fn submit_file<R>(
        &self,
        actor: &Actor,
        block: &BlockContext,
        upload: R,
        filename: &str,
        mimetype: &str,
    ) -> Result<Submission, ServiceError>
    where
        R: Read + Seek + Send + 'static,
    {
        let now = Utc::now();
        let settings = block.settings().await?;
        if !upload_allowed(actor, settings, now) {
            tracing::warn!(
                parent: &self.span,
                user_id = actor.user_id,
                block_id = block.key().block_id,
                "upload refused"
            );
            return Err(ServiceError::PermissionDenied);
        }

        let storage = Arc::clone(&self.storage);
        let owner_id = actor.user_id;
        let name = filename.to_string();
        let (digest, path, written) = tokio::task::spawn_blocking(move || -> io::Result<_> {
            let mut upload = upload;
            let digest = fingerprint(&mut upload)?;
            let path = canonical_path(owner_id, &digest, &name);
            if storage.exists(&path)? {
                return Ok((digest, path, false));
            }
            storage.save(&path, &mut upload)?;
            Ok((digest, path, true))
        })
        .await
        .map_err(io::Error::other)??;

        if written {
            tracing::info!(parent: &self.span, %path, user_id = actor.user_id, "stored submission");
        } else {
            tracing::info!(parent: &self.span, %path, "blob already stored, skipping write");
            let current = self.current_submission(actor.user_id, block).await?;
            if let Some(existing) = current.filter(|s| s.path == path) {
                return Ok(existing);
            }
        }

        let key = block.key();
        let submission = Submission {
            owner_id: actor.user_id,
            course_id: key.course_id,
            block_id: key.block_id,
            filename: filename.to_string(),
            mimetype: mimetype.to_string(),
            fingerprint: digest,
            path,
            uploaded_at: now,
        };

        block
            .store()
            .commit(
                key,
                vec![FieldWrite::new(
                    Namespace::User(actor.user_id),
                    fields::SUBMISSION,
                    serde_json::to_value(&submission)?,
                )],
            )
            .await?;

        Ok(submission)
    }

    /// The submission currently recorded for `user_id`, if any.
    pub async fn current_submission(
        &self,
        user_id: i64,
        block: &BlockContext,
    ) -> Result<Option<Submission>, ServiceError> {
        let stored = block
            .store()
            .get(block.key(), Namespace::User(user_id), fields::SUBMISSION)
            .await?;
        Ok(stored.map(serde_json::from_value).transpose()?)
    }

    /// Opens the stored bytes of a submission.
    pub fn open(&self, submission: &Submission) -> Result<Box<dyn Read + Send>, ServiceError> {
        Ok(self.storage.open(&submission.path)?)
    }
}
