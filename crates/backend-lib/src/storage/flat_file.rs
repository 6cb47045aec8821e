// ============================
// crates/backend-lib/src/storage/flat_file.rs
// ============================
//! Flat-file implementation of the identity store.
//!
//! Reads are served from an [`InMemoryStore`]. A mutation is applied to a
//! copy of that store, the copy's JSON snapshot is written to a temporary
//! file and renamed over `identities.json`, and only then does the copy
//! replace the live store. A failed write leaves memory and disk untouched.
//! Once the write has started it finishes on the blocking pool even if the
//! caller goes away, so memory never lags behind a snapshot on disk.

use super::{IdentityStore, InMemoryStore, Snapshot, StoreError};
use crate::identity::{Claim, ClaimId, Identity, IdentityId, NewIdentity};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs as tokio_fs, sync::Mutex};

const SNAPSHOT_FILE: &str = "identities.json";

/// Identity store persisted as a JSON snapshot on disk
pub struct FlatFileStore {
    live: Arc<RwLock<Arc<InMemoryStore>>>,
    path: PathBuf,
    /// Serializes mutations; held until the new state is committed
    write_lock: Arc<Mutex<()>>,
}

impl FlatFileStore {
    /// Open the store rooted at `root`, loading an existing snapshot if present
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        tokio_fs::create_dir_all(&root).await?;
        let path = root.join(SNAPSHOT_FILE);

        let inner = if tokio_fs::try_exists(&path).await? {
            let content = tokio_fs::read_to_string(&path).await?;
            let snapshot: Snapshot = serde_json::from_str(&content)?;
            tracing::info!(
                path = %path.display(),
                identities = snapshot.identities.len(),
                "loaded identity snapshot"
            );
            InMemoryStore::from_snapshot(snapshot)
        } else {
            InMemoryStore::new()
        };

        Ok(Self {
            live: Arc::new(RwLock::new(Arc::new(inner))),
            path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Location of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Arc<InMemoryStore> {
        Arc::clone(&self.live.read())
    }

    /// Apply `op` to a copy of the live store, persist the copy, then swap it in
    async fn mutate<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(Arc<InMemoryStore>) -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
    {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let next = Arc::new(InMemoryStore::from_snapshot(self.current().snapshot()));
        let value = op(Arc::clone(&next)).await?;
        let json = serde_json::to_vec_pretty(&next.snapshot())?;

        let path = self.path.clone();
        let live = Arc::clone(&self.live);
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let _guard = guard;
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, json)?;
            std::fs::rename(&tmp, &path)?;
            *live.write() = next;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        Ok(value)
    }
}

#[async_trait]
impl IdentityStore for FlatFileStore {
    async fn seed_claim(&self, id: ClaimId, name: &str) -> Result<Claim, StoreError> {
        let claims = self.current().list_claims().await?;
        if let Some(existing) = claims.into_iter().find(|c| c.id == id) {
            return Ok(existing);
        }
        let name = name.to_string();
        self.mutate(move |store| async move { store.seed_claim(id, &name).await })
            .await
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, StoreError> {
        self.current().list_claims().await
    }

    async fn find_claim_by_name(&self, name: &str) -> Result<Option<Claim>, StoreError> {
        self.current().find_claim_by_name(name).await
    }

    async fn create_claim(&self, name: &str) -> Result<Claim, StoreError> {
        let name = name.to_string();
        self.mutate(move |store| async move { store.create_claim(&name).await })
            .await
    }

    async fn create_identity(
        &self,
        new: NewIdentity,
        initial_claim: ClaimId,
    ) -> Result<Identity, StoreError> {
        self.mutate(move |store| async move { store.create_identity(new, initial_claim).await })
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        self.current().find_by_username(username).await
    }

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        self.current().find_by_id(id).await
    }

    async fn update_password_hash(&self, id: IdentityId, hash: &str) -> Result<(), StoreError> {
        let hash = hash.to_string();
        self.mutate(move |store| async move { store.update_password_hash(id, &hash).await })
            .await
    }

    async fn update_email(&self, id: IdentityId, email: &str) -> Result<Identity, StoreError> {
        let email = email.to_string();
        self.mutate(move |store| async move { store.update_email(id, &email).await })
            .await
    }

    async fn soft_delete(&self, id: IdentityId) -> Result<(), StoreError> {
        self.mutate(move |store| async move { store.soft_delete(id).await })
            .await
    }

    async fn increment_failed_attempts(
        &self,
        id: IdentityId,
        observed: u32,
    ) -> Result<u32, StoreError> {
        self.mutate(move |store| async move { store.increment_failed_attempts(id, observed).await })
            .await
    }

    async fn reset_failed_attempts(
        &self,
        id: IdentityId,
        observed: u32,
    ) -> Result<(), StoreError> {
        if observed == 0 {
            // Nothing to write; still reports a conflict if the counter moved
            return self.current().reset_failed_attempts(id, 0).await;
        }
        self.mutate(move |store| async move { store.reset_failed_attempts(id, observed).await })
            .await
    }

    async fn add_claim_association(
        &self,
        id: IdentityId,
        claim: ClaimId,
    ) -> Result<(), StoreError> {
        self.mutate(move |store| async move { store.add_claim_association(id, claim).await })
            .await
    }

    async fn remove_claim_association(
        &self,
        id: IdentityId,
        claim: ClaimId,
    ) -> Result<(), StoreError> {
        self.mutate(move |store| async move { store.remove_claim_association(id, claim).await })
            .await
    }

    async fn resolve_claim_names(&self, id: IdentityId) -> Result<Vec<String>, StoreError> {
        self.current().resolve_claim_names(id).await
    }
}
