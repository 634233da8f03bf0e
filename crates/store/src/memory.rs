//! Catalog store kept in memory, optionally backed by a shared JSON file.
//!
//! With a file, the file is the source of truth. Every `begin` reloads it
//! under a shared lock and every commit re-reads it under an exclusive lock
//! before replaying the transaction, so several processes (`serve` plus a
//! one-shot `publish` or `seed`) can work on the same catalog without
//! losing each other's writes. The in-memory copy is a cache of the last
//! state this handle saw.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use sy_domain::config::StoreConfig;

use crate::catalog::{Catalog, CatalogDocument};
use crate::error::StoreError;
use crate::store::EntityStore;
use crate::transaction::{Mutation, Transaction};

pub struct MemoryStore {
    inner: RwLock<Catalog>,
    persist_path: Option<PathBuf>,
}

impl MemoryStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Catalog::new()),
            persist_path: None,
        }
    }

    /// A store backed by `path`. An existing file is loaded; a missing one
    /// starts an empty catalog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let catalog = load_shared(&path)?;
        if !catalog.is_empty() {
            tracing::info!(
                path = %path.display(),
                programs = catalog.programs().count(),
                lessons = catalog.lessons().count(),
                "loaded catalog from disk"
            );
        }

        Ok(Self {
            inner: RwLock::new(catalog),
            persist_path: Some(path),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.persist {
            Self::open(config.catalog_path())
        } else {
            Ok(Self::in_memory())
        }
    }

    /// The catalog as of this handle's last `begin` or commit.
    pub fn snapshot(&self) -> Catalog {
        self.inner.read().clone()
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    fn commit_in_memory(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut live = self.inner.write();
        *live = replay(live.clone(), mutations)?;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn begin(&self) -> Result<Transaction, StoreError> {
        let Some(path) = self.persist_path.clone() else {
            return Ok(Transaction::new(self.snapshot()));
        };
        let catalog = run_blocking(move || load_shared(&path)).await?;
        *self.inner.write() = catalog.clone();
        Ok(Transaction::new(catalog))
    }

    async fn commit(&self, tx: Transaction) -> Result<(), StoreError> {
        if tx.is_empty() {
            return Ok(());
        }
        let tx_id = tx.id();
        let staged = tx.len();
        let mutations = tx.into_mutations();

        match self.persist_path.clone() {
            None => self.commit_in_memory(mutations)?,
            Some(path) => {
                let next = run_blocking(move || commit_to_file(&path, mutations)).await?;
                *self.inner.write() = next;
            }
        }

        tracing::debug!(%tx_id, staged, "transaction committed");
        Ok(())
    }
}

/// Apply `mutations` to `base` and check the result.
fn replay(mut base: Catalog, mutations: Vec<Mutation>) -> Result<Catalog, StoreError> {
    for mutation in mutations {
        mutation.apply(&mut base);
    }
    base.check_constraints()?;
    Ok(base)
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking join: {e}")))?
}

/// Sidecar lock file. The catalog itself is replaced by rename, so it
/// cannot carry the lock.
fn open_lock(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path.with_extension("json.lock"))?;
    Ok(file)
}

fn read_catalog(path: &Path) -> Result<Catalog, StoreError> {
    if !path.exists() {
        return Ok(Catalog::new());
    }
    let data = std::fs::read_to_string(path)?;
    let doc: CatalogDocument = serde_json::from_str(&data)?;
    let catalog = Catalog::from_document(doc);
    catalog.check_constraints()?;
    Ok(catalog)
}

fn load_shared(path: &Path) -> Result<Catalog, StoreError> {
    let lock = open_lock(path)?;
    fs2::FileExt::lock_shared(&lock)?;
    // Lock is released when `lock` is dropped.
    read_catalog(path)
}

/// Re-read, replay and write back while holding the exclusive lock, so a
/// commit from another process in between is never overwritten.
fn commit_to_file(path: &Path, mutations: Vec<Mutation>) -> Result<Catalog, StoreError> {
    let lock = open_lock(path)?;
    fs2::FileExt::lock_exclusive(&lock)?;
    let next = replay(read_catalog(path)?, mutations)?;
    write_atomic(path, &next)?;
    Ok(next)
}

/// Write to a sibling temp file and rename over the target.
fn write_atomic(path: &Path, catalog: &Catalog) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(&catalog.to_document())?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sy_domain::ids::TermId;
    use sy_domain::model::{Program, Term};
    use sy_domain::status::Status;

    fn program_with_term() -> (Program, Term) {
        let program = Program::new("AI for Beginners", "en");
        let term = Term {
            id: TermId::new(),
            program_id: program.id,
            term_number: 1,
            title: Some("Foundations".into()),
            created_at: Utc::now(),
        };
        (program, term)
    }

    #[tokio::test]
    async fn commit_makes_writes_visible() {
        let store = MemoryStore::in_memory();
        let (program, term) = program_with_term();
        let pid = program.id;

        let mut tx = store.begin().await.unwrap();
        tx.save_program(program);
        tx.save_term(term);
        store.commit(tx).await.unwrap();

        let snap = store.snapshot();
        assert!(snap.program(&pid).is_some());
        assert_eq!(snap.terms_of(&pid).len(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = MemoryStore::in_memory();
        let (program, _) = program_with_term();

        let mut tx = store.begin().await.unwrap();
        tx.save_program(program);
        store.rollback(tx).await;

        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn violating_commit_changes_nothing() {
        let store = MemoryStore::in_memory();
        let (program, term) = program_with_term();

        let mut tx = store.begin().await.unwrap();
        tx.save_program(program.clone());
        tx.save_term(term.clone());
        store.commit(tx).await.unwrap();
        let before = store.snapshot();

        let mut renamed = program;
        renamed.title = "Renamed".into();
        let mut dup = term;
        dup.id = TermId::new();

        let mut tx = store.begin().await.unwrap();
        tx.save_program(renamed);
        tx.save_term(dup);
        let err = store.commit(tx).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn concurrent_commits_keep_first_published_at() {
        let store = MemoryStore::in_memory();
        let (program, _) = program_with_term();
        let pid = program.id;
        let mut tx = store.begin().await.unwrap();
        tx.save_program(program);
        store.commit(tx).await.unwrap();

        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        let first = Utc::now();
        let second = first + chrono::Duration::seconds(30);

        let mut pa = a.program(&pid).unwrap().clone();
        pa.status = Status::Published;
        pa.published_at = Some(first);
        a.save_program(pa);

        let mut pb = b.program(&pid).unwrap().clone();
        pb.status = Status::Published;
        pb.published_at = Some(second);
        b.save_program(pb);

        store.commit(a).await.unwrap();
        store.commit(b).await.unwrap();

        assert_eq!(store.snapshot().program(&pid).unwrap().published_at, Some(first));
    }

    #[tokio::test]
    async fn persisted_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.json");
        let (program, term) = program_with_term();
        let pid = program.id;

        {
            let store = MemoryStore::open(&path).unwrap();
            let mut tx = store.begin().await.unwrap();
            tx.save_program(program);
            tx.save_term(term);
            store.commit(tx).await.unwrap();
        }

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.snapshot().program(&pid).unwrap().title, "AI for Beginners");
    }

    #[tokio::test]
    async fn failed_commit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let store = MemoryStore::open(&path).unwrap();
        let (program, term) = program_with_term();

        let mut tx = store.begin().await.unwrap();
        tx.save_program(program);
        store.commit(tx).await.unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();

        let mut orphan = term;
        orphan.program_id = sy_domain::ids::ProgramId::new();
        let mut tx = store.begin().await.unwrap();
        tx.save_term(orphan);
        assert!(store.commit(tx).await.is_err());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
    }

    #[tokio::test]
    async fn handles_on_one_file_see_each_others_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let serve = MemoryStore::open(&path).unwrap();
        let cli = MemoryStore::open(&path).unwrap();
        let (program, term) = program_with_term();
        let pid = program.id;

        let mut tx = cli.begin().await.unwrap();
        tx.save_program(program);
        tx.save_term(term);
        cli.commit(tx).await.unwrap();

        let tx = serve.begin().await.unwrap();
        assert_eq!(tx.program(&pid).unwrap().title, "AI for Beginners");
        assert_eq!(tx.catalog().terms_of(&pid).len(), 1);
        serve.rollback(tx).await;
        assert!(serve.snapshot().program(&pid).is_some());
    }

    #[tokio::test]
    async fn stale_handle_commit_keeps_other_handles_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let serve = MemoryStore::open(&path).unwrap();
        let cli = MemoryStore::open(&path).unwrap();
        let (program, _) = program_with_term();
        let pid = program.id;

        let mut tx = cli.begin().await.unwrap();
        tx.save_program(program);
        cli.commit(tx).await.unwrap();

        // Opened before the other handle publishes.
        let mut stale = serve.begin().await.unwrap();

        let mut tx = cli.begin().await.unwrap();
        let mut published = tx.program(&pid).unwrap().clone();
        published.status = Status::Published;
        published.published_at = Some(Utc::now());
        tx.save_program(published);
        cli.commit(tx).await.unwrap();

        let other = Program::new("Python Basics", "en");
        let other_id = other.id;
        stale.save_program(other);
        serve.commit(stale).await.unwrap();

        let on_disk = MemoryStore::open(&path).unwrap().snapshot();
        assert_eq!(on_disk.program(&pid).unwrap().status, Status::Published);
        assert!(on_disk.program(&other_id).is_some());
        assert_eq!(serve.snapshot(), on_disk);
    }

    #[tokio::test]
    async fn concurrent_commits_from_two_handles_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let a = std::sync::Arc::new(MemoryStore::open(&path).unwrap());
        let b = std::sync::Arc::new(MemoryStore::open(&path).unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                tx.save_program(Program::new(format!("Program {i}"), "en"));
                store.commit(tx).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let on_disk = MemoryStore::open(&path).unwrap().snapshot();
        assert_eq!(on_disk.programs().count(), 8);
    }

    #[test]
    fn from_config_without_persistence_is_in_memory() {
        let config = StoreConfig {
            persist: false,
            ..StoreConfig::default()
        };
        let store = MemoryStore::from_config(&config).unwrap();
        assert!(store.persist_path().is_none());
    }
}
