//! Runtime construction and background-task spawning, shared by `serve`
//! and the one-shot commands.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use sy_domain::clock::{Clock, SystemClock};
use sy_domain::config::{Config, ConfigSeverity};
use sy_publishing::{AuthoringService, ManualPublishService, SchedulingEngine};
use sy_store::{EntityStore, MemoryStore};

/// Everything a command needs, wired to one store and one clock.
#[derive(Clone)]
pub struct Runtime {
    pub config: Arc<Config>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<dyn Clock>,
    pub engine: Arc<SchedulingEngine>,
    pub manual: Arc<ManualPublishService>,
    pub authoring: Arc<AuthoringService>,
}

/// Validate config, open the store and return a fully wired [`Runtime`].
pub fn build_runtime(config: Arc<Config>) -> anyhow::Result<Runtime> {
    build_runtime_with_clock(config, Arc::new(SystemClock))
}

pub fn build_runtime_with_clock(
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Runtime> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Entity store ─────────────────────────────────────────────────
    let store = Arc::new(
        MemoryStore::from_config(&config.store).context("opening catalog store")?,
    );
    match store.persist_path() {
        Some(path) => tracing::info!(path = %path.display(), "catalog store ready"),
        None => tracing::info!("catalog store ready (in memory)"),
    }
    let dyn_store: Arc<dyn EntityStore> = store.clone();

    // ── Services ─────────────────────────────────────────────────────
    let engine = Arc::new(SchedulingEngine::new(
        dyn_store.clone(),
        clock.clone(),
        config.scheduler.clone(),
    ));
    let manual = Arc::new(ManualPublishService::new(dyn_store.clone(), clock.clone()));
    let authoring = Arc::new(AuthoringService::new(dyn_store, clock.clone()));

    Ok(Runtime {
        config,
        store,
        clock,
        engine,
        manual,
        authoring,
    })
}

/// Spawn the long-running background tasks. Each stops when `shutdown`
/// is cancelled; the returned handles resolve once they have.
pub fn spawn_background_tasks(
    runtime: &Runtime,
    shutdown: &CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    // ── Scheduling engine (promote due lessons every interval) ───────
    if runtime.config.scheduler.enabled {
        handles.push(runtime.engine.clone().spawn(shutdown.child_token()));
    } else {
        tracing::warn!("scheduler disabled, scheduled lessons will not be promoted");
    }

    tracing::info!(tasks = handles.len(), "background tasks spawned");
    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use sy_domain::config::StoreConfig;

    fn in_memory_config() -> Config {
        Config {
            store: StoreConfig {
                persist: false,
                ..StoreConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn invalid_config_refuses_to_boot() {
        let mut config = in_memory_config();
        config.scheduler.interval_secs = 0;
        let err = build_runtime(Arc::new(config)).err().unwrap();
        assert!(err.to_string().contains("1 error(s)"));
    }

    #[tokio::test]
    async fn disabled_scheduler_spawns_nothing() {
        let mut config = in_memory_config();
        config.scheduler.enabled = false;
        let runtime = build_runtime(Arc::new(config)).unwrap();
        let shutdown = CancellationToken::new();
        assert!(spawn_background_tasks(&runtime, &shutdown).is_empty());
    }

    #[tokio::test]
    async fn services_share_one_store() {
        let runtime = build_runtime(Arc::new(in_memory_config())).unwrap();
        let actor = sy_domain::actor::Actor::new("dana", sy_domain::actor::Role::Editor);
        let program = runtime
            .authoring
            .create_program(
                &actor,
                sy_publishing::NewProgram {
                    title: "Python Basics".into(),
                    language_primary: "en".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = runtime
            .manual
            .publish(&actor, sy_domain::model::PublishTarget::Program(program.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ASSETS_MISSING");
        assert!(runtime.store.snapshot().program(&program.id).is_some());
    }

    #[tokio::test]
    async fn background_tasks_stop_on_shutdown() {
        let runtime = build_runtime(Arc::new(in_memory_config())).unwrap();
        let shutdown = CancellationToken::new();
        let handles = spawn_background_tasks(&runtime, &shutdown);
        assert_eq!(handles.len(), 1);

        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
