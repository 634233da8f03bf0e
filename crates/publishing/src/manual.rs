//! Manual publish: the operator-triggered path, checked by the Asset Gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use sy_domain::actor::Actor;
use sy_domain::clock::Clock;
use sy_domain::model::{AssetVariant, PublishTarget};
use sy_domain::status::Status;
use sy_domain::trace::TraceEvent;
use sy_store::{EntityStore, StoreError};

use crate::state_machine::{AssetGateGuard, StateMachine, StateMachineError};

/// Successful manual publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Published {
    pub target: PublishTarget,
    pub published_at: DateTime<Utc>,
    /// The entity was already published; nothing was written.
    pub already_published: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{target} not found")]
    NotFound { target: PublishTarget },

    #[error("{target} must have {} before publishing", required_media(.target))]
    AssetsMissing {
        target: PublishTarget,
        missing: Vec<AssetVariant>,
    },

    #[error("{target} cannot be published from {from}")]
    InvalidTransition { target: PublishTarget, from: Status },

    #[error("publishing {target} failed: {source}")]
    Store {
        target: PublishTarget,
        #[source]
        source: StoreError,
    },
}

fn required_media(target: &PublishTarget) -> &'static str {
    match target {
        PublishTarget::Program(_) => "portrait and landscape posters",
        PublishTarget::Lesson(_) => "portrait and landscape thumbnails",
    }
}

impl PublishError {
    pub fn target(&self) -> PublishTarget {
        match self {
            Self::NotFound { target }
            | Self::AssetsMissing { target, .. }
            | Self::InvalidTransition { target, .. }
            | Self::Store { target, .. } => *target,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AssetsMissing { .. } => "ASSETS_MISSING",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Store { .. } => "STORE_FAILURE",
        }
    }

    /// Worth retrying unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_transient())
    }

    fn from_machine(target: PublishTarget, err: StateMachineError) -> Self {
        match err {
            StateMachineError::Store(StoreError::NotFound { .. }) => Self::NotFound { target },
            StateMachineError::Store(source) => Self::Store { target, source },
            StateMachineError::AssetsMissing { missing, .. } => {
                Self::AssetsMissing { target, missing }
            }
            StateMachineError::InvalidTransition { from, .. } => {
                Self::InvalidTransition { target, from }
            }
        }
    }
}

/// Publishes one program or lesson on request, after the Asset Gate.
///
/// Never cascades: publishing a lesson leaves its program alone and
/// publishing a program leaves its lessons alone.
pub struct ManualPublishService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    machine: StateMachine<AssetGateGuard>,
}

impl ManualPublishService {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            machine: StateMachine::new(AssetGateGuard),
        }
    }

    pub async fn publish(
        &self,
        actor: &Actor,
        target: PublishTarget,
    ) -> Result<Published, PublishError> {
        let result = self.publish_inner(target).await;

        let outcome = match &result {
            Ok(p) if p.already_published => "already_published",
            Ok(_) => "published",
            Err(e) => e.code(),
        };
        TraceEvent::ManualPublish {
            target,
            actor: actor.to_string(),
            outcome: outcome.to_string(),
        }
        .emit();

        match &result {
            Ok(p) => tracing::info!(
                %target,
                actor = %actor,
                published_at = %p.published_at,
                already_published = p.already_published,
                "manual publish succeeded"
            ),
            Err(e) => tracing::warn!(%target, actor = %actor, error = %e, "manual publish rejected"),
        }
        result
    }

    async fn publish_inner(&self, target: PublishTarget) -> Result<Published, PublishError> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|source| PublishError::Store { target, source })?;

        let transition = match self.machine.publish(&mut tx, target, self.clock.now()) {
            Ok(t) => t,
            Err(e) => {
                self.store.rollback(tx).await;
                return Err(PublishError::from_machine(target, e));
            }
        };

        self.store
            .commit(tx)
            .await
            .map_err(|source| PublishError::Store { target, source })?;

        Ok(Published {
            target,
            published_at: transition.published_at,
            already_published: !transition.newly_published,
        })
    }
}
