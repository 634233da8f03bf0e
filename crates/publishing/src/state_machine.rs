//! Publication state machine shared by the manual and autonomous writers.
//!
//! Both paths move entities through the same transition table. They differ
//! only in the [`PublishGuard`] consulted before the transition: the manual
//! path runs the Asset Gate, the scheduling engine runs [`Ungated`] unless
//! configured otherwise.

use chrono::{DateTime, Utc};

use sy_domain::ids::{LessonId, ProgramId};
use sy_domain::model::{AssetVariant, PublishTarget};
use sy_domain::status::{EntityKind, Status};
use sy_store::{Catalog, StoreError, Transaction};

use crate::gate;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transition table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether `kind` may move from `from` to `to`.
///
/// Only transitions into `published` are defined here. `published` to
/// `published` is allowed so re-publishing is an idempotent success.
pub fn is_transition_allowed(kind: EntityKind, from: Status, to: Status) -> bool {
    use Status::{Draft, Published, Scheduled};
    matches!(
        (kind, from, to),
        (EntityKind::Lesson, Draft | Scheduled | Published, Published)
            | (EntityKind::Program, Draft | Published, Published)
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Guards
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Precondition evaluated before a publish transition.
pub trait PublishGuard: Send + Sync {
    fn name(&self) -> &'static str;

    /// Variants that block the transition. Empty means allowed.
    fn missing_assets(
        &self,
        catalog: &Catalog,
        target: PublishTarget,
    ) -> Result<Vec<AssetVariant>, StoreError>;
}

impl<G: PublishGuard + ?Sized> PublishGuard for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn missing_assets(
        &self,
        catalog: &Catalog,
        target: PublishTarget,
    ) -> Result<Vec<AssetVariant>, StoreError> {
        (**self).missing_assets(catalog, target)
    }
}

/// Requires portrait and landscape media in the primary language.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetGateGuard;

impl PublishGuard for AssetGateGuard {
    fn name(&self) -> &'static str {
        "asset_gate"
    }

    fn missing_assets(
        &self,
        catalog: &Catalog,
        target: PublishTarget,
    ) -> Result<Vec<AssetVariant>, StoreError> {
        gate::missing_for_target(catalog, target)
    }
}

/// No precondition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ungated;

impl PublishGuard for Ungated {
    fn name(&self) -> &'static str {
        "ungated"
    }

    fn missing_assets(&self, _: &Catalog, _: PublishTarget) -> Result<Vec<AssetVariant>, StoreError> {
        Ok(Vec::new())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, thiserror::Error)]
pub enum StateMachineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{target} is missing required assets: {}", join_variants(.missing))]
    AssetsMissing {
        target: PublishTarget,
        missing: Vec<AssetVariant>,
    },

    #[error("{target} cannot move from {from} to {to}")]
    InvalidTransition {
        target: PublishTarget,
        from: Status,
        to: Status,
    },
}

fn join_variants(variants: &[AssetVariant]) -> String {
    variants
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a successful publish transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: PublishTarget,
    pub from: Status,
    /// The entity's `published_at` after the transition.
    pub published_at: DateTime<Utc>,
    /// `false` when the entity was already published and nothing changed.
    pub newly_published: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StateMachine<G> {
    guard: G,
}

impl<G: PublishGuard> StateMachine<G> {
    pub fn new(guard: G) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &G {
        &self.guard
    }

    /// Stage a transition to `published` in `tx`.
    ///
    /// Checks run in order: the entity exists, the guard passes, the
    /// transition is in the table. Nothing is staged unless all three hold.
    /// `published_at` is set to `now` only if it was unset.
    pub fn publish(
        &self,
        tx: &mut Transaction,
        target: PublishTarget,
        now: DateTime<Utc>,
    ) -> Result<Transition, StateMachineError> {
        match target {
            PublishTarget::Program(id) => self.publish_program(tx, id, now),
            PublishTarget::Lesson(id) => self.publish_lesson(tx, id, now),
        }
    }

    pub fn publish_program(
        &self,
        tx: &mut Transaction,
        id: ProgramId,
        now: DateTime<Utc>,
    ) -> Result<Transition, StateMachineError> {
        let target = PublishTarget::Program(id);
        let mut program = tx.program(&id)?.clone();
        self.check(tx, target, program.status)?;

        let from = program.status;
        let newly_published = from != Status::Published || program.published_at.is_none();
        program.status = Status::Published;
        let published_at = *program.published_at.get_or_insert(now);
        if newly_published {
            tx.save_program(program);
        }

        Ok(Transition {
            target,
            from,
            published_at,
            newly_published,
        })
    }

    pub fn publish_lesson(
        &self,
        tx: &mut Transaction,
        id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<Transition, StateMachineError> {
        let target = PublishTarget::Lesson(id);
        let mut lesson = tx.lesson(&id)?.clone();
        self.check(tx, target, lesson.status)?;

        let from = lesson.status;
        let newly_published = from != Status::Published || lesson.published_at.is_none();
        lesson.status = Status::Published;
        let published_at = *lesson.published_at.get_or_insert(now);
        if newly_published {
            tx.save_lesson(lesson);
        }

        Ok(Transition {
            target,
            from,
            published_at,
            newly_published,
        })
    }

    fn check(
        &self,
        tx: &Transaction,
        target: PublishTarget,
        from: Status,
    ) -> Result<(), StateMachineError> {
        let missing = self.guard.missing_assets(tx.catalog(), target)?;
        if !missing.is_empty() {
            return Err(StateMachineError::AssetsMissing { target, missing });
        }
        if !is_transition_allowed(target.kind(), from, Status::Published) {
            return Err(StateMachineError::InvalidTransition {
                target,
                from,
                to: Status::Published,
            });
        }
        Ok(())
    }
}
