//! Scheduling engine. Promotes due scheduled lessons and cascades the
//! promotion to their programs.
//!
//! One pass is one transaction: every promotion and cascade staged during a
//! pass commits together, or the pass is rolled back and its lessons are
//! picked up again on the next tick.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sy_domain::actor::Actor;
use sy_domain::clock::Clock;
use sy_domain::config::SchedulerConfig;
use sy_domain::ids::{LessonId, ProgramId};
use sy_domain::model::{Lesson, PublishTarget};
use sy_domain::trace::TraceEvent;
use sy_store::{EntityStore, LessonFilter, StoreError, Transaction};

use crate::gate;
use crate::state_machine::{
    AssetGateGuard, PublishGuard, StateMachine, StateMachineError, Ungated,
};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] StateMachineError),
}

/// What one pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Due lessons found by the query.
    pub matched: usize,
    pub promoted: Vec<LessonId>,
    pub cascaded: Vec<ProgramId>,
    /// Entities published without the assets a manual publish requires.
    pub gate_bypassed: Vec<PublishTarget>,
    /// Due lessons left scheduled because the gate is enforced.
    pub held: Vec<LessonId>,
    pub cascades_skipped: usize,
    pub duration_ms: u64,
}

impl PassReport {
    fn new(pass_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            pass_id,
            started_at,
            matched: 0,
            promoted: Vec::new(),
            cascaded: Vec::new(),
            gate_bypassed: Vec::new(),
            held: Vec::new(),
            cascades_skipped: 0,
            duration_ms: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.matched == 0
    }
}

pub struct SchedulingEngine {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    machine: StateMachine<Box<dyn PublishGuard>>,
    actor: Actor,
}

impl SchedulingEngine {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        let guard: Box<dyn PublishGuard> = if config.enforce_asset_gate {
            Box::new(AssetGateGuard)
        } else {
            Box::new(Ungated)
        };
        Self {
            store,
            clock,
            config,
            machine: StateMachine::new(guard),
            actor: Actor::scheduler(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run passes on the configured interval until `shutdown` fires.
    ///
    /// A pass in progress always completes; cancellation is only observed
    /// while waiting for the next tick. Pass failures are logged and the
    /// loop carries on.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            actor = %self.actor,
            interval_secs = self.config.interval().as_secs(),
            guard = self.machine.guard().name(),
            "scheduling engine started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.run_pass().await {
                Ok(report) if report.is_idle() => {
                    tracing::trace!(pass_id = %report.pass_id, "no scheduled lessons due");
                }
                Ok(report) => {
                    tracing::info!(
                        pass_id = %report.pass_id,
                        promoted = report.promoted.len(),
                        cascaded = report.cascaded.len(),
                        gate_bypassed = report.gate_bypassed.len(),
                        held = report.held.len(),
                        "publish pass committed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        actor = %self.actor,
                        error = %e,
                        "publish pass failed, retrying next interval"
                    );
                }
            }
        }

        tracing::info!("scheduling engine stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Promote every due lesson once, in a single transaction.
    pub async fn run_pass(&self) -> Result<PassReport, SchedulerError> {
        let pass_id = Uuid::new_v4();
        let now = self.clock.now();
        let started = Instant::now();
        TraceEvent::PublishPassStarted { pass_id, at: now }.emit();

        let result = self.execute(pass_id, now).await;
        match result {
            Ok(mut report) => {
                report.duration_ms = started.elapsed().as_millis() as u64;
                if !report.is_idle() {
                    TraceEvent::PublishPassCommitted {
                        pass_id,
                        promoted: report.promoted.len(),
                        cascaded: report.cascaded.len(),
                        duration_ms: report.duration_ms,
                    }
                    .emit();
                }
                Ok(report)
            }
            Err(e) => {
                TraceEvent::PublishPassFailed {
                    pass_id,
                    error: e.to_string(),
                }
                .emit();
                Err(e)
            }
        }
    }

    async fn execute(&self, pass_id: Uuid, now: DateTime<Utc>) -> Result<PassReport, SchedulerError> {
        let mut tx = self.store.begin().await?;

        let report = match self.promote_due(&mut tx, pass_id, now) {
            Ok(report) => report,
            Err(e) => {
                self.store.rollback(tx).await;
                return Err(e);
            }
        };

        // A failed commit publishes nothing; the same lessons are still due
        // on the next pass.
        self.store.commit(tx).await?;
        Ok(report)
    }

    fn promote_due(
        &self,
        tx: &mut Transaction,
        pass_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PassReport, SchedulerError> {
        let mut report = PassReport::new(pass_id, now);
        let due = tx.query_lessons(&LessonFilter::due(now));
        report.matched = due.len();
        TraceEvent::ScheduledLessonsMatched {
            pass_id,
            count: due.len(),
        }
        .emit();

        let cap = self.config.max_lessons_per_pass;
        for lesson in due {
            if cap > 0 && report.promoted.len() >= cap {
                tracing::debug!(%pass_id, cap, "per-pass cap reached, deferring remaining lessons");
                break;
            }
            if !self.promote_lesson(tx, &lesson, now, &mut report)? {
                continue;
            }
            self.cascade(tx, &lesson, now, &mut report)?;
        }

        Ok(report)
    }

    /// Returns `false` when the lesson was held back by the guard.
    fn promote_lesson(
        &self,
        tx: &mut Transaction,
        lesson: &Lesson,
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<bool, SchedulerError> {
        let pass_id = report.pass_id;
        let target = PublishTarget::Lesson(lesson.id);

        let transition = match self.machine.publish(tx, target, now) {
            Ok(t) => t,
            Err(StateMachineError::AssetsMissing { missing, .. }) => {
                tracing::warn!(%pass_id, lesson_id = %lesson.id, ?missing, "lesson held: thumbnails missing");
                TraceEvent::LessonHeld {
                    pass_id,
                    lesson_id: lesson.id,
                    missing,
                }
                .emit();
                report.held.push(lesson.id);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        self.note_bypass(tx, target, report)?;
        report.promoted.push(lesson.id);
        TraceEvent::LessonPromoted {
            pass_id,
            lesson_id: lesson.id,
            published_at: Some(transition.published_at),
        }
        .emit();
        Ok(true)
    }

    /// Publish the lesson's program if it is not published yet.
    fn cascade(
        &self,
        tx: &mut Transaction,
        lesson: &Lesson,
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), SchedulerError> {
        let pass_id = report.pass_id;

        let program_id = match tx.term(&lesson.term_id) {
            Ok(term) => term.program_id,
            Err(_) => {
                self.skip_cascade(report, lesson.id, None, "term not found");
                return Ok(());
            }
        };
        let status = match tx.program(&program_id) {
            Ok(program) => program.status,
            Err(_) => {
                self.skip_cascade(report, lesson.id, Some(program_id), "program not found");
                return Ok(());
            }
        };
        if status.is_published() {
            return Ok(());
        }

        let target = PublishTarget::Program(program_id);
        let transition = match self.machine.publish(tx, target, now) {
            Ok(t) => t,
            Err(StateMachineError::AssetsMissing { .. }) => {
                self.skip_cascade(report, lesson.id, Some(program_id), "posters missing");
                return Ok(());
            }
            Err(StateMachineError::InvalidTransition { from, .. }) => {
                let reason = format!("program is {from}");
                self.skip_cascade(report, lesson.id, Some(program_id), &reason);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.note_bypass(tx, target, report)?;
        report.cascaded.push(program_id);
        TraceEvent::ProgramCascaded {
            pass_id,
            program_id,
            lesson_id: lesson.id,
            published_at: Some(transition.published_at),
        }
        .emit();
        Ok(())
    }

    /// Record a publish that skipped assets a manual publish would require.
    fn note_bypass(
        &self,
        tx: &Transaction,
        target: PublishTarget,
        report: &mut PassReport,
    ) -> Result<(), SchedulerError> {
        let missing = gate::missing_for_target(tx.catalog(), target)?;
        if missing.is_empty() {
            return Ok(());
        }
        tracing::warn!(
            pass_id = %report.pass_id,
            %target,
            ?missing,
            "published without required assets (asset gate bypassed)"
        );
        TraceEvent::GateBypassed {
            pass_id: report.pass_id,
            target,
            missing,
        }
        .emit();
        report.gate_bypassed.push(target);
        Ok(())
    }

    fn skip_cascade(
        &self,
        report: &mut PassReport,
        lesson_id: LessonId,
        program_id: Option<ProgramId>,
        reason: &str,
    ) {
        tracing::warn!(pass_id = %report.pass_id, %lesson_id, ?program_id, reason, "cascade skipped");
        TraceEvent::CascadeSkipped {
            pass_id: report.pass_id,
            lesson_id,
            program_id,
            reason: reason.to_string(),
        }
        .emit();
        report.cascades_skipped += 1;
    }
}
