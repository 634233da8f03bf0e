use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ids::{LessonId, ProgramId};
use crate::model::{AssetVariant, PublishTarget};
use crate::status::EntityKind;

/// Structured trace events emitted across all Syllabus crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    PublishPassStarted {
        pass_id: Uuid,
        at: DateTime<Utc>,
    },
    ScheduledLessonsMatched {
        pass_id: Uuid,
        count: usize,
    },
    LessonPromoted {
        pass_id: Uuid,
        lesson_id: LessonId,
        published_at: Option<DateTime<Utc>>,
    },
    ProgramCascaded {
        pass_id: Uuid,
        program_id: ProgramId,
        lesson_id: LessonId,
        published_at: Option<DateTime<Utc>>,
    },
    /// An entity was published by the engine without the assets a manual
    /// publish would have required.
    GateBypassed {
        pass_id: Uuid,
        target: PublishTarget,
        missing: Vec<AssetVariant>,
    },
    /// A due lesson was left scheduled because the engine enforces the gate.
    LessonHeld {
        pass_id: Uuid,
        lesson_id: LessonId,
        missing: Vec<AssetVariant>,
    },
    CascadeSkipped {
        pass_id: Uuid,
        lesson_id: LessonId,
        program_id: Option<ProgramId>,
        reason: String,
    },
    PublishPassCommitted {
        pass_id: Uuid,
        promoted: usize,
        cascaded: usize,
        duration_ms: u64,
    },
    PublishPassFailed {
        pass_id: Uuid,
        error: String,
    },
    ManualPublish {
        target: PublishTarget,
        actor: String,
        outcome: String,
    },
    EntityCreated {
        kind: EntityKind,
        id: String,
        actor: String,
    },
    CatalogSeeded {
        programs: usize,
        lessons: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sy_event");
    }
}
