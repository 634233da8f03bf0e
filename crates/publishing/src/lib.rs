//! Publication lifecycle for the Syllabus catalog.
//!
//! Two writers move programs and lessons to `published`:
//!
//! - [`ManualPublishService`] acts on request and refuses entities that lack
//!   portrait and landscape media in their primary language.
//! - [`SchedulingEngine`] promotes scheduled lessons once their time has
//!   come and cascades the promotion to the parent program. By default it
//!   does not consult the Asset Gate; every such bypass is reported.
//!
//! Both share one [`StateMachine`] and differ only in the guard they plug
//! into it.

pub mod authoring;
pub mod gate;
pub mod manual;
pub mod scheduler;
pub mod seed;
pub mod state_machine;

pub use authoring::{AuthoringError, AuthoringService, NewAsset, NewLesson, NewProgram, NewTerm};
pub use manual::{ManualPublishService, PublishError, Published};
pub use scheduler::{PassReport, SchedulerError, SchedulingEngine};
pub use seed::{seed_demo, SeedSummary};
pub use state_machine::{
    AssetGateGuard, PublishGuard, StateMachine, StateMachineError, Transition, Ungated,
};
