//! Authoring: creating catalog entities and attaching media.
//!
//! Every operation runs in its own transaction. Uniqueness of term numbers,
//! lesson numbers and asset variants is enforced when staging and again at
//! commit, so a concurrent writer that slipped in first still yields a
//! `Conflict` rather than a duplicate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use sy_domain::actor::Actor;
use sy_domain::clock::Clock;
use sy_domain::ids::{LessonId, ProgramId, TermId};
use sy_domain::model::{
    Asset, AssetOwner, AssetVariant, ContentType, Lesson, Program, Term,
};
use sy_domain::status::{EntityKind, Status};
use sy_domain::trace::TraceEvent;
use sy_store::{EntityStore, StoreError, Transaction};

#[derive(Debug, thiserror::Error)]
pub enum AuthoringError {
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthoringError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::Conflict(_)))
    }
}

// ── Inputs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct NewProgram {
    pub title: String,
    pub description: Option<String>,
    pub language_primary: String,
    pub languages_available: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewTerm {
    pub program_id: ProgramId,
    pub term_number: u32,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLesson {
    pub term_id: TermId,
    pub lesson_number: u32,
    pub title: String,
    pub content_type: ContentType,
    pub duration_ms: Option<u64>,
    pub is_paid: bool,
    pub content_language_primary: String,
    pub content_languages_available: Vec<String>,
    pub content_urls_by_language: BTreeMap<String, String>,
    pub subtitle_languages: Vec<String>,
    pub subtitle_urls_by_language: BTreeMap<String, String>,
    /// When set, the lesson is created `scheduled` for this instant.
    pub publish_at: Option<DateTime<Utc>>,
}

impl NewLesson {
    pub fn new(term_id: TermId, lesson_number: u32, title: impl Into<String>) -> Self {
        Self {
            term_id,
            lesson_number,
            title: title.into(),
            content_type: ContentType::Video,
            duration_ms: None,
            is_paid: false,
            content_language_primary: "en".into(),
            content_languages_available: Vec::new(),
            content_urls_by_language: BTreeMap::new(),
            subtitle_languages: Vec::new(),
            subtitle_urls_by_language: BTreeMap::new(),
            publish_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub language: String,
    pub variant: AssetVariant,
    pub url: String,
}

// ── Service ──────────────────────────────────────────────────────────

pub struct AuthoringService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl AuthoringService {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_program(
        &self,
        actor: &Actor,
        input: NewProgram,
    ) -> Result<Program, AuthoringError> {
        let title = required("title", &input.title)?;
        let language_primary = required("language_primary", &input.language_primary)?;
        let mut program = Program::new(title, language_primary);
        program.description = input.description.filter(|d| !d.trim().is_empty());
        program.languages_available =
            with_primary(&program.language_primary, input.languages_available);
        program.created_at = self.clock.now();

        let created = program.clone();
        self.write(|tx| tx.insert_program(program)).await?;
        created_event(EntityKind::Program, created.id, actor);
        Ok(created)
    }

    pub async fn create_term(&self, actor: &Actor, input: NewTerm) -> Result<Term, AuthoringError> {
        let term = Term {
            id: TermId::new(),
            program_id: input.program_id,
            term_number: input.term_number,
            title: input.title.filter(|t| !t.trim().is_empty()),
            created_at: self.clock.now(),
        };

        let created = term.clone();
        self.write(|tx| tx.insert_term(term)).await?;
        created_event(EntityKind::Term, created.id, actor);
        Ok(created)
    }

    /// Create a lesson in `draft`, or in `scheduled` when `publish_at` is
    /// supplied. A `publish_at` in the past is accepted and the lesson is
    /// promoted on the next engine pass.
    pub async fn create_lesson(
        &self,
        actor: &Actor,
        input: NewLesson,
    ) -> Result<Lesson, AuthoringError> {
        let title = required("title", &input.title)?;
        let language = required("content_language_primary", &input.content_language_primary)?;
        if let Some(lang) = input
            .content_urls_by_language
            .keys()
            .find(|lang| !input.content_languages_available.contains(lang) && **lang != language)
        {
            return Err(AuthoringError::invalid(
                "content_urls_by_language",
                format!("language '{lang}' is not listed as available"),
            ));
        }

        let status = if input.publish_at.is_some() {
            Status::Scheduled
        } else {
            Status::Draft
        };
        let lesson = Lesson {
            id: LessonId::new(),
            term_id: input.term_id,
            lesson_number: input.lesson_number,
            title,
            content_type: input.content_type,
            duration_ms: input.duration_ms,
            is_paid: input.is_paid,
            content_languages_available: with_primary(&language, input.content_languages_available),
            content_language_primary: language,
            content_urls_by_language: input.content_urls_by_language,
            subtitle_languages: input.subtitle_languages,
            subtitle_urls_by_language: input.subtitle_urls_by_language,
            status,
            publish_at: input.publish_at,
            published_at: None,
            created_at: self.clock.now(),
        };

        let created = lesson.clone();
        self.write(|tx| tx.insert_lesson(lesson)).await?;
        created_event(EntityKind::Lesson, created.id, actor);
        Ok(created)
    }

    /// Attach a poster to a program.
    pub async fn add_program_asset(
        &self,
        actor: &Actor,
        program_id: ProgramId,
        input: NewAsset,
    ) -> Result<Asset, AuthoringError> {
        self.add_asset(actor, AssetOwner::Program(program_id), input)
            .await
    }

    /// Attach a thumbnail to a lesson.
    pub async fn add_lesson_asset(
        &self,
        actor: &Actor,
        lesson_id: LessonId,
        input: NewAsset,
    ) -> Result<Asset, AuthoringError> {
        self.add_asset(actor, AssetOwner::Lesson(lesson_id), input)
            .await
    }

    async fn add_asset(
        &self,
        actor: &Actor,
        owner: AssetOwner,
        input: NewAsset,
    ) -> Result<Asset, AuthoringError> {
        let language = required("language", &input.language)?;
        let url = required("url", &input.url)?;
        let asset = Asset::new(owner, language, input.variant, url);

        let created = asset.clone();
        self.write(|tx| tx.insert_asset(asset)).await?;
        created_event(EntityKind::Asset, created.id, actor);
        Ok(created)
    }

    /// Stage with `f` in a fresh transaction and commit, or roll back on
    /// the first error.
    async fn write<F>(&self, f: F) -> Result<(), AuthoringError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), StoreError>,
    {
        let mut tx = self.store.begin().await?;
        if let Err(e) = f(&mut tx) {
            self.store.rollback(tx).await;
            return Err(e.into());
        }
        self.store.commit(tx).await?;
        Ok(())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, AuthoringError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthoringError::invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// `languages` with `primary` first and duplicates removed.
fn with_primary(primary: &str, languages: Vec<String>) -> Vec<String> {
    let mut out = vec![primary.to_string()];
    for lang in languages {
        let lang = lang.trim().to_string();
        if !lang.is_empty() && !out.contains(&lang) {
            out.push(lang);
        }
    }
    out
}

fn created_event(kind: EntityKind, id: impl ToString, actor: &Actor) {
    let id = id.to_string();
    tracing::debug!(%kind, %id, actor = %actor, "entity created");
    TraceEvent::EntityCreated {
        kind,
        id,
        actor: actor.to_string(),
    }
    .emit();
}
