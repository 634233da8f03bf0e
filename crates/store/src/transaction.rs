use chrono::{DateTime, Utc};
use uuid::Uuid;

use sy_domain::ids::{LessonId, ProgramId, TermId};
use sy_domain::model::{Asset, AssetOwner, Lesson, Program, Term};
use sy_domain::status::{EntityKind, Status};

use crate::catalog::Catalog;
use crate::error::StoreError;

/// A staged write. Replayed in order onto the live catalog at commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Program(Program),
    Term(Term),
    Lesson(Lesson),
    Asset(Asset),
    Clear,
}

impl Mutation {
    pub fn apply(self, catalog: &mut Catalog) {
        match self {
            Mutation::Program(p) => catalog.put_program(p),
            Mutation::Term(t) => catalog.put_term(t),
            Mutation::Lesson(l) => catalog.put_lesson(l),
            Mutation::Asset(a) => catalog.put_asset(a),
            Mutation::Clear => catalog.clear(),
        }
    }
}

/// Criteria for [`Transaction::query_lessons`].
#[derive(Debug, Clone, Default)]
pub struct LessonFilter {
    pub status: Option<Status>,
    pub publish_at_or_before: Option<DateTime<Utc>>,
}

impl LessonFilter {
    /// Scheduled lessons whose `publish_at` is at or before `now`.
    pub fn due(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(Status::Scheduled),
            publish_at_or_before: Some(now),
            ..Self::default()
        }
    }

    pub fn matches(&self, lesson: &Lesson) -> bool {
        if self.status.is_some_and(|s| s != lesson.status) {
            return false;
        }
        if let Some(cutoff) = self.publish_at_or_before {
            match lesson.publish_at {
                Some(at) if at <= cutoff => {}
                _ => return false,
            }
        }
        true
    }
}

/// A unit of work against the store.
///
/// Reads see the catalog as it was at `begin` plus this transaction's own
/// staged writes. Nothing is visible to other readers until commit.
#[derive(Debug)]
pub struct Transaction {
    id: Uuid,
    view: Catalog,
    mutations: Vec<Mutation>,
}

impl Transaction {
    pub fn new(view: Catalog) -> Self {
        Self {
            id: Uuid::new_v4(),
            view,
            mutations: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The transaction's current view of the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.view
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn program(&self, id: &ProgramId) -> Result<&Program, StoreError> {
        self.view
            .program(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Program, id))
    }

    pub fn term(&self, id: &TermId) -> Result<&Term, StoreError> {
        self.view
            .term(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Term, id))
    }

    pub fn lesson(&self, id: &LessonId) -> Result<&Lesson, StoreError> {
        self.view
            .lesson(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Lesson, id))
    }

    pub fn assets_for(&self, owner: AssetOwner) -> Vec<&Asset> {
        self.view.assets_for(owner)
    }

    /// Lessons matching `filter`, ordered by `(publish_at, id)` with
    /// unscheduled lessons last.
    pub fn query_lessons(&self, filter: &LessonFilter) -> Vec<Lesson> {
        let mut hits: Vec<&Lesson> = self.view.lessons().filter(|l| filter.matches(l)).collect();
        hits.sort_by(|a, b| match (a.publish_at, b.publish_at) {
            (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        hits.into_iter().cloned().collect()
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub fn save_program(&mut self, program: Program) {
        self.stage(Mutation::Program(program));
    }

    pub fn save_term(&mut self, term: Term) {
        self.stage(Mutation::Term(term));
    }

    pub fn save_lesson(&mut self, lesson: Lesson) {
        self.stage(Mutation::Lesson(lesson));
    }

    pub fn save_asset(&mut self, asset: Asset) {
        self.stage(Mutation::Asset(asset));
    }

    /// Stage a new program. Fails if the id is already taken.
    pub fn insert_program(&mut self, program: Program) -> Result<(), StoreError> {
        if self.view.program(&program.id).is_some() {
            return Err(StoreError::Conflict(format!("program {} already exists", program.id)));
        }
        self.save_program(program);
        Ok(())
    }

    /// Stage a new term. The parent program must exist in this view and the
    /// term number must be free within it.
    pub fn insert_term(&mut self, term: Term) -> Result<(), StoreError> {
        self.program(&term.program_id)?;
        if self.view.term(&term.id).is_some() {
            return Err(StoreError::Conflict(format!("term {} already exists", term.id)));
        }
        if self
            .view
            .terms_of(&term.program_id)
            .iter()
            .any(|t| t.term_number == term.term_number)
        {
            return Err(StoreError::Conflict(format!(
                "term number {} already exists in program {}",
                term.term_number, term.program_id
            )));
        }
        self.save_term(term);
        Ok(())
    }

    /// Stage a new lesson. The parent term must exist in this view and the
    /// lesson number must be free within it.
    pub fn insert_lesson(&mut self, lesson: Lesson) -> Result<(), StoreError> {
        self.term(&lesson.term_id)?;
        if self.view.lesson(&lesson.id).is_some() {
            return Err(StoreError::Conflict(format!("lesson {} already exists", lesson.id)));
        }
        if self
            .view
            .lessons_of(&lesson.term_id)
            .iter()
            .any(|l| l.lesson_number == lesson.lesson_number)
        {
            return Err(StoreError::Conflict(format!(
                "lesson number {} already exists in term {}",
                lesson.lesson_number, lesson.term_id
            )));
        }
        self.save_lesson(lesson);
        Ok(())
    }

    /// Stage a new asset. The owner must exist and must not already carry
    /// the same variant in the same language.
    pub fn insert_asset(&mut self, asset: Asset) -> Result<(), StoreError> {
        match asset.owner {
            AssetOwner::Program(id) => {
                self.program(&id)?;
            }
            AssetOwner::Lesson(id) => {
                self.lesson(&id)?;
            }
        }
        let key = asset.unique_key();
        if self
            .view
            .assets_for(asset.owner)
            .iter()
            .any(|a| a.unique_key() == key)
        {
            return Err(StoreError::Conflict(format!(
                "{} already has a {} {} for language '{}'",
                asset.owner, asset.variant, asset.asset_type, asset.language
            )));
        }
        self.save_asset(asset);
        Ok(())
    }

    /// Stage removal of every record.
    pub fn clear(&mut self) {
        self.stage(Mutation::Clear);
    }

    fn stage(&mut self, mutation: Mutation) {
        mutation.clone().apply(&mut self.view);
        self.mutations.push(mutation);
    }

    /// Number of staged mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}
