//! In-memory catalog snapshot and its integrity rules.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use sy_domain::ids::{AssetId, LessonId, ProgramId, TermId};
use sy_domain::model::{Asset, AssetOwner, Lesson, Program, Term};
use sy_domain::status::{EntityKind, Status};

use crate::error::StoreError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Catalog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Every program, term, lesson and asset, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    programs: BTreeMap<ProgramId, Program>,
    terms: BTreeMap<TermId, Term>,
    lessons: BTreeMap<LessonId, Lesson>,
    assets: BTreeMap<AssetId, Asset>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self, id: &ProgramId) -> Option<&Program> {
        self.programs.get(id)
    }

    pub fn term(&self, id: &TermId) -> Option<&Term> {
        self.terms.get(id)
    }

    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.get(id)
    }

    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// All asset records attached to `owner`, regardless of language.
    pub fn assets_for(&self, owner: AssetOwner) -> Vec<&Asset> {
        self.assets.values().filter(|a| a.owner == owner).collect()
    }

    /// Terms of a program ordered by `term_number`.
    pub fn terms_of(&self, program_id: &ProgramId) -> Vec<&Term> {
        let mut terms: Vec<&Term> = self
            .terms
            .values()
            .filter(|t| t.program_id == *program_id)
            .collect();
        terms.sort_by_key(|t| t.term_number);
        terms
    }

    /// Lessons of a term ordered by `lesson_number`.
    pub fn lessons_of(&self, term_id: &TermId) -> Vec<&Lesson> {
        let mut lessons: Vec<&Lesson> = self
            .lessons
            .values()
            .filter(|l| l.term_id == *term_id)
            .collect();
        lessons.sort_by_key(|l| l.lesson_number);
        lessons
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
            && self.terms.is_empty()
            && self.lessons.is_empty()
            && self.assets.is_empty()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Upsert a program. A `published_at` already on record wins over the
    /// incoming value, so concurrent writers can never move it.
    pub fn put_program(&mut self, mut program: Program) {
        if let Some(existing) = self.programs.get(&program.id) {
            if existing.published_at.is_some() {
                program.published_at = existing.published_at;
            }
        }
        self.programs.insert(program.id, program);
    }

    pub fn put_term(&mut self, term: Term) {
        self.terms.insert(term.id, term);
    }

    /// Upsert a lesson, keeping any `published_at` already on record.
    pub fn put_lesson(&mut self, mut lesson: Lesson) {
        if let Some(existing) = self.lessons.get(&lesson.id) {
            if existing.published_at.is_some() {
                lesson.published_at = existing.published_at;
            }
        }
        self.lessons.insert(lesson.id, lesson);
    }

    pub fn put_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.id, asset);
    }

    pub fn clear(&mut self) {
        self.programs.clear();
        self.terms.clear();
        self.lessons.clear();
        self.assets.clear();
    }

    // ── Integrity ────────────────────────────────────────────────────

    /// Check referential integrity, uniqueness and status rules.
    ///
    /// Returns the first violation found as [`StoreError::Conflict`].
    pub fn check_constraints(&self) -> Result<(), StoreError> {
        for program in self.programs.values() {
            if !program.status.valid_for(EntityKind::Program) {
                return Err(StoreError::Conflict(format!(
                    "program {} cannot be {}",
                    program.id, program.status
                )));
            }
        }

        let mut term_numbers = HashSet::new();
        for term in self.terms.values() {
            if !self.programs.contains_key(&term.program_id) {
                return Err(StoreError::Conflict(format!(
                    "term {} references missing program {}",
                    term.id, term.program_id
                )));
            }
            if !term_numbers.insert((term.program_id, term.term_number)) {
                return Err(StoreError::Conflict(format!(
                    "term number {} already exists in program {}",
                    term.term_number, term.program_id
                )));
            }
        }

        let mut lesson_numbers = HashSet::new();
        for lesson in self.lessons.values() {
            if !self.terms.contains_key(&lesson.term_id) {
                return Err(StoreError::Conflict(format!(
                    "lesson {} references missing term {}",
                    lesson.id, lesson.term_id
                )));
            }
            if !lesson_numbers.insert((lesson.term_id, lesson.lesson_number)) {
                return Err(StoreError::Conflict(format!(
                    "lesson number {} already exists in term {}",
                    lesson.lesson_number, lesson.term_id
                )));
            }
            if lesson.status == Status::Scheduled && lesson.publish_at.is_none() {
                return Err(StoreError::Conflict(format!(
                    "scheduled lesson {} has no publish_at",
                    lesson.id
                )));
            }
            if lesson.status == Status::Published && lesson.published_at.is_none() {
                return Err(StoreError::Conflict(format!(
                    "published lesson {} has no published_at",
                    lesson.id
                )));
            }
        }

        let mut asset_keys = HashSet::new();
        for asset in self.assets.values() {
            let owner_exists = match asset.owner {
                AssetOwner::Program(id) => self.programs.contains_key(&id),
                AssetOwner::Lesson(id) => self.lessons.contains_key(&id),
            };
            if !owner_exists {
                return Err(StoreError::Conflict(format!(
                    "asset {} references missing {}",
                    asset.id, asset.owner
                )));
            }
            if asset.asset_type != asset.owner.asset_type() {
                return Err(StoreError::Conflict(format!(
                    "{} cannot carry a {} asset",
                    asset.owner, asset.asset_type
                )));
            }
            if !asset_keys.insert(asset.unique_key()) {
                return Err(StoreError::Conflict(format!(
                    "{} already has a {} {} for language '{}'",
                    asset.owner, asset.variant, asset.asset_type, asset.language
                )));
            }
        }

        Ok(())
    }

    // ── On-disk form ─────────────────────────────────────────────────

    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            version: CatalogDocument::VERSION,
            programs: self.programs.values().cloned().collect(),
            terms: self.terms.values().cloned().collect(),
            lessons: self.lessons.values().cloned().collect(),
            assets: self.assets.values().cloned().collect(),
        }
    }

    pub fn from_document(doc: CatalogDocument) -> Self {
        let mut catalog = Self::new();
        for p in doc.programs {
            catalog.programs.insert(p.id, p);
        }
        for t in doc.terms {
            catalog.terms.insert(t.id, t);
        }
        for l in doc.lessons {
            catalog.lessons.insert(l.id, l);
        }
        for a in doc.assets {
            catalog.assets.insert(a.id, a);
        }
        catalog
    }
}

/// Serialized form of a [`Catalog`] (`catalog.json`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl CatalogDocument {
    pub const VERSION: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use sy_domain::model::{AssetVariant, ContentType};

    fn program() -> Program {
        Program::new("Python Basics", "en")
    }

    fn term(program_id: ProgramId, n: u32) -> Term {
        Term {
            id: TermId::new(),
            program_id,
            term_number: n,
            title: None,
            created_at: Utc::now(),
        }
    }

    fn lesson(term_id: TermId, n: u32) -> Lesson {
        Lesson {
            id: LessonId::new(),
            term_id,
            lesson_number: n,
            title: format!("Lesson {n}"),
            content_type: ContentType::Video,
            duration_ms: Some(300_000),
            is_paid: false,
            content_language_primary: "en".into(),
            content_languages_available: vec!["en".into()],
            content_urls_by_language: BTreeMap::new(),
            subtitle_languages: Vec::new(),
            subtitle_urls_by_language: BTreeMap::new(),
            status: Status::Draft,
            publish_at: None,
            published_at: None,
            created_at: Utc::now(),
        }
    }

    fn populated() -> (Catalog, ProgramId, TermId, LessonId) {
        let mut c = Catalog::new();
        let p = program();
        let pid = p.id;
        c.put_program(p);
        let t = term(pid, 1);
        let tid = t.id;
        c.put_term(t);
        let l = lesson(tid, 1);
        let lid = l.id;
        c.put_lesson(l);
        (c, pid, tid, lid)
    }

    #[test]
    fn well_formed_catalog_passes() {
        let (c, _, _, _) = populated();
        assert!(c.check_constraints().is_ok());
    }

    #[test]
    fn duplicate_term_number_conflicts() {
        let (mut c, pid, _, _) = populated();
        c.put_term(term(pid, 1));
        let err = c.check_constraints().unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m.contains("term number 1")));
    }

    #[test]
    fn duplicate_lesson_number_conflicts() {
        let (mut c, _, tid, _) = populated();
        c.put_lesson(lesson(tid, 1));
        assert!(matches!(c.check_constraints(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn same_lesson_number_in_other_term_is_fine() {
        let (mut c, pid, _, _) = populated();
        let t2 = term(pid, 2);
        let t2_id = t2.id;
        c.put_term(t2);
        c.put_lesson(lesson(t2_id, 1));
        assert!(c.check_constraints().is_ok());
    }

    #[test]
    fn orphan_lesson_conflicts() {
        let mut c = Catalog::new();
        c.put_lesson(lesson(TermId::new(), 1));
        assert!(matches!(c.check_constraints(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn duplicate_asset_variant_conflicts() {
        let (mut c, _, _, lid) = populated();
        let owner = AssetOwner::Lesson(lid);
        c.put_asset(Asset::new(owner, "en", AssetVariant::Portrait, "a.jpg"));
        assert!(c.check_constraints().is_ok());
        c.put_asset(Asset::new(owner, "en", AssetVariant::Portrait, "b.jpg"));
        assert!(matches!(c.check_constraints(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn same_variant_in_other_language_is_fine() {
        let (mut c, _, _, lid) = populated();
        let owner = AssetOwner::Lesson(lid);
        c.put_asset(Asset::new(owner, "en", AssetVariant::Portrait, "a.jpg"));
        c.put_asset(Asset::new(owner, "hi", AssetVariant::Portrait, "b.jpg"));
        assert!(c.check_constraints().is_ok());
    }

    #[test]
    fn poster_on_lesson_conflicts() {
        let (mut c, _, _, lid) = populated();
        let mut asset = Asset::new(AssetOwner::Lesson(lid), "en", AssetVariant::Square, "x.jpg");
        asset.asset_type = sy_domain::model::AssetType::Poster;
        c.put_asset(asset);
        assert!(matches!(c.check_constraints(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn scheduled_program_conflicts() {
        let (mut c, pid, _, _) = populated();
        let mut p = c.program(&pid).unwrap().clone();
        p.status = Status::Scheduled;
        c.put_program(p);
        assert!(matches!(c.check_constraints(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn scheduled_lesson_requires_publish_at() {
        let (mut c, _, _, lid) = populated();
        let mut l = c.lesson(&lid).unwrap().clone();
        l.status = Status::Scheduled;
        c.put_lesson(l);
        assert!(matches!(c.check_constraints(), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn put_never_moves_published_at() {
        let (mut c, pid, _, lid) = populated();
        let first = Utc::now();

        let mut p = c.program(&pid).unwrap().clone();
        p.status = Status::Published;
        p.published_at = Some(first);
        c.put_program(p.clone());
        p.published_at = Some(first + chrono::Duration::minutes(5));
        c.put_program(p);
        assert_eq!(c.program(&pid).unwrap().published_at, Some(first));

        let mut l = c.lesson(&lid).unwrap().clone();
        l.status = Status::Published;
        l.published_at = Some(first);
        c.put_lesson(l.clone());
        l.published_at = None;
        c.put_lesson(l);
        assert_eq!(c.lesson(&lid).unwrap().published_at, Some(first));
    }

    #[test]
    fn children_come_back_in_number_order() {
        let (mut c, pid, tid, _) = populated();
        c.put_lesson(lesson(tid, 3));
        c.put_lesson(lesson(tid, 2));
        let numbers: Vec<u32> = c.lessons_of(&tid).iter().map(|l| l.lesson_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        c.put_term(term(pid, 0));
        let terms: Vec<u32> = c.terms_of(&pid).iter().map(|t| t.term_number).collect();
        assert_eq!(terms, vec![0, 1]);
    }

    #[test]
    fn document_conversion_preserves_everything() {
        let (mut c, pid, _, _) = populated();
        c.put_asset(Asset::new(
            AssetOwner::Program(pid),
            "en",
            AssetVariant::Landscape,
            "p.jpg",
        ));
        let json = serde_json::to_string(&c.to_document()).unwrap();
        let doc: CatalogDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc.version, CatalogDocument::VERSION);
        assert_eq!(Catalog::from_document(doc), c);
    }
}
