//! Demo catalog: two programs, one with a lesson scheduled two minutes out.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use sy_domain::clock::Clock;
use sy_domain::ids::{LessonId, ProgramId, TermId};
use sy_domain::model::{
    Asset, AssetOwner, AssetVariant, ContentType, Lesson, Program, Term,
};
use sy_domain::status::Status;
use sy_domain::trace::TraceEvent;
use sy_store::{EntityStore, StoreError, Transaction};

/// Ids of the seeded records, for callers that want to act on them.
#[derive(Debug, Clone)]
pub struct SeedSummary {
    pub programs: Vec<ProgramId>,
    pub lessons: Vec<LessonId>,
    /// The lesson left `scheduled` for the engine to pick up.
    pub scheduled_lesson: LessonId,
}

struct DemoLesson<'a> {
    number: u32,
    title: &'a str,
    content_type: ContentType,
    duration_ms: Option<u64>,
    is_paid: bool,
    urls: &'a [(&'a str, &'a str)],
    publish_at: Option<DateTime<Utc>>,
}

/// Replace the whole catalog with the demo data in one transaction.
pub async fn seed_demo(
    store: &dyn EntityStore,
    clock: &dyn Clock,
) -> Result<SeedSummary, StoreError> {
    let now = clock.now();
    let mut tx = store.begin().await?;
    tx.clear();

    let summary = match stage_demo(&mut tx, now) {
        Ok(summary) => summary,
        Err(e) => {
            store.rollback(tx).await;
            return Err(e);
        }
    };
    store.commit(tx).await?;

    TraceEvent::CatalogSeeded {
        programs: summary.programs.len(),
        lessons: summary.lessons.len(),
    }
    .emit();
    tracing::info!(
        programs = summary.programs.len(),
        lessons = summary.lessons.len(),
        scheduled_lesson = %summary.scheduled_lesson,
        "demo catalog seeded"
    );
    Ok(summary)
}

fn stage_demo(tx: &mut Transaction, now: DateTime<Utc>) -> Result<SeedSummary, StoreError> {
    let mut programs = Vec::new();
    let mut lessons = Vec::new();

    // Python Basics
    let python = stage_program(
        tx,
        now,
        "Python Basics",
        "Learn Python from scratch",
        &["en"],
        "Introduction",
        "poster1",
    )?;
    programs.push(python.0);
    let python_lessons = [
        DemoLesson {
            number: 1,
            title: "What is Python?",
            content_type: ContentType::Video,
            duration_ms: Some(300_000),
            is_paid: false,
            urls: &[("en", "https://example.com/python1")],
            publish_at: None,
        },
        DemoLesson {
            number: 2,
            title: "Variables & Types",
            content_type: ContentType::Video,
            duration_ms: Some(420_000),
            is_paid: false,
            urls: &[("en", "https://example.com/python2")],
            publish_at: None,
        },
        DemoLesson {
            number: 3,
            title: "Control Flow",
            content_type: ContentType::Video,
            duration_ms: Some(480_000),
            is_paid: true,
            urls: &[("en", "https://example.com/python3")],
            publish_at: Some(now + Duration::minutes(2)),
        },
    ];
    let mut scheduled_lesson = None;
    for demo in &python_lessons {
        let id = stage_lesson(tx, python.1, demo, now, "thumb")?;
        if demo.publish_at.is_some() {
            scheduled_lesson = Some(id);
        }
        lessons.push(id);
    }

    // AI for Beginners
    let ai = stage_program(
        tx,
        now,
        "AI for Beginners",
        "Intro to AI concepts",
        &["en", "hi"],
        "Getting Started",
        "poster2",
    )?;
    programs.push(ai.0);
    let ai_lessons = [
        DemoLesson {
            number: 1,
            title: "What is AI?",
            content_type: ContentType::Article,
            duration_ms: None,
            is_paid: false,
            urls: &[
                ("en", "https://example.com/ai_en"),
                ("hi", "https://example.com/ai_hi"),
            ],
            publish_at: None,
        },
        DemoLesson {
            number: 2,
            title: "AI in Real Life",
            content_type: ContentType::Video,
            duration_ms: Some(360_000),
            is_paid: false,
            urls: &[("en", "https://example.com/ai2")],
            publish_at: None,
        },
        DemoLesson {
            number: 3,
            title: "Future of AI",
            content_type: ContentType::Video,
            duration_ms: Some(390_000),
            is_paid: true,
            urls: &[("en", "https://example.com/ai3")],
            publish_at: None,
        },
    ];
    for demo in &ai_lessons {
        lessons.push(stage_lesson(tx, ai.1, demo, now, "thumb2")?);
    }

    let scheduled_lesson = scheduled_lesson.ok_or_else(|| {
        StoreError::Conflict("demo catalog has no scheduled lesson".into())
    })?;
    Ok(SeedSummary {
        programs,
        lessons,
        scheduled_lesson,
    })
}

/// Stage a draft program with one term and its portrait and landscape
/// posters.
fn stage_program(
    tx: &mut Transaction,
    now: DateTime<Utc>,
    title: &str,
    description: &str,
    languages: &[&str],
    term_title: &str,
    poster_prefix: &str,
) -> Result<(ProgramId, TermId), StoreError> {
    let mut program = Program::new(title, "en");
    program.description = Some(description.to_string());
    program.languages_available = languages.iter().map(|l| l.to_string()).collect();
    program.created_at = now;
    let program_id = program.id;
    tx.insert_program(program)?;

    let term = Term {
        id: TermId::new(),
        program_id,
        term_number: 1,
        title: Some(term_title.to_string()),
        created_at: now,
    };
    let term_id = term.id;
    tx.insert_term(term)?;

    let owner = AssetOwner::Program(program_id);
    for variant in [AssetVariant::Portrait, AssetVariant::Landscape] {
        tx.insert_asset(Asset::new(
            owner,
            "en",
            variant,
            format!("https://example.com/{poster_prefix}_{variant}.jpg"),
        ))?;
    }

    Ok((program_id, term_id))
}

/// Stage a lesson with portrait and landscape thumbnails. Lessons without
/// `publish_at` are stored already published.
fn stage_lesson(
    tx: &mut Transaction,
    term_id: TermId,
    demo: &DemoLesson<'_>,
    now: DateTime<Utc>,
    thumb_prefix: &str,
) -> Result<LessonId, StoreError> {
    let (status, published_at) = match demo.publish_at {
        Some(_) => (Status::Scheduled, None),
        None => (Status::Published, Some(now)),
    };
    let urls: BTreeMap<String, String> = demo
        .urls
        .iter()
        .map(|(lang, url)| (lang.to_string(), url.to_string()))
        .collect();

    let lesson = Lesson {
        id: LessonId::new(),
        term_id,
        lesson_number: demo.number,
        title: demo.title.to_string(),
        content_type: demo.content_type,
        duration_ms: demo.duration_ms,
        is_paid: demo.is_paid,
        content_language_primary: "en".into(),
        content_languages_available: urls.keys().cloned().collect(),
        content_urls_by_language: urls,
        subtitle_languages: Vec::new(),
        subtitle_urls_by_language: BTreeMap::new(),
        status,
        publish_at: demo.publish_at,
        published_at,
        created_at: now,
    };
    let lesson_id = lesson.id;
    tx.insert_lesson(lesson)?;

    let owner = AssetOwner::Lesson(lesson_id);
    for variant in [AssetVariant::Portrait, AssetVariant::Landscape] {
        tx.insert_asset(Asset::new(
            owner,
            "en",
            variant,
            format!("https://example.com/{thumb_prefix}_{variant}.jpg"),
        ))?;
    }

    Ok(lesson_id)
}
