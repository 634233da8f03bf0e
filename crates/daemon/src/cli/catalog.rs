//! `syllabus program|term|lesson create` and `syllabus asset add`

use anyhow::Context;

use sy_domain::ids::{LessonId, ProgramId, TermId};
use sy_publishing::{AuthoringError, NewAsset, NewLesson, NewProgram, NewTerm};

use crate::bootstrap::Runtime;
use crate::cli::{
    AssetArgs, AssetCommand, AssetOwnerArg, LessonCommand, ProgramCommand, TermCommand,
};

pub async fn program(runtime: &Runtime, cmd: ProgramCommand) -> anyhow::Result<bool> {
    let ProgramCommand::Create {
        title,
        language,
        languages,
        description,
        who,
    } = cmd;
    let input = NewProgram {
        title,
        description,
        language_primary: language,
        languages_available: languages,
    };
    let result = runtime.authoring.create_program(&who.to_actor(), input).await;
    report(result.map(|p| format!("program {} created (draft)", p.id)))
}

pub async fn term(runtime: &Runtime, cmd: TermCommand) -> anyhow::Result<bool> {
    let TermCommand::Create {
        program_id,
        number,
        title,
        who,
    } = cmd;
    let program_id: ProgramId = program_id
        .parse()
        .with_context(|| format!("invalid program id '{program_id}'"))?;
    let input = NewTerm {
        program_id,
        term_number: number,
        title,
    };
    let result = runtime.authoring.create_term(&who.to_actor(), input).await;
    report(result.map(|t| format!("term {} created (number {})", t.id, t.term_number)))
}

pub async fn lesson(runtime: &Runtime, cmd: LessonCommand) -> anyhow::Result<bool> {
    let LessonCommand::Create {
        term_id,
        number,
        title,
        language,
        languages,
        content_type,
        duration_ms,
        paid,
        urls,
        publish_at,
        who,
    } = cmd;
    let term_id: TermId = term_id
        .parse()
        .with_context(|| format!("invalid term id '{term_id}'"))?;

    let mut input = NewLesson::new(term_id, number, title);
    input.content_language_primary = language;
    input.content_languages_available = languages;
    input.content_type = content_type;
    input.duration_ms = duration_ms;
    input.is_paid = paid;
    input.content_urls_by_language = urls.into_iter().collect();
    input.publish_at = publish_at;

    let result = runtime.authoring.create_lesson(&who.to_actor(), input).await;
    report(result.map(|l| match l.publish_at {
        Some(at) => format!("lesson {} created (scheduled for {})", l.id, at.to_rfc3339()),
        None => format!("lesson {} created (draft)", l.id),
    }))
}

pub async fn asset(runtime: &Runtime, cmd: AssetCommand) -> anyhow::Result<bool> {
    let AssetCommand::Add { owner } = cmd;
    let result = match owner {
        AssetOwnerArg::Program { id, asset } => {
            let id: ProgramId = id.parse().with_context(|| format!("invalid program id '{id}'"))?;
            let (actor, input) = split(asset);
            runtime.authoring.add_program_asset(&actor, id, input).await
        }
        AssetOwnerArg::Lesson { id, asset } => {
            let id: LessonId = id.parse().with_context(|| format!("invalid lesson id '{id}'"))?;
            let (actor, input) = split(asset);
            runtime.authoring.add_lesson_asset(&actor, id, input).await
        }
    };
    report(result.map(|a| {
        format!(
            "{} {} added ({}, {})",
            a.asset_type, a.id, a.variant, a.language
        )
    }))
}

fn split(args: AssetArgs) -> (sy_domain::actor::Actor, NewAsset) {
    let actor = args.who.to_actor();
    let input = NewAsset {
        language: args.language,
        variant: args.variant,
        url: args.url,
    };
    (actor, input)
}

/// Print the outcome. Rejections return `false`; storage failures are
/// propagated.
fn report(result: Result<String, AuthoringError>) -> anyhow::Result<bool> {
    match result {
        Ok(line) => {
            println!("{line}");
            Ok(true)
        }
        Err(AuthoringError::Store(e)) if e.is_transient() => Err(e.into()),
        Err(e) => {
            println!("{}", render_error(&e));
            Ok(false)
        }
    }
}

fn render_error(err: &AuthoringError) -> String {
    let code = if err.is_conflict() {
        "CONFLICT"
    } else if matches!(err, AuthoringError::Invalid { .. }) {
        "INVALID"
    } else {
        "REJECTED"
    };
    format!("{code}: {err}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bootstrap::build_runtime_with_clock;
    use crate::cli::ActorArgs;
    use sy_domain::actor::Role;
    use sy_domain::clock::{Clock, ManualClock};
    use sy_domain::config::Config;
    use sy_domain::model::{AssetOwner, AssetVariant, ContentType};
    use sy_domain::status::Status;
    use sy_store::StoreError;

    fn runtime() -> Runtime {
        let mut config = Config::default();
        config.store.persist = false;
        build_runtime_with_clock(Arc::new(config), Arc::new(ManualClock::starting_now())).unwrap()
    }

    fn who() -> ActorArgs {
        ActorArgs {
            actor: "dana".into(),
            role: Role::Editor,
        }
    }

    async fn program_and_term(rt: &Runtime) -> (ProgramId, TermId) {
        let ok = program(
            rt,
            ProgramCommand::Create {
                title: "AI for Beginners".into(),
                language: "en".into(),
                languages: Vec::new(),
                description: None,
                who: who(),
            },
        )
        .await
        .unwrap();
        assert!(ok);
        let program_id = rt.store.snapshot().programs().next().unwrap().id;

        let ok = term(
            rt,
            TermCommand::Create {
                program_id: program_id.to_string(),
                number: 1,
                title: None,
                who: who(),
            },
        )
        .await
        .unwrap();
        assert!(ok);
        let term_id = rt.store.snapshot().terms_of(&program_id)[0].id;
        (program_id, term_id)
    }

    fn lesson_cmd(term_id: TermId, number: u32) -> LessonCommand {
        LessonCommand::Create {
            term_id: term_id.to_string(),
            number,
            title: "Intro".into(),
            language: "en".into(),
            languages: Vec::new(),
            content_type: ContentType::Video,
            duration_ms: Some(60_000),
            paid: false,
            urls: vec![("en".into(), "https://cdn.example.com/en.mp4".into())],
            publish_at: None,
            who: who(),
        }
    }

    #[tokio::test]
    async fn authoring_commands_build_a_catalog() {
        let rt = runtime();
        let (program_id, term_id) = program_and_term(&rt).await;

        let mut cmd = lesson_cmd(term_id, 1);
        let at = rt.clock.now() + chrono::Duration::minutes(5);
        let LessonCommand::Create { publish_at, .. } = &mut cmd;
        *publish_at = Some(at);
        assert!(lesson(&rt, cmd).await.unwrap());

        let snap = rt.store.snapshot();
        let created = &snap.lessons_of(&term_id)[0];
        assert_eq!(created.status, Status::Scheduled);
        assert_eq!(created.publish_at, Some(at));
        assert_eq!(
            created.content_urls_by_language.get("en").map(String::as_str),
            Some("https://cdn.example.com/en.mp4")
        );

        let lesson_id = created.id;
        for variant in [AssetVariant::Portrait, AssetVariant::Landscape] {
            let cmd = AssetCommand::Add {
                owner: AssetOwnerArg::Lesson {
                    id: lesson_id.to_string(),
                    asset: AssetArgs {
                        variant,
                        language: "en".into(),
                        url: format!("https://cdn.example.com/{variant}.jpg"),
                        who: who(),
                    },
                },
            };
            assert!(asset(&rt, cmd).await.unwrap());
        }
        let snap = rt.store.snapshot();
        assert_eq!(snap.assets_for(AssetOwner::Lesson(lesson_id)).len(), 2);
        assert_eq!(snap.program(&program_id).unwrap().status, Status::Draft);
    }

    #[tokio::test]
    async fn duplicate_lesson_number_is_a_conflict() {
        let rt = runtime();
        let (_, term_id) = program_and_term(&rt).await;

        assert!(lesson(&rt, lesson_cmd(term_id, 1)).await.unwrap());
        assert!(!lesson(&rt, lesson_cmd(term_id, 1)).await.unwrap());
        assert_eq!(rt.store.snapshot().lessons_of(&term_id).len(), 1);
    }

    #[tokio::test]
    async fn unknown_term_is_rejected_not_fatal() {
        let rt = runtime();
        let ok = lesson(&rt, lesson_cmd(TermId::new(), 1)).await.unwrap();
        assert!(!ok);
        assert!(rt.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn bad_id_is_an_error() {
        let rt = runtime();
        let cmd = TermCommand::Create {
            program_id: "nope".into(),
            number: 1,
            title: None,
            who: who(),
        };
        let err = term(&rt, cmd).await.unwrap_err();
        assert!(err.to_string().contains("invalid program id"));
    }

    #[test]
    fn conflicts_render_with_their_own_code() {
        let err = AuthoringError::Store(StoreError::Conflict("lesson 1 exists".into()));
        assert!(render_error(&err).starts_with("CONFLICT: "));
        let err = AuthoringError::Invalid {
            field: "title",
            message: "must not be empty".into(),
        };
        assert_eq!(render_error(&err), "INVALID: invalid title: must not be empty");
    }
}
