//! `syllabus publish program|lesson <id>`

use anyhow::Context;

use sy_domain::actor::Actor;
use sy_domain::ids::{LessonId, ProgramId};
use sy_domain::model::PublishTarget;
use sy_publishing::{PublishError, Published};

use crate::bootstrap::Runtime;
use crate::cli::PublishCommand;

/// Resolve the command into a target and the acting identity.
pub fn parse(cmd: &PublishCommand) -> anyhow::Result<(PublishTarget, Actor)> {
    let (target, who) = match cmd {
        PublishCommand::Program { id, who } => {
            let id: ProgramId = id.parse().with_context(|| format!("invalid program id '{id}'"))?;
            (PublishTarget::Program(id), who)
        }
        PublishCommand::Lesson { id, who } => {
            let id: LessonId = id.parse().with_context(|| format!("invalid lesson id '{id}'"))?;
            (PublishTarget::Lesson(id), who)
        }
    };
    Ok((target, who.to_actor()))
}

/// Run a manual publish and print the outcome. Returns `false` when the
/// publish was rejected.
pub async fn run(runtime: &Runtime, cmd: PublishCommand) -> anyhow::Result<bool> {
    let (target, actor) = parse(&cmd)?;
    let result = runtime.manual.publish(&actor, target).await;
    println!("{}", render(&result));
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_transient() => Err(e.into()),
        Err(_) => Ok(false),
    }
}

fn render(result: &Result<Published, PublishError>) -> String {
    match result {
        Ok(p) if p.already_published => format!(
            "{} already published at {}",
            p.target,
            p.published_at.to_rfc3339()
        ),
        Ok(p) => format!("{} published at {}", p.target, p.published_at.to_rfc3339()),
        Err(e) => format!("{}: {e}", e.code()),
    }
}
