//! `syllabus seed`

use crate::bootstrap::Runtime;

pub async fn run(runtime: &Runtime) -> anyhow::Result<()> {
    let summary = sy_publishing::seed_demo(runtime.store.as_ref(), runtime.clock.as_ref()).await?;
    println!(
        "Seeded {} programs and {} lessons; lesson {} is scheduled to publish in 2 minutes",
        summary.programs.len(),
        summary.lessons.len(),
        summary.scheduled_lesson
    );
    Ok(())
}
