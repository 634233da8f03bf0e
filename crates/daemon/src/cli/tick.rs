//! `syllabus tick`: one scheduling pass on demand.

use sy_publishing::PassReport;

use crate::bootstrap::Runtime;

pub async fn run(runtime: &Runtime, json: bool) -> anyhow::Result<()> {
    let report = runtime.engine.run_pass().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", summarize(&report));
    }
    Ok(())
}

fn summarize(report: &PassReport) -> String {
    let mut out = format!(
        "pass {}: {} due, {} promoted, {} program(s) cascaded\n",
        report.pass_id,
        report.matched,
        report.promoted.len(),
        report.cascaded.len()
    );
    for target in &report.gate_bypassed {
        out.push_str(&format!("  published without required assets: {target}\n"));
    }
    for lesson in &report.held {
        out.push_str(&format!("  held (thumbnails missing): lesson {lesson}\n"));
    }
    if report.cascades_skipped > 0 {
        out.push_str(&format!("  cascades skipped: {}\n", report.cascades_skipped));
    }
    out
}
