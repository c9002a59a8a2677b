use super::{format_counts, format_duration, load_config};
use hookwatch_core::{detect_duplicates, summarize, DuplicateReport, SessionScope, SessionSummary};
use serde::Serialize;
use std::path::PathBuf;

pub struct AuditArgs {
    pub scope: SessionScope,
    pub min_fires: Option<usize>,
    pub threshold: Option<f64>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Audit {
    scope: String,
    sessions: Vec<SessionSummary>,
    hooks: Vec<DuplicateReport>,
    skipped_records: usize,
}

pub fn run(store: Option<PathBuf>, args: &AuditArgs) -> anyhow::Result<()> {
    let mut config = load_config(store)?;
    if let Some(min_fires) = args.min_fires {
        config.dedup_min_fires = min_fires;
    }
    if let Some(threshold) = args.threshold {
        config.dedup_threshold = threshold;
    }
    config.validate()?;

    let snapshot = config.open_store().read_all()?;
    let audit = Audit {
        scope: args.scope.to_string(),
        sessions: summarize(
            &snapshot.events,
            &args.scope,
            config.token_heuristic_divisor,
        ),
        hooks: detect_duplicates(&snapshot.events, &args.scope, &config.dedup_policy()),
        skipped_records: snapshot.skipped,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&audit)?);
    } else {
        println!("{}", build_report(&audit));
    }
    Ok(())
}

fn build_report(audit: &Audit) -> String {
    let mut sections = Vec::new();

    let title = format!("Hook Audit ({})", audit.scope);
    let events: usize = audit.sessions.iter().map(|s| s.event_count).sum();
    sections.push(format!(
        "{}\n{}\nSessions: {} | Events: {} | Skipped malformed records: {}",
        title,
        "=".repeat(title.len()),
        audit.sessions.len(),
        events,
        audit.skipped_records
    ));

    if audit.sessions.is_empty() {
        sections.push("\nNo events recorded for this scope.".to_string());
        return sections.join("\n");
    }

    let session_lines: Vec<String> = audit.sessions.iter().map(session_block).collect();
    sections.push(format!("\nSessions\n--------\n{}", session_lines.join("\n")));

    let flagged: Vec<&DuplicateReport> = audit.hooks.iter().filter(|r| r.flagged).collect();
    let duplicates = if flagged.is_empty() {
        "No hooks with repetitive output.".to_string()
    } else {
        flagged
            .iter()
            .map(|r| duplicate_line(r))
            .collect::<Vec<_>>()
            .join("\n")
    };
    sections.push(format!("\nDuplicate Output\n----------------\n{}", duplicates));

    let silent: Vec<String> = audit
        .hooks
        .iter()
        .filter(|r| r.zero_output)
        .map(|r| format!("{}  {} fires, no output", r.hook_identity, r.total_fires))
        .collect();
    if !silent.is_empty() {
        sections.push(format!("\nSilent Hooks\n------------\n{}", silent.join("\n")));
    }

    sections.join("\n")
}

fn session_block(summary: &SessionSummary) -> String {
    let state = match summary.end_time {
        Some(_) => "ended",
        None => "open",
    };
    let mut block = format!(
        "{}  {} ({}, {})  events {}  ~{} tokens\n  by event: {}",
        summary.session_id,
        summary.start_time.format("%Y-%m-%d %H:%M:%S"),
        state,
        format_duration(summary.duration()),
        summary.event_count,
        summary.estimated_tokens,
        format_counts(&summary.by_event_type)
    );
    if !summary.by_tool.is_empty() {
        block.push_str(&format!("\n  by tool:  {}", format_counts(&summary.by_tool)));
    }
    block
}

fn duplicate_line(report: &DuplicateReport) -> String {
    let fingerprint = report
        .top_fingerprint
        .as_ref()
        .map(|fp| format!(" [{}]", fp.short()))
        .unwrap_or_default();
    format!(
        "{}  {}/{} identical ({:.1}%){}",
        report.hook_identity,
        report.top_fingerprint_count,
        report.fires_with_output,
        report.duplicate_ratio * 100.0,
        fingerprint
    )
}
