// crates/cli/src/render.rs
//! Plain-table rendering of synced state.

use ailab_client::{PollView, SnapshotView};
use ailab_types::{AwardRule, Badge, Job, JobSummary};

/// Shorten an ISO timestamp for table display; unparseable values pass
/// through untouched.
pub fn fmt_timestamp(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    // The server emits naive isoformat timestamps without an offset.
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

fn error_line(error: &Option<String>) {
    if let Some(message) = error {
        println!("! sync error (showing last known state): {message}");
    }
}

pub fn jobs(view: &PollView<Vec<JobSummary>>) {
    error_line(&view.error);
    match &view.data {
        Some(jobs) => jobs_table(jobs),
        None => println!("loading jobs..."),
    }
}

pub fn jobs_table(jobs: &[JobSummary]) {
    if jobs.is_empty() {
        println!("No jobs yet.");
        return;
    }
    println!("{:>6}  {:<10}  {}", "ID", "STATUS", "CREATED");
    for job in jobs {
        let created = job.created_at.as_deref().map(fmt_timestamp).unwrap_or_default();
        println!("{:>6}  {:<10}  {}", job.id, job.status.as_str(), created);
    }
}

pub fn job(view: &PollView<Job>) {
    error_line(&view.error);
    let Some(job) = &view.data else {
        println!("loading job...");
        return;
    };
    job_detail(job);
}

pub fn job_detail(job: &Job) {
    println!("Job #{}", job.id);
    println!("  status:   {}", job.status);
    if let Some(language) = &job.language {
        println!("  language: {language}");
    }
    if let Some(created) = &job.created_at {
        println!("  created:  {}", fmt_timestamp(created));
    }
    if let Some(finished) = &job.finished_at {
        println!("  finished: {}", fmt_timestamp(finished));
    }
    match &job.output {
        Some(output) if !output.is_empty() => {
            println!("  output:");
            for line in output.lines() {
                println!("    {line}");
            }
        }
        _ => println!("  output:   (none yet)"),
    }
}

pub fn board(view: &SnapshotView) {
    error_line(&view.error);
    let Some(rows) = &view.rows else {
        println!("waiting for leaderboard...");
        return;
    };
    println!("{:>4}  {:<20}  {:>8}  {:>5}", "RANK", "USER", "XP", "LVL");
    for row in rows {
        println!(
            "{:>4}  {:<20}  {:>8}  {:>5}",
            row.rank, row.display_name, row.xp, row.level
        );
    }
}

pub fn badges(badges: &[Badge]) {
    if badges.is_empty() {
        println!("No badges defined.");
        return;
    }
    for badge in badges {
        let desc = badge.description.as_deref().unwrap_or("-");
        println!("{:>4}  {:<16}  {:<24}  {desc}", badge.id, badge.code, badge.name);
    }
}

pub fn rules(rules: &[AwardRule]) {
    if rules.is_empty() {
        println!("No award rules defined.");
        return;
    }
    for rule in rules {
        let params = rule
            .params
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>4}  {:<16}  {:<12}  {params}", rule.id, rule.code, rule.rule_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_shorten_when_parseable() {
        assert_eq!(fmt_timestamp("2026-08-01T10:30:00"), "2026-08-01 10:30");
        assert_eq!(fmt_timestamp("2026-08-01T10:30:00.123456"), "2026-08-01 10:30");
        assert_eq!(fmt_timestamp("2026-08-01T10:30:00+02:00"), "2026-08-01 10:30");
    }

    #[test]
    fn unparseable_timestamps_pass_through() {
        assert_eq!(fmt_timestamp("last tuesday"), "last tuesday");
    }
}
