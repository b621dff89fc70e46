/// Today's statistics and the coaching report
use anyhow::{Context, Result};
use flowmate_ai::create_oracle;
use flowmate_storage::{Database, TodayStats};
use tabled::{Table, Tabled};

use super::helpers::truncate_str;

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Planned (min)")]
    planned_minutes: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Distractions")]
    distractions: u32,
}

#[derive(Tabled)]
struct ReasonRow {
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Count")]
    count: u32,
}

fn render_stats(stats: &TodayStats) -> String {
    if stats.is_empty() {
        return "No focus sessions recorded today.\n".to_string();
    }

    let sessions: Vec<SessionRow> = stats
        .sessions
        .iter()
        .map(|s| SessionRow {
            task: truncate_str(&s.task_name, 40),
            planned_minutes: s.planned_minutes,
            status: s.status.to_string(),
            distractions: s.distraction_count,
        })
        .collect();

    let mut out = format!("\nToday's Sessions\n{}\n", Table::new(sessions));
    out.push_str(&format!(
        "\nFocused: {} min across {} sessions, {} distractions\n",
        stats.completed_minutes(),
        stats.sessions.len(),
        stats.total_distractions()
    ));

    if !stats.top_reasons.is_empty() {
        let reasons: Vec<ReasonRow> = stats
            .top_reasons
            .iter()
            .map(|r| ReasonRow {
                reason: truncate_str(&r.reason, 50),
                count: r.count,
            })
            .collect();
        out.push_str(&format!("\nTop Distractions\n{}\n", Table::new(reasons)));
    }
    out
}

pub fn handle_stats_command() -> Result<()> {
    let db = Database::new(None).context("Failed to open database")?;
    let stats = db.get_today_stats()?;
    print!("{}", render_stats(&stats));
    Ok(())
}

pub async fn handle_report_command() -> Result<()> {
    let db = Database::new(None).context("Failed to open database")?;
    let stats = db.get_today_stats()?;
    let oracle = create_oracle(&db.get_ai_config()?.with_env_overrides());

    let report = oracle
        .daily_report(&stats)
        .await
        .context("Failed to generate daily report")?;
    println!("\nDaily Report");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmate_storage::{ReasonCount, SessionStatus, SessionSummary};

    #[test]
    fn test_empty_day() {
        assert_eq!(
            render_stats(&TodayStats::default()),
            "No focus sessions recorded today.\n"
        );
    }

    #[test]
    fn test_stats_tables() {
        let stats = TodayStats {
            sessions: vec![
                SessionSummary {
                    task_name: "Outline".to_string(),
                    planned_minutes: 25,
                    status: SessionStatus::Completed,
                    distraction_count: 2,
                },
                SessionSummary {
                    task_name: "Draft".to_string(),
                    planned_minutes: 30,
                    status: SessionStatus::Abandoned,
                    distraction_count: 1,
                },
            ],
            top_reasons: vec![ReasonCount {
                reason: "video".to_string(),
                count: 2,
            }],
        };
        let text = render_stats(&stats);
        assert!(text.contains("COMPLETED"));
        assert!(text.contains("ABANDONED"));
        assert!(text.contains("Focused: 25 min across 2 sessions, 3 distractions"));
        assert!(text.contains("Top Distractions"));
        assert!(text.contains("video"));
    }
}
