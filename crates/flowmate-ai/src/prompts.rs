//! Prompt templates for the provider-backed oracle.

use flowmate_storage::TodayStats;

use crate::oracle::TaskProfile;

pub fn plan_prompt(goal: &str) -> String {
    format!(
        "User goal: \"{goal}\".\n\
         Break it into 3-5 steps. Pick a focus length per step between 5 and 45 minutes \
         and a break between 3 and 10 minutes. Keep the first step easy.\n\
         Return JSON: {{ \"tasks\": [ {{ \"step\": \"step name\", \"duration\": int, \"break\": int }} ] }}"
    )
}

pub fn profile_prompt(goal: &str, step: &str) -> String {
    format!(
        "Task context:\n\
         Overall goal: \"{goal}\"\n\
         Current step: \"{step}\"\n\
         \n\
         Build a monitoring profile for this step:\n\
         - allowed_tools: application or process names that serve the step\n\
         - keywords: core terms likely to appear in relevant window titles\n\
         - categories: kinds of activity involved (searching, reading docs, coding, design, ...)\n\
         \n\
         Return JSON: {{ \"allowed_tools\": [], \"keywords\": [], \"categories\": [] }}"
    )
}

pub fn judge_prompt(
    goal: &str,
    step: &str,
    profile: &TaskProfile,
    window_title: &str,
    process_name: &str,
) -> String {
    let profile_json = serde_json::to_string(profile).unwrap_or_default();
    format!(
        "You audit focus. Decide whether the user's foreground window serves their current task.\n\
         \n\
         Context:\n\
         - Overall goal: \"{goal}\"\n\
         - Current step: \"{step}\"\n\
         - Allowed profile: {profile_json}\n\
         - Window title: \"{window_title}\"\n\
         - Process name: \"{process_name}\"\n\
         \n\
         Rules:\n\
         1. Supporting actions count as work even without matching keywords \
            (API docs while coding are fine, funny videos are not).\n\
         2. Browsers are neutral; judge by the page title. A focused \"now playing\" window is a distraction.\n\
         3. Drifting from \"{step}\" to a different topic is a distraction too.\n\
         \n\
         Return JSON:\n\
         {{ \"is_distracted\": bool, \"reason\": \"short playful warning, under 15 words\", \"confidence\": float }}"
    )
}

pub fn report_prompt(stats: &TodayStats) -> String {
    let sessions = stats
        .sessions
        .iter()
        .map(|s| {
            format!(
                "- {} ({} min, {}, {} distractions)",
                s.task_name, s.planned_minutes, s.status, s.distraction_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let reasons = stats
        .top_reasons
        .iter()
        .map(|r| format!("- {} (x{})", r.reason, r.count))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Role: a sharp-tongued productivity coach.\n\
         Today's sessions:\n{sessions}\n\
         Top distractions:\n{reasons}\n\
         \n\
         Write a daily report of about 200 words: summarise what got done and call out the problems."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmate_storage::{ReasonCount, SessionStatus, SessionSummary};

    #[test]
    fn test_judge_prompt_embeds_context() {
        let profile = TaskProfile {
            allowed_tools: vec!["notepad".to_string()],
            ..TaskProfile::default()
        };
        let prompt = judge_prompt("essay", "outline", &profile, "YouTube", "chrome");
        assert!(prompt.contains("\"outline\""));
        assert!(prompt.contains("[\"notepad\"]"));
        assert!(prompt.contains("is_distracted"));
    }

    #[test]
    fn test_report_prompt_lists_sessions_and_reasons() {
        let stats = TodayStats {
            sessions: vec![SessionSummary {
                task_name: "Outline".to_string(),
                planned_minutes: 25,
                status: SessionStatus::Completed,
                distraction_count: 2,
            }],
            top_reasons: vec![ReasonCount {
                reason: "Video site".to_string(),
                count: 2,
            }],
        };
        let prompt = report_prompt(&stats);
        assert!(prompt.contains("Outline (25 min, COMPLETED, 2 distractions)"));
        assert!(prompt.contains("Video site (x2)"));
    }
}
