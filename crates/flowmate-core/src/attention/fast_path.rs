//! Checks that settle a sample without asking the oracle.

use crate::sampler::ActivitySample;

/// OS chrome that is never worth a verdict
pub const SYSTEM_PATTERNS: &[&str] = &[
    "explorer",
    "searchapp",
    "context menu",
    // "new tab page" in Chinese browsers
    "\u{65b0}\u{6807}\u{7b7e}\u{9875}",
    "new tab",
    "task switcher",
];

/// Terms that mark a sample as distracting when the oracle cannot answer
pub const DISTRACTION_KEYWORDS: &[&str] = &[
    "video",
    "game",
    "social",
    "shopping",
    "\u{5a31}\u{4e50}",
    "\u{6e38}\u{620f}",
    "\u{89c6}\u{9891}",
    "\u{8d2d}\u{7269}",
    "\u{793e}\u{4ea4}",
];

pub const FALLBACK_DISTRACTED_REASON: &str = "Looks like a distraction (keyword fallback)";
pub const FALLBACK_CLEAR_REASON: &str = "Oracle unavailable, assuming on task";

/// True when the sample is this tool's own window
pub fn is_self(sample: &ActivitySample, identities: &[String]) -> bool {
    let process = sample.process.to_lowercase();
    let title = sample.title.to_lowercase();
    identities
        .iter()
        .map(|id| id.trim().to_lowercase())
        .filter(|id| !id.is_empty())
        .any(|id| process.contains(&id) || title.contains(&id))
}

/// `text` must already be lowercase
pub fn is_system(text: &str) -> bool {
    SYSTEM_PATTERNS.iter().any(|pattern| text.contains(pattern))
}

/// Degraded verdict used when the oracle fails or times out; never fails itself
pub fn keyword_fallback(text: &str) -> (bool, &'static str) {
    if DISTRACTION_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        (true, FALLBACK_DISTRACTED_REASON)
    } else {
        (false, FALLBACK_CLEAR_REASON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities() -> Vec<String> {
        vec!["flowmate".to_string()]
    }

    #[test]
    fn test_self_matches_process_or_title() {
        assert!(is_self(&ActivitySample::new("x", "FlowMate"), &identities()));
        assert!(is_self(
            &ActivitySample::new("flowmate status - Terminal", "bash"),
            &identities()
        ));
        assert!(!is_self(&ActivitySample::new("Docs", "firefox"), &identities()));
        assert!(!is_self(&ActivitySample::new("Docs", "firefox"), &[String::new()]));
    }

    #[test]
    fn test_system_patterns() {
        assert!(is_system("program manager explorer.exe"));
        assert!(is_system("new tab - google chrome chrome"));
        assert!(is_system("\u{65b0}\u{6807}\u{7b7e}\u{9875} msedge"));
        assert!(!is_system("unknown unknown"));
    }

    #[test]
    fn test_keyword_fallback() {
        assert!(keyword_fallback("funny video - youtube firefox").0);
        assert_eq!(
            keyword_fallback("\u{89c6}\u{9891} bilibili"),
            (true, FALLBACK_DISTRACTED_REASON)
        );
        assert_eq!(
            keyword_fallback("main.rs - code"),
            (false, FALLBACK_CLEAR_REASON)
        );
    }
}
