//! Heuristic detection of prompt injection attempts.
//!
//! Every pattern carries a weight and the weights of all matching patterns are summed. One signal
//! alone stays below the default threshold, so a guest asking about the booking "system" or
//! whether they can "ignore the check-in rules" is never refused. Two independent signals in the
//! same message are treated as intent.

use std::sync::LazyLock;

use regex::Regex;

/// Score at which a message is considered an injection attempt.
pub const DEFAULT_THRESHOLD: u32 = 3;

struct InjectionPattern {
    name: &'static str,
    regex: Regex,
    weight: u32,
}

impl InjectionPattern {
    #[allow(clippy::expect_used)]
    fn new(name: &'static str, pattern: &str, weight: u32) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("injection pattern is valid"),
            weight,
        }
    }
}

static PATTERNS: LazyLock<Vec<InjectionPattern>> = LazyLock::new(|| {
    vec![
        InjectionPattern::new(
            "override-instructions",
            r"(?i)\b(?:ignore|disregard|forget|override|bypass)\b[^.\n]{0,40}?\b(?:instructions?|rules?|prompts?|directions?|guidelines?|directives?)\b",
            2,
        ),
        InjectionPattern::new(
            "inline-role-marker",
            r"(?i)(?:(?:^|[\s.!?;,])(?:system|developer)\s*:|\[\s*(?:system|developer)\s*\]|<\|?\s*(?:system|im_start|im_end)\s*\|?>|<<\s*sys\s*>>|\[/?inst\])",
            2,
        ),
        InjectionPattern::new(
            "jailbreak",
            r"(?i)\b(?:jailbreak(?:ed|ing)?|jailbroken|dan\s+mode|do\s+anything\s+now|developer\s+mode|god\s+mode|unrestricted\s+mode|no\s+restrictions|without\s+(?:any\s+)?(?:restrictions|filters|limits))\b",
            2,
        ),
        InjectionPattern::new(
            "reveal-prompt",
            r"(?i)\b(?:reveal|show|print|repeat|display|output|leak|tell\s+me|what\s+(?:is|are))\b[^.\n]{0,30}?\b(?:system|hidden|secret|initial|original|internal)\s+(?:prompt|instructions?|message|rules)\b",
            2,
        ),
        InjectionPattern::new(
            "privileged-role-play",
            r"(?i)\b(?:act|behave|respond|speak)\s+as\s+(?:the\s+|a\s+|an\s+|if\s+you\s+were\s+(?:the\s+|a\s+)?)?(?:system|developer|admin(?:istrator)?|root|operator)\b",
            2,
        ),
        InjectionPattern::new(
            "persona-switch",
            r"(?i)\b(?:you\s+are\s+now|from\s+now\s+on\s+you\s+are|pretend\s+(?:to\s+be|you\s+are)|roleplay\s+as)\b",
            1,
        ),
        InjectionPattern::new("new-instructions", r"(?i)\bnew\s+(?:instructions?|rules|system\s+prompt)\s*:", 1),
    ]
});

/// Weighted pattern scorer for prompt injection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionScorer {
    threshold: u32,
}

impl Default for InjectionScorer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl InjectionScorer {
    /// A scorer refusing messages scoring at least `threshold`.
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Sum of the weights of all patterns matching `text`.
    pub fn score(&self, text: &str) -> u32 {
        PATTERNS
            .iter()
            .filter(|pattern| pattern.regex.is_match(text))
            .inspect(|pattern| log::debug!("Injection pattern '{}' matched", pattern.name))
            .map(|pattern| pattern.weight)
            .sum()
    }

    /// Whether `text` reaches the threshold.
    pub fn is_suspicious(&self, text: &str) -> bool {
        self.score(text) >= self.threshold
    }
}
