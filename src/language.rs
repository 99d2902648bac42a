//! Per-language consecutive-play counters.
//!
//! Only the language of the current streak ever holds a non-zero count. Once
//! that count reaches the language's threshold the orchestrator sweeps other
//! languages before staying in the same one.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct LanguageDiversityTracker {
    counters: HashMap<String, u32>,
    thresholds: HashMap<String, u32>,
    default_threshold: u32,
}

impl LanguageDiversityTracker {
    #[must_use]
    pub fn new(thresholds: HashMap<String, u32>, default_threshold: u32) -> Self {
        let thresholds = thresholds
            .into_iter()
            .map(|(language, limit)| (language.to_lowercase(), limit))
            .collect();
        Self {
            counters: HashMap::new(),
            thresholds,
            default_threshold,
        }
    }

    /// Count a play in `language`, resetting every other language.
    pub fn record(&mut self, language: &str) {
        let language = language.to_lowercase();
        for (tracked, count) in self.counters.iter_mut() {
            if *tracked != language {
                *count = 0;
            }
        }
        *self.counters.entry(language).or_insert(0) += 1;
    }

    #[must_use]
    pub fn count(&self, language: &str) -> u32 {
        self.counters
            .get(&language.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn threshold(&self, language: &str) -> u32 {
        self.thresholds
            .get(&language.to_lowercase())
            .copied()
            .unwrap_or(self.default_threshold)
    }

    /// Has `language` been played back-to-back often enough to diversify?
    #[must_use]
    pub fn should_diversify(&self, language: &str) -> bool {
        let count = self.count(language);
        count > 0 && count >= self.threshold(language)
    }

    /// The language currently on a streak, with its run length.
    #[must_use]
    pub fn current_streak(&self) -> Option<(&str, u32)> {
        self.counters
            .iter()
            .find(|(_, &count)| count > 0)
            .map(|(language, &count)| (language.as_str(), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_resets_other_languages() {
        let mut tracker = LanguageDiversityTracker::new(HashMap::new(), 3);
        tracker.record("telugu");
        tracker.record("Telugu");
        assert_eq!(tracker.count("telugu"), 2);

        tracker.record("hindi");
        assert_eq!(tracker.count("telugu"), 0);
        assert_eq!(tracker.count("hindi"), 1);
        assert_eq!(tracker.current_streak(), Some(("hindi", 1)));
    }

    #[test]
    fn test_per_language_threshold() {
        let thresholds = HashMap::from([("TELUGU".to_string(), 2)]);
        let mut tracker = LanguageDiversityTracker::new(thresholds, 4);
        tracker.record("telugu");
        assert!(!tracker.should_diversify("telugu"));
        tracker.record("telugu");
        assert!(tracker.should_diversify("telugu"));

        tracker.record("tamil");
        tracker.record("tamil");
        tracker.record("tamil");
        assert!(!tracker.should_diversify("tamil"), "tamil uses the default of 4");
        tracker.record("tamil");
        assert!(tracker.should_diversify("tamil"));
    }

    #[test]
    fn test_zero_threshold_needs_a_play() {
        let tracker = LanguageDiversityTracker::new(HashMap::new(), 0);
        assert!(!tracker.should_diversify("english"));
    }
}
