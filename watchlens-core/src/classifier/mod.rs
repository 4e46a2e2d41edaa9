//! Keyword-based content classifier
//!
//! Maps a video's title, description and tags to a category, an age rating,
//! a set of content flags and a confidence value. Classification is pure and
//! deterministic: the same text and tables always yield the same result.
//!
//! Matching is plain substring search over the lowercased text, so
//! "gaming" also matches inside "wargaming".

pub mod keywords;

pub use keywords::{KeywordTables, BUILTIN_KEYWORDS_VERSION};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::{AgeRating, Category, ContentFlag};

/// Lowest confidence ever reported.
pub const MIN_CONFIDENCE: f64 = 0.3;
/// Highest confidence ever reported.
pub const MAX_CONFIDENCE: f64 = 0.95;

static BUILTIN: Lazy<KeywordTables> = Lazy::new(KeywordTables::builtin);

/// Classifier output for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub age_rating: AgeRating,
    pub confidence: f64,
    /// Detected flags, in [`ContentFlag::ALL`] order
    pub flags: Vec<ContentFlag>,
    /// Version of the keyword tables that produced this result
    pub keywords_version: u32,
}

/// Classify with the built-in keyword tables.
pub fn classify(title: &str, description: &str, tags: &[String]) -> ClassificationResult {
    BUILTIN.classify(title, description, tags)
}

/// Number of keywords occurring anywhere in `text`.
fn keyword_matches(text: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|k| text.contains(k.as_str())).count()
}

impl KeywordTables {
    /// Classify a video's text against these tables.
    pub fn classify(&self, title: &str, description: &str, tags: &[String]) -> ClassificationResult {
        let text = format!("{} {} {}", title, description, tags.join(" ")).to_lowercase();

        let (category, matches) = self.determine_category(&text);
        let age_rating = self.determine_age_rating(&text);
        let flags = self.determine_flags(&text);
        let confidence = self.confidence(category, matches);

        tracing::trace!(
            %category,
            %age_rating,
            matches,
            confidence,
            ?flags,
            "Classified video text"
        );

        ClassificationResult {
            category,
            age_rating,
            confidence,
            flags,
            keywords_version: self.version,
        }
    }

    /// Highest-scoring category and its match count.
    ///
    /// Ties keep the category declared first; no match at all falls back to
    /// Entertainment.
    fn determine_category(&self, text: &str) -> (Category, usize) {
        let mut best = (Category::Entertainment, 0);
        for category in Category::ALL {
            let score = keyword_matches(text, self.category_keywords(category));
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }

    /// First bucket with a match, harshest first.
    fn determine_age_rating(&self, text: &str) -> AgeRating {
        self.age_rating_buckets()
            .into_iter()
            .find(|(_, keywords)| keyword_matches(text, keywords) > 0)
            .map(|(rating, _)| rating)
            .unwrap_or(AgeRating::AllAges)
    }

    fn determine_flags(&self, text: &str) -> Vec<ContentFlag> {
        ContentFlag::ALL
            .into_iter()
            .filter(|flag| keyword_matches(text, self.flag_keywords(*flag)) > 0)
            .collect()
    }

    fn confidence(&self, category: Category, matches: usize) -> f64 {
        let total = self.category_keywords(category).len();
        if total == 0 {
            return MIN_CONFIDENCE;
        }
        let ratio = (matches as f64 / total as f64).min(1.0);
        ratio.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_funny_cat_compilation() {
        let result = classify(
            "Funny Cat Fails Compilation",
            "",
            &tags(&["comedy", "fail"]),
        );
        assert_eq!(result.category, Category::Entertainment);
        assert_eq!(result.age_rating, AgeRating::AllAges);
        assert!(result.flags.is_empty());
        // funny, fun, comedy: 3 of 19 entertainment keywords, below the floor
        assert_eq!(result.confidence, MIN_CONFIDENCE);
    }

    #[test]
    fn test_no_signal_defaults() {
        let result = classify("", "", &[]);
        assert_eq!(result.category, Category::Entertainment);
        assert_eq!(result.age_rating, AgeRating::AllAges);
        assert_eq!(result.confidence, MIN_CONFIDENCE);
        assert!(result.flags.is_empty());
        assert_eq!(result.keywords_version, BUILTIN_KEYWORDS_VERSION);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let t = tags(&["rust", "programming"]);
        let a = classify("Rust Tutorial", "Learn the borrow checker", &t);
        let b = classify("Rust Tutorial", "Learn the borrow checker", &t);
        assert_eq!(a, b);
        assert_eq!(a.category, Category::Educational);
    }

    #[test]
    fn test_tie_goes_to_earlier_category() {
        // walkthrough hits Gaming only, concert hits Music only
        let result = classify("Walkthrough", "concert", &[]);
        assert_eq!(result.category, Category::Gaming);
    }

    #[test]
    fn test_tie_break_with_custom_tables() {
        let mut tables = KeywordTables::builtin();
        tables.categories.gaming = tags(&["gaming"]);
        tables.categories.music = tags(&["music"]);
        tables.categories.entertainment = tags(&["zzz-unused"]);
        let result = tables.classify("music gaming", "", &[]);
        assert_eq!(result.category, Category::Gaming);
        assert_eq!(result.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_substring_matching_is_not_word_bound() {
        let result = classify("Wargaming tournament finals", "", &[]);
        assert_eq!(result.category, Category::Gaming);
        assert!(result.flags.contains(&ContentFlag::Violence));
    }

    #[test]
    fn test_harsher_age_rating_wins() {
        let result = classify("Teen cartoon night", "", &[]);
        assert_eq!(result.age_rating, AgeRating::ThirteenPlus);

        let result = classify("Cartoon for every kid", "", &[]);
        assert_eq!(result.age_rating, AgeRating::SevenPlus);

        let result = classify("NSFW teen cartoon", "", &[]);
        assert_eq!(result.age_rating, AgeRating::EighteenPlus);
    }

    #[test]
    fn test_multiple_flags_co_occur() {
        let result = classify("Offensive fight with profanity", "", &[]);
        assert_eq!(
            result.flags,
            vec![
                ContentFlag::Violence,
                ContentFlag::Language,
                ContentFlag::Inappropriate
            ]
        );
    }

    #[test]
    fn test_confidence_is_linear_between_bounds() {
        let mut tables = KeywordTables::builtin();
        tables.categories.news = tags(&["alpha", "beta", "gamma", "delta"]);
        let result = tables.classify("alpha beta", "", &[]);
        assert_eq!(result.category, Category::News);
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tags_and_description_contribute() {
        let result = classify("Untitled", "Breaking headlines", &tags(&["politics"]));
        assert_eq!(result.category, Category::News);
    }
}
