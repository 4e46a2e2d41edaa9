//! Keyword tables driving the classifier.
//!
//! Tables are plain data so they can be tuned without touching the scoring
//! code. The built-in table is version 1; a replacement can be loaded from a
//! TOML file:
//!
//! ```toml
//! version = 2
//!
//! [categories]
//! educational = ["tutorial", "course"]
//! entertainment = ["funny"]
//! gaming = ["gameplay"]
//! music = ["song"]
//! news = ["breaking"]
//! vlogs = ["vlog"]
//!
//! [age_ratings]
//! eighteen_plus = ["nsfw"]
//! thirteen_plus = ["teen"]
//! seven_plus = ["kid"]
//! all_ages = ["family friendly"]
//!
//! [flags]
//! violence = ["fight"]
//! language = ["swear"]
//! adult_content = ["nsfw"]
//! inappropriate = ["offensive"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{AgeRating, Category, ContentFlag};

/// Version of the built-in keyword table.
pub const BUILTIN_KEYWORDS_VERSION: u32 = 1;

/// Keyword lists per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub educational: Vec<String>,
    pub entertainment: Vec<String>,
    pub gaming: Vec<String>,
    pub music: Vec<String>,
    pub news: Vec<String>,
    pub vlogs: Vec<String>,
}

/// Keyword buckets per age rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeRatingKeywords {
    pub eighteen_plus: Vec<String>,
    pub thirteen_plus: Vec<String>,
    pub seven_plus: Vec<String>,
    pub all_ages: Vec<String>,
}

/// Keyword buckets per content flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagKeywords {
    pub violence: Vec<String>,
    pub language: Vec<String>,
    pub adult_content: Vec<String>,
    pub inappropriate: Vec<String>,
}

/// Complete, versioned set of keyword tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTables {
    pub version: u32,
    pub categories: CategoryKeywords,
    pub age_ratings: AgeRatingKeywords,
    pub flags: FlagKeywords,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeywordTables {
    /// The built-in keyword tables.
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_KEYWORDS_VERSION,
            categories: CategoryKeywords {
                educational: words(&[
                    "tutorial", "learn", "course", "education", "study", "academic", "science",
                    "math", "programming", "coding", "development", "technology", "engineering",
                    "physics", "chemistry", "biology", "history", "language", "skill",
                    "training", "how to", "explained", "documentary", "lecture", "research",
                    "analysis",
                ]),
                entertainment: words(&[
                    "funny", "comedy", "entertainment", "fun", "joke", "prank", "meme",
                    "reaction", "challenge", "vlog", "lifestyle", "travel", "food", "cooking",
                    "review", "unboxing", "gaming", "music", "dance",
                ]),
                gaming: words(&[
                    "gameplay", "gaming", "game", "playthrough", "walkthrough", "review",
                    "strategy", "multiplayer", "online", "console", "pc", "mobile", "esports",
                    "tournament", "stream", "twitch", "youtube gaming",
                ]),
                music: words(&[
                    "music", "song", "album", "artist", "band", "concert", "live",
                    "performance", "lyrics", "instrumental", "cover", "remix", "music video",
                    "mv", "audio", "soundtrack",
                ]),
                news: words(&[
                    "news", "breaking", "update", "report", "analysis", "politics", "world",
                    "local", "national", "international", "current events", "headlines",
                    "journalism", "media", "broadcast",
                ]),
                vlogs: words(&[
                    "vlog", "daily", "day in my life", "lifestyle", "personal", "my life",
                    "routine", "morning", "evening", "weekend", "vacation", "trip", "adventure",
                    "experience",
                ]),
            },
            age_ratings: AgeRatingKeywords {
                eighteen_plus: words(&[
                    "adult", "mature", "explicit", "nsfw", "violence", "blood", "gore", "sexual",
                ]),
                thirteen_plus: words(&[
                    "teen", "adolescent", "mild violence", "language", "suggestive",
                ]),
                seven_plus: words(&[
                    "kid", "child", "family", "cartoon", "animation", "educational",
                ]),
                all_ages: words(&["family friendly", "safe", "appropriate", "educational"]),
            },
            flags: FlagKeywords {
                violence: words(&["fight", "violence", "blood", "gore", "weapon", "war", "battle"]),
                language: words(&[
                    "swear", "curse", "profanity", "bad language", "explicit language",
                ]),
                adult_content: words(&[
                    "adult", "mature", "sexual", "nsfw", "explicit", "adult themes",
                ]),
                inappropriate: words(&["inappropriate", "offensive", "disturbing", "controversial"]),
            },
        }
    }

    /// Load tables from a TOML file, normalise and validate them.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read keyword file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse tables from TOML text, normalise and validate them.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut tables: KeywordTables = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse keyword tables: {}", e)))?;
        tables.normalize();
        tables.validate()?;
        Ok(tables)
    }

    /// Lowercase and trim every keyword, dropping blanks and duplicates.
    pub fn normalize(&mut self) {
        for list in self.lists_mut() {
            let mut seen = std::collections::HashSet::new();
            let normalized: Vec<String> = list
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty() && seen.insert(w.clone()))
                .collect();
            *list = normalized;
        }
    }

    /// Every category list must be non-empty; confidence divides by its length.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            if self.category_keywords(category).is_empty() {
                return Err(Error::Config(format!(
                    "keyword list for category {} is empty",
                    category
                )));
            }
        }
        Ok(())
    }

    pub fn category_keywords(&self, category: Category) -> &[String] {
        match category {
            Category::Educational => &self.categories.educational,
            Category::Entertainment => &self.categories.entertainment,
            Category::Gaming => &self.categories.gaming,
            Category::Music => &self.categories.music,
            Category::News => &self.categories.news,
            Category::Vlogs => &self.categories.vlogs,
        }
    }

    /// Age rating buckets in evaluation order, harshest first.
    pub fn age_rating_buckets(&self) -> [(AgeRating, &[String]); 4] {
        [
            (AgeRating::EighteenPlus, self.age_ratings.eighteen_plus.as_slice()),
            (AgeRating::ThirteenPlus, self.age_ratings.thirteen_plus.as_slice()),
            (AgeRating::SevenPlus, self.age_ratings.seven_plus.as_slice()),
            (AgeRating::AllAges, self.age_ratings.all_ages.as_slice()),
        ]
    }

    pub fn flag_keywords(&self, flag: ContentFlag) -> &[String] {
        match flag {
            ContentFlag::Violence => &self.flags.violence,
            ContentFlag::Language => &self.flags.language,
            ContentFlag::AdultContent => &self.flags.adult_content,
            ContentFlag::Inappropriate => &self.flags.inappropriate,
        }
    }

    fn lists_mut(&mut self) -> [&mut Vec<String>; 14] {
        [
            &mut self.categories.educational,
            &mut self.categories.entertainment,
            &mut self.categories.gaming,
            &mut self.categories.music,
            &mut self.categories.news,
            &mut self.categories.vlogs,
            &mut self.age_ratings.eighteen_plus,
            &mut self.age_ratings.thirteen_plus,
            &mut self.age_ratings.seven_plus,
            &mut self.age_ratings.all_ages,
            &mut self.flags.violence,
            &mut self.flags.language,
            &mut self.flags.adult_content,
            &mut self.flags.inappropriate,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lists_are_valid() {
        let tables = KeywordTables::builtin();
        assert!(tables.validate().is_ok());
        assert_eq!(tables.version, BUILTIN_KEYWORDS_VERSION);
        assert_eq!(tables.category_keywords(Category::Entertainment).len(), 19);
    }

    #[test]
    fn test_normalize_dedupes_and_lowercases() {
        let mut tables = KeywordTables::builtin();
        tables.categories.music = words(&["Song", " song ", "", "ALBUM"]);
        tables.normalize();
        assert_eq!(tables.categories.music, words(&["song", "album"]));
    }

    #[test]
    fn test_from_toml_rejects_empty_category() {
        let toml = toml::to_string(&{
            let mut t = KeywordTables::builtin();
            t.categories.news.clear();
            t
        })
        .unwrap();
        let err = KeywordTables::from_toml(&toml).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_toml_missing_bucket_is_config_error() {
        let err = KeywordTables::from_toml("version = 2\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.toml");
        let mut tables = KeywordTables::builtin();
        tables.version = 7;
        std::fs::write(&path, toml::to_string(&tables).unwrap()).unwrap();

        let loaded = KeywordTables::load_from(&path).unwrap();
        assert_eq!(loaded.version, 7);
        assert_eq!(
            loaded.category_keywords(Category::Vlogs),
            tables.category_keywords(Category::Vlogs)
        );
    }
}
