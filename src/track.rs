//! Track identifiers and catalog metadata as they cross the collaborator
//! boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque catalog identifier. Nothing is assumed about its structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One encoded rendition of a track, e.g. `96kbps` or `320kbps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioVariant {
    pub quality: String,
    pub url: String,
}

/// How a track is described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Lowercased on the way in; the catalog is inconsistent about case.
    #[serde(deserialize_with = "lowercase")]
    pub language: String,
    /// Release year. Some catalog entries don't carry one.
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub audio_variants: Vec<AudioVariant>,
}

impl Track {
    /// Whether this track was released within `tolerance` years of `target`.
    #[must_use]
    pub fn released_near(&self, target: i32, tolerance: i32) -> bool {
        self.year
            .map(|year| (year - target).abs() <= tolerance)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_language(&self, language: &str) -> bool {
        self.language.eq_ignore_ascii_case(language)
    }
}

fn lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(year: Option<i32>) -> Track {
        Track {
            id: TrackId::new("t1"),
            name: "Sample".to_string(),
            language: "telugu".to_string(),
            year,
            artists: vec!["Someone".to_string()],
            album: "Album".to_string(),
            audio_variants: Vec::new(),
        }
    }

    #[test]
    fn test_released_near() {
        let track = sample(Some(2015));
        assert!(track.released_near(2016, 1));
        assert!(track.released_near(2015, 0));
        assert!(!track.released_near(2018, 1));
        assert!(!sample(None).released_near(2015, 5), "Unknown year never matches");
    }

    #[test]
    fn test_language_is_lowercased_on_deserialize() {
        let json = r#"{"id":"abc","name":"Song","language":" Telugu ","year":2019}"#;
        let track: Track = serde_json::from_str(json).expect("valid track json");
        assert_eq!(track.language, "telugu");
        assert_eq!(track.id, TrackId::new("abc"));
        assert!(track.artists.is_empty());
        assert!(track.is_language("TELUGU"));
    }

    #[test]
    fn test_track_id_is_transparent() {
        let id: TrackId = serde_json::from_str("\"xyz\"").expect("string id");
        assert_eq!(id.as_str(), "xyz");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"xyz\"");
    }
}
