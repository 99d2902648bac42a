//! Local catalog mirror backed by SQLite.
//!
//! Stands in for the upstream catalog API: metadata lookups, suggestion
//! lists and free-text search all answer from one database file built by
//! `segue init-db` from a JSON dump.

use crate::error::{FetchError, FetchResult};
use crate::provider::{CatalogSearchProvider, SuggestionProvider, TrackMetadataProvider};
use crate::track::{Track, TrackId};
use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Words that carry no filtering meaning in a catalog query.
const FILLER_WORDS: &[&str] = &["songs", "song", "top", "hits", "latest", "popular", "best"];

const TRACK_COLUMNS: &str = "id, name, language, year, album, artists, audio_variants";

/// A track as it appears in a catalog dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpTrack {
    #[serde(flatten)]
    pub track: Track,
    /// Higher sorts first in search results
    #[serde(default)]
    pub popularity: i64,
}

/// JSON dump consumed by [`LocalCatalog::import`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDump {
    pub tracks: Vec<DumpTrack>,
    #[serde(default)]
    pub suggestions: HashMap<TrackId, Vec<TrackId>>,
}

/// Import totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub tracks: usize,
    pub suggestions: usize,
}

/// SQLite-backed implementation of the three catalog collaborators.
///
/// The connection sits behind a mutex so one catalog can serve several
/// sessions.
pub struct LocalCatalog {
    conn: Mutex<Connection>,
}

impl LocalCatalog {
    /// Open (and create if needed) a catalog file.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be opened or the schema can't be created.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open catalog database at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Catalog that lives only as long as this value.
    ///
    /// # Errors
    ///
    /// Fails if SQLite can't create the schema.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tracks (
                id             TEXT PRIMARY KEY,
                name           TEXT NOT NULL,
                language       TEXT NOT NULL,
                year           INTEGER,
                album          TEXT NOT NULL DEFAULT '',
                artists        TEXT NOT NULL DEFAULT '[]',
                audio_variants TEXT NOT NULL DEFAULT '[]',
                popularity     INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS suggestions (
                track_id     TEXT NOT NULL,
                position     INTEGER NOT NULL,
                suggested_id TEXT NOT NULL,
                PRIMARY KEY (track_id, position)
            );
            CREATE INDEX IF NOT EXISTS idx_tracks_language ON tracks(language);
            CREATE INDEX IF NOT EXISTS idx_tracks_year ON tracks(year);",
        )
        .context("Failed to create catalog schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> FetchResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| FetchError::transient("catalog connection lock poisoned"))
    }

    /// Read a JSON dump from disk and import it.
    ///
    /// # Errors
    ///
    /// Fails on unreadable or malformed files, or any database error.
    pub fn import_dump(&self, path: &Path) -> Result<ImportStats> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog dump {}", path.display()))?;
        let dump: CatalogDump = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed catalog dump {}", path.display()))?;
        self.import(&dump)
    }

    /// Upsert every track and replace suggestion lists, in one transaction.
    ///
    /// # Errors
    ///
    /// Any database error rolls the whole import back.
    pub fn import(&self, dump: &CatalogDump) -> Result<ImportStats> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        {
            let mut insert_track = tx.prepare(
                "INSERT OR REPLACE INTO tracks (id, name, language, year, album, artists, audio_variants, popularity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for DumpTrack { track, popularity } in &dump.tracks {
                insert_track
                    .execute(params![
                        track.id.as_str(),
                        track.name,
                        track.language,
                        track.year,
                        track.album,
                        serde_json::to_string(&track.artists)?,
                        serde_json::to_string(&track.audio_variants)?,
                        popularity,
                    ])
                    .with_context(|| format!("Failed to insert track {}", track.id))?;
            }

            let mut clear_suggestions = tx.prepare("DELETE FROM suggestions WHERE track_id = ?1")?;
            let mut insert_suggestion =
                tx.prepare("INSERT INTO suggestions (track_id, position, suggested_id) VALUES (?1, ?2, ?3)")?;
            for (track_id, suggested) in &dump.suggestions {
                clear_suggestions.execute([track_id.as_str()])?;
                for (position, suggested_id) in suggested.iter().enumerate() {
                    insert_suggestion.execute(params![track_id.as_str(), position as i64, suggested_id.as_str()])?;
                }
            }
        }

        tx.commit().context("Committing catalog import failed")?;

        let stats = ImportStats {
            tracks: dump.tracks.len(),
            suggestions: dump.suggestions.len(),
        };
        info!(
            "Imported {} tracks and {} suggestion lists",
            stats.tracks, stats.suggestions
        );
        Ok(stats)
    }

    /// Number of tracks in the mirror.
    ///
    /// # Errors
    ///
    /// Database errors are reported as transient.
    pub fn track_count(&self) -> FetchResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl TrackMetadataProvider for LocalCatalog {
    fn fetch(&self, id: &TrackId) -> FetchResult<Track> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"),
            [id.as_str()],
            track_from_row,
        )
        .optional()?
        .ok_or_else(|| FetchError::MissingMetadata(id.clone()))
    }
}

impl SuggestionProvider for LocalCatalog {
    fn fetch_suggestions(&self, id: &TrackId) -> FetchResult<Vec<TrackId>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT suggested_id FROM suggestions WHERE track_id = ?1 ORDER BY position")?;
        let ids = stmt
            .query_map([id.as_str()], |row| row.get::<_, String>(0))?
            .map(|row| row.map(TrackId::from))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

impl CatalogSearchProvider for LocalCatalog {
    fn search(&self, query: &str, limit: usize) -> FetchResult<Vec<Track>> {
        let (clause, mut values) = build_search_filter(query);
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks {clause} ORDER BY popularity DESC, id LIMIT ?"
        );
        debug!("Catalog search \"{query}\": {sql}");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(rusqlite::params_from_iter(values), track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }
}

/// Turn a free-text query into a WHERE clause.
///
/// Numeric tokens match the release year; other tokens match the language
/// exactly or appear somewhere in name, album or artists. All tokens must
/// match.
fn build_search_filter(query: &str) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    for token in query.split_whitespace().map(str::to_lowercase) {
        if FILLER_WORDS.contains(&token.as_str()) {
            continue;
        }
        if let Ok(year) = token.parse::<i64>() {
            conditions.push("year = ?".to_string());
            values.push(Value::Integer(year));
            continue;
        }
        let pattern = format!("%{}%", escape_like(&token));
        conditions.push(
            "(language = ? OR lower(name) LIKE ? ESCAPE '\\' OR lower(album) LIKE ? ESCAPE '\\' OR lower(artists) LIKE ? ESCAPE '\\')"
                .to_string(),
        );
        values.push(Value::Text(token));
        for _ in 0..3 {
            values.push(Value::Text(pattern.clone()));
        }
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

fn escape_like(token: &str) -> String {
    token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: TrackId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        language: row.get::<_, String>(2)?.to_lowercase(),
        year: row.get(3)?,
        album: row.get(4)?,
        artists: json_column(row, 5)?,
        audio_variants: json_column(row, 6)?,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump() -> CatalogDump {
        let json = r#"{
            "tracks": [
                {"id": "a", "name": "Morning Raga", "language": "Telugu", "year": 2019,
                 "artists": ["Sid Sriram"], "album": "Dawn", "popularity": 10,
                 "audio_variants": [{"quality": "320kbps", "url": "https://cdn/a.mp4"}]},
                {"id": "b", "name": "Night Drive", "language": "hindi", "year": 2019, "popularity": 50},
                {"id": "c", "name": "100% Pure", "language": "telugu", "popularity": 5}
            ],
            "suggestions": {"a": ["c", "b"]}
        }"#;
        serde_json::from_str(json).expect("valid dump")
    }

    fn catalog() -> LocalCatalog {
        let catalog = LocalCatalog::open_in_memory().unwrap();
        catalog.import(&dump()).unwrap();
        catalog
    }

    #[test]
    fn test_fetch_round_trips_metadata() {
        let track = catalog().fetch(&TrackId::new("a")).unwrap();
        assert_eq!(track.language, "telugu");
        assert_eq!(track.year, Some(2019));
        assert_eq!(track.artists, vec!["Sid Sriram".to_string()]);
        assert_eq!(track.audio_variants[0].quality, "320kbps");
    }

    #[test]
    fn test_fetch_unknown_is_missing_metadata() {
        assert!(matches!(
            catalog().fetch(&TrackId::new("zzz")),
            Err(FetchError::MissingMetadata(_))
        ));
    }

    #[test]
    fn test_suggestions_keep_position_order() {
        let ids = catalog().fetch_suggestions(&TrackId::new("a")).unwrap();
        assert_eq!(ids, vec![TrackId::new("c"), TrackId::new("b")]);
        assert!(catalog().fetch_suggestions(&TrackId::new("b")).unwrap().is_empty());
    }

    #[test]
    fn test_search_language_and_year() {
        let catalog = catalog();
        let hits = catalog.search("telugu songs 2019", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, TrackId::new("a"));

        let hits = catalog.search("telugu songs", 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"], "Ordered by popularity");
    }

    #[test]
    fn test_popularity_query_returns_everything_ranked() {
        let hits = catalog().search("top hits", 2).unwrap();
        let ids: Vec<_> = hits.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_search_escapes_like_wildcards() {
        let catalog = catalog();
        // "100%" is not a year, so it matches the literal text.
        let hits = catalog.search("100%", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, TrackId::new("c"));
        assert!(catalog.search("dri_e", 10).unwrap().is_empty());
    }

    #[test]
    fn test_reimport_replaces_suggestions() {
        let catalog = catalog();
        let mut again = dump();
        again.suggestions.insert(TrackId::new("a"), vec![TrackId::new("b")]);
        catalog.import(&again).unwrap();
        assert_eq!(catalog.track_count().unwrap(), 3);
        assert_eq!(
            catalog.fetch_suggestions(&TrackId::new("a")).unwrap(),
            vec![TrackId::new("b")]
        );
    }
}
