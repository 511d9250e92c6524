//! Storage contract for the fingerprint index, expressed as a trait so the
//! orchestrator, matcher, and recognizer depend on behavior rather than on
//! a concrete PostgreSQL connection.

use std::collections::HashMap;

use diesel::dsl::insert_into;
use diesel::prelude::*;
use diesel::{Connection, PgConnection, RunQueryDsl};

use crate::db::models::{MatchRow, NewFingerprint, NewSong, Song};
use crate::db::schema::{fingerprints, songs};
use crate::error::{Result, SonoraError};
use crate::fingerprint::hasher::Hash;

/// Rows per statement, bounding driver parameter limits for both batched
/// inserts and batched hash lookups.
pub const BATCH: usize = 11250;

/// Abstract storage contract for the two logical tables (`songs`,
/// `fingerprints`). Implemented by [`PostgresIndex`] for production use and
/// by [`crate::db::memory::InMemoryIndex`] for tests that don't need a live
/// database.
pub trait FingerprintIndex {
    fn insert_song(&mut self, name: &str, content_hash: &[u8]) -> Result<i32>;

    fn insert_hashes(&mut self, song_id: i32, landmarks: &[(Hash, u32)]) -> Result<()>;

    fn set_song_fingerprinted(&mut self, song_id: i32) -> Result<()>;

    /// `(song_id, name, content_hash_hex_upper)` for every fingerprinted song.
    fn get_fingerprinted_songs(&mut self) -> Result<Vec<(i32, String, String)>>;

    fn get_song_by_id(&mut self, song_id: i32) -> Result<Option<Song>>;

    /// `(song_id, db_offset - query_offset)` for every matching hash.
    fn return_matches(&mut self, query_landmarks: &[(Hash, u32)]) -> Result<Vec<(i32, i64)>>;

    /// Crash-cleanup: removes every song with `fingerprinted = false` and
    /// its landmarks.
    fn delete_unfingerprinted(&mut self) -> Result<()>;

    /// Drops and recreates both tables.
    fn empty(&mut self) -> Result<()>;
}

pub struct PostgresIndex {
    conn: PgConnection,
}

impl PostgresIndex {
    pub fn connect(database_url: &str) -> Result<Self> {
        let conn = PgConnection::establish(database_url)?;
        Ok(Self { conn })
    }

    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

impl FingerprintIndex for PostgresIndex {
    fn insert_song(&mut self, name: &str, content_hash: &[u8]) -> Result<i32> {
        let new_song = NewSong {
            name,
            content_hash,
            fingerprinted: false,
        };

        let song_id = insert_into(songs::table)
            .values(&new_song)
            .returning(songs::song_id)
            .get_result::<i32>(&mut self.conn)?;

        Ok(song_id)
    }

    fn insert_hashes(&mut self, song_id: i32, landmarks: &[(Hash, u32)]) -> Result<()> {
        for chunk in landmarks.chunks(BATCH) {
            let rows: Vec<NewFingerprint> = chunk
                .iter()
                .map(|(hash, offset)| NewFingerprint {
                    hash: hash.to_vec(),
                    song_id,
                    frame_offset: *offset as i64,
                })
                .collect();

            self.conn.transaction(|conn| {
                insert_into(fingerprints::table)
                    .values(&rows)
                    .execute(conn)
            })?;
        }

        Ok(())
    }

    fn set_song_fingerprinted(&mut self, song_id: i32) -> Result<()> {
        diesel::update(songs::table.filter(songs::song_id.eq(song_id)))
            .set(songs::fingerprinted.eq(true))
            .execute(&mut self.conn)?;
        Ok(())
    }

    fn get_fingerprinted_songs(&mut self) -> Result<Vec<(i32, String, String)>> {
        let rows: Vec<Song> = songs::table
            .filter(songs::fingerprinted.eq(true))
            .select(Song::as_select())
            .load(&mut self.conn)?;

        Ok(rows
            .into_iter()
            .map(|s| (s.song_id, s.name, hex_upper(&s.content_hash)))
            .collect())
    }

    fn get_song_by_id(&mut self, song_id: i32) -> Result<Option<Song>> {
        let row = songs::table
            .filter(songs::song_id.eq(song_id))
            .select(Song::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row)
    }

    fn return_matches(&mut self, query_landmarks: &[(Hash, u32)]) -> Result<Vec<(i32, i64)>> {
        if query_landmarks.is_empty() {
            return Ok(Vec::new());
        }

        let mut offsets_by_hash: HashMap<Hash, Vec<u32>> = HashMap::new();
        for (hash, offset) in query_landmarks {
            offsets_by_hash.entry(*hash).or_default().push(*offset);
        }
        let distinct_hashes: Vec<Hash> = offsets_by_hash.keys().copied().collect();

        let mut results = Vec::new();

        for chunk in distinct_hashes.chunks(BATCH) {
            let rows = self.conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::sql_query(
                    "CREATE TEMPORARY TABLE temp_query_hashes (hash BYTEA NOT NULL PRIMARY KEY) ON COMMIT DROP",
                )
                .execute(conn)?;

                diesel::table! {
                    temp_query_hashes (hash) {
                        hash -> Bytea,
                    }
                }

                #[derive(Insertable)]
                #[diesel(table_name = temp_query_hashes)]
                struct TempHash {
                    hash: Vec<u8>,
                }

                let temp_rows: Vec<TempHash> = chunk
                    .iter()
                    .map(|h| TempHash { hash: h.to_vec() })
                    .collect();

                insert_into(temp_query_hashes::table)
                    .values(&temp_rows)
                    .on_conflict_do_nothing()
                    .execute(conn)?;

                diesel::sql_query(
                    "SELECT f.hash, f.song_id, f.frame_offset \
                     FROM fingerprints AS f \
                     INNER JOIN temp_query_hashes AS t ON f.hash = t.hash",
                )
                .load::<MatchRow>(conn)
            })?;

            for row in rows {
                let hash: Hash = row
                    .hash
                    .as_slice()
                    .try_into()
                    .map_err(|_| SonoraError::IndexSchema("fingerprints.hash is not 5 bytes wide".into()))?;

                if let Some(query_offsets) = offsets_by_hash.get(&hash) {
                    for query_offset in query_offsets {
                        results.push((row.song_id, row.frame_offset - *query_offset as i64));
                    }
                }
            }
        }

        Ok(results)
    }

    fn delete_unfingerprinted(&mut self) -> Result<()> {
        self.conn.transaction(|conn| {
            let stale: Vec<i32> = songs::table
                .filter(songs::fingerprinted.eq(false))
                .select(songs::song_id)
                .load(conn)?;

            if stale.is_empty() {
                return Ok(());
            }

            diesel::delete(fingerprints::table.filter(fingerprints::song_id.eq_any(&stale)))
                .execute(conn)?;
            diesel::delete(songs::table.filter(songs::song_id.eq_any(&stale))).execute(conn)?;

            Ok::<(), diesel::result::Error>(())
        })?;
        Ok(())
    }

    fn empty(&mut self) -> Result<()> {
        diesel::sql_query("DROP TABLE IF EXISTS fingerprints").execute(&mut self.conn)?;
        diesel::sql_query("DROP TABLE IF EXISTS songs").execute(&mut self.conn)?;

        diesel::sql_query(
            "CREATE TABLE songs ( \
                song_id SERIAL PRIMARY KEY, \
                name TEXT NOT NULL, \
                content_hash BYTEA NOT NULL, \
                fingerprinted BOOLEAN NOT NULL DEFAULT FALSE \
             )",
        )
        .execute(&mut self.conn)?;

        diesel::sql_query(
            "CREATE UNIQUE INDEX songs_content_hash_fingerprinted_idx \
             ON songs (content_hash) WHERE fingerprinted",
        )
        .execute(&mut self.conn)?;

        diesel::sql_query(
            "CREATE TABLE fingerprints ( \
                id BIGSERIAL PRIMARY KEY, \
                hash BYTEA NOT NULL, \
                song_id INTEGER NOT NULL REFERENCES songs (song_id), \
                frame_offset BIGINT NOT NULL \
             )",
        )
        .execute(&mut self.conn)?;

        diesel::sql_query("CREATE INDEX fingerprints_hash_idx ON fingerprints (hash)")
            .execute(&mut self.conn)?;

        Ok(())
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
