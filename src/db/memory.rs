//! Plain-Rust-collections implementation of [`FingerprintIndex`], used by
//! tests that exercise crash cleanup, dedup, and alignment properties
//! without a live PostgreSQL instance.

use std::collections::HashMap;

use crate::db::index::FingerprintIndex;
use crate::db::models::Song;
use crate::error::Result;
use crate::fingerprint::hasher::Hash;

#[derive(Default)]
pub struct InMemoryIndex {
    songs: HashMap<i32, Song>,
    fingerprints: Vec<(Hash, i32, u32)>,
    next_id: i32,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintIndex for InMemoryIndex {
    fn insert_song(&mut self, name: &str, content_hash: &[u8]) -> Result<i32> {
        self.next_id += 1;
        let song_id = self.next_id;
        self.songs.insert(
            song_id,
            Song {
                song_id,
                name: name.to_string(),
                content_hash: content_hash.to_vec(),
                fingerprinted: false,
            },
        );
        Ok(song_id)
    }

    fn insert_hashes(&mut self, song_id: i32, landmarks: &[(Hash, u32)]) -> Result<()> {
        self.fingerprints
            .extend(landmarks.iter().map(|(h, o)| (*h, song_id, *o)));
        Ok(())
    }

    fn set_song_fingerprinted(&mut self, song_id: i32) -> Result<()> {
        if let Some(song) = self.songs.get_mut(&song_id) {
            song.fingerprinted = true;
        }
        Ok(())
    }

    fn get_fingerprinted_songs(&mut self) -> Result<Vec<(i32, String, String)>> {
        Ok(self
            .songs
            .values()
            .filter(|s| s.fingerprinted)
            .map(|s| (s.song_id, s.name.clone(), hex_upper(&s.content_hash)))
            .collect())
    }

    fn get_song_by_id(&mut self, song_id: i32) -> Result<Option<Song>> {
        Ok(self.songs.get(&song_id).cloned())
    }

    fn return_matches(&mut self, query_landmarks: &[(Hash, u32)]) -> Result<Vec<(i32, i64)>> {
        let mut offsets_by_hash: HashMap<Hash, Vec<u32>> = HashMap::new();
        for (hash, offset) in query_landmarks {
            offsets_by_hash.entry(*hash).or_default().push(*offset);
        }

        let mut results = Vec::new();
        for (hash, song_id, db_offset) in &self.fingerprints {
            if let Some(query_offsets) = offsets_by_hash.get(hash) {
                for query_offset in query_offsets {
                    results.push((*song_id, *db_offset as i64 - *query_offset as i64));
                }
            }
        }
        Ok(results)
    }

    fn delete_unfingerprinted(&mut self) -> Result<()> {
        let stale: Vec<i32> = self
            .songs
            .values()
            .filter(|s| !s.fingerprinted)
            .map(|s| s.song_id)
            .collect();

        for song_id in stale {
            self.songs.remove(&song_id);
            self.fingerprints.retain(|(_, sid, _)| *sid != song_id);
        }
        Ok(())
    }

    fn empty(&mut self) -> Result<()> {
        self.songs.clear();
        self.fingerprints.clear();
        self.next_id = 0;
        Ok(())
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(byte: u8) -> Hash {
        [byte; 5]
    }

    #[test]
    fn dedup_by_content_hash_is_the_caller_s_job() {
        // InMemoryIndex itself doesn't enforce uniqueness (neither does the
        // Postgres index outside the fingerprinted partial index); the
        // ingest orchestrator's dedup set is what provides at-most-once.
        let mut index = InMemoryIndex::new();
        let a = index.insert_song("track", b"hash").unwrap();
        let b = index.insert_song("track", b"hash").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn crash_cleanup_removes_unfingerprinted_song_and_its_landmarks() {
        let mut index = InMemoryIndex::new();
        let song_id = index.insert_song("track", b"hash").unwrap();
        index
            .insert_hashes(song_id, &[(h(1), 0), (h(2), 1)])
            .unwrap();
        // crash before set_song_fingerprinted

        index.delete_unfingerprinted().unwrap();

        assert!(index.get_song_by_id(song_id).unwrap().is_none());
        let matches = index.return_matches(&[(h(1), 0)]).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn self_match_yields_zero_offset_for_every_landmark() {
        let mut index = InMemoryIndex::new();
        let song_id = index.insert_song("track", b"hash").unwrap();
        let landmarks = vec![(h(1), 10), (h(2), 11), (h(3), 12)];
        index.insert_hashes(song_id, &landmarks).unwrap();
        index.set_song_fingerprinted(song_id).unwrap();

        let matches = index.return_matches(&landmarks).unwrap();
        assert_eq!(matches.len(), landmarks.len());
        assert!(matches.iter().all(|(sid, delta)| *sid == song_id && *delta == 0));
    }

    #[test]
    fn fingerprinted_songs_are_listed_with_upper_hex_content_hash() {
        let mut index = InMemoryIndex::new();
        let song_id = index.insert_song("track", &[0xAB, 0xCD]).unwrap();
        index.set_song_fingerprinted(song_id).unwrap();

        let listed = index.get_fingerprinted_songs().unwrap();
        assert_eq!(listed, vec![(song_id, "track".to_string(), "ABCD".to_string())]);
    }
}
