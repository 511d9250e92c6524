use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::db::schema::songs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Song {
    pub song_id: i32,
    pub name: String,
    pub content_hash: Vec<u8>,
    pub fingerprinted: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::db::schema::songs)]
pub struct NewSong<'a> {
    pub name: &'a str,
    pub content_hash: &'a [u8],
    pub fingerprinted: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::db::schema::fingerprints)]
pub struct NewFingerprint {
    pub hash: Vec<u8>,
    pub song_id: i32,
    pub frame_offset: i64,
}

/// Row shape for the temp-table join used by `return_matches`.
#[derive(QueryableByName, Debug)]
pub struct MatchRow {
    #[diesel(sql_type = diesel::sql_types::Bytea)]
    pub hash: Vec<u8>,
    #[diesel(sql_type = diesel::sql_types::Int4)]
    pub song_id: i32,
    #[diesel(sql_type = diesel::sql_types::Int8)]
    pub frame_offset: i64,
}
