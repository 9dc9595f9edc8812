use super::models::*;
use super::social_store::{FollowStore, InteractionStore, PostStore, RatingStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};
use std::{
    collections::HashMap,
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
};

const POST_FK: ForeignKey = ForeignKey {
    foreign_table: "post",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const POST_TABLE_V_0: Table = Table {
    name: "post",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("post_type", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("item_id", &SqlType::Text, non_null = true),
        sqlite_column!("item_name", &SqlType::Text, non_null = true),
        sqlite_column!("item_artist", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
        sqlite_column!("preview_url", &SqlType::Text),
        sqlite_column!("external_url", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!("is_private", &SqlType::Integer, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_post_created", "created"),
        ("idx_post_author_created", "author_id, created"),
    ],
};
const FOLLOW_TABLE_V_0: Table = Table {
    name: "follow",
    columns: &[
        sqlite_column!("follower_id", &SqlType::Integer, non_null = true),
        sqlite_column!("following_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["follower_id", "following_id"]],
    indices: &[("idx_follow_following_id", "following_id")],
};
const POST_LIKE_TABLE_V_0: Table = Table {
    name: "post_like",
    columns: &[
        sqlite_column!(
            "post_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POST_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["post_id", "user_id"]],
    indices: &[],
};
const POST_COMMENT_TABLE_V_0: Table = Table {
    name: "post_comment",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!(
            "post_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POST_FK)
        ),
        sqlite_column!("author_id", &SqlType::Integer, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[("idx_post_comment_post_id", "post_id")],
};
const TRACK_RATING_TABLE_V_0: Table = Table {
    name: "track_rating",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("track_name", &SqlType::Text, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["user_id", "track_id"]],
    indices: &[("idx_track_rating_track_id", "track_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        POST_TABLE_V_0,
        FOLLOW_TABLE_V_0,
        POST_LIKE_TABLE_V_0,
        POST_COMMENT_TABLE_V_0,
        TRACK_RATING_TABLE_V_0,
    ],
    migration: None,
}];

/// Post columns followed by the viewer-relative counters, `?1` being the viewer.
const POST_RECORD_SELECT: &str = "SELECT p.id, p.author_id, p.post_type, p.content, p.item_id,
        p.item_name, p.item_artist, p.image_url, p.preview_url, p.external_url, p.rating,
        p.is_private, p.created, p.updated,
        (SELECT COUNT(*) FROM post_like l WHERE l.post_id = p.id),
        (SELECT COUNT(*) FROM post_comment c WHERE c.post_id = p.id),
        EXISTS (SELECT 1 FROM post_like l WHERE l.post_id = p.id AND l.user_id = ?1)
    FROM post p";

#[derive(Clone)]
pub struct SqliteSocialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSocialStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteSocialStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn query_post_records<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<PostRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, raw_post_record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawPostRecord::into_record).collect()
    }
}

struct RawPostRecord {
    post_type: String,
    post: Post,
    like_count: usize,
    comment_count: usize,
    liked_by_viewer: bool,
}

impl RawPostRecord {
    fn into_record(self) -> Result<PostRecord> {
        let mut post = self.post;
        post.post_type = PostType::from_str(&self.post_type)
            .with_context(|| format!("Corrupted post {}", post.id))?;
        Ok(PostRecord {
            post,
            like_count: self.like_count,
            comment_count: self.comment_count,
            liked_by_viewer: self.liked_by_viewer,
        })
    }
}

// post_type is parsed after the row is read so a bad value surfaces as an anyhow error.
fn raw_post_record_from_row(row: &Row) -> rusqlite::Result<RawPostRecord> {
    Ok(RawPostRecord {
        post_type: row.get(2)?,
        post: Post {
            id: row.get(0)?,
            author_id: row.get(1)?,
            post_type: PostType::Track,
            content: row.get(3)?,
            subject: PostSubject {
                item_id: row.get(4)?,
                item_name: row.get(5)?,
                item_artist: row.get(6)?,
                image_url: row.get(7)?,
                preview_url: row.get(8)?,
                external_url: row.get(9)?,
            },
            rating: row.get(10)?,
            is_private: row.get(11)?,
            created: row.get(12)?,
            updated: row.get(13)?,
        },
        like_count: row.get(14)?,
        comment_count: row.get(15)?,
        liked_by_viewer: row.get(16)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        created: row.get(4)?,
    })
}

impl PostStore for SqliteSocialStore {
    fn insert_post(&self, post: &NewPost) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO post (author_id, post_type, content, item_id, item_name, item_artist,
                image_url, preview_url, external_url, rating, is_private, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                post.author_id,
                post.post_type.as_str(),
                post.content,
                post.subject.item_id,
                post.subject.item_name,
                post.subject.item_artist,
                post.subject.image_url,
                post.subject.preview_url,
                post.subject.external_url,
                post.rating,
                post.is_private,
                post.created,
            ],
        )
        .with_context(|| format!("Failed to insert post of user {}", post.author_id))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_post(&self, post_id: usize, viewer_id: usize) -> Result<Option<PostRecord>> {
        let sql = format!("{} WHERE p.id = ?2", POST_RECORD_SELECT);
        Ok(self
            .query_post_records(&sql, params![viewer_id, post_id])?
            .into_iter()
            .next())
    }

    fn update_post(&self, post_id: usize, edit: &PostEdit, updated: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE post SET
                content = COALESCE(?1, content),
                rating = COALESCE(?2, rating),
                is_private = COALESCE(?3, is_private),
                updated = ?4
             WHERE id = ?5",
            params![edit.content, edit.rating, edit.is_private, updated, post_id],
        )?;
        Ok(())
    }

    fn delete_post(&self, post_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM post WHERE id = ?1", params![post_id])?;
        Ok(deleted > 0)
    }

    fn find_recent_post(
        &self,
        author_id: usize,
        post_type: PostType,
        item_id: &str,
        since: i64,
    ) -> Result<Option<PostRecord>> {
        let sql = format!(
            "{} WHERE p.author_id = ?1 AND p.post_type = ?2 AND p.item_id = ?3 AND p.created > ?4
             ORDER BY p.created DESC, p.id DESC LIMIT 1",
            POST_RECORD_SELECT
        );
        Ok(self
            .query_post_records(&sql, params![author_id, post_type.as_str(), item_id, since])?
            .into_iter()
            .next())
    }

    fn get_feed(&self, viewer_id: usize, page: Page) -> Result<Vec<PostRecord>> {
        let sql = format!(
            "{} WHERE p.author_id = ?1
                OR (p.is_private = 0 AND p.author_id IN
                    (SELECT following_id FROM follow WHERE follower_id = ?1))
             ORDER BY p.created DESC, p.id DESC LIMIT ?2 OFFSET ?3",
            POST_RECORD_SELECT
        );
        self.query_post_records(&sql, params![viewer_id, page.limit, page.offset])
    }

    fn get_user_posts(
        &self,
        author_id: usize,
        viewer_id: usize,
        include_private: bool,
        page: Page,
    ) -> Result<Vec<PostRecord>> {
        let sql = format!(
            "{} WHERE p.author_id = ?2 AND (?3 OR p.is_private = 0)
             ORDER BY p.created DESC, p.id DESC LIMIT ?4 OFFSET ?5",
            POST_RECORD_SELECT
        );
        self.query_post_records(
            &sql,
            params![viewer_id, author_id, include_private, page.limit, page.offset],
        )
    }

    fn count_user_posts(&self, author_id: usize, include_private: bool) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM post WHERE author_id = ?1 AND (?2 OR is_private = 0)",
            params![author_id, include_private],
            |row| row.get(0),
        )?)
    }
}

impl FollowStore for SqliteSocialStore {
    fn add_follow(&self, follower_id: usize, following_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO follow (follower_id, following_id) VALUES (?1, ?2)",
            params![follower_id, following_id],
        )?;
        Ok(inserted > 0)
    }

    fn remove_follow(&self, follower_id: usize, following_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM follow WHERE follower_id = ?1 AND following_id = ?2",
            params![follower_id, following_id],
        )?;
        Ok(deleted > 0)
    }

    fn is_following(&self, follower_id: usize, following_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM follow WHERE follower_id = ?1 AND following_id = ?2)",
            params![follower_id, following_id],
            |row| row.get(0),
        )?)
    }

    fn get_follower_ids(&self, user_id: usize) -> Result<Vec<usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT follower_id FROM follow WHERE following_id = ?1 ORDER BY created DESC, rowid DESC",
        )?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<usize>>>()?;
        Ok(ids)
    }

    fn get_following_ids(&self, user_id: usize) -> Result<Vec<usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT following_id FROM follow WHERE follower_id = ?1 ORDER BY created DESC, rowid DESC",
        )?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<usize>>>()?;
        Ok(ids)
    }

    fn count_followers(&self, user_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM follow WHERE following_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    fn count_following(&self, user_id: usize) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM follow WHERE follower_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }
}

impl InteractionStore for SqliteSocialStore {
    fn add_like(&self, post_id: usize, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO post_like (post_id, user_id) VALUES (?1, ?2)",
            params![post_id, user_id],
        )?;
        Ok(inserted > 0)
    }

    fn remove_like(&self, post_id: usize, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM post_like WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn add_comment(
        &self,
        post_id: usize,
        author_id: usize,
        content: &str,
        created: i64,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO post_comment (post_id, author_id, content, created)
             VALUES (?1, ?2, ?3, ?4)",
            params![post_id, author_id, content, created],
        )?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_comment(&self, comment_id: usize) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, post_id, author_id, content, created FROM post_comment WHERE id = ?1",
                params![comment_id],
                comment_from_row,
            )
            .optional()?)
    }

    fn delete_comment(&self, comment_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM post_comment WHERE id = ?1",
            params![comment_id],
        )?;
        Ok(deleted > 0)
    }

    fn get_comments(&self, post_id: usize) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, post_id, author_id, content, created FROM post_comment
             WHERE post_id = ?1 ORDER BY created ASC, id ASC",
        )?;
        let comments = stmt
            .query_map(params![post_id], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }
}

impl RatingStore for SqliteSocialStore {
    fn upsert_track_rating(&self, rating: &TrackRating) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO track_rating
                (user_id, track_id, track_name, artist_name, rating, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, track_id) DO UPDATE SET
                track_name = excluded.track_name,
                artist_name = excluded.artist_name,
                rating = excluded.rating,
                updated = excluded.updated",
            params![
                rating.user_id,
                rating.track_id,
                rating.track_name,
                rating.artist_name,
                rating.rating,
                rating.created,
                rating.updated
            ],
        )?;
        Ok(())
    }

    fn get_track_rating(&self, user_id: usize, track_id: &str) -> Result<Option<TrackRating>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, track_id, track_name, artist_name, rating, created, updated
                 FROM track_rating WHERE user_id = ?1 AND track_id = ?2",
                params![user_id, track_id],
                |row| {
                    Ok(TrackRating {
                        user_id: row.get(0)?,
                        track_id: row.get(1)?,
                        track_name: row.get(2)?,
                        artist_name: row.get(3)?,
                        rating: row.get(4)?,
                        created: row.get(5)?,
                        updated: row.get(6)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_rating_summary(&self, track_id: &str) -> Result<RatingSummary> {
        let conn = self.conn.lock().unwrap();
        let (sum, count): (i64, usize) = conn.query_row(
            "SELECT COALESCE(SUM(rating), 0), COUNT(*) FROM track_rating WHERE track_id = ?1",
            params![track_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(RatingSummary {
            average: round_average(sum, count),
            count,
        })
    }

    fn get_user_ratings(
        &self,
        user_id: usize,
        track_ids: &[String],
    ) -> Result<HashMap<String, u8>> {
        if track_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; track_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT track_id, rating FROM track_rating WHERE user_id = ? AND track_id IN ({})",
            placeholders
        ))?;
        let bindings = std::iter::once(Value::Integer(user_id as i64))
            .chain(track_ids.iter().cloned().map(Value::Text));
        let ratings = stmt
            .query_map(params_from_iter(bindings), |row| {
                Ok((row.get::<usize, String>(0)?, row.get::<usize, u8>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(ratings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteSocialStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteSocialStore::new(temp_dir.path().join("social.db")).unwrap();
        (store, temp_dir)
    }

    fn new_post(author_id: usize, item_id: &str, is_private: bool, created: i64) -> NewPost {
        NewPost {
            author_id,
            post_type: PostType::Track,
            content: format!("post about {}", item_id),
            subject: PostSubject {
                item_id: item_id.to_string(),
                item_name: format!("Track {}", item_id),
                item_artist: "Artist A, Artist B".to_string(),
                image_url: "https://img/1".to_string(),
                preview_url: None,
                external_url: format!("https://open.spotify.com/track/{}", item_id),
            },
            rating: None,
            is_private,
            created,
        }
    }

    fn rating(user_id: usize, track_id: &str, value: u8, at: i64) -> TrackRating {
        TrackRating {
            user_id,
            track_id: track_id.to_string(),
            track_name: "Track".to_string(),
            artist_name: "Artist".to_string(),
            rating: value,
            created: at,
            updated: at,
        }
    }

    #[test]
    fn inserts_and_reads_posts() {
        let (store, _dir) = create_tmp_store();
        let id = store.insert_post(&new_post(1, "t1", false, 100)).unwrap();

        let record = store.get_post(id, 2).unwrap().unwrap();
        assert_eq!(record.post.author_id, 1);
        assert_eq!(record.post.post_type, PostType::Track);
        assert_eq!(record.post.subject.item_artist, "Artist A, Artist B");
        assert_eq!(record.post.created, 100);
        assert_eq!(record.post.updated, 100);
        assert_eq!(record.like_count, 0);
        assert!(!record.liked_by_viewer);

        assert!(store.get_post(id + 1, 2).unwrap().is_none());
    }

    #[test]
    fn edits_only_given_fields() {
        let (store, _dir) = create_tmp_store();
        let id = store.insert_post(&new_post(1, "t1", false, 100)).unwrap();

        store
            .update_post(
                id,
                &PostEdit {
                    is_private: Some(true),
                    ..Default::default()
                },
                150,
            )
            .unwrap();
        let post = store.get_post(id, 1).unwrap().unwrap().post;
        assert!(post.is_private);
        assert_eq!(post.content, "post about t1");
        assert_eq!(post.updated, 150);

        store
            .update_post(
                id,
                &PostEdit {
                    content: Some("changed".to_string()),
                    rating: Some(4),
                    is_private: None,
                },
                160,
            )
            .unwrap();
        let post = store.get_post(id, 1).unwrap().unwrap().post;
        assert_eq!(post.content, "changed");
        assert_eq!(post.rating, Some(4));
        assert!(post.is_private);
    }

    #[test]
    fn feed_shows_followed_public_posts_and_own_posts() {
        let (store, _dir) = create_tmp_store();
        let (me, friend, stranger) = (1, 2, 3);
        store.add_follow(me, friend).unwrap();

        let own_private = store.insert_post(&new_post(me, "a", true, 10)).unwrap();
        let friend_public = store.insert_post(&new_post(friend, "b", false, 20)).unwrap();
        let _friend_private = store.insert_post(&new_post(friend, "c", true, 30)).unwrap();
        let _stranger_public = store
            .insert_post(&new_post(stranger, "d", false, 40))
            .unwrap();

        let feed = store.get_feed(me, Page::default()).unwrap();
        let ids: Vec<_> = feed.iter().map(|r| r.post.id).collect();
        assert_eq!(ids, vec![friend_public, own_private]);

        // The friend's own feed contains all of their posts but not mine.
        let friend_feed = store.get_feed(friend, Page::default()).unwrap();
        assert_eq!(friend_feed.len(), 2);
        assert!(friend_feed.iter().all(|r| r.post.author_id == friend));
    }

    #[test]
    fn feed_orders_ties_by_id_and_paginates() {
        let (store, _dir) = create_tmp_store();
        let first = store.insert_post(&new_post(1, "a", false, 50)).unwrap();
        let second = store.insert_post(&new_post(1, "b", false, 50)).unwrap();
        let third = store.insert_post(&new_post(1, "c", false, 10)).unwrap();

        let ids: Vec<_> = store
            .get_feed(1, Page::default())
            .unwrap()
            .iter()
            .map(|r| r.post.id)
            .collect();
        assert_eq!(ids, vec![second, first, third]);

        let page = store
            .get_feed(1, Page::new(Some(1), Some(1)))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].post.id, first);

        let past_the_end = Page::new(None, Some(usize::MAX));
        assert!(store.get_feed(1, past_the_end).unwrap().is_empty());
        assert!(store
            .get_user_posts(1, 1, true, past_the_end)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn user_posts_respect_privacy_flag() {
        let (store, _dir) = create_tmp_store();
        store.insert_post(&new_post(1, "a", false, 10)).unwrap();
        store.insert_post(&new_post(1, "b", true, 20)).unwrap();

        assert_eq!(store.get_user_posts(1, 1, true, Page::default()).unwrap().len(), 2);
        assert_eq!(store.get_user_posts(1, 2, false, Page::default()).unwrap().len(), 1);
        assert_eq!(store.count_user_posts(1, true).unwrap(), 2);
        assert_eq!(store.count_user_posts(1, false).unwrap(), 1);
    }

    #[test]
    fn finds_recent_duplicates() {
        let (store, _dir) = create_tmp_store();
        let id = store.insert_post(&new_post(1, "t1", false, 1000)).unwrap();

        let found = store
            .find_recent_post(1, PostType::Track, "t1", 990)
            .unwrap();
        assert_eq!(found.map(|r| r.post.id), Some(id));

        assert!(store
            .find_recent_post(1, PostType::Track, "t1", 1000)
            .unwrap()
            .is_none());
        assert!(store
            .find_recent_post(1, PostType::Album, "t1", 0)
            .unwrap()
            .is_none());
        assert!(store
            .find_recent_post(2, PostType::Track, "t1", 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn follows_are_unique() {
        let (store, _dir) = create_tmp_store();
        assert!(store.add_follow(1, 2).unwrap());
        assert!(!store.add_follow(1, 2).unwrap());
        assert!(store.add_follow(3, 2).unwrap());

        assert!(store.is_following(1, 2).unwrap());
        assert!(!store.is_following(2, 1).unwrap());
        assert_eq!(store.count_followers(2).unwrap(), 2);
        assert_eq!(store.count_following(1).unwrap(), 1);
        assert_eq!(store.get_follower_ids(2).unwrap(), vec![3, 1]);
        assert_eq!(store.get_following_ids(1).unwrap(), vec![2]);

        assert!(store.remove_follow(1, 2).unwrap());
        assert!(!store.remove_follow(1, 2).unwrap());
        assert_eq!(store.count_followers(2).unwrap(), 1);
    }

    #[test]
    fn likes_are_unique_and_counted() {
        let (store, _dir) = create_tmp_store();
        let id = store.insert_post(&new_post(1, "t1", false, 10)).unwrap();

        assert!(store.add_like(id, 2).unwrap());
        assert!(!store.add_like(id, 2).unwrap());
        assert!(store.add_like(id, 3).unwrap());

        let record = store.get_post(id, 2).unwrap().unwrap();
        assert_eq!(record.like_count, 2);
        assert!(record.liked_by_viewer);
        assert!(!store.get_post(id, 4).unwrap().unwrap().liked_by_viewer);

        assert!(store.remove_like(id, 2).unwrap());
        assert!(!store.remove_like(id, 2).unwrap());
        assert_eq!(store.get_post(id, 2).unwrap().unwrap().like_count, 1);
    }

    #[test]
    fn likes_need_an_existing_post() {
        let (store, _dir) = create_tmp_store();
        assert!(store.add_like(42, 1).is_err());
    }

    #[test]
    fn deleting_post_removes_likes_and_comments() {
        let (store, _dir) = create_tmp_store();
        let id = store.insert_post(&new_post(1, "t1", false, 10)).unwrap();
        store.add_like(id, 2).unwrap();
        let comment_id = store.add_comment(id, 2, "nice", 11).unwrap();

        assert!(store.delete_post(id).unwrap());
        assert!(!store.delete_post(id).unwrap());
        assert!(store.get_comment(comment_id).unwrap().is_none());

        let conn = store.conn.lock().unwrap();
        let likes: i64 = conn
            .query_row("SELECT COUNT(*) FROM post_like", [], |row| row.get(0))
            .unwrap();
        assert_eq!(likes, 0);
    }

    #[test]
    fn comments_are_listed_oldest_first() {
        let (store, _dir) = create_tmp_store();
        let id = store.insert_post(&new_post(1, "t1", false, 10)).unwrap();
        let late = store.add_comment(id, 2, "second", 30).unwrap();
        let early = store.add_comment(id, 3, "first", 20).unwrap();

        let comments = store.get_comments(id).unwrap();
        let ids: Vec<_> = comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert_eq!(store.get_post(id, 1).unwrap().unwrap().comment_count, 2);

        assert!(store.delete_comment(early).unwrap());
        assert_eq!(store.get_comments(id).unwrap().len(), 1);
    }

    #[test]
    fn rating_upsert_overwrites_and_average_recomputes() {
        let (store, _dir) = create_tmp_store();
        assert_eq!(
            store.get_rating_summary("t1").unwrap(),
            RatingSummary {
                average: None,
                count: 0
            }
        );

        store.upsert_track_rating(&rating(1, "t1", 5, 10)).unwrap();
        store.upsert_track_rating(&rating(2, "t1", 4, 20)).unwrap();
        assert_eq!(
            store.get_rating_summary("t1").unwrap(),
            RatingSummary {
                average: Some(4.5),
                count: 2
            }
        );

        store.upsert_track_rating(&rating(1, "t1", 1, 30)).unwrap();
        let summary = store.get_rating_summary("t1").unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, Some(2.5));

        let stored = store.get_track_rating(1, "t1").unwrap().unwrap();
        assert_eq!(stored.rating, 1);
        assert_eq!(stored.created, 10);
        assert_eq!(stored.updated, 30);

        store.upsert_track_rating(&rating(3, "t1", 2, 40)).unwrap();
        assert_eq!(
            store.get_rating_summary("t1").unwrap().average,
            Some(2.3)
        );
    }

    #[test]
    fn returns_only_requested_user_ratings() {
        let (store, _dir) = create_tmp_store();
        store.upsert_track_rating(&rating(1, "t1", 5, 10)).unwrap();
        store.upsert_track_rating(&rating(1, "t2", 3, 10)).unwrap();
        store.upsert_track_rating(&rating(2, "t3", 4, 10)).unwrap();

        let ratings = store
            .get_user_ratings(1, &["t1".to_string(), "t3".to_string(), "t9".to_string()])
            .unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings.get("t1"), Some(&5));
        assert!(store.get_user_ratings(1, &[]).unwrap().is_empty());
    }
}
