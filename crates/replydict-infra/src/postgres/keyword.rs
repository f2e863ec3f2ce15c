//! PostgreSQL keyword dictionary repository.
//!
//! Implements `KeywordRepository` from `replydict-core` on the `keyword_dict`
//! table created by the workspace migrations.

use replydict_core::repository::keyword::KeywordRepository;
use replydict_types::error::RepositoryError;
use replydict_types::keyword::{CreatorCount, CreatorRank, KeywordEntry, NewKeyword, RankedKeyword};
use sqlx::Row;
use sqlx::postgres::PgRow;

use super::pool::PgDatabasePool;

macro_rules! entry_columns {
    () => {
        "id, keyword, reply, deleted, override, admin, used_time, creator, is_pic_reply, is_sticker_kw"
    };
}

macro_rules! select_entries {
    ($tail:literal) => {
        concat!("SELECT ", entry_columns!(), " FROM keyword_dict ", $tail)
    };
}

/// PostgreSQL-backed implementation of `KeywordRepository`.
pub struct PgKeywordRepository {
    pool: PgDatabasePool,
}

impl PgKeywordRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: PgDatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn entry_from_row(row: &PgRow) -> Result<KeywordEntry, sqlx::Error> {
    Ok(KeywordEntry {
        id: row.try_get("id")?,
        keyword: row.try_get("keyword")?,
        reply: row.try_get("reply")?,
        deleted: row.try_get("deleted")?,
        overridden: row.try_get("override")?,
        admin: row.try_get("admin")?,
        used_time: row.try_get("used_time")?,
        creator: row.try_get("creator")?,
        is_pic_reply: row.try_get("is_pic_reply")?,
        is_sticker_kw: row.try_get("is_sticker_kw")?,
    })
}

fn entries_from_rows(rows: &[PgRow]) -> Result<Vec<KeywordEntry>, RepositoryError> {
    rows.iter()
        .map(|row| entry_from_row(row).map_err(map_sqlx_error))
        .collect()
}

fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict(db_err.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        _ => RepositoryError::Query(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// KeywordRepository implementation
// ---------------------------------------------------------------------------

impl KeywordRepository for PgKeywordRepository {
    async fn insert_keyword(&self, new: &NewKeyword) -> Result<KeywordEntry, RepositoryError> {
        let mut tx = self.pool.pool.begin().await.map_err(map_sqlx_error)?;

        let overridden = sqlx::query("UPDATE keyword_dict SET override = TRUE WHERE keyword = $1")
            .bind(&new.keyword)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let row = sqlx::query(concat!(
            "INSERT INTO keyword_dict (keyword, reply, creator, used_time, admin, is_sticker_kw, is_pic_reply) \
             VALUES ($1, $2, $3, 0, $4, $5, $6) RETURNING ",
            entry_columns!()
        ))
        .bind(&new.keyword)
        .bind(&new.reply)
        .bind(&new.creator)
        .bind(new.is_top)
        .bind(new.is_sticker_kw)
        .bind(new.is_pic_reply)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        let entry = entry_from_row(&row).map_err(map_sqlx_error)?;
        tracing::debug!(id = entry.id, overridden, "inserted keyword row");
        Ok(entry)
    }

    async fn get_reply(&self, keyword: &str, is_sticker_kw: bool) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(select_entries!(
            "WHERE keyword = $1 AND deleted = FALSE AND is_sticker_kw = $2 ORDER BY admin DESC, id DESC"
        ))
        .bind(keyword)
        .bind(is_sticker_kw)
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        let entries = entries_from_rows(&rows)?;
        if let Some(first) = entries.first() {
            sqlx::query("UPDATE keyword_dict SET used_time = used_time + 1 WHERE id = $1 AND override = FALSE")
                .bind(first.id)
                .execute(&self.pool.pool)
                .await
                .map_err(map_sqlx_error)?;
        }

        Ok(entries)
    }

    async fn search_keyword(&self, text: &str) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(select_entries!(
            "WHERE keyword LIKE $1 OR reply LIKE $1 ORDER BY id DESC"
        ))
        .bind(format!("%{text}%"))
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn search_keyword_index(&self, start: i32, end: i32) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(select_entries!("WHERE id >= $1 AND id <= $2 ORDER BY id DESC"))
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn get_info(&self, text: &str) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(select_entries!("WHERE keyword = $1 OR reply = $1 ORDER BY id DESC"))
            .bind(text)
            .fetch_all(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn get_info_id(&self, id: i32) -> Result<Option<KeywordEntry>, RepositoryError> {
        let row = sqlx::query(select_entries!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref()
            .map(entry_from_row)
            .transpose()
            .map_err(map_sqlx_error)
    }

    async fn order_by_used_rank(&self, limit: i64) -> Result<Vec<RankedKeyword>, RepositoryError> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            entry_columns!(),
            ", RANK() OVER (ORDER BY used_time DESC) AS used_rank \
             FROM keyword_dict ORDER BY used_rank ASC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                Ok(RankedKeyword {
                    entry: entry_from_row(row)?,
                    used_rank: row.try_get("used_rank")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(map_sqlx_error)
    }

    async fn user_created_rank(&self, limit: i64) -> Result<Vec<CreatorRank>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT RANK() OVER (ORDER BY created_count DESC) AS creator_rank, creator, created_count
               FROM (SELECT creator, COUNT(creator) AS created_count FROM keyword_dict GROUP BY creator) AS counts
               ORDER BY creator_rank ASC, creator ASC
               LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                Ok(CreatorRank {
                    rank: row.try_get("creator_rank")?,
                    creator: row.try_get("creator")?,
                    created_count: row.try_get("created_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(map_sqlx_error)
    }

    async fn most_used(&self) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(select_entries!(
            "WHERE used_time = (SELECT MAX(used_time) FROM keyword_dict) \
             AND override = FALSE AND deleted = FALSE ORDER BY id DESC"
        ))
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn least_used(&self) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(select_entries!(
            "WHERE used_time = (SELECT MIN(used_time) FROM keyword_dict) \
             AND override = FALSE AND deleted = FALSE ORDER BY id DESC"
        ))
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn delete_keyword(&self, keyword: &str, is_top: bool) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(concat!(
            "UPDATE keyword_dict SET deleted = TRUE \
             WHERE keyword = $1 AND admin = $2 AND deleted = FALSE RETURNING ",
            entry_columns!()
        ))
        .bind(keyword)
        .bind(is_top)
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn delete_keyword_id(&self, id: i32, is_top: bool) -> Result<Vec<KeywordEntry>, RepositoryError> {
        let rows = sqlx::query(concat!(
            "UPDATE keyword_dict SET deleted = TRUE \
             WHERE id = $1 AND admin = $2 AND deleted = FALSE RETURNING ",
            entry_columns!()
        ))
        .bind(id)
        .bind(is_top)
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        entries_from_rows(&rows)
    }

    async fn user_sort_by_created_pair(&self) -> Result<Vec<CreatorCount>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT creator, COUNT(creator) FROM keyword_dict GROUP BY creator ORDER BY COUNT(creator) DESC, creator ASC",
        )
        .fetch_all(&self.pool.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(creator, created_count)| CreatorCount {
                creator,
                created_count,
            })
            .collect())
    }

    async fn row_count(&self) -> Result<i64, RepositoryError> {
        sqlx::query_scalar("SELECT COUNT(id) FROM keyword_dict")
            .fetch_one(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn picture_reply_count(&self) -> Result<i64, RepositoryError> {
        sqlx::query_scalar("SELECT COUNT(id) FROM keyword_dict WHERE is_pic_reply = TRUE")
            .fetch_one(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn sticker_keyword_count(&self) -> Result<i64, RepositoryError> {
        sqlx::query_scalar("SELECT COUNT(id) FROM keyword_dict WHERE is_sticker_kw = TRUE")
            .fetch_one(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn used_time_sum(&self) -> Result<i64, RepositoryError> {
        sqlx::query_scalar("SELECT COALESCE(SUM(used_time), 0)::BIGINT FROM keyword_dict")
            .fetch_one(&self.pool.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::pool::testing::test_pool;

    fn new_keyword(keyword: &str, reply: &str, creator: &str) -> NewKeyword {
        NewKeyword {
            keyword: keyword.to_string(),
            reply: reply.to_string(),
            creator: creator.to_string(),
            is_top: false,
            is_sticker_kw: false,
            is_pic_reply: false,
        }
    }

    #[tokio::test]
    async fn test_insert_marks_previous_as_override() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgKeywordRepository::new(pool);

        let first = repo.insert_keyword(&new_keyword("hi", "one", "U1")).await.unwrap();
        let second = repo.insert_keyword(&new_keyword("hi", "two", "U2")).await.unwrap();
        assert!(second.id > first.id);
        assert!(!second.overridden);
        assert_eq!(second.used_time, 0);

        let old = repo.get_info_id(first.id).await.unwrap().unwrap();
        assert!(old.overridden);
    }

    #[tokio::test]
    async fn test_get_reply_orders_and_counts_usage() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgKeywordRepository::new(pool);

        let pinned = repo
            .insert_keyword(&NewKeyword {
                is_top: true,
                ..new_keyword("hi", "pinned", "ADMIN")
            })
            .await
            .unwrap();
        let newest = repo.insert_keyword(&new_keyword("hi", "newest", "U1")).await.unwrap();

        let replies = repo.get_reply("hi", false).await.unwrap();
        assert_eq!(replies.iter().map(|e| e.id).collect::<Vec<_>>(), vec![pinned.id, newest.id]);
        assert!(repo.get_reply("hi", true).await.unwrap().is_empty());

        // The pinned entry was overridden by the newer insert, so it is not counted.
        assert_eq!(repo.get_info_id(pinned.id).await.unwrap().unwrap().used_time, 0);
        assert_eq!(repo.used_time_sum().await.unwrap(), 0);

        repo.delete_keyword_id(pinned.id, true).await.unwrap();
        repo.get_reply("hi", false).await.unwrap();
        assert_eq!(repo.get_info_id(newest.id).await.unwrap().unwrap().used_time, 1);
    }

    #[tokio::test]
    async fn test_search_and_info() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgKeywordRepository::new(pool);

        let a = repo.insert_keyword(&new_keyword("morning", "good day", "U1")).await.unwrap();
        let b = repo.insert_keyword(&new_keyword("night", "good night", "U1")).await.unwrap();

        let found = repo.search_keyword("good").await.unwrap();
        assert_eq!(found.iter().map(|e| e.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let info = repo.get_info("good day").await.unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].id, a.id);

        let range = repo.search_keyword_index(a.id, a.id).await.unwrap();
        assert_eq!(range.len(), 1);
        assert!(repo.get_info_id(b.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_respects_pin_state() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgKeywordRepository::new(pool);

        repo.insert_keyword(&new_keyword("bye", "see you", "U1")).await.unwrap();
        assert!(repo.delete_keyword("bye", true).await.unwrap().is_empty());

        let deleted = repo.delete_keyword("bye", false).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].deleted);
        assert!(repo.delete_keyword("bye", false).await.unwrap().is_empty());
        assert!(repo.get_reply("bye", false).await.unwrap().is_empty());
        assert_eq!(repo.row_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rankings_and_counters() {
        let Some(pool) = test_pool().await else { return };
        let repo = PgKeywordRepository::new(pool);

        repo.insert_keyword(&new_keyword("a", "r", "U1")).await.unwrap();
        repo.insert_keyword(&new_keyword("b", "r", "U1")).await.unwrap();
        repo.insert_keyword(&NewKeyword {
            is_sticker_kw: true,
            is_pic_reply: true,
            ..new_keyword("123", "https://example.com/p.png", "U2")
        })
        .await
        .unwrap();
        repo.get_reply("a", false).await.unwrap();
        repo.get_reply("a", false).await.unwrap();

        let ranked = repo.order_by_used_rank(10).await.unwrap();
        assert_eq!(ranked[0].entry.keyword, "a");
        assert_eq!(ranked[0].used_rank, 1);
        assert_eq!(ranked[1].used_rank, 2);
        assert_eq!(ranked[2].used_rank, 2);

        let creators = repo.user_created_rank(10).await.unwrap();
        assert_eq!(creators[0].creator, "U1");
        assert_eq!(creators[0].created_count, 2);
        assert_eq!(creators[1].rank, 2);

        let pairs = repo.user_sort_by_created_pair().await.unwrap();
        assert_eq!(pairs.len(), 2);

        assert_eq!(repo.most_used().await.unwrap()[0].keyword, "a");
        assert_eq!(repo.least_used().await.unwrap().len(), 2);
        assert_eq!(repo.row_count().await.unwrap(), 3);
        assert_eq!(repo.picture_reply_count().await.unwrap(), 1);
        assert_eq!(repo.sticker_keyword_count().await.unwrap(), 1);
        assert_eq!(repo.used_time_sum().await.unwrap(), 2);
    }
}
