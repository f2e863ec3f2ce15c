//! Keyword dictionary service.
//!
//! Applies the dictionary's input rules before delegating to a
//! [`KeywordRepository`]: whitespace normalization and emptiness checks on
//! new entries, wildcard stripping on lookups, limit and range validation.

use replydict_types::error::KeywordError;
use replydict_types::keyword::{
    CreatorCount, CreatorRank, KeywordEntry, KeywordStats, NewKeyword, RankedKeyword,
};

use crate::repository::keyword::KeywordRepository;

/// Default number of rows fetched by ranking queries.
pub const DEFAULT_RANK_LIMIT: i64 = 1000;

/// Service orchestrating keyword dictionary use cases.
pub struct KeywordService<R: KeywordRepository> {
    repo: R,
    rank_limit: i64,
}

impl<R: KeywordRepository> KeywordService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            rank_limit: DEFAULT_RANK_LIMIT,
        }
    }

    /// Override the row count used by ranking queries when the caller passes none.
    pub fn with_rank_limit(mut self, rank_limit: i64) -> Self {
        self.rank_limit = rank_limit;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Add a keyword entry, overriding older entries with the same keyword.
    ///
    /// Keyword and reply have runs of spaces collapsed and ends trimmed;
    /// either one empty afterwards is [`KeywordError::EmptyInput`].
    pub async fn add_keyword(&self, new: NewKeyword) -> Result<KeywordEntry, KeywordError> {
        let new = NewKeyword {
            keyword: normalize_spaces(&new.keyword),
            reply: normalize_spaces(&new.reply),
            ..new
        };
        if new.keyword.is_empty() || new.reply.is_empty() {
            return Err(KeywordError::EmptyInput);
        }

        let entry = self.repo.insert_keyword(&new).await?;
        tracing::info!(id = entry.id, keyword = %entry.keyword, creator = %entry.creator, "added keyword");
        Ok(entry)
    }

    /// Replies for a keyword; the first one is the answer and gets its call count bumped.
    pub async fn get_reply(
        &self,
        keyword: &str,
        is_sticker_kw: bool,
    ) -> Result<Vec<KeywordEntry>, KeywordError> {
        let keyword = keyword.replace('%', "");
        let replies = self.repo.get_reply(&keyword, is_sticker_kw).await?;
        tracing::debug!(keyword = %keyword, matches = replies.len(), "reply lookup");
        Ok(replies)
    }

    pub async fn search(&self, text: &str) -> Result<Vec<KeywordEntry>, KeywordError> {
        Ok(self.repo.search_keyword(text).await?)
    }

    pub async fn search_range(&self, start: i32, end: i32) -> Result<Vec<KeywordEntry>, KeywordError> {
        if start > end {
            return Err(KeywordError::InvalidRange { start, end });
        }
        Ok(self.repo.search_keyword_index(start, end).await?)
    }

    pub async fn info(&self, text: &str) -> Result<Vec<KeywordEntry>, KeywordError> {
        Ok(self.repo.get_info(text).await?)
    }

    pub async fn info_by_id(&self, id: i32) -> Result<Option<KeywordEntry>, KeywordError> {
        Ok(self.repo.get_info_id(id).await?)
    }

    pub async fn used_rank(&self, limit: Option<i64>) -> Result<Vec<RankedKeyword>, KeywordError> {
        let limit = self.resolve_limit(limit)?;
        Ok(self.repo.order_by_used_rank(limit).await?)
    }

    pub async fn creator_rank(&self, limit: Option<i64>) -> Result<Vec<CreatorRank>, KeywordError> {
        let limit = self.resolve_limit(limit)?;
        Ok(self.repo.user_created_rank(limit).await?)
    }

    pub async fn most_used(&self) -> Result<Vec<KeywordEntry>, KeywordError> {
        Ok(self.repo.most_used().await?)
    }

    pub async fn least_used(&self) -> Result<Vec<KeywordEntry>, KeywordError> {
        Ok(self.repo.least_used().await?)
    }

    pub async fn delete(&self, keyword: &str, is_top: bool) -> Result<Vec<KeywordEntry>, KeywordError> {
        let deleted = self.repo.delete_keyword(keyword, is_top).await?;
        tracing::info!(keyword = %keyword, is_top, deleted = deleted.len(), "deleted keyword");
        Ok(deleted)
    }

    pub async fn delete_by_id(&self, id: i32, is_top: bool) -> Result<Vec<KeywordEntry>, KeywordError> {
        let deleted = self.repo.delete_keyword_id(id, is_top).await?;
        tracing::info!(id, is_top, deleted = deleted.len(), "deleted keyword by id");
        Ok(deleted)
    }

    pub async fn creator_pairs(&self) -> Result<Vec<CreatorCount>, KeywordError> {
        Ok(self.repo.user_sort_by_created_pair().await?)
    }

    /// Gather all dictionary counters.
    pub async fn stats(&self) -> Result<KeywordStats, KeywordError> {
        Ok(KeywordStats {
            row_count: self.repo.row_count().await?,
            picture_reply_count: self.repo.picture_reply_count().await?,
            sticker_keyword_count: self.repo.sticker_keyword_count().await?,
            used_time_sum: self.repo.used_time_sum().await?,
        })
    }

    fn resolve_limit(&self, limit: Option<i64>) -> Result<i64, KeywordError> {
        let limit = limit.unwrap_or(self.rank_limit);
        if limit <= 0 {
            return Err(KeywordError::InvalidLimit(limit));
        }
        Ok(limit)
    }
}

/// Collapse runs of spaces to one and trim surrounding whitespace.
pub fn normalize_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for ch in text.trim().chars() {
        if ch == ' ' {
            if !previous_space {
                out.push(ch);
            }
            previous_space = true;
        } else {
            out.push(ch);
            previous_space = false;
        }
    }
    out
}
