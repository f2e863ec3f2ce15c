//! Keyword dictionary repository trait definition.

use replydict_types::error::RepositoryError;
use replydict_types::keyword::{CreatorCount, CreatorRank, KeywordEntry, NewKeyword, RankedKeyword};

/// Repository trait for keyword dictionary persistence.
///
/// Implementations live in replydict-infra (e.g., `PgKeywordRepository`).
/// Inputs are taken as given; normalization belongs to `KeywordService`.
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait KeywordRepository: Send + Sync {
    /// Mark existing entries with the same keyword as overridden, then insert
    /// `new` with a zero call count. Returns the stored entry.
    fn insert_keyword(
        &self,
        new: &NewKeyword,
    ) -> impl std::future::Future<Output = Result<KeywordEntry, RepositoryError>> + Send;

    /// Live entries for an exact keyword and sticker flag, pinned first then
    /// newest first. Bumps the call count of the first entry unless it is
    /// overridden.
    fn get_reply(
        &self,
        keyword: &str,
        is_sticker_kw: bool,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Entries whose keyword or reply contains `text`, newest first.
    fn search_keyword(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Entries with `start <= id <= end`, newest first.
    fn search_keyword_index(
        &self,
        start: i32,
        end: i32,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Entries whose keyword or reply equals `text`, newest first.
    fn get_info(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Entry by id.
    fn get_info_id(
        &self,
        id: i32,
    ) -> impl std::future::Future<Output = Result<Option<KeywordEntry>, RepositoryError>> + Send;

    /// Entries ranked by call count, best first.
    fn order_by_used_rank(
        &self,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<RankedKeyword>, RepositoryError>> + Send;

    /// Creators ranked by number of created entries, best first.
    fn user_created_rank(
        &self,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<CreatorRank>, RepositoryError>> + Send;

    /// Live, non-overridden entries with the highest call count.
    fn most_used(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Live, non-overridden entries with the lowest call count.
    fn least_used(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Soft-delete live entries with this keyword and pin state. Returns them.
    fn delete_keyword(
        &self,
        keyword: &str,
        is_top: bool,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Soft-delete the live entry with this id and pin state. Returns it.
    fn delete_keyword_id(
        &self,
        id: i32,
        is_top: bool,
    ) -> impl std::future::Future<Output = Result<Vec<KeywordEntry>, RepositoryError>> + Send;

    /// Creators with their entry counts, most prolific first.
    fn user_sort_by_created_pair(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<CreatorCount>, RepositoryError>> + Send;

    fn row_count(&self) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    fn picture_reply_count(
        &self,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    fn sticker_keyword_count(
        &self,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Sum of all call counts; 0 for an empty dictionary.
    fn used_time_sum(&self) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;
}
