//! Keywords that name a text hash directly / 哈希直查

use crate::error::Result;
use crate::models::LangCode;
use crate::search::pattern::{parse_hash_literal, LikePatterns};
use crate::store::TextStore;

/// A hash the keyword literally names / 关键词指向的哈希
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinnedHash {
    pub hash: i64,
    /// The entry also matches the keyword as text, so it is pinned inside the text
    /// corpus instead of being prepended / 文本本身也匹配关键词
    pub matches_text: bool,
}

pub struct HashLookup;

impl HashLookup {
    /// Resolve a literal keyword to an existing hash / 解析并确认哈希存在
    pub async fn resolve(
        store: &TextStore,
        keyword: &str,
        lang: LangCode,
        patterns: &LikePatterns,
    ) -> Result<Option<PinnedHash>> {
        let Some(hash) = parse_hash_literal(keyword) else {
            return Ok(None);
        };
        if !store.hash_exists(hash).await? {
            tracing::debug!("Keyword {} parses as hash {} but no entry exists", keyword, hash);
            return Ok(None);
        }

        let matches_text = store.text_matches(hash, lang, &patterns.exact, &patterns.fuzzy).await?;
        Ok(Some(PinnedHash { hash, matches_text }))
    }
}
