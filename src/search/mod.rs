//! Search module - federated keyword search over the text store / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Corpus searchers only build SQL and return rows; results are assembled in `results`
//! - Pagination across corpora goes through one reusable paginator
//! - Settings reach the engine as a request-scoped [`SearchContext`], never a global
//! - Call direction: route layer → facade → searchers → store / 调用方向
//!
//! Search features / 搜索特性：
//! - Text entries, documents and subtitles in one page space
//! - Whitespace-insensitive skeleton matching for Chinese
//! - Speaker search including the player and counterpart
//! - Keywords that are text hashes pin that entry
//! - Name lookups for quests, documents and characters

pub mod context;
pub mod corpus;
pub mod facade;
pub mod hash_lookup;
pub mod names;
pub mod paginator;
pub mod pattern;
pub mod ranking;
pub mod results;
pub mod speaker;
pub mod views;
pub mod voice;

#[cfg(test)]
mod tests;

pub use context::SearchContext;
pub use facade::{SearchFacade, SearchMode};
pub use names::{AvatarHit, AvatarVoiceItem, NameSearch, NameSearchResult, QuestNameHit, ReadableNameHit};
pub use paginator::{Page, PageSource, SequentialPaginator};
pub use pattern::LikePatterns;
pub use ranking::RankingOptions;
pub use views::{QuestDialogues, ReadableContent, SceneViews, SubtitleContext, TalkView};
pub use voice::{DirectoryVoiceOracle, StaticVoiceOracle, VoiceOracle};
