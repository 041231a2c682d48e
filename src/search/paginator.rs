//! Sequential multi-source pagination / 多数据源顺序分页
//!
//! Sources are laid end to end in a fixed priority order, giving one global offset
//! space. Counts are taken up front; a source that lies entirely before the page is
//! skipped without being fetched, and every fetch asks for at most what is left of
//! the page.

use async_trait::async_trait;

use crate::error::Result;

/// One ordered, countable result source / 可计数的有序数据源
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Name used in logs / 日志名称
    fn name(&self) -> &str;

    async fn count(&self) -> Result<u64>;

    /// Rows `offset..offset + limit` of this source's total order / 按偏移获取
    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<T>>;
}

/// One page plus the summed count of all sources / 分页结果
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Running-offset paginator / 顺序分页器
pub struct SequentialPaginator;

impl SequentialPaginator {
    pub async fn paginate<T: Send>(
        sources: &[&dyn PageSource<T>],
        offset: u64,
        limit: u64,
    ) -> Result<Page<T>> {
        let mut counts = Vec::with_capacity(sources.len());
        for source in sources {
            counts.push(source.count().await?);
        }
        let total = counts.iter().sum();

        let mut items = Vec::new();
        let mut skip = offset;
        let mut remaining = limit;

        for (source, &count) in sources.iter().zip(&counts) {
            if remaining == 0 {
                break;
            }
            if count <= skip {
                skip -= count;
                continue;
            }

            let rows = source.fetch(remaining, skip).await?;
            tracing::debug!("Page source {}: fetched {} rows at local offset {}", source.name(), rows.len(), skip);
            remaining = remaining.saturating_sub(rows.len() as u64);
            items.extend(rows);
            skip = 0;
        }

        Ok(Page { items, total })
    }
}

/// Page size and 1-based page to a global offset / 页码转偏移
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(page_size)
}
