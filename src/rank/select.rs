use crate::model::TrendingItem;

/// Stable sort by score (descending) and keep the first `limit`.
/// The caller is responsible for clamping `limit`.
pub fn select_top(mut items: Vec<TrendingItem>, limit: usize) -> Vec<TrendingItem> {
    items.sort_by(|a, b| b.score_or_zero().total_cmp(&a.score_or_zero()));
    items.truncate(limit);
    items
}
