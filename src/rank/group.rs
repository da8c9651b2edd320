use std::collections::BTreeMap;

use crate::model::{SourceKind, TrendingItem};

/// Bucket items by source, keeping their relative order. Every source
/// category is present, possibly with an empty bucket.
pub fn group_by_source(items: &[TrendingItem]) -> BTreeMap<SourceKind, Vec<TrendingItem>> {
    let mut groups: BTreeMap<SourceKind, Vec<TrendingItem>> =
        SourceKind::ALL.iter().map(|k| (*k, Vec::new())).collect();
    for item in items {
        groups.entry(item.source()).or_default().push(item.clone());
    }
    groups
}

/// Per-source sizes of a grouping.
pub fn group_counts(groups: &BTreeMap<SourceKind, Vec<TrendingItem>>) -> BTreeMap<SourceKind, usize> {
    groups.iter().map(|(k, v)| (*k, v.len())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceDetails;

    #[test]
    fn empty_input_still_has_every_key() {
        let g = group_by_source(&[]);
        assert_eq!(g.len(), SourceKind::ALL.len());
        assert!(g.values().all(Vec::is_empty));
    }

    #[test]
    fn order_within_bucket_is_preserved() {
        let items: Vec<_> = ["p1", "s1", "p2"]
            .iter()
            .map(|n| {
                let kind = if n.starts_with('p') {
                    SourceKind::Paper
                } else {
                    SourceKind::Space
                };
                TrendingItem::new(*n, format!("https://x.test/{n}"), SourceDetails::empty(kind))
            })
            .collect();
        let g = group_by_source(&items);
        let papers: Vec<_> = g[&SourceKind::Paper].iter().map(|t| t.name.as_str()).collect();
        assert_eq!(papers, ["p1", "p2"]);
        assert_eq!(group_counts(&g)[&SourceKind::Space], 1);
        assert_eq!(group_counts(&g)[&SourceKind::Repository], 0);
    }
}
