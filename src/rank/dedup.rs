//! Collapse items that describe the same artifact.
//!
//! Two items are duplicates when their canonical urls match, or when they come
//! from the same source and carry the same normalized name. The higher score
//! survives (first seen wins a tie) and takes the slot of the earliest item it
//! replaced.

use std::collections::HashMap;

use crate::model::{SourceKind, TrendingItem};

/// Lowercased, trimmed, trailing slashes removed.
pub fn canonical_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

fn name_key(item: &TrendingItem) -> (SourceKind, String) {
    let name = item
        .name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (item.source(), name)
}

struct Slot {
    item: TrendingItem,
    url: String,
    name: (SourceKind, String),
}

/// Returns the deduplicated items and how many were removed.
pub fn dedupe_counted(items: Vec<TrendingItem>) -> (Vec<TrendingItem>, usize) {
    let mut slots: Vec<Option<Slot>> = Vec::with_capacity(items.len());
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut by_name: HashMap<(SourceKind, String), usize> = HashMap::new();
    let mut removed = 0usize;

    for item in items {
        let url = canonical_url(&item.url);
        let name = name_key(&item);

        let mut matched: Vec<usize> = by_url
            .get(&url)
            .into_iter()
            .chain(by_name.get(&name))
            .copied()
            .collect();
        matched.sort_unstable();
        matched.dedup();

        if matched.is_empty() {
            let idx = slots.len();
            by_url.insert(url.clone(), idx);
            by_name.insert(name.clone(), idx);
            slots.push(Some(Slot { item, url, name }));
            continue;
        }

        let challenger = item.score_or_zero();
        let beats_all = matched.iter().all(|&i| {
            slots[i]
                .as_ref()
                .is_some_and(|s| challenger > s.item.score_or_zero())
        });
        if !beats_all {
            removed += 1;
            continue;
        }

        // Evict every matched incumbent, then seat the challenger in the first slot.
        for &i in &matched {
            if let Some(old) = slots[i].take() {
                if by_url.get(&old.url) == Some(&i) {
                    by_url.remove(&old.url);
                }
                if by_name.get(&old.name) == Some(&i) {
                    by_name.remove(&old.name);
                }
                removed += 1;
            }
        }
        let idx = matched[0];
        by_url.insert(url.clone(), idx);
        by_name.insert(name.clone(), idx);
        slots[idx] = Some(Slot { item, url, name });
    }

    (slots.into_iter().flatten().map(|s| s.item).collect(), removed)
}

pub fn dedupe(items: Vec<TrendingItem>) -> Vec<TrendingItem> {
    dedupe_counted(items).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceDetails;

    fn scored(name: &str, url: &str, kind: SourceKind, score: f64) -> TrendingItem {
        let mut it = TrendingItem::new(name, url, SourceDetails::empty(kind));
        it.score = Some(score);
        it
    }

    #[test]
    fn same_url_keeps_higher_score() {
        let a = scored("a", "https://github.com/o/r", SourceKind::Repository, 10.0);
        let b = scored("b", "https://github.com/o/r", SourceKind::Repository, 15.0);
        let out = dedupe(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, Some(15.0));
    }

    #[test]
    fn url_normalization_ignores_case_and_trailing_slash() {
        let a = scored("a", "https://GitHub.com/O/R/", SourceKind::Repository, 5.0);
        let b = scored("b", "https://github.com/o/r", SourceKind::Repository, 3.0);
        let (out, removed) = dedupe_counted(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "a");
        assert_eq!(removed, 1);
    }

    #[test]
    fn same_name_same_source_is_duplicate_but_not_across_sources() {
        let a = scored("Org/Model", "https://x.test/1", SourceKind::Space, 1.0);
        let b = scored("org/model ", "https://x.test/2", SourceKind::Space, 2.0);
        let c = scored("org/model", "https://x.test/3", SourceKind::Repository, 1.0);
        let out = dedupe(vec![a, b, c]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://x.test/2");
        assert_eq!(out[1].source(), SourceKind::Repository);
    }

    #[test]
    fn tie_keeps_first_encountered() {
        let a = scored("first", "https://x.test/a", SourceKind::Paper, 4.0);
        let b = scored("second", "https://x.test/a", SourceKind::Paper, 4.0);
        let out = dedupe(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "first");
    }

    #[test]
    fn challenger_matching_two_incumbents_replaces_both() {
        let a = scored("alpha", "https://x.test/a", SourceKind::Paper, 1.0);
        let b = scored("beta", "https://x.test/b", SourceKind::Paper, 2.0);
        // url matches `a`, name matches `b`
        let c = scored("beta", "https://x.test/a", SourceKind::Paper, 3.0);
        let out = dedupe(vec![a, b, c]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, Some(3.0));
        assert_eq!(dedupe(out.clone()), out);
    }
}
