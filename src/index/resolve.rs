//! Merge of a track's stored variants with index-declared ones.
//!
//! Output order:
//! 1. the default variant
//! 2. stored Local variants, in store order
//! 3. stored Streaming/Hosted variants, in store order
//! 4. index variants whose id the store doesn't hold, in index order
//!
//! An id present in the store always wins over the index copy, whatever
//! the kinds. Index metadata is not merged into stored records.

use std::collections::HashSet;

use super::adapter::ParsedIndex;
use crate::model::{TrackId, Variant, VariantKind, VariantSet};

/// Variants declared for `track_id` across `indexes`, first declaration of
/// each id wins.
pub fn index_variants_for<'a>(
    track_id: TrackId,
    indexes: impl IntoIterator<Item = &'a ParsedIndex>,
) -> Vec<&'a Variant> {
    let mut seen = HashSet::new();
    let mut variants = Vec::new();
    for index in indexes {
        for variant in index.variants.iter().filter(|v| v.track_id() == track_id) {
            if seen.insert(variant.unique_id()) {
                variants.push(variant);
            } else {
                tracing::warn!(
                    target: "jukebox::index",
                    track = %track_id,
                    unique_id = %variant.unique_id(),
                    index = %index.metadata.id,
                    "Duplicate index variant skipped"
                );
            }
        }
    }
    variants
}

/// Ordered, duplicate-free view of a track's variants.
pub fn merge<'a>(
    set: &VariantSet,
    index_variants: impl IntoIterator<Item = &'a Variant>,
) -> Vec<Variant> {
    let index_variants: Vec<&Variant> = index_variants.into_iter().collect();
    let mut merged = Vec::with_capacity(set.len() + index_variants.len());
    merged.push(set.default_variant().clone());

    merged.extend(
        set.variants()
            .iter()
            .filter(|v| v.kind() == VariantKind::Local)
            .cloned(),
    );

    for stored in set.variants().iter().filter(|v| v.kind() != VariantKind::Local) {
        if stored.origin_index_id().is_some()
            && index_variants
                .iter()
                .any(|v| v.unique_id() == stored.unique_id())
        {
            tracing::trace!(
                target: "jukebox::index",
                track = %set.track_id(),
                unique_id = %stored.unique_id(),
                "Stored variant also declared by an index; keeping stored copy"
            );
        }
        merged.push(stored.clone());
    }

    let mut emitted: HashSet<String> = merged.iter().map(|v| v.unique_id().to_string()).collect();
    for variant in index_variants {
        if emitted.insert(variant.unique_id().to_string()) {
            merged.push(variant.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_UNIQUE_ID, IndexMetadata};
    use crate::test_utils::{hosted, local, streaming};
    use proptest::prelude::*;

    fn index(id: &str, variants: Vec<Variant>) -> ParsedIndex {
        ParsedIndex {
            metadata: IndexMetadata {
                id: id.to_string(),
                name: id.to_string(),
                url: format!("http://{}/index.json", id),
                description: None,
            },
            variants,
        }
    }

    fn ids(variants: &[Variant]) -> Vec<&str> {
        variants.iter().map(|v| v.unique_id()).collect()
    }

    #[test]
    fn test_segments_are_ordered() {
        let mut set = VariantSet::new(TrackId(1), "/host/1.mp3");
        set.upsert(streaming(1, "s1", "yt", Some("hub"))).unwrap();
        set.upsert(local(1, "l1", "/l1.mp3")).unwrap();
        set.upsert(hosted(1, "h1", "http://x/h1.mp3", None)).unwrap();
        set.upsert(local(1, "l2", "/l2.mp3")).unwrap();

        let idx = index(
            "hub",
            vec![
                streaming(1, "s1", "yt", Some("hub")),
                hosted(1, "new2", "http://x/2.mp3", Some("hub")),
                hosted(1, "new1", "http://x/1.mp3", Some("hub")),
            ],
        );

        let merged = merge(&set, index_variants_for(TrackId(1), [&idx]));
        assert_eq!(
            ids(&merged),
            vec![DEFAULT_UNIQUE_ID, "l1", "l2", "s1", "h1", "new2", "new1"]
        );
    }

    #[test]
    fn test_stored_copy_wins() {
        let mut set = VariantSet::new(TrackId(911), "/host/911.mp3");
        set.upsert(local(911, "abc", "/songs/abc.mp3")).unwrap();
        let idx = index("hub", vec![hosted(911, "abc", "http://x/y.mp3", Some("hub"))]);

        let merged = merge(&set, index_variants_for(TrackId(911), [&idx]));
        assert_eq!(ids(&merged), vec![DEFAULT_UNIQUE_ID, "abc"]);
        assert_eq!(merged[1].kind(), VariantKind::Local);
    }

    #[test]
    fn test_first_index_wins_duplicates_and_other_tracks_are_ignored() {
        let a = index("a", vec![hosted(5, "dup", "http://a/dup.mp3", Some("a"))]);
        let b = index(
            "b",
            vec![
                hosted(5, "dup", "http://b/dup.mp3", Some("b")),
                hosted(6, "other", "http://b/o.mp3", Some("b")),
            ],
        );

        let found = index_variants_for(TrackId(5), [&a, &b]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].origin_index_id(), Some("a"));
    }

    fn stored_segment(set: &VariantSet, local: bool) -> Vec<&str> {
        set.variants()
            .iter()
            .filter(|v| (v.kind() == VariantKind::Local) == local)
            .map(|v| v.unique_id())
            .collect()
    }

    fn arb_variant(track: i32) -> impl Strategy<Value = Variant> {
        (0..3u8, "[a-f]{1,2}").prop_map(move |(kind, id)| match kind {
            0 => local(track, &id, "/songs/x.mp3"),
            1 => streaming(track, &id, "yt", Some("hub")),
            _ => hosted(track, &id, "http://x/y.mp3", Some("hub")),
        })
    }

    proptest! {
        #[test]
        fn prop_merge_keeps_default_unique_ids_and_stored_copies(
            stored in prop::collection::vec(arb_variant(1), 0..8),
            declared in prop::collection::vec(arb_variant(1), 0..8),
        ) {
            let mut set = VariantSet::new(TrackId(1), "/host/1.mp3");
            for v in stored {
                set.upsert(v).unwrap();
            }
            let idx = index("hub", declared);

            let merged = merge(&set, index_variants_for(TrackId(1), [&idx]));

            prop_assert_eq!(merged[0].unique_id(), DEFAULT_UNIQUE_ID);
            prop_assert_eq!(
                merged.iter().filter(|v| v.unique_id() == DEFAULT_UNIQUE_ID).count(),
                1
            );
            let unique: HashSet<_> = merged.iter().map(|v| v.unique_id()).collect();
            prop_assert_eq!(unique.len(), merged.len());

            for v in set.variants() {
                let found = merged.iter().find(|m| m.unique_id() == v.unique_id());
                prop_assert_eq!(found, Some(v));
            }

            // Stored variants occupy the prefix right after the default.
            let stored_count = set.variants().len();
            prop_assert!(merged[1..=stored_count].iter().all(|m| set.contains(m.unique_id())));
            prop_assert!(merged[stored_count + 1..].iter().all(|m| !set.contains(m.unique_id())));

            // Each segment keeps its source's relative order.
            let fresh: Vec<&str> = index_variants_for(TrackId(1), [&idx])
                .into_iter()
                .map(|v| v.unique_id())
                .filter(|id| !set.contains(id))
                .collect();
            let expected: Vec<&str> = std::iter::once(DEFAULT_UNIQUE_ID)
                .chain(stored_segment(&set, true))
                .chain(stored_segment(&set, false))
                .chain(fresh)
                .collect();
            prop_assert_eq!(ids(&merged), expected);
        }

        #[test]
        fn prop_reordering_index_changes_only_its_segment(
            stored in prop::collection::vec(arb_variant(1), 0..6),
            declared in prop::collection::vec(arb_variant(1), 0..6),
        ) {
            let mut set = VariantSet::new(TrackId(1), "/host/1.mp3");
            for v in stored {
                set.upsert(v).unwrap();
            }
            let mut reversed = declared.clone();
            reversed.reverse();
            let forward = index("hub", declared);
            let backward = index("hub", reversed);

            let a = merge(&set, index_variants_for(TrackId(1), [&forward]));
            let b = merge(&set, index_variants_for(TrackId(1), [&backward]));

            let stored_end = set.variants().len() + 1;
            prop_assert_eq!(&a[..stored_end], &b[..stored_end]);
            let a_fresh: HashSet<_> = ids(&a[stored_end..]).into_iter().collect();
            let b_fresh: HashSet<_> = ids(&b[stored_end..]).into_iter().collect();
            prop_assert_eq!(a_fresh, b_fresh);
        }

        #[test]
        fn prop_merge_is_idempotent(
            stored in prop::collection::vec(arb_variant(1), 0..6),
            declared in prop::collection::vec(arb_variant(1), 0..6),
        ) {
            let mut set = VariantSet::new(TrackId(1), "/host/1.mp3");
            for v in stored {
                set.upsert(v).unwrap();
            }
            let idx = index("hub", declared);

            let first = merge(&set, index_variants_for(TrackId(1), [&idx]));
            let second = merge(&set, index_variants_for(TrackId(1), [&idx]));
            prop_assert_eq!(first, second);
        }
    }
}
