//! Property-based tests for diffing, replay and index merging.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::clone::replay_records;
    use crate::diff::{replay, DiffComputer, DiffFormat, Patch, PatchError};
    use crate::index::RepoIndex;
    use crate::record::CommitRecord;
    use crate::store::file::encode_component;
    use proptest::prelude::*;

    /// Text made of a few short lines, with or without a final newline.
    /// Includes two- and three-byte characters, since edit lengths are byte
    /// counts.
    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-cé€ ]{0,4}", 0..6).prop_flat_map(|lines| {
            let joined = lines.join("\n");
            prop_oneof![Just(joined.clone()), Just(format!("{}\n", joined))]
        })
    }

    fn versions() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(text(), 1..6)
    }

    fn format() -> impl Strategy<Value = DiffFormat> {
        prop_oneof![Just(DiffFormat::Lines), Just(DiffFormat::Snapshot)]
    }

    /// Patches a committer would produce for `versions`, skipping no-ops.
    fn history(computer: &DiffComputer, versions: &[String]) -> Vec<Patch> {
        let mut synced: Option<&str> = None;
        let mut patches = Vec::new();
        for version in versions {
            if let Some(patch) = computer.compute(synced, version) {
                patches.push(patch);
                synced = Some(version);
            }
        }
        patches
    }

    fn index_of(pairs: &[(String, i64)]) -> RepoIndex {
        let mut index = RepoIndex::new("repo-p", "owner", 1);
        for (file, commit) in pairs {
            index.record(file, *commit);
        }
        index
    }

    fn pairs() -> impl Strategy<Value = Vec<(String, i64)>> {
        prop::collection::vec(("[a-d]\\.txt", 0i64..20), 0..12)
    }

    // ============================================================================
    // diff / replay
    // ============================================================================

    proptest! {
        /// Property: applying the diff between two versions yields the new one
        #[test]
        fn diff_then_apply_restores_new_content(old in text(), new in text(), format in format()) {
            let computer = DiffComputer::new(format);
            match computer.compute(Some(&old), &new) {
                None => prop_assert_eq!(&old, &new),
                Some(patch) => prop_assert_eq!(patch.apply(&old).unwrap(), new),
            }
        }

        /// Property: an edit script applied to content it was not computed
        /// from fails with an error instead of panicking, and applied to its
        /// own base it yields the new content
        #[test]
        fn apply_to_foreign_base_never_panics(old in text(), new in text(), other in text()) {
            let computer = DiffComputer::new(DiffFormat::Lines);
            if let Some(patch) = computer.compute(Some(&old), &new) {
                let result: Result<String, PatchError> = patch.apply(&other);
                if old == other {
                    prop_assert_eq!(result, Ok(new));
                }
            }
        }

        /// Property: replaying a whole history from empty content yields the
        /// last version
        #[test]
        fn replay_of_history_yields_last_version(versions in versions(), format in format()) {
            let computer = DiffComputer::new(format);
            let patches = history(&computer, &versions);
            let last = versions.last().cloned().unwrap_or_default();
            prop_assert_eq!(replay("", &patches).unwrap(), last);
        }

        /// Property: patches survive their stored encoding
        #[test]
        fn encoded_patches_replay_identically(versions in versions()) {
            let computer = DiffComputer::new(DiffFormat::Lines);
            let patches = history(&computer, &versions);
            let decoded: Vec<Patch> = patches
                .iter()
                .map(|p| Patch::decode(p.kind(), &p.encode().unwrap()).unwrap())
                .collect();
            prop_assert_eq!(replay("", &decoded).unwrap(), replay("", &patches).unwrap());
        }

        /// Property: reconstruction does not depend on the order records
        /// arrive in
        #[test]
        fn reconstruction_is_deterministic(versions in versions(), seed in any::<u64>()) {
            let computer = DiffComputer::new(DiffFormat::Lines);
            let mut records: Vec<CommitRecord> = history(&computer, &versions)
                .iter()
                .enumerate()
                .map(|(i, patch)| CommitRecord {
                    repo: "repo-p".to_string(),
                    commit_date: i as i64,
                    file: "f.txt".to_string(),
                    author: "a".to_string(),
                    diff: patch.encode().unwrap(),
                    kind: patch.kind(),
                    message: "m".to_string(),
                })
                .collect();

            let mut sorted = records.clone();
            sorted.sort_by(CommitRecord::replay_order);
            let expected = replay_records("f.txt", &sorted).unwrap();

            // Scramble deterministically from the seed, then sort again.
            let len = records.len().max(1);
            records.rotate_left((seed as usize) % len);
            if seed % 2 == 0 {
                records.reverse();
            }
            records.sort_by(CommitRecord::replay_order);
            prop_assert_eq!(replay_records("f.txt", &records).unwrap(), expected);
        }
    }

    // ============================================================================
    // RepoIndex merge
    // ============================================================================

    proptest! {
        /// Property: merging the same content again changes nothing
        #[test]
        fn merge_is_idempotent(pairs in pairs(), times in 1usize..5) {
            let once = index_of(&pairs);
            let mut many = index_of(&pairs);
            for _ in 0..times {
                many.merge(&once);
            }
            prop_assert_eq!(many, once);
        }

        /// Property: two writers' updates merge to the same index in either
        /// order
        #[test]
        fn merge_is_commutative(a in pairs(), b in pairs()) {
            let mut ab = index_of(&a);
            ab.merge(&index_of(&b));
            let mut ba = index_of(&b);
            ba.merge(&index_of(&a));
            prop_assert_eq!(ab, ba);
        }

        /// Property: any interleaving of single-pair updates converges
        #[test]
        fn interleavings_converge(pairs in pairs(), seed in any::<u64>()) {
            let expected = index_of(&pairs);
            let mut shuffled = pairs.clone();
            let len = shuffled.len().max(1);
            shuffled.rotate_right((seed as usize) % len);
            let mut merged = RepoIndex::new("repo-p", "owner", 1);
            for (file, commit) in &shuffled {
                merged.merge(&index_of(&[(file.clone(), *commit)]));
            }
            prop_assert_eq!(merged, expected);
        }
    }

    // ============================================================================
    // store naming
    // ============================================================================

    proptest! {
        /// Property: encoded names never contain path separators
        #[test]
        fn encoded_components_are_single_path_segments(input in ".*") {
            let encoded = encode_component(&input);
            prop_assert!(!encoded.contains('/'));
            prop_assert!(!encoded.contains('\\'));
            prop_assert!(!encoded.is_empty());
            prop_assert!(!encoded.starts_with('.'));
        }

        /// Property: distinct names never collide
        #[test]
        fn encoding_is_injective(a in ".{0,8}", b in ".{0,8}") {
            prop_assume!(a != b);
            prop_assert_ne!(encode_component(&a), encode_component(&b));
        }
    }
}
