//! Single-region text diff
//!
//! Classifies the change between two text snapshots as one insert, delete or
//! replace. Multi-point edits are never decomposed: everything between the
//! common prefix and the common suffix is reported as a single region.

use crate::types::EditOp;

/// Compute the single-region edit turning `old_text` into `new_text`.
///
/// Indices are char offsets into `old_text`. `end` is always
/// `start + deleted_len`, so an insert has `start == end`.
///
/// Returns `None` when both texts are identical.
pub fn diff(old_text: &str, new_text: &str) -> Option<EditOp> {
    if old_text == new_text {
        return None;
    }

    let old: Vec<char> = old_text.chars().collect();
    let new: Vec<char> = new_text.chars().collect();
    let min_len = old.len().min(new.len());

    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // Suffix is bounded so it never overlaps the prefix
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(min_len - prefix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid: String = old[prefix..old.len() - suffix].iter().collect();
    let new_mid: String = new[prefix..new.len() - suffix].iter().collect();
    let old_mid_len = old.len() - suffix - prefix;
    let new_mid_len = new.len() - suffix - prefix;

    let start = prefix;
    let end = prefix + old_mid_len;

    let op = match (old_mid_len, new_mid_len) {
        (0, n) => EditOp::Insert {
            start,
            end,
            n_chars: n,
            text: new_mid,
        },
        (n, 0) => EditOp::Delete {
            start,
            end,
            n_chars: n,
            text: old_mid,
        },
        (del, ins) => EditOp::Replace {
            start,
            end,
            n_chars_del: del,
            n_chars_ins: ins,
            del_text: old_mid,
            ins_text: new_mid,
        },
    };

    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_append_is_insert() {
        let op = diff("hello", "hello world").unwrap();
        assert_eq!(
            op,
            EditOp::Insert {
                start: 5,
                end: 5,
                n_chars: 6,
                text: " world".to_string(),
            }
        );
    }

    #[test]
    fn test_truncate_is_delete() {
        let op = diff("hello world", "hello").unwrap();
        assert_eq!(
            op,
            EditOp::Delete {
                start: 5,
                end: 11,
                n_chars: 6,
                text: " world".to_string(),
            }
        );
    }

    #[test]
    fn test_single_char_substitution_is_replace() {
        let op = diff("cat", "cot").unwrap();
        assert_eq!(
            op,
            EditOp::Replace {
                start: 1,
                end: 2,
                n_chars_del: 1,
                n_chars_ins: 1,
                del_text: "a".to_string(),
                ins_text: "o".to_string(),
            }
        );
    }

    #[test]
    fn test_identical_text_is_none() {
        assert!(diff("same", "same").is_none());
        assert!(diff("", "").is_none());
    }

    #[test]
    fn test_empty_old_text() {
        let op = diff("", "abc").unwrap();
        assert_eq!(op.start(), 0);
        assert_eq!(op.end(), 0);
        assert_eq!(op.inserted_text(), Some("abc"));
    }

    #[test]
    fn test_clear_all_text() {
        let op = diff("abc", "").unwrap();
        assert_eq!(op.start(), 0);
        assert_eq!(op.end(), 3);
        assert_eq!(op.deleted_text(), Some("abc"));
    }

    #[test]
    fn test_repeated_chars_prefix_and_suffix_do_not_overlap() {
        // "aa" -> "aaa": prefix would match 2 and suffix 2 without the bound
        let op = diff("aa", "aaa").unwrap();
        assert_eq!(
            op,
            EditOp::Insert {
                start: 2,
                end: 2,
                n_chars: 1,
                text: "a".to_string(),
            }
        );

        let op = diff("aaa", "aa").unwrap();
        assert_eq!(op.start(), 2);
        assert_eq!(op.end(), 3);
    }

    #[test]
    fn test_multi_point_edit_collapses_to_one_replace() {
        // Two separate edits become one region spanning both
        let op = diff("abcdef", "Xbcdeg").unwrap();
        assert_eq!(
            op,
            EditOp::Replace {
                start: 0,
                end: 6,
                n_chars_del: 6,
                n_chars_ins: 6,
                del_text: "abcdef".to_string(),
                ins_text: "Xbcdeg".to_string(),
            }
        );
    }

    #[test]
    fn test_indices_are_char_offsets() {
        let op = diff("héllo", "héllo!").unwrap();
        assert_eq!(op.start(), 5);
        assert_eq!(op.inserted_text(), Some("!"));

        let op = diff("日本語", "日本人語").unwrap();
        assert_eq!(op.start(), 2);
        assert_eq!(op.inserted_text(), Some("人"));
    }

    #[test]
    fn test_apply_reconstructs_new_text() {
        let pairs = [
            ("", ""),
            ("", "x"),
            ("x", ""),
            ("hello", "hello world"),
            ("hello world", "hello"),
            ("cat", "cot"),
            ("abcabc", "abc"),
            ("abc", "abcabc"),
            ("the quick fox", "the slow fox"),
            ("mississippi", "missippi"),
            ("aaaa", "aa"),
            ("ab", "ba"),
            ("naïve café", "naive cafe"),
            ("line one\nline two", "line one\nline 2\nline three"),
        ];

        for (old, new) in pairs {
            match diff(old, new) {
                Some(op) => assert_eq!(op.apply(old), new, "diff({old:?}, {new:?})"),
                None => assert_eq!(old, new),
            }
        }
    }

    /// Every string of up to `max_len` chars over `alphabet`
    fn all_strings(alphabet: &[char], max_len: usize) -> Vec<String> {
        let mut out = vec![String::new()];
        let mut frontier = vec![String::new()];
        for _ in 0..max_len {
            frontier = frontier
                .iter()
                .flat_map(|s| {
                    alphabet.iter().map(move |c| {
                        let mut next = s.clone();
                        next.push(*c);
                        next
                    })
                })
                .collect();
            out.extend(frontier.iter().cloned());
        }
        out
    }

    #[test]
    fn test_exhaustive_short_pairs() {
        // 'é' is two bytes, so byte and char offsets diverge
        let strings = all_strings(&['a', 'b', 'é'], 4);
        assert_eq!(strings.len(), 1 + 3 + 9 + 27 + 81);

        for old in &strings {
            for new in &strings {
                let Some(op) = diff(old, new) else {
                    assert_eq!(old, new);
                    continue;
                };
                assert_ne!(old, new);
                assert_eq!(op.apply(old), *new, "diff({old:?}, {new:?})");

                let old_len = old.chars().count();
                let new_len = new.chars().count();
                let deleted = op.deleted_text().map_or(0, |t| t.chars().count());
                let inserted = op.inserted_text().map_or(0, |t| t.chars().count());

                assert_eq!(op.end(), op.start() + deleted);
                assert_eq!(new_len, old_len - deleted + inserted);
                assert!(deleted > 0 || inserted > 0);
                // Prefix and suffix never overlap
                assert!(op.start() + (old_len - op.end()) <= old_len.min(new_len));
            }
        }
    }

    #[test]
    fn test_prefix_suffix_bound_holds() {
        let pairs = [("abab", "ab"), ("ab", "abab"), ("xyzxyz", "xyz"), ("aaa", "a")];

        for (old, new) in pairs {
            let op = diff(old, new).unwrap();
            let old_len = old.chars().count();
            let new_len = new.chars().count();
            let suffix = old_len - op.end();
            assert!(op.start() + suffix <= old_len.min(new_len));
        }
    }
}
