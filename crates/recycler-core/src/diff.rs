//! Edit-script computation between two entry sequences.
//!
//! The engine matches entries across the two sequences with a longest common
//! subsequence under the comparator identity chain, then emits a script in
//! four phases ordered so that sequential replay against a copy of the old
//! sequence reconstructs the new one exactly: coalesced removals from the
//! tail down, moves of identity-matched leftovers (when requested),
//! coalesced insertions at final positions, then per-entry change hints.

use serde_json::Value;

use crate::comparator::ComparatorTable;
use crate::Entry;

/// One edit-script operation.
///
/// Indices refer to the intermediate sequence as the script is replayed in
/// order. `InsertRange` and `Changed` carry the entries themselves so a
/// script can be applied standalone; the consumer notification surface only
/// sees positions, counts and change payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    RemoveRange {
        position: usize,
        count: usize,
    },
    InsertRange {
        position: usize,
        items: Vec<Entry>,
    },
    /// Pop at `from`, reinsert at `to` into the already-shrunk sequence.
    Moved {
        from: usize,
        to: usize,
    },
    Changed {
        position: usize,
        item: Entry,
        payload: Option<Value>,
    },
}

const UNMATCHED: usize = usize::MAX;

fn items_same(table: &ComparatorTable, old: &Entry, new: &Entry) -> bool {
    if old.type_id != new.type_id {
        return false;
    }
    match table.get(new.type_id) {
        Some(comparator) => comparator.items_same(&old.value, &new.value),
        None => old.value == new.value,
    }
}

fn contents_same(table: &ComparatorTable, old: &Entry, new: &Entry) -> bool {
    match table.get(new.type_id) {
        Some(comparator) => comparator.contents_same(&old.value, &new.value),
        None => true,
    }
}

fn change_payload(table: &ComparatorTable, old: &Entry, new: &Entry) -> Option<Value> {
    table
        .get(new.type_id)
        .and_then(|comparator| comparator.change_payload(&old.value, &new.value))
}

/// Computes the edit script reconciling `old` into `new`.
///
/// Matching is strictly 1:1; when several candidates satisfy identity against
/// the same old entry, the earliest unmatched candidate wins. With
/// `detect_moves` unmatched old entries are paired with identity-equal
/// unmatched new entries and emitted as single `Moved` operations instead of
/// remove + insert pairs. Worst case O(old.len() * new.len()).
pub fn diff(
    old: &[Entry],
    new: &[Entry],
    table: &ComparatorTable,
    detect_moves: bool,
) -> Vec<DiffOp> {
    let n = old.len();
    let m = new.len();

    // lcs[i][j] = length of the longest common subsequence of old[i..] and
    // new[j..] under the identity chain.
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            let diagonal = if items_same(table, &old[i], &new[j]) {
                lcs[i + 1][j + 1] + 1
            } else {
                0
            };
            lcs[i][j] = diagonal.max(lcs[i + 1][j]).max(lcs[i][j + 1]);
        }
    }

    // Forward walk; ties resolve toward the earliest unmatched candidate.
    let mut old_match = vec![UNMATCHED; n];
    let mut new_match = vec![UNMATCHED; m];
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if items_same(table, &old[i], &new[j]) && lcs[i][j] == lcs[i + 1][j + 1] + 1 {
            old_match[i] = j;
            new_match[j] = i;
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    // Pair leftover removals with identity-equal leftover insertions; each
    // pair is one relocation instead of a remove + insert.
    let mut move_old = vec![UNMATCHED; n];
    let mut move_new = vec![UNMATCHED; m];
    if detect_moves {
        for oi in 0..n {
            if old_match[oi] != UNMATCHED {
                continue;
            }
            for nj in 0..m {
                if new_match[nj] != UNMATCHED || move_new[nj] != UNMATCHED {
                    continue;
                }
                if items_same(table, &old[oi], &new[nj]) {
                    move_old[oi] = nj;
                    move_new[nj] = oi;
                    break;
                }
            }
        }
    }

    let mut ops = Vec::new();

    // Phase 1: removals of entries with no counterpart, tail first so
    // positions in earlier runs stay valid, coalesced into contiguous runs.
    let mut run_end = n;
    let mut oi = n;
    while oi > 0 {
        oi -= 1;
        let kept = old_match[oi] != UNMATCHED || move_old[oi] != UNMATCHED;
        if kept {
            if run_end > oi + 1 {
                ops.push(DiffOp::RemoveRange {
                    position: oi + 1,
                    count: run_end - oi - 1,
                });
            }
            run_end = oi;
        }
    }
    if run_end > 0 {
        ops.push(DiffOp::RemoveRange {
            position: 0,
            count: run_end,
        });
    }

    // Phase 2: relocate move pairs within the surviving entries. The target
    // slot sits right after the last already-settled entry that must precede
    // the moved one; not-yet-relocated move sources are skipped since their
    // own relocation fixes their ordering later.
    if detect_moves {
        let mut current: Vec<usize> = (0..n)
            .filter(|&idx| old_match[idx] != UNMATCHED || move_old[idx] != UNMATCHED)
            .collect();
        let mut settled: Vec<bool> = (0..n).map(|idx| old_match[idx] != UNMATCHED).collect();
        let mut pending: Vec<usize> = (0..n).filter(|&idx| move_old[idx] != UNMATCHED).collect();
        pending.sort_by_key(|&idx| move_old[idx]);

        for &source in &pending {
            let Some(from) = current.iter().position(|&idx| idx == source) else {
                continue;
            };
            current.remove(from);
            let target = move_old[source];
            let mut to = 0usize;
            for (position, &other) in current.iter().enumerate() {
                if !settled[other] {
                    continue;
                }
                let other_target = if old_match[other] != UNMATCHED {
                    old_match[other]
                } else {
                    move_old[other]
                };
                if other_target < target {
                    to = position + 1;
                }
            }
            current.insert(to, source);
            settled[source] = true;
            if from != to {
                ops.push(DiffOp::Moved { from, to });
            }
        }
    }

    // Phase 3: insertions of entries new to the sequence, ascending, at their
    // final positions, coalesced into contiguous runs.
    let mut nj = 0usize;
    while nj < m {
        if new_match[nj] != UNMATCHED || move_new[nj] != UNMATCHED {
            nj += 1;
            continue;
        }
        let start = nj;
        while nj < m && new_match[nj] == UNMATCHED && move_new[nj] == UNMATCHED {
            nj += 1;
        }
        ops.push(DiffOp::InsertRange {
            position: start,
            items: new[start..nj].to_vec(),
        });
    }

    // Phase 4: change hints for matched and moved pairs whose contents
    // differ, ascending final positions.
    for nj in 0..m {
        let oi = if new_match[nj] != UNMATCHED {
            new_match[nj]
        } else if move_new[nj] != UNMATCHED {
            move_new[nj]
        } else {
            continue;
        };
        if !contents_same(table, &old[oi], &new[nj]) {
            ops.push(DiffOp::Changed {
                position: nj,
                item: new[nj].clone(),
                payload: change_payload(table, &old[oi], &new[nj]),
            });
        }
    }

    ops
}

/// Replays `script` against `seq`.
///
/// Applying the script produced by [`diff`] to a copy of the old sequence
/// yields the new sequence, provided the comparators derive a change payload
/// whenever identity-equal payloads differ (the structural-equality fallback
/// always does).
pub fn apply(script: &[DiffOp], seq: &mut Vec<Entry>) {
    for op in script {
        match op {
            DiffOp::RemoveRange { position, count } => {
                seq.drain(*position..position + count);
            }
            DiffOp::InsertRange { position, items } => {
                seq.splice(*position..*position, items.iter().cloned());
            }
            DiffOp::Moved { from, to } => {
                let entry = seq.remove(*from);
                seq.insert(*to, entry);
            }
            DiffOp::Changed { position, item, .. } => {
                seq[*position] = item.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{ComparatorTable, DiffComparator};
    use crate::registry::TypeId;
    use crate::Entry;
    use serde_json::{json, Value};

    fn entry(type_id: usize, value: &str) -> Entry {
        Entry::new(TypeId(type_id), json!(value))
    }

    fn seq(values: &[&str]) -> Vec<Entry> {
        values.iter().map(|v| entry(0, v)).collect()
    }

    #[test]
    fn identical_sequences_produce_empty_script() {
        let old = seq(&["a", "b", "c"]);
        let table = ComparatorTable::new();
        assert!(diff(&old, &old, &table, true).is_empty());
        assert!(diff(&old, &old, &table, false).is_empty());
    }

    #[test]
    fn both_empty_is_empty_script() {
        let table = ComparatorTable::new();
        assert!(diff(&[], &[], &table, true).is_empty());
    }

    #[test]
    fn full_insert_and_full_remove_are_single_runs() {
        let table = ComparatorTable::new();
        let items = seq(&["a", "b"]);

        let script = diff(&[], &items, &table, false);
        assert_eq!(
            script,
            vec![DiffOp::InsertRange {
                position: 0,
                items: items.clone(),
            }]
        );

        let script = diff(&items, &[], &table, false);
        assert_eq!(
            script,
            vec![DiffOp::RemoveRange {
                position: 0,
                count: 2,
            }]
        );
    }

    #[test]
    fn earliest_unmatched_candidate_wins() {
        let table = ComparatorTable::new();
        let old = seq(&["a"]);
        let new = seq(&["a", "a"]);
        // old[0] must match new[0]; the duplicate is appended after it.
        let script = diff(&old, &new, &table, false);
        assert_eq!(
            script,
            vec![DiffOp::InsertRange {
                position: 1,
                items: seq(&["a"]),
            }]
        );
    }

    #[test]
    fn single_relocation_is_one_move() {
        let table = ComparatorTable::new();
        let old = seq(&["a", "b", "c"]);
        let new = seq(&["b", "c", "a"]);
        let script = diff(&old, &new, &table, true);
        assert_eq!(script, vec![DiffOp::Moved { from: 0, to: 2 }]);

        let mut replayed = old.clone();
        apply(&script, &mut replayed);
        assert_eq!(replayed, new);
    }

    #[test]
    fn relocation_without_move_detection_is_remove_plus_insert() {
        let table = ComparatorTable::new();
        let old = seq(&["a", "b", "c"]);
        let new = seq(&["b", "c", "a"]);
        let script = diff(&old, &new, &table, false);
        assert_eq!(
            script,
            vec![
                DiffOp::RemoveRange {
                    position: 0,
                    count: 1,
                },
                DiffOp::InsertRange {
                    position: 2,
                    items: seq(&["a"]),
                },
            ]
        );
        let mut replayed = old.clone();
        apply(&script, &mut replayed);
        assert_eq!(replayed, new);
    }

    #[test]
    fn crossing_moves_replay_correctly() {
        let table = ComparatorTable::new();
        // Two entries swap across a stable backbone.
        let old = seq(&["m2", "a", "b", "m1"]);
        let new = seq(&["a", "m1", "b", "m2"]);
        let script = diff(&old, &new, &table, true);
        let moves = script
            .iter()
            .filter(|op| matches!(op, DiffOp::Moved { .. }))
            .count();
        assert_eq!(moves, 2);

        let mut replayed = old.clone();
        apply(&script, &mut replayed);
        assert_eq!(replayed, new);
    }

    #[test]
    fn differing_type_ids_never_match() {
        let table = ComparatorTable::new();
        let old = vec![entry(0, "x")];
        let new = vec![entry(1, "x")];
        let script = diff(&old, &new, &table, true);
        assert_eq!(
            script,
            vec![
                DiffOp::RemoveRange {
                    position: 0,
                    count: 1,
                },
                DiffOp::InsertRange {
                    position: 0,
                    items: new.clone(),
                },
            ]
        );
    }

    #[test]
    fn comparator_identity_with_change_payload() {
        struct ById;
        impl DiffComparator for ById {
            fn items_same(&self, old: &Value, new: &Value) -> bool {
                old["id"] == new["id"]
            }
            fn change_payload(&self, old: &Value, new: &Value) -> Option<Value> {
                (old["title"] != new["title"]).then(|| json!({ "title": new["title"] }))
            }
        }

        let mut table = ComparatorTable::new();
        table.insert(TypeId(0), std::rc::Rc::new(ById));

        let old = vec![Entry::new(TypeId(0), json!({ "id": 1, "title": "one" }))];
        let new = vec![Entry::new(TypeId(0), json!({ "id": 1, "title": "uno" }))];
        let script = diff(&old, &new, &table, true);
        assert_eq!(
            script,
            vec![DiffOp::Changed {
                position: 0,
                item: new[0].clone(),
                payload: Some(json!({ "title": "uno" })),
            }]
        );

        let mut replayed = old.clone();
        apply(&script, &mut replayed);
        assert_eq!(replayed, new);
    }

    #[test]
    fn replay_reconstructs_new_for_mixed_edits() {
        let table = ComparatorTable::new();
        let cases: &[(&[&str], &[&str])] = &[
            (&["a", "b", "c", "d"], &["c", "a", "d", "b"]),
            (&["a", "a", "b"], &["b", "a", "a"]),
            (&["a", "b", "c"], &["x", "b", "y", "c", "z"]),
            (&["a", "b", "c", "d", "e"], &["e", "d", "c", "b", "a"]),
            (&["a"], &["b"]),
            (&[], &["a", "b"]),
            (&["a", "b"], &[]),
        ];
        for (old_values, new_values) in cases {
            let old = seq(old_values);
            let new = seq(new_values);
            for detect_moves in [false, true] {
                let script = diff(&old, &new, &table, detect_moves);
                let mut replayed = old.clone();
                apply(&script, &mut replayed);
                assert_eq!(
                    replayed, new,
                    "replay mismatch for {old_values:?} -> {new_values:?} (detect_moves={detect_moves})"
                );
            }
        }
    }
}
