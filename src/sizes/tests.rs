use super::*;
use crate::{
    chain::{Context, CycloParams},
    collections::IndexSet,
    sdk::api::{decode, encode, ChainError, Platform},
};

/// smalls {0: 17, 1: 1009}, ctxt {2: 1013, 3: 1019, 4: 1021}.
fn test_context() -> Context {
    let cyclo = CycloParams::new(4, 2, 1).unwrap();
    let mut context = Context::new(cyclo, Platform::native()).unwrap();
    context.add_small_prime(17).unwrap();
    context.add_small_prime(1009).unwrap();
    context.add_ctxt_prime(1013).unwrap();
    context.add_ctxt_prime(1019).unwrap();
    context.add_ctxt_prime(1021).unwrap();
    context
}

fn test_table() -> ModuliSizes {
    ModuliSizes::init(&test_context()).unwrap()
}

fn set(indices: &[usize]) -> IndexSet {
    indices.iter().copied().collect()
}

#[test]
fn enumerates_subset_prefix_grid() {
    let context = test_context();
    let table = test_table();
    assert_eq!(table.len(), 16, "2^2 small subsets × 4 ctxt prefixes");

    // ascending, sizes match member logs, entries unique
    let entries = table.entries();
    for pair in entries.windows(2) {
        assert!(pair[0].size <= pair[1].size);
        assert_ne!(pair[0].set, pair[1].set);
    }
    for entry in entries {
        let expected = context.log_of_product(&entry.set).unwrap();
        assert!((entry.size - expected).abs() < 1e-9);
        // member sets are a small subset plus a ctxt prefix
        let smalls = entry.set.intersection(context.small_primes());
        let ctxts = entry.set.intersection(context.ctxt_primes());
        assert_eq!(entry.set, smalls.union(&ctxts));
        let prefix_len = ctxts.card();
        assert_eq!(ctxts, set(&(2..2 + prefix_len).collect::<Vec<_>>()));
    }
}

#[test]
fn init_without_small_primes() {
    let cyclo = CycloParams::new(4, 2, 1).unwrap();
    let mut context = Context::new(cyclo, Platform::native()).unwrap();
    context.add_ctxt_prime(1013).unwrap();
    let table = ModuliSizes::init(&context).unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.entries()[0].set.is_empty());
    assert_eq!(table.entries()[1].set, set(&[0]));
}

#[test]
fn in_range_query_returns_unique_match() {
    let table = test_table();
    // only the empty set and {17} fit below log(17) + 0.5
    let high = (17f64).ln() + 0.5;
    let chosen = table
        .get_set_for_size(0.0, high, &IndexSet::new(), false)
        .unwrap();
    assert_eq!(chosen, set(&[0]));
}

#[test]
fn in_range_ties_prefer_later_entries() {
    let table = test_table();
    // all entries cost 0 from the empty set: the largest in-window wins
    let chosen = table
        .get_set_for_size(0.0, 7.0, &IndexSet::new(), false)
        .unwrap();
    assert_eq!(chosen, set(&[2]));

    // {17, 1009} at 9.75 and {17, 1013} at 9.754 both cost 0 from {17}:
    // the later entry is kept
    let chosen = table.get_set_for_size(9.0, 10.0, &set(&[0]), false).unwrap();
    assert_eq!(chosen, set(&[0, 2]));
}

#[test]
fn in_range_query_minimizes_dropped_primes() {
    let table = test_table();
    // from {17, 1009}: keeping both beats the later, costlier {17, 1013}
    let chosen = table
        .get_set_for_size(9.0, 10.0, &set(&[0, 1]), false)
        .unwrap();
    assert_eq!(chosen, set(&[0, 1]));
}

#[test]
fn two_source_cost_sums_both_diffs() {
    let table = test_table();
    let chosen = table
        .get_set_for_size2(9.0, 10.0, &set(&[0]), &set(&[1]), false)
        .unwrap();
    assert_eq!(chosen, set(&[0, 1]));

    // tie on summed cost resolves to the later entry
    let chosen = table
        .get_set_for_size2(9.0, 10.0, &set(&[0]), &IndexSet::new(), false)
        .unwrap();
    assert_eq!(chosen, set(&[0, 2]));
}

#[test]
fn fallback_below_window_within_one_bit() {
    let table = test_table();
    // window above every entry: the largest table entry is within slack
    let chosen = table
        .get_set_for_size(31.0, 40.0, &IndexSet::new(), false)
        .unwrap();
    assert_eq!(chosen, set(&[0, 1, 2, 3, 4]));
}

#[test]
fn fallback_above_window_when_reversed() {
    let table = test_table();
    // empty window between the empty set and {17}
    let chosen = table
        .get_set_for_size(1.0, 1.0, &IndexSet::new(), true)
        .unwrap();
    assert_eq!(chosen, set(&[0]));
}

#[test]
fn no_feasible_set_when_slack_misses() {
    let table = test_table();
    // reverse looks above the window only; nothing lives there
    assert_eq!(
        table
            .get_set_for_size(31.0, 40.0, &IndexSet::new(), true)
            .err(),
        Some(ChainError::NoFeasibleSet)
    );
    // empty tables violate the query precondition
    assert_eq!(
        ModuliSizes::default()
            .get_set_for_size(0.0, 1.0, &IndexSet::new(), false)
            .err(),
        Some(ChainError::NoFeasibleSet)
    );
}

#[test]
fn query_cost_is_optimal_over_all_windows() {
    let context = test_context();
    let table = test_table();
    let froms = [set(&[]), set(&[0]), set(&[0, 1]), set(&[2, 4]), set(&[1, 3])];
    let entries = table.entries();
    for i in 0..entries.len() {
        for j in i..entries.len() {
            let (low, high) = (entries[i].size - 1e-9, entries[j].size + 1e-9);
            for from in &froms {
                let chosen = table.get_set_for_size(low, high, from, false).unwrap();
                let chosen_size = context.log_of_product(&chosen).unwrap();
                assert!(low <= chosen_size && chosen_size <= high);
                let min_cost = entries
                    .iter()
                    .filter(|e| low <= e.size && e.size <= high)
                    .map(|e| from.diff_card(&e.set))
                    .min()
                    .unwrap();
                assert_eq!(from.diff_card(&chosen), min_cost);
            }
        }
    }
}

#[test]
fn text_roundtrip() {
    let table = test_table();
    let mut buf = Vec::new();
    write_text(&mut buf, &table).unwrap();
    let restored = read_text(&mut buf.as_slice()).unwrap();
    assert_eq!(restored, table);
}

#[test]
fn binary_roundtrip() {
    let table = test_table();
    let mut buf = Vec::new();
    write_binary(&mut buf, &table).unwrap();
    let restored = read_binary(&mut buf.as_slice()).unwrap();
    assert_eq!(restored, table);
}

#[test]
fn malformed_text_rejected() {
    // missing opening bracket
    assert_eq!(
        read_text(&mut "3 [1.0 [0]]".as_bytes()).err(),
        Some(ChainError::MalformedStream)
    );
    // count exceeds available entries
    assert_eq!(
        read_text(&mut "[ 2 [1.0 [0]] ]".as_bytes()).err(),
        Some(ChainError::MalformedStream)
    );
    // unparseable size
    assert_eq!(
        read_text(&mut "[ 1 [abc [0]] ]".as_bytes()).err(),
        Some(ChainError::MalformedStream)
    );
    // truncated
    assert_eq!(
        read_text(&mut "[ 1 [1.0 [0]".as_bytes()).err(),
        Some(ChainError::MalformedStream)
    );
}

#[test]
fn truncated_binary_rejected() {
    let table = test_table();
    let mut buf = Vec::new();
    write_binary(&mut buf, &table).unwrap();
    let cut = buf.len() / 2;
    assert_eq!(
        read_binary(&mut &buf[..cut]).err(),
        Some(ChainError::MalformedStream)
    );
}

#[test]
fn versioned_encode_decode() {
    let table = test_table();
    let bytes = encode(&table).unwrap();
    let restored: ModuliSizes = decode(&bytes).unwrap();
    assert_eq!(restored, table);

    // version mismatch is rejected, not misparsed
    let mut tampered = bytes.clone();
    tampered[0] ^= 1;
    assert_eq!(decode::<ModuliSizes>(&tampered), None);
}
