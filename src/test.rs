use rstest::rstest;

use crate::node::{NodeRef, NodeType, SPAN_BYTES};
use crate::Judy;

fn root_kind(judy: &Judy) -> Option<NodeType> {
    judy.root().map(NodeRef::kind)
}

fn key_at(judy: &Judy) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let len = judy.key(&mut buf);
    buf[..len].to_vec()
}

/// Walk the whole array front to back as (key, cell) pairs.
fn dump(judy: &mut Judy) -> Vec<(Vec<u8>, u64)> {
    let mut entries = Vec::new();
    let mut cell = judy.strt(b"").map(|cell| *cell);
    while let Some(value) = cell {
        entries.push((key_at(judy), value));
        cell = judy.nxt().map(|cell| *cell);
    }
    entries
}

#[test]
fn counts_duplicates_in_lexicographic_order() {
    let mut judy = Judy::open(16).unwrap();
    for word in [&b"b"[..], b"a", b"b", b"c", b"a", b"b"] {
        *judy.cell(word).unwrap() += 1;
    }
    assert_eq!(
        dump(&mut judy),
        vec![
            (b"a".to_vec(), 2),
            (b"b".to_vec(), 3),
            (b"c".to_vec(), 1),
        ]
    );
}

#[test]
fn round_trips_cell_values() {
    let mut judy = Judy::open(32).unwrap();
    *judy.cell(b"carrier").unwrap() = 0x1234_5678_9abc_def0;
    assert_eq!(
        judy.slot(b"carrier").map(|cell| *cell),
        Some(0x1234_5678_9abc_def0)
    );
    assert_eq!(key_at(&judy), b"carrier");
    assert!(judy.slot(b"carrie").is_none());
    assert!(judy.slot(b"carriers").is_none());
}

#[test]
fn repeated_insert_returns_the_same_cell() {
    let mut judy = Judy::open(16).unwrap();
    *judy.cell(b"once").unwrap() = 7;
    // a second insert locates the existing cell instead of making one
    let cell = judy.cell(b"once").unwrap();
    assert_eq!(*cell, 7);
    *cell = 9;
    assert_eq!(judy.slot(b"once").map(|cell| *cell), Some(9));
}

#[rstest]
#[case(1, NodeType::Span)]
#[case(2, NodeType::Lin2)]
#[case(3, NodeType::Lin4)]
#[case(5, NodeType::Lin8)]
#[case(9, NodeType::Lin16)]
#[case(17, NodeType::Lin32)]
#[case(33, NodeType::Radix)]
fn root_class_follows_population(#[case] count: usize, #[case] expected: NodeType) {
    let mut judy = Judy::open(16).unwrap();
    for idx in 0..count {
        *judy.cell(format!("k{idx:02}").as_bytes()).unwrap() = idx as u64 + 1;
    }
    assert_eq!(root_kind(&judy), Some(expected));
}

#[test]
fn every_key_survives_the_radix_split() {
    let mut judy = Judy::open(16).unwrap();
    for idx in 0..33u64 {
        *judy.cell(format!("k{idx:02}").as_bytes()).unwrap() = idx + 1;
    }
    assert_eq!(root_kind(&judy), Some(NodeType::Radix));
    for idx in 0..33u64 {
        let key = format!("k{idx:02}");
        assert_eq!(
            judy.slot(key.as_bytes()).map(|cell| *cell),
            Some(idx + 1),
            "lost {key}"
        );
    }
    let expected: Vec<_> = (0..33u64)
        .map(|idx| (format!("k{idx:02}").into_bytes(), idx + 1))
        .collect();
    assert_eq!(dump(&mut judy), expected);
}

#[test]
fn long_tails_compress_into_spans() {
    let key = b"alpha/beta/gamma/long_tail_of_bytes";
    let mut judy = Judy::open(64).unwrap();
    *judy.cell(key).unwrap() = 7;

    // 35 bytes of tail occupy exactly two chained span nodes
    let root = judy.root().unwrap();
    assert_eq!(root.kind(), NodeType::Span);
    let child = NodeRef::from_raw(judy.arena.word(root.addr() + SPAN_BYTES as u64)).unwrap();
    assert_eq!(child.kind(), NodeType::Span);
    assert_eq!(judy.arena.word(child.addr() + SPAN_BYTES as u64), 7);

    assert_eq!(judy.slot(key).map(|cell| *cell), Some(7));
    assert_eq!(key_at(&judy), key);
}

#[test]
fn diverging_key_splits_the_span() {
    let long = &b"alpha/beta/gamma/long_tail_of_bytes"[..];
    let mut judy = Judy::open(64).unwrap();
    *judy.cell(long).unwrap() = 1;
    *judy.cell(b"alpha/beta/zzz").unwrap() = 2;

    // the shared span burst into single-entry nodes
    assert_eq!(root_kind(&judy), Some(NodeType::Lin1));
    assert_eq!(judy.slot(long).map(|cell| *cell), Some(1));
    assert_eq!(judy.slot(b"alpha/beta/zzz").map(|cell| *cell), Some(2));
    assert_eq!(key_at(&judy), b"alpha/beta/zzz");
    assert_eq!(
        dump(&mut judy),
        vec![(long.to_vec(), 1), (b"alpha/beta/zzz".to_vec(), 2)]
    );
}

#[test]
fn delete_hands_back_the_predecessor() {
    let mut judy = Judy::open(8).unwrap();
    for (value, key) in [b"a", b"b", b"c"].iter().enumerate() {
        *judy.cell(*key).unwrap() = value as u64 + 1;
    }
    judy.slot(b"b").unwrap();
    assert_eq!(judy.del().map(|cell| *cell), Some(1));
    assert_eq!(key_at(&judy), b"a");
    assert_eq!(judy.nxt().map(|cell| *cell), Some(3));
    assert!(judy.slot(b"b").is_none());
    // the ceiling of the deleted key is now its successor
    assert_eq!(judy.strt(b"b").map(|cell| *cell), Some(3));
}

#[test]
fn single_byte_keys_walk_the_whole_radix() {
    let mut judy = Judy::open(8).unwrap();
    for byte in 0..=255u8 {
        *judy.cell(&[byte]).unwrap() = u64::from(byte) + 1;
    }
    assert_eq!(root_kind(&judy), Some(NodeType::Radix));

    // the zero key lives in inner slot 0 of outer slot 0
    assert_eq!(judy.strt(&[0]).map(|cell| *cell), Some(1));
    // and reconstructs as the empty string, zero bytes terminate
    assert_eq!(key_at(&judy), b"");

    for byte in 1..=255u64 {
        assert_eq!(judy.nxt().map(|cell| *cell), Some(byte + 1));
        assert_eq!(key_at(&judy), [byte as u8]);
    }
    assert!(judy.nxt().is_none());

    // walking backwards visits the same cells
    assert_eq!(judy.end().map(|cell| *cell), Some(256));
    for byte in (1..=255u64).rev() {
        assert_eq!(judy.prv().map(|cell| *cell), Some(byte));
    }
    assert!(judy.prv().is_none());
}

#[test]
fn deleted_radix_terminator_reads_as_missing() {
    let mut judy = Judy::open(8).unwrap();
    for byte in 0..=255u8 {
        *judy.cell(&[byte]).unwrap() = u64::from(byte) + 1;
    }
    judy.strt(&[0]).unwrap();
    // the zero key is first, so deleting it yields no predecessor
    assert!(judy.del().is_none());
    assert!(judy.slot(&[0]).is_none());
    assert_eq!(judy.strt(&[0]).map(|cell| *cell), Some(2));
}

#[test]
fn empty_key_is_a_valid_entry() {
    let mut judy = Judy::open(8).unwrap();
    *judy.cell(b"").unwrap() = 9;
    assert_eq!(judy.slot(b"").map(|cell| *cell), Some(9));
    *judy.cell(b"x").unwrap() = 1;
    assert_eq!(
        dump(&mut judy),
        vec![(b"".to_vec(), 9), (b"x".to_vec(), 1)]
    );
}

#[test]
fn deleting_every_entry_empties_the_root() {
    let mut judy = Judy::open(16).unwrap();
    for idx in 0..33u64 {
        *judy.cell(format!("k{idx:02}").as_bytes()).unwrap() = idx + 1;
    }
    assert!(judy.end().is_some());
    let mut deletes = 1;
    while judy.del().is_some() {
        deletes += 1;
    }
    assert_eq!(deletes, 33);
    assert_eq!(judy.arena.word(judy.root), 0);
    assert!(judy.strt(b"").is_none());
    assert!(judy.end().is_none());
}

#[test]
fn mixed_keys_enumerate_sorted_both_ways() {
    let mut keys: Vec<Vec<u8>> = (0..300u32)
        .map(|idx| format!("{:07x}/{idx}", idx.wrapping_mul(0x9e37_79b9) >> 4).into_bytes())
        .collect();
    keys.push(b"pre".to_vec());
    keys.push(b"prefix".to_vec());
    keys.push(b"prefixes".to_vec());

    let mut judy = Judy::open(32).unwrap();
    for (value, key) in keys.iter().enumerate() {
        *judy.cell(key).unwrap() = value as u64 + 1;
    }

    let mut expected: Vec<(Vec<u8>, u64)> = keys
        .iter()
        .enumerate()
        .map(|(value, key)| (key.clone(), value as u64 + 1))
        .collect();
    expected.sort();
    assert_eq!(dump(&mut judy), expected);

    // backwards over end/prv
    let mut reversed = Vec::new();
    let mut cell = judy.end().map(|cell| *cell);
    while let Some(value) = cell {
        reversed.push((key_at(&judy), value));
        cell = judy.prv().map(|cell| *cell);
    }
    reversed.reverse();
    assert_eq!(reversed, expected);

    // ceiling lands on the entry itself or the next one
    for probe in [&b"0"[..], b"8", b"pre", b"prefi", b"zzz"] {
        let found = judy.strt(probe).map(|cell| *cell);
        let want = expected
            .iter()
            .find(|(key, _)| key.as_slice() >= probe)
            .map(|(_, value)| *value);
        assert_eq!(found, want, "ceiling of {probe:?}");
    }
}

#[test]
fn deleting_half_keeps_the_rest_intact() {
    let keys: Vec<Vec<u8>> = (0..120u32)
        .map(|idx| format!("node-{:05}", idx * 37 % 1000).into_bytes())
        .collect();
    let mut judy = Judy::open(32).unwrap();
    for key in &keys {
        *judy.cell(key).unwrap() = u64::from(crc(key));
    }
    for key in keys.iter().step_by(2) {
        judy.slot(key).unwrap();
        judy.del();
    }
    for (idx, key) in keys.iter().enumerate() {
        let found = judy.slot(key).map(|cell| *cell);
        if idx % 2 == 0 {
            assert_eq!(found, None, "still present: {key:?}");
        } else {
            assert_eq!(found, Some(u64::from(crc(key))), "lost: {key:?}");
        }
    }
}

// cheap deterministic non-zero value per key
fn crc(key: &[u8]) -> u32 {
    key.iter().fold(0xffff_ffff, |acc: u32, byte| {
        (acc.rotate_left(5) ^ u32::from(*byte)) | 1
    })
}

#[test]
fn view_reads_share_the_node_graph() {
    let mut judy = Judy::open(8).unwrap();
    for (value, key) in [b"a", b"b", b"c"].iter().enumerate() {
        *judy.cell(*key).unwrap() = value as u64 + 1;
    }
    judy.slot(b"a").unwrap();

    let mut view = judy.view();
    // the view picks up the owner's cursor position
    assert_eq!(view.nxt(), Some(2));
    let mut buf = [0u8; 8];
    assert_eq!(view.key(&mut buf), 1);
    assert_eq!(&buf[..1], b"b");
    assert_eq!(view.slot(b"c"), Some(3));
    assert_eq!(view.strt(b"b"), Some(2));
    assert_eq!(view.end(), Some(3));
    assert_eq!(view.prv(), Some(2));

    // and the owner's own cursor is untouched by the view's walking
    assert_eq!(judy.nxt().map(|cell| *cell), Some(2));
}

#[test]
fn keys_longer_than_declared_still_resolve() {
    // keys past the declared maximum are not rejected, the cursor depth
    // saturates instead
    let mut judy = Judy::open(4).unwrap();
    let first = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let second = b"abcdefghijklmnopqrstuvwxyz9876543210";
    *judy.cell(first).unwrap() = 1;
    *judy.cell(second).unwrap() = 2;
    assert_eq!(judy.slot(first).map(|cell| *cell), Some(1));
    assert_eq!(judy.slot(second).map(|cell| *cell), Some(2));
}

#[test]
fn auxiliary_data_is_zeroed_and_writable() {
    let mut judy = Judy::open(8).unwrap();
    let data = judy.data(100).unwrap();
    assert!(judy.data_bytes(data).iter().all(|byte| *byte == 0));
    judy.data_bytes_mut(data)[99] = 0xaa;
    assert_eq!(judy.data_bytes(data)[99], 0xaa);
    assert!(judy.memory() >= 64 * 1024);
}
