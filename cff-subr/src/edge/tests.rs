use super::*;

/// Corpus of one-byte tokens `0..=255` followed by two-byte tokens.
fn corpus() -> Vec<u8> {
    let mut r: Vec<u8> = (0..=255).collect();
    r.extend_from_slice(&[250, 1, 250, 2, 12, 3]);
    r
}

fn edge(label: u32, len: u16, child: u32) -> Edge {
    Edge { label, len, child }
}

#[test]
fn empty() {
    let corpus = corpus();
    let table = EdgeTable::default();
    assert!(table.is_empty());
    assert_eq!(table.get(&corpus, &[1]), None);
    assert_eq!(table.iter().count(), 0);
}

#[test]
fn insert_get() {
    let corpus = corpus();
    let mut table = EdgeTable::default();
    table.insert(&corpus, edge(139, 1, 1));
    table.insert(&corpus, edge(256, 2, 2));
    table.insert(&corpus, edge(258, 2, 3));
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(&corpus, &[139]).map(|e| e.child), Some(1));
    assert_eq!(table.get(&corpus, &[250, 1]).map(|e| e.child), Some(2));
    assert_eq!(table.get(&corpus, &[250, 2]).map(|e| e.child), Some(3));
    assert_eq!(table.get(&corpus, &[250, 3]), None);
    assert_eq!(table.get(&corpus, &[250]), None);
}

#[test]
fn insert_replaces_same_token() {
    let corpus = corpus();
    let mut table = EdgeTable::default();
    table.insert(&corpus, edge(260, 2, 1));
    // a later occurrence of the same token
    let mut other = corpus.clone();
    other.extend_from_slice(&[12, 3]);
    table.insert(&other, edge(262, 2, 5));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(&other, &[12, 3]), Some(&edge(262, 2, 5)));
}

#[test]
fn get_mut() {
    let corpus = corpus();
    let mut table = EdgeTable::default();
    table.insert(&corpus, edge(21, 1, 1));
    table.get_mut(&corpus, &[21]).unwrap().child = 9;
    assert_eq!(table.get(&corpus, &[21]).map(|e| e.child), Some(9));
}

#[test]
fn grow_keeps_every_edge() {
    let corpus = corpus();
    let mut table = EdgeTable::default();
    for b in 0..=255u32 {
        table.insert(&corpus, edge(b, 1, b + 1));
    }
    assert_eq!(table.len(), 256);
    for b in 0..=255u8 {
        assert_eq!(
            table.get(&corpus, &[b]).map(|e| e.child),
            Some(b as u32 + 1)
        );
    }
    let mut children: Vec<u32> = table.iter().map(|e| e.child).collect();
    children.sort_unstable();
    assert_eq!(children, (1..=256).collect::<Vec<_>>());
}

#[test]
fn iteration_depends_on_insertion_only() {
    let corpus = corpus();
    let build = || {
        let mut table = EdgeTable::default();
        for b in [139u32, 21, 5, 200, 14] {
            table.insert(&corpus, edge(b, 1, b));
        }
        table.iter().copied().collect::<Vec<_>>()
    };
    assert_eq!(build(), build());
}
