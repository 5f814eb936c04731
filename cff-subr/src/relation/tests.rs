use super::*;
use crate::testing::subrs_of;

fn related(contents: &[&[u8]], uses: &[i64]) -> Vec<Subr> {
    let (corpus, mut subrs, _) = subrs_of(contents, b"");
    let trie = MatchTrie::build(&corpus, &subrs);
    build_relations(&trie, &corpus, &mut subrs);
    for (s, &n) in subrs.iter_mut().zip(uses) {
        s.count = n as u32;
        s.uses = n;
    }
    subrs
}

fn targets(links: &[Link]) -> Vec<(SubrId, u32)> {
    links.iter().map(|l| (l.subr, l.offset)).collect()
}

#[test]
fn links() {
    let subrs = related(&[b"abcdefgh", b"bcdefg", b"cde", b"xcdexcde"], &[]);
    assert_eq!(targets(&subrs[0].inferiors), vec![(1, 1)]);
    assert_eq!(targets(&subrs[1].inferiors), vec![(2, 1)]);
    assert_eq!(targets(&subrs[1].superiors), vec![(0, 1)]);
    // overlapped by a longer call in "abcdefgh"
    assert_eq!(targets(&subrs[2].superiors), vec![(1, 1), (3, 1), (3, 5)]);
    assert_eq!(targets(&subrs[3].inferiors), vec![(2, 1), (2, 5)]);
    assert!(subrs[3].superiors.is_empty());
}

#[test]
fn select_and_deselect() {
    let mut subrs = related(&[b"abcdef", b"cde"], &[3, 5]);
    select(&mut subrs, 1);
    assert!(subrs[1].is_selected());
    assert_eq!(subrs[1].collapsed, 4);
    assert_eq!(subrs[0].delta, -1);
    assert_eq!(subrs[0].body_len(), 5);

    select(&mut subrs, 0);
    assert_eq!(subrs[0].collapsed, 2);
    // copies inside the selected superior collapse into its body
    assert_eq!(subrs[1].uses, 3);

    deselect(&mut subrs, 0);
    assert_eq!(subrs[0].state, State::Rejected);
    assert_eq!(subrs[0].collapsed, 0);
    assert_eq!(subrs[1].uses, 5);

    deselect(&mut subrs, 1);
    assert_eq!(subrs[0].delta, 0);
    assert_eq!(subrs[1].collapsed, 0);
}

#[test]
fn propagate_through_unselected() {
    let mut subrs = related(&[b"abcdefgh", b"bcdefg", b"cde"], &[2, 3, 4]);
    select(&mut subrs, 2);
    assert_eq!(subrs[1].delta, -1);
    assert_eq!(subrs[0].delta, -1);
}

#[test]
fn propagate_stops_at_selected() {
    let mut subrs = related(&[b"abcdefgh", b"bcdefg", b"cde"], &[2, 3, 4]);
    select(&mut subrs, 1);
    assert_eq!(subrs[0].delta, -4);
    select(&mut subrs, 2);
    assert_eq!(subrs[1].delta, -1);
    assert_eq!(subrs[0].delta, -4);
    // the superior's call no longer counts copies of the inferior
    assert_eq!(subrs[2].uses, 2);
}

#[test]
fn one_delta_per_call_site() {
    let mut subrs = related(&[b"xcdexcde", b"cde"], &[2, 4]);
    select(&mut subrs, 1);
    assert_eq!(subrs[0].delta, -2);
    assert_eq!(subrs[0].body_len(), 6);
}

#[test]
fn reject_marks_state() {
    let mut subrs = related(&[b"abc"], &[2]);
    reject(&mut subrs, 0);
    assert_eq!(subrs[0].state, State::Rejected);
    assert!(!subrs[0].is_selected());
}
