use super::*;
use crate::testing::subrs_of;

fn calls(
    contents: &[&[u8]],
    text: &[u8],
    self_match: bool,
    accept: impl Fn(SubrId) -> bool,
) -> Vec<(SubrId, u32)> {
    let (corpus, subrs, span) = subrs_of(contents, text);
    let trie = MatchTrie::build(&corpus, &subrs);
    call_list(&trie, &corpus, &subrs, span, self_match, accept)
        .into_iter()
        .map(|c| (c.subr, c.offset))
        .collect()
}

#[test]
fn longest_first() {
    let contents: [&[u8]; 3] = [b"abc", b"cd", b"ab"];
    assert_eq!(
        calls(&contents, b"abcdab", false, |_| true),
        vec![(0, 0), (2, 4)]
    );
    // shorter ones fill in once the longest is refused
    assert_eq!(
        calls(&contents, b"abcdab", false, |id| id != 0),
        vec![(2, 0), (1, 2), (2, 4)]
    );
}

#[test]
fn leftmost_among_equal_lengths() {
    assert_eq!(
        calls(&[b"aa"], b"aaaaa", false, |_| true),
        vec![(0, 0), (0, 2)]
    );
}

#[test]
fn self_match() {
    let contents: [&[u8]; 2] = [b"abc", b"ab"];
    assert_eq!(calls(&contents, b"abc", false, |_| true), vec![(1, 0)]);
    assert_eq!(calls(&contents, b"abc", true, |_| true), vec![(0, 0)]);
}

#[test]
fn count_overlapping() {
    let (corpus, mut subrs, span) = subrs_of(&[b"aa", b"ab"], b"aaaab");
    let trie = MatchTrie::build(&corpus, &subrs);
    let other = span.start + 3..span.end;
    count_occurrences(
        &trie,
        &corpus,
        [span.clone(), other].into_iter(),
        &mut subrs,
    );
    assert_eq!(subrs[0].count, 3);
    assert_eq!(subrs[0].uses, 3);
    assert_eq!(subrs[1].count, 2);

    // counting again gives the same numbers
    count_occurrences(&trie, &corpus, [span].into_iter(), &mut subrs);
    assert_eq!(subrs[0].count, 3);
    assert_eq!(subrs[1].count, 1);
}

#[test]
fn well_formed() {
    let (_, subrs, _) = subrs_of(&[b"abc", b"ab"], b"");
    let c = |subr, offset| Call { subr, offset };
    assert!(is_well_formed(&[], &subrs, 0));
    assert!(is_well_formed(&[c(0, 0), c(1, 3)], &subrs, 5));
    assert!(is_well_formed(&[c(1, 1), c(0, 4)], &subrs, 8));
    assert!(!is_well_formed(&[c(0, 0), c(1, 2)], &subrs, 5));
    assert!(!is_well_formed(&[c(1, 3), c(0, 0)], &subrs, 5));
    assert!(!is_well_formed(&[c(0, 3)], &subrs, 5));
}
