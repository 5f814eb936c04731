use super::*;
use crate::{
    subr::Link,
    testing::{concat, path, Fixture},
};
use test_case::test_case;
use test_log::test;

#[test_case(Owner::Tag(3), false => Dest::Local(3))]
#[test_case(Owner::Tag(3), true => Dest::Global)]
#[test_case(Owner::Shared, false => Dest::Global)]
#[test_case(Owner::Shared, true => Dest::Global)]
fn dest_of(owner: Owner, combined: bool) -> Dest {
    Dest::of(owner, combined)
}

#[test]
fn interleave_ranks() {
    assert_eq!(interleave(&[5, 6, 7, 8, 9]), (vec![5, 7, 9], vec![6, 8]));
    assert_eq!(interleave(&[5]), (vec![5], vec![]));
    assert_eq!(interleave(&[]), (vec![], vec![]));
}

/// Subroutines of lengths 1, 2, .. each calling the previous one.
fn chain(n: u32) -> Vec<Subr> {
    (0..n)
        .map(|i| {
            let mut s = Subr::new(0, i + 1, 0, 3, Owner::Tag(0));
            s.state = State::Selected;
            if i > 0 {
                s.inferiors.push(Link {
                    subr: i - 1,
                    offset: 0,
                });
            }
            if i + 1 < n {
                s.superiors.push(Link {
                    subr: i + 1,
                    offset: 0,
                });
            }
            s
        })
        .collect()
}

#[test]
fn selects_profitable() {
    let p = path(1, 11);
    let g1 = concat(&[&p, &path(2, 5)]);
    let g2 = concat(&[&p, &path(3, 5)]);
    let mut f = Fixture::new(&[vec![g1, g2]], Format::Cff);
    let id = f.find(&p).unwrap();
    let stats = Selection::new(&mut f.subrs, Format::Cff, true, 65535)
        .run()
        .unwrap();
    assert_eq!(stats.selected, 1);
    assert_eq!(stats.depth_reductions, 0);
    assert_eq!(stats.truncated, 0);
    assert!(f.subrs[id as usize].is_selected());
}

#[test]
fn futile_never_selected() {
    let p = path(1, 11);
    let g1 = concat(&[&p, &path(2, 5)]);
    let g2 = concat(&[&p, &path(3, 5)]);
    let mut f = Fixture::new(&[vec![g1, g2]], Format::Cff);
    let id = f.find(&p).unwrap();
    f.subrs[id as usize].futile = true;
    let stats = Selection::new(&mut f.subrs, Format::Cff, true, 65535)
        .run()
        .unwrap();
    assert_eq!(stats.selected, 0);
    assert_eq!(f.subrs[id as usize].state, State::Rejected);
}

#[test]
fn unprofitable_rejected() {
    // a 6 byte body called twice: 2 * (6 - 2) - (2 + 6 + 1) < 0
    let p = path(1, 5);
    let g1 = concat(&[&p, &path(2, 5)]);
    let g2 = concat(&[&p, &path(3, 5)]);
    let mut f = Fixture::new(&[vec![g1, g2]], Format::Cff);
    Selection::new(&mut f.subrs, Format::Cff, true, 65535)
        .run()
        .unwrap();
    assert!(f.subrs.iter().all(|s| !s.is_selected()));
}

#[test]
fn shared_prefers_longer_with_inferior() {
    // "p q" twice and "p" alone twice more: both pay and nest
    let p = path(1, 11);
    let q = path(2, 11);
    let pq = concat(&[&p, &q]);
    let glyphs = vec![
        concat(&[&pq, &path(3, 3)]),
        concat(&[&pq, &path(4, 3)]),
        concat(&[&p, &path(5, 3)]),
        concat(&[&p, &path(6, 3)]),
    ];
    let mut f = Fixture::new(&[glyphs], Format::Cff);
    let (p_id, pq_id) = (f.find(&p).unwrap(), f.find(&pq).unwrap());
    Selection::new(&mut f.subrs, Format::Cff, true, 65535)
        .run()
        .unwrap();
    let (ps, pqs) = (&f.subrs[p_id as usize], &f.subrs[pq_id as usize]);
    assert!(ps.is_selected());
    assert!(pqs.is_selected());
    // the call to "p" inside "p q" shrank its body
    assert_eq!(pqs.body_len(), 24 - 12 + 2);
}

#[test]
fn depth_reduced() {
    let mut subrs = chain(12);
    let mut sel = Selection::new(&mut subrs, Format::Cff, false, 65535);
    sel.check_depth().unwrap();
    assert_eq!(sel.stats.depth_reductions, 2);
    let selected: Vec<_> = subrs.iter().map(|s| s.is_selected()).collect();
    assert_eq!(selected, [vec![true; 10], vec![false; 2]].concat());
}

#[test]
fn depth_within_limit() {
    let mut subrs = chain(10);
    let mut sel = Selection::new(&mut subrs, Format::Cff, false, 65535);
    sel.check_depth().unwrap();
    assert_eq!(sel.stats.depth_reductions, 0);
}

#[test]
fn inferior_not_shorter() {
    let mut subrs = chain(3);
    subrs[1].len = 1;
    let mut sel = Selection::new(&mut subrs, Format::Cff, false, 65535);
    assert!(matches!(sel.check_depth(), Err(Error::Internal(_))));
}

fn flat(n: u32) -> Vec<Subr> {
    (0..n)
        .map(|_| {
            let mut s = Subr::new(0, 10, 0, 3, Owner::Tag(0));
            s.state = State::Selected;
            s
        })
        .collect()
}

#[test]
fn tiers_by_rank() {
    let mut subrs = flat(300);
    let mut sel = Selection::new(&mut subrs, Format::Cff, false, 65535);
    assert!(sel.assign_tiers());
    assert!(!sel.assign_tiers());
    assert!(subrs[..215].iter().all(|s| s.index_size == 1));
    assert!(subrs[215..].iter().all(|s| s.index_size == 2));
}

#[test]
fn tiers_in_combined_pool() {
    // interleaved into two indices of 150
    let mut subrs = flat(300);
    let mut sel = Selection::new(&mut subrs, Format::Cff, true, 65535);
    assert!(!sel.assign_tiers());
    assert!(subrs.iter().all(|s| s.index_size == 1));
}

#[test]
fn unselected_get_worst_tier() {
    let mut subrs = flat(300);
    subrs[0].state = State::Rejected;
    let mut sel = Selection::new(&mut subrs, Format::Cff, false, 65535);
    sel.assign_tiers();
    assert_eq!(subrs[0].index_size, 2);
    assert_eq!(subrs[1].index_size, 1);
}

fn distinct_tails(n: u32) -> Fixture {
    let glyphs: Vec<_> = (0..n)
        .flat_map(|i| {
            let g = concat(&[&path(20 + i, 11), &[14]]);
            [g.clone(), g]
        })
        .collect();
    Fixture::new(&[glyphs], Format::Cff)
}

#[test]
fn truncate_over_budget() {
    let mut f = distinct_tails(6);
    assert_eq!(f.subrs.len(), 6);
    // combined, two indices of 2
    let stats = Selection::new(&mut f.subrs, Format::Cff, true, 2)
        .run()
        .unwrap();
    assert_eq!(stats.selected, 4);
    assert_eq!(stats.truncated, 2);
}

#[test]
fn within_budget() {
    let mut f = distinct_tails(6);
    let stats = Selection::new(&mut f.subrs, Format::Cff, true, 3)
        .run()
        .unwrap();
    assert_eq!(stats.selected, 6);
    assert_eq!(stats.truncated, 0);
}

#[test]
fn rerun_is_stable() {
    // more subroutines than fit one byte operands
    let mut f = distinct_tails(300);
    let snapshot = |subrs: &[Subr]| -> Vec<(State, u8)> {
        subrs.iter().map(|s| (s.state, s.index_size)).collect()
    };
    let first = Selection::new(&mut f.subrs, Format::Cff, false, 65535)
        .run()
        .unwrap();
    assert!(first.selected > 215);
    assert!(f
        .subrs
        .iter()
        .any(|s| s.is_selected() && s.index_size == 2));
    let before = snapshot(&f.subrs);
    {
        let mut sel = Selection::new(&mut f.subrs, Format::Cff, false, 65535);
        assert!(!sel.assign_tiers());
    }
    assert_eq!(snapshot(&f.subrs), before);

    let second = Selection::new(&mut f.subrs, Format::Cff, false, 65535)
        .run()
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(snapshot(&f.subrs), before);
}

#[test]
fn local_sets() {
    let p = path(1, 11);
    let q = path(2, 11);
    let font1 = vec![concat(&[&p, &path(3, 3)]), path(9, 4)];
    let font2 = vec![concat(&[&p, &path(5, 3)]), path(10, 4)];
    let font3 = vec![concat(&[&q, &path(7, 3)]), concat(&[&q, &path(8, 3)])];
    let mut f = Fixture::new(&[font1, font2, font3], Format::Cff);
    let p_id = f.find(&p).unwrap();
    let q_id = f.find(&q).unwrap();
    assert_eq!(f.subrs[p_id as usize].owner, Owner::Shared);
    assert_eq!(f.subrs[q_id as usize].owner, Owner::Tag(2));
    Selection::new(&mut f.subrs, Format::Cff, false, 65535)
        .run()
        .unwrap();
    assert!(f.subrs[p_id as usize].is_selected());
    assert!(f.subrs[q_id as usize].is_selected());
}
