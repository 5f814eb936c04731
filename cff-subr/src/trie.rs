//! Aho-Corasick automaton over the content of all candidate subroutines.

use std::{collections::VecDeque, ops::Range};

use log::debug;

use crate::{
    charstring::tokens,
    edge::{Edge, EdgeTable},
    subr::{Subr, SubrId},
};

type TrieNodeId = u32;

const ROOT: TrieNodeId = 0;

#[derive(Debug, Default)]
struct TrieNode {
    edges: EdgeTable,
    /// Byte length of the prefix this node spells.
    len: u32,
    /// Failure link: longest proper suffix that is also a prefix.
    fail: TrieNodeId,
    /// Next node on the failure chain that ends a subroutine.
    output: Option<TrieNodeId>,
    /// Subroutine whose content ends exactly here.
    subr: Option<SubrId>,
}

#[derive(Debug)]
pub(crate) struct MatchTrie {
    nodes: Vec<TrieNode>,
}

impl MatchTrie {
    pub fn build(corpus: &[u8], subrs: &[Subr]) -> Self {
        let mut nodes = vec![TrieNode::default()];
        for (id, subr) in subrs.iter().enumerate() {
            let span = subr.span();
            let mut cur = ROOT;
            for (pos, len) in tokens(&corpus[span.clone()]) {
                let label = span.start + pos;
                let token = &corpus[label..label + len];
                let found = nodes[cur as usize].edges.get(corpus, token).map(|e| e.child);
                cur = match found {
                    Some(child) => child,
                    None => {
                        let child = nodes.len() as TrieNodeId;
                        let node_len = nodes[cur as usize].len + len as u32;
                        nodes.push(TrieNode {
                            len: node_len,
                            ..Default::default()
                        });
                        nodes[cur as usize].edges.insert(
                            corpus,
                            Edge {
                                label: label as u32,
                                len: len as u16,
                                child,
                            },
                        );
                        child
                    }
                };
            }
            nodes[cur as usize].subr = Some(id as SubrId);
        }

        // Breadth first, so failure targets, being shallower, are complete.
        let mut queue = VecDeque::from([ROOT]);
        while let Some(u) = queue.pop_front() {
            let edges: Vec<Edge> = nodes[u as usize].edges.iter().copied().collect();
            for e in edges {
                let v = e.child;
                if u != ROOT {
                    let token = e.token(corpus);
                    let mut f = nodes[u as usize].fail;
                    let fail = loop {
                        if let Some(x) = nodes[f as usize].edges.get(corpus, token) {
                            break x.child;
                        }
                        if f == ROOT {
                            break ROOT;
                        }
                        f = nodes[f as usize].fail;
                    };
                    let target = &nodes[fail as usize];
                    let output = match target.subr {
                        Some(_) => Some(fail),
                        None => target.output,
                    };
                    let node = &mut nodes[v as usize];
                    node.fail = fail;
                    node.output = output;
                }
                queue.push_back(v);
            }
        }

        debug!("match trie: {} nodes", nodes.len());
        Self { nodes }
    }

    fn node(&self, id: TrieNodeId) -> &TrieNode {
        &self.nodes[id as usize]
    }

    /// Call `f(subr, offset)` for every subroutine occurring in
    /// `corpus[span]`, `offset` is relative to `span.start`. Matches are
    /// reported in order of their end offset.
    pub fn for_each_match(
        &self,
        corpus: &[u8],
        span: Range<usize>,
        mut f: impl FnMut(SubrId, usize),
    ) {
        let mut state = ROOT;
        for (pos, len) in tokens(&corpus[span.clone()]) {
            let label = span.start + pos;
            let token = &corpus[label..label + len];
            state = loop {
                if let Some(e) = self.node(state).edges.get(corpus, token) {
                    break e.child;
                }
                if state == ROOT {
                    break ROOT;
                }
                state = self.node(state).fail;
            };

            let end = pos + len;
            let mut out = match self.node(state).subr {
                Some(_) => Some(state),
                None => self.node(state).output,
            };
            while let Some(id) = out {
                let node = self.node(id);
                if let Some(subr) = node.subr {
                    f(subr, end - node.len as usize);
                }
                out = node.output;
            }
        }
    }
}
