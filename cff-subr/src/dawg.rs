//! Online suffix automaton (DAWG) over charstring tokens.
//!
//! One automaton is shared by every font of the set, each font's corpus is
//! added as a separate string starting from the root. Edges are labeled by
//! single tokens, a node's `len` is the byte length of the longest string
//! reaching it. An edge is *solid* when it extends that longest string,
//! i.e. `len(parent) + label len == len(child)`; solid edges form a spanning
//! tree of the automaton.

use std::cmp::Reverse;

use log::debug;

use crate::{
    charstring::{tokens, SEPARATOR_LEN},
    corpus::Corpus,
    edge::{Edge, EdgeTable},
};

pub(crate) type NodeId = u32;

pub(crate) const ROOT: NodeId = 0;

/// Which sub-font's glyphs contain the strings of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Owner {
    Unset,
    Tag(u16),
    /// Reachable from more than one tag.
    Shared,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub len: u32,
    /// Corpus offset where one occurrence of the longest string ends.
    pub end: u32,
    /// Suffix link, root has none.
    pub link: Option<NodeId>,
    pub edges: EdgeTable,
    pub owner: Owner,
    /// Number of corpus positions whose suffix passes this node, saturated.
    pub paths: u16,
}

impl Node {
    fn new(len: u32, end: u32, owner: Owner) -> Self {
        Self {
            len,
            end,
            link: None,
            edges: EdgeTable::default(),
            owner,
            paths: 0,
        }
    }
}

pub(crate) struct Dawg {
    nodes: Vec<Node>,
    last: NodeId,
    /// Owner tags are only tracked if the set has more than one tag.
    track_owner: bool,
}

impl Dawg {
    pub fn new(track_owner: bool) -> Self {
        Self {
            nodes: vec![Node::new(0, 0, Owner::Shared)],
            last: ROOT,
            track_owner,
        }
    }

    /// Automaton of the whole corpus, one string per font, paths counted.
    pub fn build(corpus: &Corpus) -> Self {
        let mut r = Self::new(corpus.tags.len() > 1);
        for font in &corpus.fonts {
            r.start();
            for g in &corpus.glyphs[font.glyphs.clone()] {
                let span = g.start as usize..g.end as usize + SEPARATOR_LEN;
                for (pos, len) in tokens(&corpus.data[span.clone()]) {
                    r.extend(&corpus.data, (span.start + pos) as u32, len as u16, g.tag);
                }
            }
        }
        r.count_paths();
        debug!("automaton: {} nodes", r.len());
        r
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    pub fn is_solid(&self, parent: NodeId, edge: &Edge) -> bool {
        self.node(parent).len + edge.len as u32 == self.node(edge.child).len
    }

    /// Start a new string, the next `extend()` appends to the empty string.
    pub fn start(&mut self) {
        self.last = ROOT;
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn new_owner(&self, tag: u16) -> Owner {
        if self.track_owner {
            Owner::Unset
        } else {
            Owner::Tag(tag)
        }
    }

    /// Append the token at `corpus[pos..pos + len]`, which belongs to a
    /// glyph tagged `tag`.
    pub fn extend(&mut self, corpus: &[u8], pos: u32, len: u16, tag: u16) {
        let token = &corpus[pos as usize..pos as usize + len as usize];
        let edge_len = len as u32;
        let last = self.last;

        // The token continues a string already in the automaton, which
        // happens when a later font repeats an earlier one.
        if let Some(e) = self.node(last).edges.get(corpus, token) {
            let q = e.child;
            let r = if self.node(last).len + edge_len == self.node(q).len {
                q
            } else {
                self.split(corpus, last, q, token)
            };
            self.last = r;
            self.mark_owner(r, tag);
            return;
        }

        let cur = self.push(Node::new(
            self.node(last).len + edge_len,
            pos + edge_len,
            self.new_owner(tag),
        ));
        let mut p = Some(last);
        while let Some(id) = p {
            let node = self.node_mut(id);
            if node.edges.get(corpus, token).is_some() {
                break;
            }
            node.edges.insert(
                corpus,
                Edge {
                    label: pos,
                    len,
                    child: cur,
                },
            );
            p = node.link;
        }

        let link = match p {
            None => ROOT,
            Some(id) => {
                let q = self.child(corpus, id, token);
                if self.node(id).len + edge_len == self.node(q).len {
                    q
                } else {
                    self.split(corpus, id, q, token)
                }
            }
        };
        self.node_mut(cur).link = Some(link);
        self.last = cur;
        self.mark_owner(cur, tag);
    }

    fn child(&self, corpus: &[u8], id: NodeId, token: &[u8]) -> NodeId {
        self.node(id)
            .edges
            .get(corpus, token)
            .map_or(ROOT, |e| e.child)
    }

    /// Split `q`, reached from `p` by a secondary edge labeled `token`: the
    /// strings of `q` not longer than `len(p) + token` move to a new node,
    /// and every edge on `p`'s suffix path that led to `q` is redirected to it.
    fn split(&mut self, corpus: &[u8], p: NodeId, q: NodeId, token: &[u8]) -> NodeId {
        let qn = self.node(q);
        let clone = Node {
            len: self.node(p).len + token.len() as u32,
            end: qn.end,
            link: qn.link,
            edges: qn.edges.clone(),
            owner: qn.owner,
            paths: 0,
        };
        let clone = self.push(clone);
        self.node_mut(q).link = Some(clone);

        let mut p = Some(p);
        while let Some(id) = p {
            let node = self.node_mut(id);
            match node.edges.get_mut(corpus, token) {
                Some(e) if e.child == q => e.child = clone,
                _ => break,
            }
            p = node.link;
        }
        clone
    }

    /// Walk suffix links from `from`, tagging nodes with `tag`, or demoting
    /// them to shared when another tag already owns them. Stops at the first
    /// node already owned by `tag` or shared: its suffix ancestors are too.
    fn mark_owner(&mut self, from: NodeId, tag: u16) {
        if !self.track_owner {
            return;
        }
        let mut v = Some(from);
        while let Some(id) = v {
            if id == ROOT {
                break;
            }
            let node = self.node_mut(id);
            match node.owner {
                Owner::Unset => node.owner = Owner::Tag(tag),
                Owner::Tag(t) if t == tag => break,
                Owner::Shared => break,
                Owner::Tag(_) => node.owner = Owner::Shared,
            }
            v = node.link;
        }
    }

    /// Count paths bottom-up: a sink (end of a font string) counts one,
    /// every other node the sum of its children, saturated to u16.
    ///
    /// Children are always longer than their parent, so visiting nodes by
    /// decreasing `len` is a valid post-order.
    pub fn count_paths(&mut self) {
        let mut order: Vec<NodeId> = (0..self.nodes.len() as NodeId).collect();
        order.sort_by_key(|&id| Reverse(self.node(id).len));
        for id in order {
            let node = self.node(id);
            let paths = if node.edges.is_empty() {
                1
            } else {
                node.edges
                    .iter()
                    .fold(0u16, |acc, e| acc.saturating_add(self.node(e.child).paths))
            };
            self.node_mut(id).paths = paths;
        }
    }
}
