//! Open-addressed edge table shared by the suffix automaton and the match
//! trie.
//!
//! Edge labels are single tokens referenced by offset into the corpus, the
//! table never owns label bytes. Slots are probed quadratically (triangular
//! steps over a power-of-two table, which visits every slot) and the table
//! doubles once it is 7/8 full. Iteration follows slot order, so it only
//! depends on the insertion sequence.

/// Transition to `child` labeled by the token at `corpus[label..label + len]`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Edge {
    pub label: u32,
    pub len: u16,
    pub child: u32,
}

impl Edge {
    pub fn token<'a>(&self, corpus: &'a [u8]) -> &'a [u8] {
        let start = self.label as usize;
        &corpus[start..start + self.len as usize]
    }
}

#[derive(Clone, Default, Debug)]
pub(crate) struct EdgeTable {
    slots: Vec<Option<Edge>>,
    len: u32,
}

/// FNV-1a over the token bytes, mixed with the first byte so single byte
/// tokens spread over the whole table.
fn hash_token(token: &[u8]) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for &b in token {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h ^ ((token[0] as u32) << 16)
}

impl EdgeTable {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find slot holding `token`, or the empty slot where it would go.
    /// Table must not be empty.
    fn probe(&self, corpus: &[u8], token: &[u8]) -> usize {
        let mask = self.slots.len() - 1;
        let mut i = hash_token(token) as usize & mask;
        let mut step = 0;
        loop {
            match &self.slots[i] {
                None => return i,
                Some(e) if e.token(corpus) == token => return i,
                Some(_) => {
                    step += 1;
                    i = (i + step) & mask;
                }
            }
        }
    }

    pub fn get(&self, corpus: &[u8], token: &[u8]) -> Option<&Edge> {
        if self.slots.is_empty() {
            return None;
        }
        let i = self.probe(corpus, token);
        self.slots[i].as_ref()
    }

    pub fn get_mut(&mut self, corpus: &[u8], token: &[u8]) -> Option<&mut Edge> {
        if self.slots.is_empty() {
            return None;
        }
        let i = self.probe(corpus, token);
        self.slots[i].as_mut()
    }

    /// Insert `edge`, replacing any edge with the same label token.
    pub fn insert(&mut self, corpus: &[u8], edge: Edge) {
        if (self.len as usize + 1) * 8 > self.slots.len() * 7 {
            self.grow(corpus);
        }
        let i = self.probe(corpus, edge.token(corpus));
        if self.slots[i].is_none() {
            self.len += 1;
        }
        self.slots[i] = Some(edge);
    }

    fn grow(&mut self, corpus: &[u8]) {
        let cap = (self.slots.len() * 2).max(2);
        let old = std::mem::replace(&mut self.slots, vec![None; cap]);
        for e in old.into_iter().flatten() {
            let i = self.probe(corpus, e.token(corpus));
            self.slots[i] = Some(e);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests;
