//! Optimistic local mutations with precomputed rollback.
//!
//! A mutation's inverse is computed against the state *before* it is
//! applied and parked under a token. When the remote request settles the
//! token is either confirmed (inverse dropped) or rolled back (inverse
//! applied).

use std::collections::BTreeMap;

/// A local state change that knows how to undo itself.
pub trait Reversible<S>: Sized {
    fn apply(&self, state: &mut S);

    /// The mutation that undoes `self`, given `state` before `self` runs.
    fn inverse(&self, state: &S) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingToken(u64);

/// Inverses of mutations whose remote request is still outstanding.
#[derive(Debug)]
pub struct PendingOps<M> {
    next: u64,
    undo: BTreeMap<u64, M>,
}

impl<M> Default for PendingOps<M> {
    fn default() -> Self {
        Self { next: 0, undo: BTreeMap::new() }
    }
}

impl<M> PendingOps<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<S>(&mut self, state: &mut S, op: M) -> PendingToken
    where
        M: Reversible<S>,
    {
        let undo = op.inverse(state);
        op.apply(state);

        let token = PendingToken(self.next);
        self.next += 1;
        self.undo.insert(token.0, undo);
        token
    }

    /// The remote side accepted the mutation. Returns false for unknown tokens.
    pub fn confirm(&mut self, token: PendingToken) -> bool {
        self.undo.remove(&token.0).is_some()
    }

    /// The remote side rejected the mutation; undo it locally.
    pub fn rollback<S>(&mut self, state: &mut S, token: PendingToken) -> bool
    where
        M: Reversible<S>,
    {
        match self.undo.remove(&token.0) {
            Some(undo) => {
                undo.apply(state);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, token: PendingToken) -> bool {
        self.undo.contains_key(&token.0)
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum ListOp {
        Push(u32),
        Remove(u32),
    }

    impl Reversible<Vec<u32>> for ListOp {
        fn apply(&self, state: &mut Vec<u32>) {
            match self {
                ListOp::Push(v) => state.push(*v),
                ListOp::Remove(v) => state.retain(|x| x != v),
            }
        }

        fn inverse(&self, _state: &Vec<u32>) -> Self {
            match self {
                ListOp::Push(v) => ListOp::Remove(*v),
                ListOp::Remove(v) => ListOp::Push(*v),
            }
        }
    }

    #[test]
    fn rollback_undoes_only_its_own_mutation() {
        let mut list = vec![1];
        let mut ops = PendingOps::new();

        let a = ops.apply(&mut list, ListOp::Push(2));
        let b = ops.apply(&mut list, ListOp::Push(3));
        assert_eq!(list, vec![1, 2, 3]);
        assert_eq!(ops.len(), 2);

        assert!(ops.rollback(&mut list, a));
        assert_eq!(list, vec![1, 3]);
        assert!(ops.is_pending(b));
        assert!(!ops.is_pending(a));
    }

    #[test]
    fn confirmed_tokens_cannot_be_rolled_back() {
        let mut list = Vec::new();
        let mut ops = PendingOps::new();

        let t = ops.apply(&mut list, ListOp::Push(7));
        assert!(ops.confirm(t));
        assert!(!ops.rollback(&mut list, t));
        assert!(!ops.confirm(t));
        assert_eq!(list, vec![7]);
        assert!(ops.is_empty());
    }
}
