//! The public matchmaking queue.

use std::collections::VecDeque;

use pairhub_peer::ConnectionId;

/// FIFO of connections waiting for a public match.
///
/// A connection appears at most once; [`push`](Self::push) refuses
/// duplicates.
#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: VecDeque<ConnectionId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` unless it is already queued. Returns `true` if added.
    pub fn push(&mut self, id: ConnectionId) -> bool {
        if self.waiting.contains(&id) {
            return false;
        }
        self.waiting.push_back(id);
        true
    }

    /// Takes the connection that has waited longest.
    pub fn pop_front(&mut self) -> Option<ConnectionId> {
        self.waiting.pop_front()
    }

    /// Removes `id` if queued. Returns `true` if it was there.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        match self.waiting.iter().position(|c| *c == id) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// Keeps only the entries for which `keep` returns `true`, preserving
    /// order. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(ConnectionId) -> bool) -> usize {
        let before = self.waiting.len();
        self.waiting.retain(|c| keep(*c));
        before - self.waiting.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.waiting.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Queued connections, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.waiting.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut q = MatchQueue::new();
        assert!(q.push(cid(1)));
        assert!(!q.push(cid(1)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_pop_front_is_fifo() {
        let mut q = MatchQueue::new();
        q.push(cid(1));
        q.push(cid(2));
        assert_eq!(q.pop_front(), Some(cid(1)));
        assert_eq!(q.pop_front(), Some(cid(2)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut q = MatchQueue::new();
        q.push(cid(1));
        assert!(!q.remove(cid(2)));
        assert!(q.remove(cid(1)));
        assert!(q.is_empty());
    }

    #[test]
    fn test_retain_preserves_order_and_counts_drops() {
        let mut q = MatchQueue::new();
        for i in 1..=5 {
            q.push(cid(i));
        }
        let dropped = q.retain(|c| c.into_inner() % 2 == 1);
        assert_eq!(dropped, 2);
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![cid(1), cid(3), cid(5)]);
    }
}
