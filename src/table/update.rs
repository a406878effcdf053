//! Update chains
//!
//! Every key's pending modifications form a singly-linked list,
//! newest-to-oldest, whose nodes live in one arena per table. Links are arena
//! indices; nothing outside the arena owns a node.
//!
//! A freed arena cell bumps its generation, so a [`ChainHandle`] taken before
//! reconciliation stops resolving once the node it named is gone, even if the
//! cell has been reused since.

use crate::mvcc::{CommitId, Timestamp, VersionPayload};

/// Non-owning reference to one update chain node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHandle {
    index: usize,
    generation: u64,
}

impl ChainHandle {
    pub(crate) fn new(index: usize, generation: u64) -> Self {
        Self { index, generation }
    }

    /// Arena index of the node.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell generation observed when the handle was taken.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// One modification on an update chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNode {
    pub commit_id: CommitId,
    pub revision: u64,
    pub start_ts: Option<Timestamp>,
    pub durable_ts: Timestamp,
    pub payload: VersionPayload,
    /// Next older node
    pub(crate) older: Option<usize>,
}

impl UpdateNode {
    /// An unlinked node; the durable timestamp is the commit timestamp, or
    /// zero for untimestamped writes.
    pub fn new(
        commit_id: CommitId,
        revision: u64,
        start_ts: Option<Timestamp>,
        payload: VersionPayload,
    ) -> Self {
        Self {
            commit_id,
            revision,
            start_ts,
            durable_ts: start_ts.unwrap_or(0),
            payload,
            older: None,
        }
    }
}

/// A resolved chain node as handed to cursors: the node's contents plus a
/// handle to the next older node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub commit_id: CommitId,
    pub revision: u64,
    pub start_ts: Option<Timestamp>,
    pub durable_ts: Timestamp,
    pub payload: VersionPayload,
    pub older: Option<ChainHandle>,
}

#[derive(Debug)]
struct Cell {
    generation: u64,
    node: Option<UpdateNode>,
}

/// Generational arena holding every update node of a table.
#[derive(Debug, Default)]
pub(crate) struct UpdateArena {
    cells: Vec<Cell>,
    free: Vec<usize>,
}

impl UpdateArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `node` and returns its index.
    pub(crate) fn alloc(&mut self, node: UpdateNode) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.cells[index].node = Some(node);
                index
            }
            None => {
                self.cells.push(Cell {
                    generation: 0,
                    node: Some(node),
                });
                self.cells.len() - 1
            }
        }
    }

    /// Handle for the live node at `index`.
    pub(crate) fn handle(&self, index: usize) -> Option<ChainHandle> {
        let cell = self.cells.get(index)?;
        cell.node.as_ref().map(|_| ChainHandle {
            index,
            generation: cell.generation,
        })
    }

    pub(crate) fn get(&self, index: usize) -> Option<&UpdateNode> {
        self.cells.get(index)?.node.as_ref()
    }

    /// Resolves a handle; `None` once the node has been freed.
    pub(crate) fn resolve(&self, handle: ChainHandle) -> Option<ChainEntry> {
        let cell = self.cells.get(handle.index)?;
        if cell.generation != handle.generation {
            return None;
        }
        let node = cell.node.as_ref()?;
        Some(ChainEntry {
            commit_id: node.commit_id,
            revision: node.revision,
            start_ts: node.start_ts,
            durable_ts: node.durable_ts,
            payload: node.payload.clone(),
            older: node.older.and_then(|i| self.handle(i)),
        })
    }

    /// Walks a chain from `head`, newest first.
    pub(crate) fn chain(&self, head: usize) -> ChainIter<'_> {
        ChainIter {
            arena: self,
            next: Some(head),
        }
    }

    /// Frees the whole chain starting at `head`.
    pub(crate) fn free_chain(&mut self, head: usize) {
        let mut next = Some(head);
        while let Some(index) = next {
            let cell = &mut self.cells[index];
            next = cell.node.take().and_then(|node| node.older);
            cell.generation += 1;
            self.free.push(index);
        }
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.cells.len() - self.free.len()
    }
}

pub(crate) struct ChainIter<'a> {
    arena: &'a UpdateArena,
    next: Option<usize>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a UpdateNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.next?)?;
        self.next = node.older;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(commit: u64, older: Option<usize>) -> UpdateNode {
        UpdateNode {
            commit_id: CommitId::new(commit),
            revision: 0,
            start_ts: Some(commit * 10),
            durable_ts: commit * 10,
            payload: VersionPayload::Document(vec![commit as u8]),
            older,
        }
    }

    #[test]
    fn test_chain_walks_newest_first() {
        let mut arena = UpdateArena::new();
        let a = arena.alloc(node(1, None));
        let b = arena.alloc(node(2, Some(a)));
        let c = arena.alloc(node(3, Some(b)));

        let commits: Vec<u64> = arena.chain(c).map(|n| n.commit_id.value()).collect();
        assert_eq!(commits, vec![3, 2, 1]);
    }

    #[test]
    fn test_resolve_links_to_older() {
        let mut arena = UpdateArena::new();
        let a = arena.alloc(node(1, None));
        let b = arena.alloc(node(2, Some(a)));

        let entry = arena.resolve(arena.handle(b).unwrap()).unwrap();
        assert_eq!(entry.commit_id, CommitId::new(2));
        let older = arena.resolve(entry.older.unwrap()).unwrap();
        assert_eq!(older.commit_id, CommitId::new(1));
        assert!(older.older.is_none());
    }

    #[test]
    fn test_freed_handle_is_stale_after_reuse() {
        let mut arena = UpdateArena::new();
        let a = arena.alloc(node(1, None));
        let handle = arena.handle(a).unwrap();

        arena.free_chain(a);
        assert!(arena.resolve(handle).is_none());
        assert_eq!(arena.live(), 0);

        let reused = arena.alloc(node(9, None));
        assert_eq!(reused, a);
        assert!(arena.resolve(handle).is_none());
        assert!(arena.resolve(arena.handle(reused).unwrap()).is_some());
    }
}
