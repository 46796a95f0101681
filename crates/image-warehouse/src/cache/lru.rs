//! Bounded LRU cache with an arena-backed recency list.
//!
//! The recency order is kept in a doubly-linked list threaded through a
//! `Vec` arena; the head is the most recently used entry and the tail the
//! least. Links are integer handles into the arena rather than references,
//! so eviction is a plain handle rewrite and evicted slots are recycled
//! through a free list. A `HashMap` indexes keys to arena slots for O(1)
//! lookup.
//!
//! Every entry carries a size; the capacity bounds the sum of entry sizes,
//! not the entry count. The image cache façade pins every size to 1, which
//! collapses the budget to a plain entry count.
//!
//! All operations are `&mut self`; concurrent callers go through the
//! façade's mutex (see [`super::image_cache`]).

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::errors::CacheError;

/// Index into the node arena.
type NodeIndex = usize;

/// Sentinel for absent links.
const NIL: NodeIndex = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    size: usize,
    prev: NodeIndex,
    next: NodeIndex,
}

/// Bounded mapping from key to value with strict least-recently-used
/// eviction.
///
/// Both `get` hits and `put` count as accesses. Eviction happens only on
/// `put`, from the tail, until the size budget is respected again.
#[derive(Debug)]
pub struct LruCache<K, V> {
    arena: Vec<Node<K, V>>,
    free: Vec<NodeIndex>,
    map: HashMap<K, NodeIndex>,
    head: NodeIndex,
    tail: NodeIndex,
    capacity: usize,
    used: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache bounded by `capacity` total entry size.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            arena: Vec::new(),
            free: Vec::new(),
            map: HashMap::new(),
            head: NIL,
            tail: NIL,
            capacity,
            used: 0,
        })
    }

    /// Look up `key`, marking the entry most-recently-used on a hit.
    ///
    /// Never evicts.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.move_to_head(idx);
        Some(self.arena[idx].value.clone())
    }

    /// Insert or replace the entry at `key`, marking it most-recently-used.
    ///
    /// A replacement updates the existing node in place; the key is never
    /// transiently absent. If the total size now exceeds the capacity,
    /// entries are evicted from the least-recently-used end until it fits.
    pub fn put(&mut self, key: K, value: V, size: usize) {
        if let Some(&idx) = self.map.get(&key) {
            let node = &mut self.arena[idx];
            self.used = self.used - node.size + size;
            node.value = value;
            node.size = size;
            self.move_to_head(idx);
        } else {
            let idx = self.alloc(Node {
                key: key.clone(),
                value,
                size,
                prev: NIL,
                next: NIL,
            });
            self.map.insert(key, idx);
            self.push_head(idx);
            self.used += size;
        }

        while self.used > self.capacity && self.tail != NIL {
            self.evict_tail();
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum total entry size.
    pub fn cap(&self) -> usize {
        self.capacity
    }

    /// Current total entry size.
    pub fn used(&self) -> usize {
        self.used
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeIndex {
        if let Some(idx) = self.free.pop() {
            self.arena[idx] = node;
            idx
        } else {
            self.arena.push(node);
            self.arena.len() - 1
        }
    }

    /// Unlink a node from the recency list, fixing head/tail.
    fn detach(&mut self, idx: NodeIndex) {
        let prev = self.arena[idx].prev;
        let next = self.arena[idx].next;

        if prev != NIL {
            self.arena[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.arena[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.arena[idx].prev = NIL;
        self.arena[idx].next = NIL;
    }

    fn push_head(&mut self, idx: NodeIndex) {
        self.arena[idx].prev = NIL;
        self.arena[idx].next = self.head;
        if self.head != NIL {
            self.arena[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn move_to_head(&mut self, idx: NodeIndex) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.push_head(idx);
    }

    fn evict_tail(&mut self) {
        let idx = self.tail;
        self.detach(idx);
        self.map.remove(&self.arena[idx].key);
        self.used -= self.arena[idx].size;
        self.free.push(idx);
    }
}
