// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded embedding cache with first-in-first-out eviction.
//!
//! Eviction order is insertion order, not access order: a hit does not
//! refresh an entry, and overwriting an existing key keeps its original slot.

use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};

/// Cache key for `text` embedded by `model`: hex SHA-256 of `"{model}:{text}"`.
pub fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// FIFO-bounded map from cache key to embedding.
#[derive(Debug)]
pub struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

impl EmbeddingCache {
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Vec<f32>> {
        self.entries.get(key)
    }

    /// Inserts or overwrites `key`, evicting the earliest-inserted keys past capacity.
    pub fn insert(&mut self, key: String, embedding: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = embedding;
            return;
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, embedding);

        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
