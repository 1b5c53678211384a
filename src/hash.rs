use std::hash::{Hash, Hasher};

/// Hash function used to fold page identifiers before they are reduced to a
/// lock hash cell. Uses an enum to avoid trait object limitations with
/// generics.
#[derive(Debug, Clone, Copy)]
pub enum ShardHasher {
    /// AHash implementation (default, fast and well-distributed).
    AHash,
    /// FxHash implementation (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

impl ShardHasher {
    /// Fold a key into a 64-bit value.
    ///
    /// Both hashers are seeded with fixed keys, so the same key folds to the
    /// same value for the lifetime of the process.
    pub fn fold<K: Hash + ?Sized>(&self, key: &K) -> u64 {
        match self {
            ShardHasher::AHash => {
                let mut hasher = ahash::AHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
            #[cfg(feature = "fxhash")]
            ShardHasher::FxHash => {
                let mut hasher = fxhash::FxHasher::default();
                key.hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}

impl Default for ShardHasher {
    fn default() -> Self {
        ShardHasher::AHash
    }
}
