//! Scope registry: one batcher per field occurrence per query execution

use super::batcher::Batcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Identity of one field occurrence in one parsed query
///
/// Built from the address of the field node, which stays put for the whole
/// execution because the document is borrowed, never moved, while fields
/// resolve. The same occurrence reached from N sibling parents yields the
/// same handle; aliased or repeated occurrences yield different ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeHandle(usize);

impl ScopeHandle {
    /// Handle for a node, by address
    pub fn of<T>(node: &T) -> Self {
        Self(node as *const T as usize)
    }
}

/// Per-execution map from scope handle to batcher
///
/// Created at the start of an execution and dropped at its end, together
/// with every batcher it created.
pub struct ScopeRegistry<V> {
    batchers: Mutex<HashMap<ScopeHandle, Arc<Batcher<V>>>>,
}

impl<V> ScopeRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            batchers: Mutex::new(HashMap::new()),
        }
    }

    /// Batcher for `handle`, created with `factory` on first use
    pub fn get_or_create(
        &self,
        handle: ScopeHandle,
        factory: impl FnOnce() -> Batcher<V>,
    ) -> Arc<Batcher<V>> {
        let mut batchers = self
            .batchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        batchers
            .entry(handle)
            .or_insert_with(|| Arc::new(factory()))
            .clone()
    }

    /// Number of scopes that obtained a batcher
    pub fn len(&self) -> usize {
        self.batchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for ScopeRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex as StdMutex;

    fn echo_batcher(name: &str, seen: Arc<StdMutex<Vec<Vec<String>>>>) -> Batcher<String> {
        Batcher::new(name.to_string(), move |keys: Vec<String>| {
            seen.lock().unwrap().push(keys.clone());
            async move { Ok(keys) }.boxed()
        })
    }

    #[test]
    fn test_same_node_same_handle() {
        let nodes = [String::from("posts"), String::from("posts")];
        assert_eq!(ScopeHandle::of(&nodes[0]), ScopeHandle::of(&nodes[0]));
        assert_ne!(ScopeHandle::of(&nodes[0]), ScopeHandle::of(&nodes[1]));
    }

    #[test]
    fn test_get_or_create_reuses_existing_batcher() {
        let registry = ScopeRegistry::<String>::new();
        let node = 1u64;
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let first = registry.get_or_create(ScopeHandle::of(&node), || {
            echo_batcher("first", seen.clone())
        });
        let second = registry.get_or_create(ScopeHandle::of(&node), || {
            echo_batcher("second", seen.clone())
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name(), "first");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_batchers_of_different_scopes_are_isolated() {
        let registry = ScopeRegistry::<String>::new();
        let nodes = [0u8, 1u8];
        let seen_a = Arc::new(StdMutex::new(Vec::new()));
        let seen_b = Arc::new(StdMutex::new(Vec::new()));

        let a = registry.get_or_create(ScopeHandle::of(&nodes[0]), || {
            echo_batcher("a", seen_a.clone())
        });
        let b = registry.get_or_create(ScopeHandle::of(&nodes[1]), || {
            echo_batcher("b", seen_b.clone())
        });

        // Same tick, same keys, different scopes
        let (ra, rb) = futures::join!(a.enqueue("k1").unwrap(), b.enqueue("k2").unwrap());
        assert_eq!(ra.unwrap(), "k1");
        assert_eq!(rb.unwrap(), "k2");

        assert_eq!(*seen_a.lock().unwrap(), vec![vec!["k1".to_string()]]);
        assert_eq!(*seen_b.lock().unwrap(), vec![vec!["k2".to_string()]]);
        assert_eq!(registry.len(), 2);
    }
}
