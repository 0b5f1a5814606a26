//! Vector access for the index.
//!
//! The graph never owns vectors; it asks a [`DocVectorAccess`] implementation
//! for them on demand. [`VectorStore`] is the concurrent implementation used
//! by the mutation pipeline.

use std::sync::Arc;

use dashmap::DashMap;

use crate::hnsw::DocId;

/// Supplies the vector of a document by id.
///
/// A vector must stay stable for the lifetime of a document until it is
/// updated or removed. Readers tolerate a missing vector by skipping the
/// document, which happens transiently while a removal is in flight.
pub trait DocVectorAccess: Send + Sync {
    /// Returns the vector stored for `doc`, if any.
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>>;
}

impl<T: DocVectorAccess + ?Sized> DocVectorAccess for Arc<T> {
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>> {
        (**self).get_vector(doc)
    }
}

impl<T: DocVectorAccess + ?Sized> DocVectorAccess for &T {
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>> {
        (**self).get_vector(doc)
    }
}

/// Concurrent map from document id to vector.
///
/// # Examples
/// ```
/// use tsukiji_core::{DocVectorAccess, VectorStore};
///
/// let store = VectorStore::new();
/// store.set(3, vec![1.0, 2.0]);
/// assert_eq!(store.get_vector(3).as_deref(), Some(&[1.0_f32, 2.0][..]));
/// assert!(store.remove(3).is_some());
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct VectorStore {
    vectors: DashMap<DocId, Arc<[f32]>>,
}

impl VectorStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `vector` for `doc`, returning the vector it replaced.
    pub fn set(&self, doc: DocId, vector: impl Into<Arc<[f32]>>) -> Option<Arc<[f32]>> {
        self.vectors.insert(doc, vector.into())
    }

    /// Removes the vector stored for `doc`.
    pub fn remove(&self, doc: DocId) -> Option<Arc<[f32]>> {
        self.vectors.remove(&doc).map(|(_, vector)| vector)
    }

    /// Reports whether a vector is stored for `doc`.
    #[must_use]
    pub fn contains(&self, doc: DocId) -> bool {
        self.vectors.contains_key(&doc)
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Reports whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl DocVectorAccess for VectorStore {
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>> {
        self.vectors.get(&doc).map(|entry| Arc::clone(entry.value()))
    }
}

impl<S: std::hash::BuildHasher + Send + Sync> DocVectorAccess
    for std::collections::HashMap<DocId, Arc<[f32]>, S>
{
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>> {
        self.get(&doc).cloned()
    }
}

impl DocVectorAccess for [Vec<f32>] {
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>> {
        let index = usize::try_from(doc).ok()?;
        self.get(index).map(|vector| Arc::from(vector.as_slice()))
    }
}

impl DocVectorAccess for Vec<Vec<f32>> {
    fn get_vector(&self, doc: DocId) -> Option<Arc<[f32]>> {
        self.as_slice().get_vector(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_previous_vector() {
        let store = VectorStore::new();
        assert!(store.set(1, vec![0.0, 1.0]).is_none());
        let previous = store.set(1, vec![2.0, 3.0]).expect("previous vector");
        assert_eq!(&*previous, &[0.0, 1.0]);
        assert_eq!(store.get_vector(1).as_deref(), Some(&[2.0_f32, 3.0][..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_documents_yield_none() {
        let store = VectorStore::new();
        assert!(store.get_vector(42).is_none());
        assert!(store.remove(42).is_none());
        assert!(!store.contains(42));
    }

    #[test]
    fn dense_rows_are_addressed_by_position() {
        let rows = vec![vec![1.0_f32], vec![2.0_f32]];
        assert_eq!(rows.get_vector(1).as_deref(), Some(&[2.0_f32][..]));
        assert!(rows.get_vector(2).is_none());

        let shared = Arc::new(rows);
        assert!(shared.get_vector(0).is_some());
    }
}
