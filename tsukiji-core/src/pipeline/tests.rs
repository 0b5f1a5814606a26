use std::sync::{Arc, Condvar, Mutex, PoisonError};

use super::*;
use crate::{
    DocVectorAccess,
    distance::{self, DistanceFunction, SquaredEuclidean},
    hnsw::{HnswError, HnswIndex, HnswInvariant, HnswParams},
    vectors::VectorStore,
};

fn config() -> PipelineConfig {
    PipelineConfig::new(3, 4, 2).expect("valid config")
}

fn params() -> HnswParams {
    HnswParams::new(4, 16).expect("valid params").with_rng_seed(11)
}

fn pipeline() -> Pipeline {
    Pipeline::new(params(), SquaredEuclidean, config()).expect("pipeline starts")
}

/// Squared Euclidean distance that blocks until the gate opens.
#[derive(Clone, Debug, Default)]
struct GatedDistance {
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl GatedDistance {
    fn open(&self) {
        let (open, changed) = &*self.gate;
        *open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        changed.notify_all();
    }
}

impl DistanceFunction for GatedDistance {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn distance(&self, left: &[f32], right: &[f32]) -> distance::Result<distance::Distance> {
        let (open, changed) = &*self.gate;
        let mut guard = open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*guard {
            guard = changed.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        drop(guard);
        SquaredEuclidean.distance(left, right)
    }
}

#[test]
fn adds_are_applied_after_drain() {
    let pipeline = pipeline();
    for doc in 0..40_u32 {
        pipeline
            .submit_add(doc, vec![doc as f32, (doc % 7) as f32])
            .expect("submitted");
    }
    pipeline.drain().expect("drained");

    assert_eq!(pipeline.index().documents(), (0..40).collect::<Vec<_>>());
    assert_eq!(pipeline.vectors().len(), 40);
    assert_eq!(pipeline.index().generation_handler().current_generation().get(), 40);
    pipeline
        .index()
        .invariants()
        .check_many(HnswInvariant::structural())
        .expect("graph valid");
}

#[test]
fn updates_and_removes_keep_the_store_in_step() {
    let pipeline = pipeline();
    for doc in 0..10_u32 {
        pipeline.submit_add(doc, vec![doc as f32]).expect("submitted");
    }
    pipeline.drain().expect("drained");

    pipeline.submit_update(3, vec![30.0]).expect("submitted");
    pipeline.submit_remove(4).expect("submitted");
    pipeline.submit_remove(99).expect("absent removal is accepted");
    pipeline.drain().expect("drained");

    assert_eq!(pipeline.vectors().get_vector(3).as_deref(), Some(&[30.0_f32][..]));
    assert!(!pipeline.vectors().contains(4));
    assert!(!pipeline.index().contains(4));
    let nearest = pipeline.index().search(&[29.0], 1, 16).expect("search");
    assert_eq!(nearest[0].id, 3);
    assert!(!pipeline.is_in_flight(3));
}

#[test]
fn overlapping_operations_on_one_document_are_rejected() {
    let distance = GatedDistance::default();
    let index = HnswIndex::new(params(), Arc::new(VectorStore::new()), distance.clone());
    let pipeline = Pipeline::with_index(index, config()).expect("pipeline starts");
    // The first insert needs no distances; the second blocks in prepare.
    pipeline.submit_add(0, vec![0.0]).expect("submitted");
    pipeline.drain().expect("drained");
    pipeline.submit_add(1, vec![1.0]).expect("submitted");

    assert!(pipeline.is_in_flight(1));
    assert_eq!(
        pipeline.submit_remove(1),
        Err(PipelineError::DocumentBusy { doc: 1 })
    );
    assert_eq!(
        pipeline.submit_update(1, vec![2.0]),
        Err(PipelineError::DocumentBusy { doc: 1 })
    );

    distance.open();
    pipeline.drain().expect("drained");
    assert!(!pipeline.is_in_flight(1));
    assert!(pipeline.index().contains(1));
}

#[test]
fn invalid_vectors_are_rejected_at_submission() {
    let pipeline = pipeline();
    let err = pipeline
        .submit_add(5, vec![f32::NAN])
        .expect_err("non-finite vector");
    assert!(matches!(err, PipelineError::Index(HnswError::InvalidVector { doc: 5, .. })));
    assert!(!pipeline.is_in_flight(5));
    pipeline.drain().expect("nothing failed");
}

#[test]
fn duplicate_add_halts_without_touching_the_stored_vector() {
    let pipeline = pipeline();
    pipeline.submit_add(1, vec![1.0]).expect("submitted");
    pipeline.drain().expect("drained");

    // Adding a present document is a caller error the writer cannot absorb.
    pipeline.submit_add(1, vec![2.0]).expect("submitted");
    let expected = HnswError::DuplicateNode { node: 1 };
    assert_eq!(
        pipeline.drain(),
        Err(PipelineError::Halted {
            source: expected.clone()
        })
    );
    assert_eq!(pipeline.failure(), Some(&expected));
    assert_eq!(
        pipeline.vectors().get_vector(1).as_deref(),
        Some(&[1.0_f32][..])
    );
    assert!(matches!(
        pipeline.submit_add(2, vec![2.0]),
        Err(PipelineError::Halted { .. })
    ));
    assert!(matches!(
        pipeline.submit_remove(1),
        Err(PipelineError::Halted { .. })
    ));
}
