//! Optional `metrics` instrumentation for the writer path.
//!
//! With the `metrics` feature disabled every recorder compiles to a no-op.

#[cfg(feature = "metrics")]
pub(crate) fn record_document_added() {
    ::metrics::counter!("hnsw_documents_added").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) const fn record_document_added() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_document_removed() {
    ::metrics::counter!("hnsw_documents_removed").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) const fn record_document_removed() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_link_evicted() {
    ::metrics::counter!("hnsw_links_evicted").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) const fn record_link_evicted() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_stale_candidate() {
    ::metrics::counter!("hnsw_stale_candidates_skipped").increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(crate) const fn record_stale_candidate() {}

#[cfg(feature = "metrics")]
pub(crate) fn record_hold_bytes(bytes: usize) {
    ::metrics::gauge!("hnsw_hold_list_bytes").set(bytes as f64);
}

#[cfg(not(feature = "metrics"))]
pub(crate) const fn record_hold_bytes(_bytes: usize) {}
