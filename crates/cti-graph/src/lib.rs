//! CTI Graph - Knowledge graph of extracted triplets
//!
//! Collects (subject, relation, object) triplets into a directed multigraph
//! whose nodes are identified by their label, and answers neighbourhood and
//! keyword queries over it.

use cti_core::Triplet;

/// Sink for extracted triplets
pub trait TripletSink {
    /// Add a triplet, returning `false` when it was skipped
    fn add_triplet(&mut self, triplet: &Triplet) -> bool;

    /// Add every triplet, returning how many were accepted
    fn extend_triplets<'a, I>(&mut self, triplets: I) -> usize
    where
        I: IntoIterator<Item = &'a Triplet>,
        Self: Sized,
    {
        triplets
            .into_iter()
            .filter(|triplet| self.add_triplet(triplet))
            .count()
    }
}

pub mod knowledge;

pub use knowledge::{GraphElement, KnowledgeGraph};
