//! Context fusion.

use crate::types::{GroundedContext, RetrievalHit};
use std::collections::HashSet;

/// Merge structured and vector hits into one bounded context.
///
/// Structured hits come first. Duplicates by id keep their first occurrence,
/// then the result is cut to `cap`.
pub fn fuse(
    vector_hits: Vec<RetrievalHit>,
    structured_hits: Vec<RetrievalHit>,
    cap: usize,
) -> GroundedContext {
    let mut seen = HashSet::new();
    let hits: Vec<RetrievalHit> = structured_hits
        .into_iter()
        .chain(vector_hits)
        .filter(|hit| seen.insert(hit.id.clone()))
        .take(cap)
        .collect();

    if hits.is_empty() {
        tracing::debug!("No grounding found");
    }

    GroundedContext { hits }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, HitOrigin, HitPayload};

    fn hit(id: &str, origin: HitOrigin) -> RetrievalHit {
        RetrievalHit {
            id: id.to_string(),
            score: 1.0,
            origin,
            payload: HitPayload::Chunk {
                metadata: ChunkMetadata::default(),
            },
        }
    }

    fn ids(context: &GroundedContext) -> Vec<&str> {
        context.hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_structured_before_vector() {
        let context = fuse(
            vec![hit("v1", HitOrigin::Vector)],
            vec![hit("7", HitOrigin::TopicMatch)],
            3,
        );
        assert_eq!(ids(&context), vec!["7", "v1"]);
    }

    #[test]
    fn test_dedup_keeps_first_and_caps() {
        let context = fuse(
            vec![hit("2", HitOrigin::Vector), hit("v", HitOrigin::Vector)],
            vec![
                hit("1", HitOrigin::NumberMatch),
                hit("2", HitOrigin::TopicMatch),
                hit("3", HitOrigin::TopicMatch),
            ],
            3,
        );
        assert_eq!(ids(&context), vec!["1", "2", "3"]);
        assert_eq!(context.hits[1].origin, HitOrigin::TopicMatch);
    }

    #[test]
    fn test_empty_inputs_give_empty_context() {
        let context = fuse(Vec::new(), Vec::new(), 3);
        assert!(context.is_empty());
    }
}
