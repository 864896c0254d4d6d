
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::corpus::Document;
use crate::index::SearchHit;

/// Collapse hits that resolve to the same provision, keeping the best-ranked one.
///
/// Single left-to-right pass; the seen-set lives only for this call.
#[inline]
pub fn dedupe<'a>(hits: &[SearchHit], documents: &'a [Document]) -> Vec<&'a Document> {
    let mut seen = HashSet::with_capacity(hits.len());
    let mut unique = Vec::with_capacity(hits.len());

    for (rank, hit) in hits.iter().enumerate() {
        let Some(document) = documents.get(hit.row_index) else {
            warn!("Result {}: row {} has no metadata, skipped", rank + 1, hit.row_index);
            continue;
        };
        let key = document.dedup_key();

        if seen.insert(key) {
            debug!(
                "Result {}: Chapter {} Section {} (added)",
                rank + 1,
                document.chapter,
                document.section
            );
            unique.push(document);
        } else {
            debug!(
                "Result {}: Chapter {} Section {} (duplicate skipped)",
                rank + 1,
                document.chapter,
                document.section
            );
        }
    }

    unique
}
