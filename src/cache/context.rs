//! Conditioning-context construction for enrichment fetches

use super::record::NoteRecord;
use crate::client::ContextEntry;
use crate::note::{format_note_timestamp, Enrichment, NoteId};

/// Default bound on prior summaries sent with one fetch
pub const DEFAULT_CONTEXT_LIMIT: usize = 50;

/// Build the conditioning context for a fetch of `id`
///
/// Takes every record already holding an enrichment with an id strictly
/// smaller than `id`, orders them oldest first, and keeps only the most
/// recent `limit`. The note being fetched never appears in its own
/// context, and newer notes never leak backwards in time.
pub fn build_context_window(
    records: &[NoteRecord],
    id: NoteId,
    limit: usize,
) -> Vec<ContextEntry> {
    let mut prior: Vec<(NoteId, &Enrichment)> = records
        .iter()
        .filter(|record| record.id < id)
        .filter_map(|record| record.enrichment.as_ref().map(|e| (record.id, e)))
        .collect();
    prior.sort_unstable_by_key(|(prior_id, _)| *prior_id);

    let skip = prior.len().saturating_sub(limit);
    prior
        .into_iter()
        .skip(skip)
        .map(|(prior_id, enrichment)| ContextEntry {
            title: enrichment.title.clone(),
            summary: enrichment.summary.clone(),
            timestamp: format_note_timestamp(prior_id),
        })
        .collect()
}
