//! Per-note record state as the cache sees it

use crate::note::{Enrichment, NoteId};

/// Fetch lifecycle of a single note
///
/// `Idle` covers both "enriched" and "nothing to do"; which one is told
/// by whether the record holds an enrichment. `Error` is terminal until
/// the next full load, which resets every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Error,
}

/// One note in the cache's view
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub id: NoteId,
    /// Present once fetched or read back from the store
    pub enrichment: Option<Enrichment>,
    pub fetch: FetchState,
}

impl NoteRecord {
    pub fn enriched(&self) -> bool {
        self.enrichment.is_some()
    }

    /// True while a background fetch for this note is outstanding
    pub fn is_fetching(&self) -> bool {
        self.fetch == FetchState::Fetching
    }

    /// True once a fetch has failed and no enrichment exists
    pub fn failed(&self) -> bool {
        self.fetch == FetchState::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Enrichment;

    #[test]
    fn state_accessors_reflect_the_record() {
        let id = NoteId::from(100);
        let pending = NoteRecord { id, enrichment: None, fetch: FetchState::Fetching };
        assert!(pending.is_fetching());
        assert!(!pending.enriched());

        let done = NoteRecord {
            id,
            enrichment: Some(Enrichment {
                title: "T".to_string(),
                summary: "S".to_string(),
                raw_text: None,
            }),
            fetch: FetchState::Idle,
        };
        assert!(done.enriched());
        assert!(!done.failed());
    }
}
