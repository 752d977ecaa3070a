//! civicdb-vector
//!
//! The semantic half of retrieval plus the corpus it runs over: a JSON
//! snapshot of sections with stored vector literals, a store that answers
//! full scans and nearest-neighbour queries, the vector retriever, and the
//! ingest/backfill jobs that maintain the snapshot.

pub mod backfill;
pub mod ingest;
pub mod retriever;
pub mod snapshot;
pub mod store;

pub use backfill::{backfill_embeddings, embed_new_sections, BackfillReport};
pub use ingest::{load_dataset, merge_dataset, DatasetRecord, IngestReport};
pub use retriever::{Unavailable, VectorOutcome, VectorRetriever};
pub use snapshot::{CorpusSnapshot, SnapshotRow};
pub use store::SnapshotStore;
