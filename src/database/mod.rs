// Database module
// Fingerprint persistence (SQLite) and the vector collection store (Qdrant)

pub mod qdrant;
pub mod sqlite;

pub use qdrant::{CollectionOutcome, CollectionSpec, PointRecord, QdrantStore, VectorIndex};
pub use sqlite::{Database, FingerprintEntry};
