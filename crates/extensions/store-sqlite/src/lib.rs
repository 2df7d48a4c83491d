//! SQLite store for termsnap.
//!
//! One [`SqliteStore`] serves a single cache instantiation and implements
//! all three storage protocols:
//!
//! - **Entry store**: `{namespace}_entries` table, atomic inserts and
//!   single-statement counter updates
//! - **Keyword index**: FTS5 external-content table ranked by `bm25()`,
//!   with a substring scan when the FTS query itself fails
//! - **Vector index**: linear cosine scan over stored embedding blobs
//!
//! The vector scan is O(n) in the number of embedded entries. That is the
//! intended operating point for a personal command-history cache; there is
//! no approximate index.

mod codec;
mod keyword;
mod schema;
mod store;
mod vector;

pub use codec::{decode_embedding, encode_embedding};
pub use store::{open_file, SqliteStore};
