//! Vector Store Contract Tests
//!
//! Every adapter must behave the same way behind the `VectorStore` trait:
//! - ids are reused or generated, re-adding an id replaces it
//! - deleting absent ids or fields is a silent no-op
//! - searches return at most `top_k` hits, scores strictly above the
//!   threshold, best first
//! - engines without lexical search return no hits
//!
//! The memory adapter runs against the real embedded engine; the Chroma and
//! Qdrant adapters run against a scripted fake of their REST APIs.

mod chroma;
mod harness;
mod memory;
mod qdrant;
mod ranking;
