// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod config;
pub mod metrics;
pub mod sponsors;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::cache::JobCache;
pub use crate::aggregate::types::{JobPosting, JobSource, SponsorshipHint};
pub use crate::sponsors::{effective_sponsorship, SponsorRegistry};
