//! GridMatch Matcher - job-to-resource matching engine
//!
//! Implements the DIRAC-style optimistic matching algorithm: resources
//! (pilot agents) submit a descriptor of what they can run, and the matcher
//! picks the highest-priority, best-fit waiting job across all task queues
//! whose `Requirements` the resource satisfies and whose counter-requirements
//! the job's `Requirements` are satisfied by in turn.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Matcher Service                           │
//! │                                                                 │
//! │   resource JDL                                                 │
//! │       │                                                        │
//! │       ▼                                                        │
//! │  ┌──────────┐     ┌────────────┐     ┌──────────────────┐      │
//! │  │  expr    │────▶│  matching  │────▶│   site_mask        │    │
//! │  │ (parse)  │     │ (two-way)  │     │ (allow/ban policy) │    │
//! │  └──────────┘     └────────────┘     └──────────────────┘      │
//! │       │                                       │                │
//! │       ▼                                       ▼                │
//! │  ┌─────────────────────────────────────────────────────┐       │
//! │  │         queue (priority-ordered task queue index)     │      │
//! │  └─────────────────────────────────────────────────────┘       │
//! │                           │                                    │
//! │                           ▼                                    │
//! │  ┌─────────────────────────────────────────────────────┐       │
//! │  │  claim (ClaimCoordinator — serializes every claim)    │      │
//! │  └─────────────────────────────────────────────────────┘       │
//! │                           │                                    │
//! │                           ▼                                    │
//! │  ┌─────────────────────────────────────────────────────┐       │
//! │  │   store (JobStore port to the external job database)  │      │
//! │  └─────────────────────────────────────────────────────┘       │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod claim;
pub mod di;
pub mod expr;
pub mod matching;
pub mod queue;
pub mod resilient_store;
pub mod service;
pub mod site_mask;
pub mod store;

pub use claim::{ClaimCoordinator, ClaimOutcome, ClaimedJob};
pub use di::{MatcherComponent, MatcherServiceInterface};
pub use expr::{Descriptor, Expr, Value};
pub use matching::{match_descriptors, match_text, MatchOutcome};
pub use queue::{QueueReportEntry, TaskQueueSummary};
pub use resilient_store::ResilientJobStore;
pub use service::{JobPayload, MatcherService, MatcherServiceImpl};
pub use site_mask::{classify, passes, SiteMask, SiteState};
pub use store::{InMemoryJobStore, JobRecord, JobStatus, JobStore};

/// Re-export of the module's core public surface for crates that depend on
/// `gridmatch-matcher` only through its service boundary.
pub mod prelude {
    pub use crate::di::{MatcherComponent, MatcherServiceInterface};
    pub use crate::service::{JobPayload, MatcherService};
    pub use crate::store::JobStore;
}
