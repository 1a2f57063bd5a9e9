//! Site-mask policy: filters task queues by the resource's site against the
//! active set of sites currently accepting work.

use crate::expr::{single_pinned_site, Expr};
use std::collections::HashSet;

/// The active set of site names currently permitted to receive work.
pub type SiteMask = HashSet<String>;

/// Whether the agent's site is currently allowed or banned from receiving
/// new work, derived once per `request_job`/`check_for_jobs` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Allowed,
    Banned,
}

/// Classifies `agent_site` against the active mask.
#[must_use]
pub fn classify(agent_site: Option<&str>, mask: &SiteMask) -> SiteState {
    match agent_site {
        Some(site) if mask.contains(site) => SiteState::Allowed,
        _ => SiteState::Banned,
    }
}

/// Decides whether a task queue should still be considered for a resource at
/// `agent_site` given the queue's `Requirements` expression and the current
/// site classification.
///
/// An allowed site always passes. A banned (or unmasked) site passes only if
/// the queue's `Requirements` pins exactly one site via a top-level
/// `other.Site == "<S>"` clause and `<S>` equals the agent's site — queues
/// with zero or multiple site pins are skipped for banned sites.
#[must_use]
pub fn passes(requirements: &Expr, agent_site: Option<&str>, state: SiteState) -> bool {
    match state {
        SiteState::Allowed => true,
        SiteState::Banned => match (agent_site, single_pinned_site(requirements)) {
            (Some(site), Some(pinned)) => site == pinned,
            _ => false,
        },
    }
}
