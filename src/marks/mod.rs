//! Packet marking rule managers
//!
//! Four independent entry points that manage marking rules around the
//! per-interface chains:
//!
//! - [`DestinationMarkManager`]: mark traffic to specific destinations
//! - [`UidRuleManager`]: steer uid ranges into an interface's chain
//! - [`HostExemptionManager`]: protect-mark traffic to exempted hosts
//! - [`MarkQueryService`]: read-only mark lookups

pub mod destination;
pub mod exemption;
pub mod query;
pub mod uid;

pub use destination::DestinationMarkManager;
pub use exemption::HostExemptionManager;
pub use query::MarkQueryService;
pub use uid::UidRuleManager;
