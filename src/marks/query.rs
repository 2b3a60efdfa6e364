//! Mark queries
//!
//! Read-only lookups answered from registry state and arithmetic, with
//! no external process invocation. Callers use these marks to label
//! their own sockets so the kernel routes them like traffic from the
//! queried uid's network.

use std::sync::Arc;

use tracing::debug;

use crate::registry::{NetworkRegistry, NETID_UNSET, PID_UNSPECIFIED};
use crate::response::{ResponseCode, ResponseSink};
use crate::rules::{TableMap, PROTECT_MARK};

/// Answers mark lookups without touching the data plane
pub struct MarkQueryService {
    registry: Arc<dyn NetworkRegistry>,
    tables: TableMap,
}

impl MarkQueryService {
    /// Create a service over the given registry and table mapping
    pub fn new(registry: Arc<dyn NetworkRegistry>, tables: TableMap) -> Self {
        Self { registry, tables }
    }

    /// The fwmark value for the network a uid is bound to
    #[must_use]
    pub fn uid_mark(&self, uid: i32) -> String {
        let net_id = self
            .registry
            .network_of_uid(uid, NETID_UNSET, PID_UNSPECIFIED, false);
        let mark = self.tables.mark_of(net_id);
        debug!(uid, net_id, mark, "resolved uid mark");
        mark
    }

    /// The mark that exempts traffic from fwmark routing
    #[must_use]
    pub fn protect_mark(&self) -> String {
        PROTECT_MARK.to_string()
    }

    /// Report a uid's mark to the sink
    pub fn get_uid_mark(&self, sink: &dyn ResponseSink, uid: i32) {
        sink.send(ResponseCode::GetMarkResult, &self.uid_mark(uid));
    }

    /// Report the protect mark to the sink
    pub fn get_protect_mark(&self, sink: &dyn ResponseSink) {
        sink.send(ResponseCode::GetMarkResult, &self.protect_mark());
    }
}
