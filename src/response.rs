//! Caller response channel
//!
//! Route-mutating operations and mark queries answer the original caller
//! with a numeric code plus a human-readable message. The transport is
//! external; this module only defines the codes and the sink trait the
//! managers write into.

use parking_lot::Mutex;

/// Response codes on the control protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// Request completed
    CommandOkay = 200,
    /// Reply to a mark query, message carries the mark
    GetMarkResult = 225,
    /// Request understood but the operation failed
    OperationFailed = 400,
}

impl ResponseCode {
    /// Numeric wire value
    #[must_use]
    pub const fn value(self) -> u16 {
        self as u16
    }
}

/// Destination for operation responses
pub trait ResponseSink: Send + Sync {
    /// Deliver one response to the caller
    fn send(&self, code: ResponseCode, message: &str);
}

/// Discards every response
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpResponseSink;

impl ResponseSink for NoOpResponseSink {
    fn send(&self, _code: ResponseCode, _message: &str) {}
}

/// Buffers responses for later inspection
#[derive(Debug, Default)]
pub struct BufferedResponseSink {
    responses: Mutex<Vec<(ResponseCode, String)>>,
}

impl BufferedResponseSink {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All responses delivered so far
    #[must_use]
    pub fn responses(&self) -> Vec<(ResponseCode, String)> {
        self.responses.lock().clone()
    }

    /// The most recent response, if any
    #[must_use]
    pub fn last(&self) -> Option<(ResponseCode, String)> {
        self.responses.lock().last().cloned()
    }
}

impl ResponseSink for BufferedResponseSink {
    fn send(&self, code: ResponseCode, message: &str) {
        self.responses.lock().push((code, message.to_string()));
    }
}
