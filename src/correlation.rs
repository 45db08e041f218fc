//! Response-to-request id correlation
//!
//! The host hands the two phases of one exchange different ids. Observed
//! behaviour is that the response-phase id is the request-phase id plus one,
//! but the host does not document this, so the mapping lives behind
//! [`Correlator`] and can be replaced without touching the store.

/// Maps a response-phase id back to the request-phase id of the same exchange
pub trait Correlator: Send + Sync {
    /// `None` when no request id can correspond to `response_id`
    fn request_id_for(&self, response_id: u32) -> Option<u32>;
}

/// Correlator assuming a fixed distance between the two ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetCorrelator {
    offset: u32,
}

impl OffsetCorrelator {
    pub fn new(offset: u32) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl Default for OffsetCorrelator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Correlator for OffsetCorrelator {
    fn request_id_for(&self, response_id: u32) -> Option<u32> {
        response_id.checked_sub(self.offset)
    }
}

/// Request-phase id for a response-phase id under the observed `+1` offset
pub fn request_id_for_response(response_id: u32) -> Option<u32> {
    OffsetCorrelator::default().request_id_for(response_id)
}
