use crate::error::{DeliveryOutcome, FailureReason};

/// HTTP 410 Gone: the receiver asks us to stop.
pub const STATUS_GONE: u16 = 410;

/// Decide what a single attempt's result means for its chain.
///
/// Policy is flat on purpose: every status other than 2xx and 410, and every
/// transport failure, is retried the same way. A 404 is retried exactly like
/// a 503.
pub fn classify(result: Result<u16, FailureReason>) -> DeliveryOutcome {
    match result {
        Ok(status @ 200..=299) => DeliveryOutcome::Delivered(status),
        Ok(STATUS_GONE) => DeliveryOutcome::Gone,
        Ok(status) => DeliveryOutcome::Retry(FailureReason::UnexpectedStatus(status)),
        Err(reason) => DeliveryOutcome::Retry(reason),
    }
}
