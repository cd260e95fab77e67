use serde::Serialize;

/// Recovery routing for every failure the workflow can surface.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Invalid or missing input. Rejected before any remote call is made.
    Caller,
    /// Network-class failure. The same call may be retried unmodified.
    TransientRemote,
    /// The remote side said no. Step backward and re-select with fresher
    /// data instead of retrying the identical request.
    BusinessRejection,
    /// The user dismissed checkout or the gateway errored. The hold is
    /// still usable while unexpired.
    PaymentNotCompleted,
    /// Payment may already be captured while the booking is unconfirmed.
    /// Retry confirmation with the identical idempotency pair; never
    /// restart from search.
    ConfirmationAmbiguous,
}

/// Implemented by every error the surrounding UI layer can receive.
pub trait Classified {
    fn class(&self) -> ErrorClass;
}
