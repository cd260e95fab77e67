pub mod confirm;
pub mod hold_manager;
pub mod machine;
pub mod mock;
pub mod payment;

pub use confirm::{BookingConfirmationService, ConfirmServiceError};
pub use hold_manager::{HoldManagerError, SeatHoldManager};
pub use machine::{BookingWorkflow, Collaborators, ResetNotice, Stage, StateView, WorkflowError};
pub use payment::PaymentOrchestrator;
