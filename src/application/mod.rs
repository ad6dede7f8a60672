//! Application layer containing the confirmation workflow.
//!
//! `ConfirmationOrchestrator` is the entry point. It sequences the
//! `PaymentVerifier`, the `AppointmentStore` and the `NotificationDispatcher`,
//! each of which bounds its external call with a timeout and maps failures to
//! a typed `ConfirmationError`.

pub mod assistant;
pub mod notifier;
pub mod orchestrator;
pub mod store;
pub mod verifier;
