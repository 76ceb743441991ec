//! Usage quota: the optimistic local counter, the pre-send limits gate,
//! and the subscription purchase flow.

pub mod gate;
pub mod payment;
pub mod tracker;

pub use gate::{LimitsVerdict, check_limits};
pub use payment::{PaymentOutcome, SubscriptionService};
pub use tracker::QuotaTracker;
