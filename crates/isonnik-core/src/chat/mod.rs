//! Conversation state: the resident transcript, startup reconciliation,
//! message dispatch, the multi-chat list, and context clearing.

pub mod collection;
pub mod context;
pub mod dispatcher;
pub mod reconciler;
pub mod transcript;

pub use collection::{ChatCollectionService, ChatSummary, DeleteOutcome};
pub use context::ContextService;
pub use dispatcher::{DispatchOptions, DispatchOutcome, MessageDispatcher};
pub use reconciler::{HistoryReconciler, Reconciled, SessionSource};
pub use transcript::{Delivery, SingleChat, Slot, Transcript};
