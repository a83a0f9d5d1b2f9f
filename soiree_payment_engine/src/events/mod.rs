//! Stateless pub-sub hooks for ledger events.
//!
//! Components outside the core (notification dispatch, analytics) can subscribe to events emitted
//! when money moves. Handlers are stateless: all they receive is the event itself, strictly after
//! the transaction that produced it has committed. Nothing here can hold a database transaction
//! open.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{EventType, OrderCompletedEvent, OrderPaidEvent, WalletCreditedEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
