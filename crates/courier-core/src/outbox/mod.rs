//! Outbox: the ordered queue of not-yet-confirmed outbound messages.
//!
//! Ordering is the contract here. The queue is strict FIFO with
//! head-of-line behavior: a message that keeps failing stays at the head
//! and blocks everything behind it until it reaches a terminal outcome
//! (ack or drop). Nothing is ever silently lost on a transient failure.

mod memory;
mod record;
mod retry;

pub use memory::MessageQueue;
pub use record::{OutboundMessage, QueuedMessage};
pub use retry::RetryPolicy;
