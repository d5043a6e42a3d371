//! Shared types for the Bookstall marketplace
//!
//! Wire-level vocabulary used by the store server and its clients:
//! order lifecycle enums, the fulfillment transition graph, and the
//! catalog classification types.

pub mod book;
pub mod order;

// Re-exports
pub use book::{BookCategory, BookFormat};
pub use order::{InvalidTransition, OrderStatus, PaymentStatus, RefundStatus};
