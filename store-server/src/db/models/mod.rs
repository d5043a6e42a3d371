//! Database Models

// Serde helpers
pub mod serde_helpers;

// Catalog
pub mod book;

// Cart
pub mod cart;

// Orders
pub mod order;

// System
pub mod settings;

// Re-exports
pub use book::{Book, BookCreate, BookUpdate};
pub use cart::{Cart, CartLine, CartLineView, CartView};
pub use order::{Order, OrderLine, OrderView};
pub use settings::Settings;
