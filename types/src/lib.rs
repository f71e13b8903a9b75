//! Domain types for the purchase bridge.
//!
//! This crate defines the types every other crate in the workspace speaks:
//! product and transaction identifiers, timestamps, catalog products,
//! purchases, purchase states, item types and the domain error taxonomy.

pub mod error;
pub mod ids;
pub mod item;
pub mod product;
pub mod purchase;
pub mod state;
pub mod time;

pub use error::PurchaseError;
pub use ids::{ProductId, TransactionId};
pub use item::ItemType;
pub use product::{Product, MICROS_PER_UNIT};
pub use purchase::Purchase;
pub use state::PurchaseState;
pub use time::Timestamp;
