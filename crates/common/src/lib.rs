//! Shared types for the commerce system.
//!
//! Identifier newtypes, integer-cent money, and the closed order status
//! state machine used by every other crate in the workspace.

pub mod ids;
pub mod money;
pub mod status;

pub use ids::{CartId, CartItemId, CustomerId, OrderId, ProductId, StoreId};
pub use money::Money;
pub use status::OrderStatus;
