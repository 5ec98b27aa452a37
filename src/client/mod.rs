//! Browser-equivalent client pieces: a typed API client and the cart store
//! the storefront UI drives. The presentation layer itself lives elsewhere;
//! this module owns the state it would render.

pub mod api;
pub mod cart_store;

pub use api::{ApiClient, ClientError};
pub use cart_store::{CartLine, CartStore, DEMO_USER_ID};
