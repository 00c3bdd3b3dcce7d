//! AI intent routing.
//!
//! Used only when no deterministic rule matches. The model sees the issue
//! and a catalog of configured repositories built from their descriptions.

mod error;
mod router;

pub use error::RouterError;
pub use router::{Router, RoutingResult};
