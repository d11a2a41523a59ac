//! Token secrets and the grant returned by a successful code exchange.

pub mod grant;
pub mod secret;

pub use grant::*;
pub use secret::*;
