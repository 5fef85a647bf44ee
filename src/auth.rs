//! Credential models: redacted secrets, the access/refresh pair, and the decoded principal.

pub mod pair;
pub mod principal;
pub mod secret;

pub use pair::*;
pub use principal::*;
pub use secret::*;
