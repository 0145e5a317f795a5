//! App credentials, token secrets, and the authenticator contract used by the credential cache.

pub mod authenticator;
pub mod credentials;
pub mod endpoint;
pub mod id;
pub mod secret;

pub use authenticator::*;
pub use credentials::*;
pub use endpoint::*;
pub use id::*;
pub use secret::*;
