//! Client-side identity: the persisted credential, its decoded claims and the admin gate.
//! Callers go through the re-exports below; the sub-modules stay private.

mod principal;
mod session;
mod claims;
mod authorizer;

pub use principal::{Claims, Role};
pub use session::{Credential, SessionStore, TOKEN_KEY, TOKEN_TYPE_KEY};
pub use claims::{decode, DecodeError};
pub use authorizer::AdminGuard;
