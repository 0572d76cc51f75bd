//! Bearer token authentication for the JSON API.
//!
//! Access tokens (5 min, stateless) arrive in the `Authorization` header.
//! Refresh tokens (2 weeks, database-tracked) are only ever exchanged at the
//! token endpoints and never authenticate a request on their own.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{clear_cookie, get_cookie, set_cookie};
pub use errors::ApiAuthError;
pub use extractors::{ApiAuth, MaybeAuth};
pub use ip::{ClientIp, HasHeadersAndExtensions, client_ip};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
