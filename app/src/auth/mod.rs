// app/src/auth/mod.rs

//! Authentication and authorization.
//!
//! * [`token`] signs and verifies bearer tokens and resolves them to an identity.
//! * [`session`] resolves an identity from a server session first and a bearer
//!   token second, binding the two together.
//! * [`gate`] checks a resolved identity against the roles a route requires.

pub mod error;
pub mod gate;
pub mod password;
pub mod session;
pub mod token;

pub use error::{AuthError, AuthFailure};
pub use gate::{authorize, require_verified_email, RoleSet};
pub use session::{AuthRequest, Resolution, SessionResolver};
pub use token::{bearer_token, Claims, CredentialVerifier, TokenService};
