pub mod api;
pub mod identity;

pub use identity::{IDENTITY_HEADER, Identity, IdentityError};
