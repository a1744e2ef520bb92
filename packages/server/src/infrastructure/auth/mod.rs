//! Identity resolvers.

mod static_token;

pub use static_token::{StaticTokenResolver, TokenSpecError};
