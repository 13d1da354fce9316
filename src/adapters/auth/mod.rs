//! Dashboard authentication adapters.
//!
//! - `jwt` - HS256 shared-secret tokens
//! - `mock` - fixed tokens for tests and local runs

mod jwt;
mod mock;

pub use jwt::{JwtAgentValidator, JwtValidatorConfig};
pub use mock::MockAgentValidator;
