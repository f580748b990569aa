//! Cross-cutting request plumbing shared by the Axon client crates

pub mod context;
pub mod credentials;

pub use context::RequestContext;
pub use credentials::{StaticTokenSupplier, TokenSupplier};
