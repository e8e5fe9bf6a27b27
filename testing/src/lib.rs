//! Shared test fixtures for the configuration binding workspace.
//!
//! Provides sample configuration types covering the interesting corners
//! of the binding contract (legacy aliases, security-sensitive values,
//! deprecation, defunct names, collections), plus recording doubles for
//! the warnings monitor and binding listener interfaces.

mod fixtures;

pub use fixtures::*;
