//! LLM Router Guardrails
//!
//! Gate stages that delegate the safety decision to remote HTTP services.
//! A service failure is returned as an error; the gate pipeline turns it
//! into a rejection.

pub mod client;
pub mod config;
pub mod nask_guard;
pub mod sojka_guard;

pub use client::{parse_verdict, GuardrailClient};
pub use config::GuardrailConfig;
pub use nask_guard::NaskGuard;
pub use sojka_guard::SojkaGuard;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::GuardrailClient;
    pub use crate::config::GuardrailConfig;
    pub use crate::nask_guard::NaskGuard;
    pub use crate::sojka_guard::SojkaGuard;
}
