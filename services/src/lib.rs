pub use psa_core::*;

mod classify;
pub use classify::*;

mod de;

pub mod enrich;

mod normalize;
pub use normalize::normalize;

mod relay;
pub use relay::*;

pub mod service;

mod webhook;
pub use webhook::Webhook;

#[cfg(test)]
mod testing;
