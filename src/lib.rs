pub mod adapter;
pub mod config;
pub mod dom;
pub mod engine;
pub mod logging;
pub mod registry;
pub mod units;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
