pub mod models;
pub mod errors;
pub mod payloads;
pub mod fuzzer;
pub mod client;
pub mod verdict;
pub mod reporting;
pub mod engine;

// Re-export commonly used items
pub use models::*;
pub use errors::*;
pub use payloads::*;
pub use fuzzer::*;
pub use client::*;
pub use verdict::*;
pub use reporting::*;
pub use engine::*;
