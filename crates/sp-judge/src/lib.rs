pub mod client;
pub mod prompts;
pub mod verdict;

pub use client::*;
pub use prompts::*;
pub use verdict::*;
