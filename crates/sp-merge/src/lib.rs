pub mod merge;
pub mod safetensors;

pub use merge::*;
pub use safetensors::*;
