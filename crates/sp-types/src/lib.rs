pub mod errors;
pub mod eval;
pub mod tensor;
pub mod weights;

pub use errors::*;
pub use eval::*;
pub use tensor::*;
pub use weights::*;
