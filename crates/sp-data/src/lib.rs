pub mod eval_set;
pub mod news;
pub mod shards;
pub mod store;

pub use eval_set::*;
pub use news::*;
pub use shards::*;
pub use store::*;

/// Default on-disk root for Souper data (shards, merged artifacts).
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("souper")
}
