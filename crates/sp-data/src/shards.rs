use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sp_types::{DataError, QaPair, SpResult};

/// Number of training shards cut from the generated pool; the remainder
/// becomes the held-out evaluation shard.
pub const DELTA_SHARDS: usize = 4;

/// On-disk layout produced by [`write_shards`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardLayout {
    pub delta_paths: Vec<PathBuf>,
    pub eval_path: PathBuf,
}

/// Split the generated instruction pool into four equal training shards plus
/// one held-out evaluation shard (the remainder), written as pretty JSON.
///
/// The delta shards each get `pool.len() / 5` items; anything left over lands
/// in the evaluation shard, so it is never smaller than the training shards.
pub fn write_shards<P: AsRef<Path>>(pool: &[QaPair], dir: P) -> SpResult<ShardLayout> {
    let dir = dir.as_ref();
    let chunk_size = pool.len() / (DELTA_SHARDS + 1);

    if chunk_size == 0 {
        return Err(DataError::InsufficientData {
            message: format!(
                "Need at least {} instruction pairs to cut shards, got {}",
                DELTA_SHARDS + 1,
                pool.len()
            ),
        }
        .into());
    }

    fs::create_dir_all(dir)?;

    let mut delta_paths = Vec::with_capacity(DELTA_SHARDS);
    for i in 0..DELTA_SHARDS {
        let path = dir.join(format!("delta_data_{}.json", i + 1));
        write_shard(&path, &pool[chunk_size * i..chunk_size * (i + 1)])?;
        delta_paths.push(path);
    }

    let eval_path = dir.join("eval_data.json");
    write_shard(&eval_path, &pool[chunk_size * DELTA_SHARDS..])?;

    tracing::info!(
        "Wrote {} delta shards of {} items and an eval shard of {} items to {}",
        DELTA_SHARDS,
        chunk_size,
        pool.len() - chunk_size * DELTA_SHARDS,
        dir.display()
    );

    Ok(ShardLayout {
        delta_paths,
        eval_path,
    })
}

fn write_shard(path: &Path, items: &[QaPair]) -> SpResult<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, items)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pool(n: usize) -> Vec<QaPair> {
        (0..n)
            .map(|i| QaPair::new(format!("q{i}"), format!("a{i}")))
            .collect()
    }

    #[test]
    fn shards_have_expected_sizes() {
        let dir = TempDir::new().unwrap();
        let layout = write_shards(&pool(23), dir.path()).unwrap();

        assert_eq!(layout.delta_paths.len(), DELTA_SHARDS);
        for path in &layout.delta_paths {
            let items: Vec<QaPair> =
                serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(items.len(), 4); // 23 / 5 == 4
        }

        // Eval shard takes the remainder: 23 - 4*4 = 7
        let eval: Vec<QaPair> =
            serde_json::from_str(&fs::read_to_string(&layout.eval_path).unwrap()).unwrap();
        assert_eq!(eval.len(), 7);
    }

    #[test]
    fn shards_preserve_order() {
        let dir = TempDir::new().unwrap();
        let layout = write_shards(&pool(10), dir.path()).unwrap();

        let first: Vec<QaPair> =
            serde_json::from_str(&fs::read_to_string(&layout.delta_paths[0]).unwrap()).unwrap();
        assert_eq!(first[0].question, "q0");
        assert_eq!(first[1].question, "q1");

        let eval: Vec<QaPair> =
            serde_json::from_str(&fs::read_to_string(&layout.eval_path).unwrap()).unwrap();
        assert_eq!(eval[0].question, "q8");
    }

    #[test]
    fn tiny_pool_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = write_shards(&pool(4), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            sp_types::SpError::Data(DataError::InsufficientData { .. })
        ));
    }
}
