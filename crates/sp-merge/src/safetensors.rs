//! Minimal safetensors codec.
//!
//! Layout: an 8-byte little-endian header length, a JSON header mapping
//! tensor names to `{dtype, shape, data_offsets}`, then the raw tensor data
//! little-endian, offsets relative to the start of the data section.  Covers
//! the two dtypes the merger handles (F32, I64).

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sp_types::{DataError, ParameterSet, SpResult, Tensor, TensorData};

#[derive(Debug, Serialize, Deserialize)]
struct TensorHeader {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

/// Serialize a parameter set to a safetensors file.
pub fn save_safetensors<P: AsRef<Path>>(path: P, params: &ParameterSet) -> SpResult<()> {
    let path = path.as_ref();

    // BTreeMap keys are sorted, so header order and data layout are
    // deterministic for identical parameter sets.
    let mut header = BTreeMap::new();
    let mut offset = 0usize;
    for (name, tensor) in params {
        let len = tensor.byte_len();
        header.insert(
            name.clone(),
            TensorHeader {
                dtype: tensor.dtype().to_string(),
                shape: tensor.shape.clone(),
                data_offsets: [offset, offset + len],
            },
        );
        offset += len;
    }

    let header_bytes = serde_json::to_vec(&header)?;

    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&(header_bytes.len() as u64).to_le_bytes())?;
    writer.write_all(&header_bytes)?;

    for tensor in params.values() {
        match &tensor.data {
            TensorData::F32(values) => {
                for v in values {
                    writer.write_all(&v.to_le_bytes())?;
                }
            }
            TensorData::I64(values) => {
                for v in values {
                    writer.write_all(&v.to_le_bytes())?;
                }
            }
        }
    }
    writer.flush()?;

    tracing::debug!(
        "Saved {} tensors ({} data bytes) to {}",
        params.len(),
        offset,
        path.display()
    );
    Ok(())
}

/// Deserialize a parameter set from a safetensors file.
pub fn load_safetensors<P: AsRef<Path>>(path: P) -> SpResult<ParameterSet> {
    let path = path.as_ref();
    let raw = fs::read(path)?;

    if raw.len() < 8 {
        return Err(corrupt(path, "file shorter than header length field"));
    }
    let header_len = u64::from_le_bytes(
        raw[..8]
            .try_into()
            .map_err(|_| corrupt(path, "unreadable header length"))?,
    ) as usize;

    let data_start = 8 + header_len;
    if raw.len() < data_start {
        return Err(corrupt(path, "header extends past end of file"));
    }

    let header: BTreeMap<String, TensorHeader> = serde_json::from_slice(&raw[8..data_start])
        .map_err(|e| corrupt(path, &format!("invalid header JSON: {e}")))?;

    let data = &raw[data_start..];
    let mut params = ParameterSet::new();
    for (name, info) in header {
        let [start, end] = info.data_offsets;
        if end > data.len() || start > end {
            return Err(corrupt(path, &format!("offsets out of range for {name}")));
        }
        let bytes = &data[start..end];

        let tensor = match info.dtype.as_str() {
            "F32" => {
                let values: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                Tensor::f32(info.shape, values)
            }
            "I64" => {
                let values: Vec<i64> = bytes
                    .chunks_exact(8)
                    .map(|b| i64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
                    .collect();
                Tensor::i64(info.shape, values)
            }
            other => {
                return Err(corrupt(path, &format!("unsupported dtype {other} for {name}")));
            }
        };
        params.insert(name, tensor);
    }

    Ok(params)
}

fn corrupt(path: &Path, detail: &str) -> sp_types::SpError {
    DataError::InvalidFormat {
        message: format!("Corrupt safetensors file {}: {}", path.display(), detail),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_params() -> ParameterSet {
        let mut params = ParameterSet::new();
        params.insert(
            "layer.weight".into(),
            Tensor::f32(vec![2, 2], vec![1.0, -2.5, 3.25, 0.0]),
        );
        params.insert("layer.bias".into(), Tensor::f32(vec![2], vec![0.5, 0.5]));
        params.insert("position_ids".into(), Tensor::i64(vec![4], vec![0, 1, 2, 3]));
        params
    }

    #[test]
    fn roundtrip_preserves_tensors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");

        let params = sample_params();
        save_safetensors(&path, &params).unwrap();
        let loaded = load_safetensors(&path).unwrap();

        assert_eq!(loaded, params);
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, [0u8; 4]).unwrap();

        assert!(load_safetensors(&path).is_err());
    }

    #[test]
    fn garbage_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");
        let mut raw = Vec::new();
        raw.extend_from_slice(&10u64.to_le_bytes());
        raw.extend_from_slice(b"not json!!");
        fs::write(&path, raw).unwrap();

        assert!(load_safetensors(&path).is_err());
    }
}
