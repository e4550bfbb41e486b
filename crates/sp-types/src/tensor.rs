use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named parameter map, keyed by tensor name.  BTreeMap keeps iteration
/// order stable so merged artifacts serialize deterministically.
pub type ParameterSet = BTreeMap<String, Tensor>;

/// Raw tensor payload.  Float tensors participate in weighted merging;
/// integer tensors (position ids and similar non-trainable buffers) are
/// copied verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TensorData {
    F32(Vec<f32>),
    I64(Vec<i64>),
}

/// A single model parameter: shape plus flat row-major data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl Tensor {
    pub fn f32(shape: Vec<usize>, values: Vec<f32>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self {
            shape,
            data: TensorData::F32(values),
        }
    }

    pub fn i64(shape: Vec<usize>, values: Vec<i64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self {
            shape,
            data: TensorData::I64(values),
        }
    }

    /// Integer tensors are assigned rather than summed during a merge.
    pub fn is_integer(&self) -> bool {
        matches!(self.data, TensorData::I64(_))
    }

    pub fn numel(&self) -> usize {
        match &self.data {
            TensorData::F32(v) => v.len(),
            TensorData::I64(v) => v.len(),
        }
    }

    /// Dtype tag as written into the safetensors header.
    pub fn dtype(&self) -> &'static str {
        match &self.data {
            TensorData::F32(_) => "F32",
            TensorData::I64(_) => "I64",
        }
    }

    /// Byte length of the raw little-endian encoding.
    pub fn byte_len(&self) -> usize {
        match &self.data {
            TensorData::F32(v) => v.len() * 4,
            TensorData::I64(v) => v.len() * 8,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Some(v),
            TensorData::I64(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            TensorData::I64(v) => Some(v),
            TensorData::F32(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_tensor_basics() {
        let t = Tensor::f32(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        assert!(!t.is_integer());
        assert_eq!(t.numel(), 4);
        assert_eq!(t.byte_len(), 16);
        assert_eq!(t.dtype(), "F32");
        assert_eq!(t.as_f32().unwrap()[3], 4.0);
        assert!(t.as_i64().is_none());
    }

    #[test]
    fn integer_tensor_basics() {
        let t = Tensor::i64(vec![3], vec![0, 1, 2]);
        assert!(t.is_integer());
        assert_eq!(t.byte_len(), 24);
        assert_eq!(t.dtype(), "I64");
    }

    #[test]
    fn parameter_set_iterates_in_key_order() {
        let mut params = ParameterSet::new();
        params.insert("b.weight".into(), Tensor::f32(vec![1], vec![1.0]));
        params.insert("a.weight".into(), Tensor::f32(vec![1], vec![2.0]));
        let keys: Vec<_> = params.keys().cloned().collect();
        assert_eq!(keys, vec!["a.weight", "b.weight"]);
    }
}
