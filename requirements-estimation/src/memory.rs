use crate::dtype::DataType;
use crate::round2;

/// Bytes per parameter of the fp32 reference the formula scales from.
const BYTES_PER_PARAMETER: f64 = 4.0;
const BITS_IN_WORD: f64 = 32.0;
const BITS_IN_BYTE: f64 = 8.0;
/// Roughly 18% on top of the weights for activations, CUDA context and allocator slack.
const OVERHEAD_FACTOR: f64 = 1.18;

/// GPU memory, in GB, needed to hold the weights of a model with `params_b`
/// billion parameters stored as `dtype`.
///
/// `M = (P * 4B) / (32 / Q) * 1.18`, where Q is the quantization width in bits.
pub fn base_memory_gb(params_b: f64, dtype: DataType) -> f64 {
    let quantization_bits = dtype.bytes_per_param() * BITS_IN_BYTE;
    let memory = (params_b * BYTES_PER_PARAMETER) / (BITS_IN_WORD / quantization_bits) * OVERHEAD_FACTOR;
    round2(memory)
}
