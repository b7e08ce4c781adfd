//! uint8 quantization/dequantization for stored item embeddings.

use ndarray::Array1;

/// Quantize a float32 embedding to uint8 bytes with scale and offset.
///
/// Maps [min, max] → [0, 255] linearly.
/// Returns (bytes, scale, offset) where: original ≈ bytes * scale + offset
pub fn quantize_uint8(embedding: &Array1<f32>) -> (Vec<u8>, f32, f32) {
    let min_val = embedding.iter().copied().fold(f32::INFINITY, f32::min);
    let max_val = embedding.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let range = max_val - min_val;
    if range < 1e-9 {
        // Constant vector — all zeros
        let bytes = vec![0u8; embedding.len()];
        return (bytes, 0.0, min_val);
    }

    let scale = range / 255.0;
    let offset = min_val;

    let bytes: Vec<u8> = embedding
        .iter()
        .map(|&v| ((v - offset) / scale).round().clamp(0.0, 255.0) as u8)
        .collect();

    (bytes, scale, offset)
}

/// Dequantize uint8 bytes back to float32 embedding.
///
/// original ≈ bytes * scale + offset
pub fn dequantize_uint8(bytes: &[u8], scale: f32, offset: f32) -> Array1<f32> {
    Array1::from_iter(bytes.iter().map(|&b| b as f32 * scale + offset))
}
