//! Bit matrix transposition, as needed by OT extension to turn per-OT rows
//! into per-column keys.
mod portable;

/// Transposes `input`, a row-major bit matrix of `rows` rows with the least
/// significant bit of each byte first, into `output`.
///
/// # Panics
/// If the buffers differ in length, or the shape is not a multiple of 16 rows
/// by a multiple of 8 columns with at least 16 columns.
pub(crate) fn transpose_bitmatrix(input: &[u8], output: &mut [u8], rows: usize) {
    assert_eq!(input.len(), output.len(), "transpose buffers differ in length");
    portable::transpose_bitmatrix(input, output, rows);
}
