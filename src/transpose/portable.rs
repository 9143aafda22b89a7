use wide::{i8x16, i64x2};

/// Transposes a row-major bit matrix with `rows` rows into `output`, which
/// then holds `cols` rows of `rows` bits each.
///
/// The matrix is walked in tiles of 16 rows by 8 columns. Each tile is one
/// 128-bit vector with one byte per row; `move_mask` collects the top bit of
/// every byte, which is one output column of 16 bits. Shifting the tile left
/// brings the next column to the top.
///
/// # Panics
/// If `rows` is not a positive multiple of 16, or the column count is not a
/// multiple of 8 that is at least 16.
pub(crate) fn transpose_bitmatrix(input: &[u8], output: &mut [u8], rows: usize) {
    assert!(rows >= 16 && rows % 16 == 0, "invalid row count {rows}");
    assert_eq!(input.len() % rows, 0, "input does not split into {rows} rows");
    let row_bytes = input.len() / rows;
    let cols = row_bytes * 8;
    assert!(cols >= 16, "a bit matrix needs at least 16 columns, got {cols}");
    let col_bytes = rows / 8;

    for tile_row in (0..rows).step_by(16) {
        for col_byte in 0..row_bytes {
            let mut tile = i8x16::from(std::array::from_fn::<i8, 16, _>(|i| {
                input[(tile_row + i) * row_bytes + col_byte] as i8
            }));
            for bit in (0..8).rev() {
                let column = tile.move_mask() as u16;
                let at = (col_byte * 8 + bit) * col_bytes + tile_row / 8;
                output[at..at + 2].copy_from_slice(&column.to_le_bytes());
                let lanes: &mut i64x2 = bytemuck::must_cast_mut(&mut tile);
                *lanes = *lanes << 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn get(m: &[u8], row_bytes: usize, r: usize, c: usize) -> bool {
        (m[r * row_bytes + c / 8] >> (c % 8)) & 1 == 1
    }

    fn bit_matrix() -> impl Strategy<Value = (Vec<u8>, usize, usize)> {
        (1..12_usize, 2..12_usize).prop_flat_map(|(row_tiles, col_bytes)| {
            let (rows, cols) = (row_tiles * 16, col_bytes * 8);
            (
                proptest::collection::vec(any::<u8>(), rows * cols / 8),
                Just(rows),
                Just(cols),
            )
        })
    }

    proptest! {
        #[test]
        fn every_bit_moves_to_its_mirror((m, rows, cols) in bit_matrix()) {
            let mut t = vec![0; m.len()];
            transpose_bitmatrix(&m, &mut t, rows);
            for r in 0..rows {
                for c in 0..cols {
                    prop_assert_eq!(get(&m, cols / 8, r, c), get(&t, rows / 8, c, r));
                }
            }
        }
    }

    #[test]
    fn square_identity_is_its_own_transpose() {
        let mut m = vec![0_u8; 32 * 4];
        for i in 0..32 {
            m[i * 4 + i / 8] |= 1 << (i % 8);
        }
        let mut t = vec![0; m.len()];
        transpose_bitmatrix(&m, &mut t, 32);
        assert_eq!(m, t);
    }
}
