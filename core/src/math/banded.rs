use ndarray::{Array1, Array2, ArrayView1};

/// Symmetric banded matrix. Row `i`, column `d` of the storage holds `M[i][i + d]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BandedMatrix {
    bands: Array2<f32>,
}

impl BandedMatrix {
    pub fn zeros(size: usize, width: usize) -> Self {
        Self {
            bands: Array2::zeros((size, width.max(1))),
        }
    }

    pub fn identity(size: usize, width: usize) -> Self {
        let mut matrix = Self::zeros(size, width);
        matrix.bands.column_mut(0).fill(1.0);
        matrix
    }

    pub fn size(&self) -> usize {
        self.bands.nrows()
    }

    pub fn width(&self) -> usize {
        self.bands.ncols()
    }

    /// `M[row][row + diag]`; zero outside the band or the matrix.
    pub fn band(&self, row: usize, diag: usize) -> f32 {
        if diag < self.width() && row + diag < self.size() {
            self.bands[[row, diag]]
        } else {
            0.0
        }
    }

    pub fn set_band(&mut self, row: usize, diag: usize, value: f32) {
        if diag < self.width() && row + diag < self.size() {
            self.bands[[row, diag]] = value;
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        let (row, diag) = if i <= j { (i, j - i) } else { (j, i - j) };
        self.band(row, diag)
    }

    pub fn multiply(&self, x: ArrayView1<f32>) -> Array1<f32> {
        let n = self.size().min(x.len());
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let mut acc = self.bands[[i, 0]] * x[i];
            for d in 1..self.width() {
                if i + d < n {
                    acc += self.bands[[i, d]] * x[i + d];
                }
                if i >= d {
                    acc += self.bands[[i - d, d]] * x[i - d];
                }
            }
            y[i] = acc;
        }
        y
    }

    /// `M += scale * v vᵀ`, restricted to the band.
    pub fn add_outer(&mut self, v: ArrayView1<f32>, scale: f32) {
        let n = self.size().min(v.len());
        for i in 0..n {
            for d in 0..self.width() {
                if i + d < n {
                    self.bands[[i, d]] += scale * v[i] * v[i + d];
                }
            }
        }
    }

    /// `xᵀ M x` for a short vector `x` placed at row `offset`.
    pub fn quadratic_form(&self, x: &[f32], offset: usize) -> f32 {
        let mut acc = 0.0;
        for (p, &xp) in x.iter().enumerate() {
            acc += xp * xp * self.band(offset + p, 0);
            for (d, &xq) in x.iter().enumerate().skip(p + 1).map(|(q, v)| (q - p, v)) {
                acc += 2.0 * xp * xq * self.band(offset + p, d);
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn multiply_matches_dense_product() {
        let mut matrix = BandedMatrix::zeros(4, 2);
        for i in 0..4 {
            matrix.set_band(i, 0, 2.0);
            matrix.set_band(i, 1, -1.0);
        }
        let y = matrix.multiply(array![1.0, 2.0, 3.0, 4.0].view());
        assert_eq!(y, array![0.0, 0.0, 0.0, 5.0]);
        assert_eq!(matrix.get(2, 1), -1.0);
        assert_eq!(matrix.get(0, 3), 0.0);
    }

    #[test]
    fn outer_product_and_quadratic_form_agree() {
        let mut matrix = BandedMatrix::identity(6, 3);
        let v = array![0.0, 0.6, 0.8, 0.0, 0.0, 0.0];
        matrix.add_outer(v.view(), -1.0);
        // (I - v vᵀ) v = 0 when v fits in the band.
        let projected = matrix.multiply(v.view());
        assert!(projected.iter().all(|x| x.abs() < 1e-6));
        assert!(matrix.quadratic_form(&[0.6, 0.8], 1).abs() < 1e-6);
        assert!((matrix.quadratic_form(&[1.0], 4) - 1.0).abs() < 1e-6);
    }
}
