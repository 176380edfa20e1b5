use crate::core::cloud_mask::CloudMask;
use crate::types::{LstError, LstResult, RasterGrid};

/// Regression constants of the MSWCVR model (Du et al. 2015):
/// `CWV = c0 + c1 * Rji + c2 * Rji^2`
pub const CWV_C0: f64 = -9.674;
pub const CWV_C1: f64 = 0.653;
pub const CWV_C2: f64 = 9.087;

/// Window center statistic for the transmittance ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatistic {
    Mean,
    Median,
}

/// Column water vapor estimation parameters
#[derive(Debug, Clone)]
pub struct CwvParams {
    /// Odd spatial window size n (an n x n neighborhood per pixel).
    /// Larger windows stabilize the covariance ratio but over-smooth
    /// fine-scale atmospheric variation.
    pub window_size: usize,
    /// Minimum number of valid neighborhood cells below which the
    /// estimate is degenerate and the pixel is marked no-data
    pub min_valid_cells: usize,
    /// Statistic used for the window centers of Ti and Tj
    pub statistic: WindowStatistic,
}

impl Default for CwvParams {
    fn default() -> Self {
        Self {
            window_size: 7,
            min_valid_cells: 4,
            statistic: WindowStatistic::Mean,
        }
    }
}

/// Running sums over a window of valid cells. Enough to reconstruct the
/// covariance-variance ratio without touching the cells again:
///
/// `Rji = (S_ij - S_i * S_j / N) / (S_ii - S_i^2 / N)`
#[derive(Debug, Clone, Copy, Default)]
struct WindowSums {
    sum_ti: f64,
    sum_tj: f64,
    sum_titi: f64,
    sum_titj: f64,
    count: usize,
}

impl WindowSums {
    fn add(&mut self, other: &WindowSums) {
        self.sum_ti += other.sum_ti;
        self.sum_tj += other.sum_tj;
        self.sum_titi += other.sum_titi;
        self.sum_titj += other.sum_titj;
        self.count += other.count;
    }

    fn subtract(&mut self, other: &WindowSums) {
        self.sum_ti -= other.sum_ti;
        self.sum_tj -= other.sum_tj;
        self.sum_titi -= other.sum_titi;
        self.sum_titj -= other.sum_titj;
        self.count -= other.count;
    }

    fn accumulate(&mut self, ti: f64, tj: f64) {
        self.sum_ti += ti;
        self.sum_tj += tj;
        self.sum_titi += ti * ti;
        self.sum_titj += ti * tj;
        self.count += 1;
    }
}

/// Estimates atmospheric column water vapor from the two TIRS brightness
/// temperature bands with the modified split-window covariance-variance
/// ratio (MSWCVR) method.
///
/// The method assumes the atmosphere is unchanged over the neighboring
/// pixels and relates the CWV to the ratio of the upward transmittances in
/// the two bands, computable from the window statistics of the two
/// brightness temperatures.
pub struct ColumnWaterVaporEstimator {
    params: CwvParams,
}

impl ColumnWaterVaporEstimator {
    /// Create an estimator, validating the window specification up front
    pub fn new(params: CwvParams) -> LstResult<Self> {
        if params.window_size < 3 || params.window_size % 2 == 0 {
            return Err(LstError::Configuration(format!(
                "CWV window size must be an odd number >= 3, got {}",
                params.window_size
            )));
        }
        if params.min_valid_cells < 2 {
            return Err(LstError::Configuration(
                "CWV estimation needs at least 2 valid cells per window".to_string(),
            ));
        }
        Ok(Self { params })
    }

    /// Create an estimator with the recommended 7x7 window
    pub fn standard() -> Self {
        Self {
            params: CwvParams::default(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.params.window_size
    }

    /// Estimate CWV (g/cm^2) per pixel. Cloud-excluded and no-data cells are
    /// skipped both as window members and as window centers; pixels whose
    /// neighborhood is degenerate come back as no-data.
    pub fn estimate(
        &self,
        ti: &RasterGrid,
        tj: &RasterGrid,
        mask: &CloudMask,
    ) -> LstResult<RasterGrid> {
        if ti.dim() != tj.dim() || ti.dim() != mask.dim() {
            return Err(LstError::Processing(format!(
                "Brightness temperature and mask extents differ: {:?}, {:?}, {:?}",
                ti.dim(),
                tj.dim(),
                mask.dim()
            )));
        }

        log::info!(
            "Estimating column water vapor over a {}x{} grid ({}x{} window, {:?} statistic)",
            ti.nrows(),
            ti.ncols(),
            self.params.window_size,
            self.params.window_size,
            self.params.statistic
        );

        let mut cwv = RasterGrid::from_elem(ti.raw_dim(), f32::NAN);

        #[cfg(feature = "parallel")]
        {
            use ndarray::Axis;
            use rayon::prelude::*;
            cwv.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(row, mut out)| {
                    self.fill_row(row, out.as_slice_mut().expect("row is contiguous"), ti, tj, mask);
                });
        }
        #[cfg(not(feature = "parallel"))]
        {
            use ndarray::Axis;
            for (row, mut out) in cwv.axis_iter_mut(Axis(0)).enumerate() {
                self.fill_row(row, out.as_slice_mut().expect("row is contiguous"), ti, tj, mask);
            }
        }

        let undefined = cwv.iter().filter(|v| v.is_nan()).count();
        log::debug!("CWV undefined for {} of {} cells", undefined, cwv.len());
        Ok(cwv)
    }

    /// Compute one output row. The window slides horizontally over
    /// per-column partial sums so each cell costs O(window) instead of
    /// O(window^2).
    fn fill_row(
        &self,
        row: usize,
        out: &mut [f32],
        ti: &RasterGrid,
        tj: &RasterGrid,
        mask: &CloudMask,
    ) {
        let (rows, cols) = ti.dim();
        let half = self.params.window_size / 2;

        let row_lo = row.saturating_sub(half);
        let row_hi = (row + half).min(rows - 1);

        // partial sums per column over the clipped row band
        let mut columns = vec![WindowSums::default(); cols];
        for r in row_lo..=row_hi {
            for (c, sums) in columns.iter_mut().enumerate() {
                if mask.is_excluded(r, c) {
                    continue;
                }
                let vi = ti[[r, c]];
                let vj = tj[[r, c]];
                if vi.is_finite() && vj.is_finite() {
                    sums.accumulate(vi as f64, vj as f64);
                }
            }
        }

        let mut window = WindowSums::default();
        for c in 0..=half.min(cols - 1) {
            window.add(&columns[c]);
        }

        for c in 0..cols {
            if c > 0 {
                let entering = c + half;
                if entering < cols {
                    window.add(&columns[entering]);
                }
                if c > half {
                    window.subtract(&columns[c - half - 1]);
                }
            }

            // excluded or invalid centers stay no-data
            if mask.is_excluded(row, c) || !ti[[row, c]].is_finite() || !tj[[row, c]].is_finite() {
                continue;
            }

            out[c] = match self.params.statistic {
                WindowStatistic::Mean => self.cwv_from_sums(&window),
                WindowStatistic::Median => {
                    self.cwv_from_median_window(row, c, ti, tj, mask)
                }
            };
        }
    }

    /// CWV from accumulated window sums (mean-centered ratio)
    fn cwv_from_sums(&self, window: &WindowSums) -> f32 {
        if window.count < self.params.min_valid_cells {
            return f32::NAN;
        }
        let n = window.count as f64;
        let denominator = window.sum_titi - window.sum_ti * window.sum_ti / n;
        if !(denominator > 0.0) {
            return f32::NAN;
        }
        let numerator = window.sum_titj - window.sum_ti * window.sum_tj / n;
        Self::cwv_from_ratio(numerator / denominator)
    }

    /// CWV with median-centered deviations; recomputed per window since
    /// medians do not accumulate
    fn cwv_from_median_window(
        &self,
        row: usize,
        col: usize,
        ti: &RasterGrid,
        tj: &RasterGrid,
        mask: &CloudMask,
    ) -> f32 {
        let (rows, cols) = ti.dim();
        let half = self.params.window_size / 2;
        let row_lo = row.saturating_sub(half);
        let row_hi = (row + half).min(rows - 1);
        let col_lo = col.saturating_sub(half);
        let col_hi = (col + half).min(cols - 1);

        let mut values_ti = Vec::with_capacity(self.params.window_size * self.params.window_size);
        let mut values_tj = Vec::with_capacity(values_ti.capacity());
        for r in row_lo..=row_hi {
            for c in col_lo..=col_hi {
                if mask.is_excluded(r, c) {
                    continue;
                }
                let vi = ti[[r, c]];
                let vj = tj[[r, c]];
                if vi.is_finite() && vj.is_finite() {
                    values_ti.push(vi as f64);
                    values_tj.push(vj as f64);
                }
            }
        }
        if values_ti.len() < self.params.min_valid_cells {
            return f32::NAN;
        }

        let median_ti = median(&mut values_ti.clone());
        let median_tj = median(&mut values_tj.clone());

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (&vi, &vj) in values_ti.iter().zip(values_tj.iter()) {
            let di = vi - median_ti;
            numerator += di * (vj - median_tj);
            denominator += di * di;
        }
        if !(denominator > 0.0) {
            return f32::NAN;
        }
        Self::cwv_from_ratio(numerator / denominator)
    }

    fn cwv_from_ratio(ratio_ji: f64) -> f32 {
        (CWV_C0 + CWV_C1 * ratio_ji + CWV_C2 * ratio_ji * ratio_ji) as f32
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).expect("window values are finite"));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    /// Straightforward per-window reference implementation
    fn naive_cwv(
        ti: &RasterGrid,
        tj: &RasterGrid,
        mask: &CloudMask,
        window_size: usize,
        min_valid: usize,
    ) -> RasterGrid {
        let (rows, cols) = ti.dim();
        let half = window_size / 2;
        let mut cwv = RasterGrid::from_elem((rows, cols), f32::NAN);
        for row in 0..rows {
            for col in 0..cols {
                if mask.is_excluded(row, col)
                    || !ti[[row, col]].is_finite()
                    || !tj[[row, col]].is_finite()
                {
                    continue;
                }
                let mut pairs = Vec::new();
                for r in row.saturating_sub(half)..=(row + half).min(rows - 1) {
                    for c in col.saturating_sub(half)..=(col + half).min(cols - 1) {
                        if !mask.is_excluded(r, c)
                            && ti[[r, c]].is_finite()
                            && tj[[r, c]].is_finite()
                        {
                            pairs.push((ti[[r, c]] as f64, tj[[r, c]] as f64));
                        }
                    }
                }
                if pairs.len() < min_valid {
                    continue;
                }
                let n = pairs.len() as f64;
                let mean_i = pairs.iter().map(|p| p.0).sum::<f64>() / n;
                let mean_j = pairs.iter().map(|p| p.1).sum::<f64>() / n;
                let numerator: f64 = pairs.iter().map(|p| (p.0 - mean_i) * (p.1 - mean_j)).sum();
                let denominator: f64 = pairs.iter().map(|p| (p.0 - mean_i).powi(2)).sum();
                if denominator > 0.0 {
                    let rji = numerator / denominator;
                    cwv[[row, col]] = (CWV_C0 + CWV_C1 * rji + CWV_C2 * rji * rji) as f32;
                }
            }
        }
        cwv
    }

    /// Ti field with spatial texture, Tj affinely related so the covariance
    /// ratio equals the slope everywhere
    fn correlated_bands(rows: usize, cols: usize, slope: f32) -> (RasterGrid, RasterGrid) {
        let ti = Array2::from_shape_fn((rows, cols), |(r, c)| {
            280.0 + ((r * 7 + c * 3) % 11) as f32 * 0.37 + (r as f32 * 0.05)
        });
        let tj = ti.mapv(|v| 12.0 + slope * v);
        (ti, tj)
    }

    #[test]
    fn test_affine_bands_recover_slope() {
        // Rji equals the affine slope, so CWV is the model polynomial at it
        let slope = 1.05;
        let (ti, tj) = correlated_bands(9, 9, slope);
        let estimator = ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 5,
            ..CwvParams::default()
        })
        .unwrap();
        let cwv = estimator
            .estimate(&ti, &tj, &CloudMask::clear((9, 9)))
            .unwrap();

        let s = slope as f64;
        let expected = (CWV_C0 + CWV_C1 * s + CWV_C2 * s * s) as f32;
        for &value in cwv.iter() {
            assert_relative_eq!(value, expected, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_matches_naive_reference() {
        let (ti, mut tj) = correlated_bands(12, 10, 0.98);
        // break the perfect correlation so windows differ from each other
        for (index, value) in tj.iter_mut().enumerate() {
            *value += ((index * 13) % 7) as f32 * 0.11;
        }
        // sprinkle exclusions and no-data
        let mut qa = Array2::zeros((12, 10));
        qa[[3, 3]] = 61440_u32;
        qa[[8, 1]] = 61440_u32;
        let mask = CloudMask::from_qa_band(&qa, &[61440]).unwrap();
        let mut ti = ti;
        ti[[5, 5]] = f32::NAN;

        let estimator = ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 5,
            ..CwvParams::default()
        })
        .unwrap();
        let fast = estimator.estimate(&ti, &tj, &mask).unwrap();
        let slow = naive_cwv(&ti, &tj, &mask, 5, 4);

        for (&f, &s) in fast.iter().zip(slow.iter()) {
            if s.is_nan() {
                assert!(f.is_nan());
            } else {
                assert_relative_eq!(f, s, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_constant_band_has_zero_variance() {
        let ti = Array2::from_elem((7, 7), 285.0_f32);
        let tj = Array2::from_elem((7, 7), 284.0_f32);
        let estimator = ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 3,
            ..CwvParams::default()
        })
        .unwrap();
        let cwv = estimator
            .estimate(&ti, &tj, &CloudMask::clear((7, 7)))
            .unwrap();
        assert!(cwv.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_all_cloud_neighborhood_is_nodata() {
        let (ti, tj) = correlated_bands(7, 7, 1.02);
        // everything cloudy except the center pixel: its window holds a
        // single valid cell, below the minimum
        let mut clouds = Array2::from_elem((7, 7), 1.0_f32);
        clouds[[3, 3]] = 0.0;
        let mask = CloudMask::from_cloud_raster(&clouds);

        let estimator = ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 3,
            ..CwvParams::default()
        })
        .unwrap();
        let cwv = estimator.estimate(&ti, &tj, &mask).unwrap();
        assert!(cwv.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_median_statistic_matches_on_affine_bands() {
        // medians are preserved under a positive affine map, so the
        // median-centered ratio also recovers the slope
        let slope = 1.08;
        let (ti, tj) = correlated_bands(9, 9, slope);
        let estimator = ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 5,
            statistic: WindowStatistic::Median,
            ..CwvParams::default()
        })
        .unwrap();
        let cwv = estimator
            .estimate(&ti, &tj, &CloudMask::clear((9, 9)))
            .unwrap();

        let s = slope as f64;
        let expected = (CWV_C0 + CWV_C1 * s + CWV_C2 * s * s) as f32;
        for &value in cwv.iter() {
            assert_relative_eq!(value, expected, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_window_validation() {
        assert!(ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 4,
            ..CwvParams::default()
        })
        .is_err());
        assert!(ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 1,
            ..CwvParams::default()
        })
        .is_err());
        assert!(ColumnWaterVaporEstimator::new(CwvParams {
            window_size: 9,
            ..CwvParams::default()
        })
        .is_ok());
    }

    #[test]
    fn test_extent_mismatch() {
        let ti = Array2::zeros((4, 4));
        let tj = Array2::zeros((4, 5));
        let estimator = ColumnWaterVaporEstimator::standard();
        assert!(estimator
            .estimate(&ti, &tj, &CloudMask::clear((4, 4)))
            .is_err());
    }
}
