use crate::core::cloud_mask::CloudMask;
use crate::core::coefficients::{
    CoefficientSelection, CwvCoefficientTable, SplitWindowCoefficients,
};
use crate::types::{LstError, LstResult, RasterGrid};

/// Split-window compositor parameters
#[derive(Debug, Clone, Default)]
pub struct CompositorParams {
    /// Ignore the CWV raster and evaluate every pixel with the whole-range
    /// coefficient set
    pub fixed_coefficients: bool,
}

/// Evaluates the split-window equation per pixel:
///
/// ```text
/// LST = b0 + (b1 + b2*(1-e)/e + b3*de/e^2) * (Ti+Tj)/2
///          + (b4 + b5*(1-e)/e + b6*de/e^2) * (Ti-Tj)/2
///          + b7 * (Ti-Tj)^2
/// ```
///
/// with `e` the average and `de` the delta of the two channel emissivities.
/// When the pixel's CWV falls in the overlap of two adjacent sub-ranges the
/// equation runs once per set and the two temperatures are averaged, which
/// keeps the LST field continuous across sub-range boundaries.
pub struct LstCompositor {
    table: CwvCoefficientTable,
    params: CompositorParams,
}

impl LstCompositor {
    pub fn new(table: CwvCoefficientTable, params: CompositorParams) -> Self {
        Self { table, params }
    }

    pub fn standard() -> Self {
        Self::new(CwvCoefficientTable::default(), CompositorParams::default())
    }

    /// The split-window equation for one pixel and one coefficient set
    pub fn evaluate_single(
        coefficients: &SplitWindowCoefficients,
        ti: f64,
        tj: f64,
        avg_emissivity: f64,
        delta_emissivity: f64,
    ) -> f64 {
        let [b0, b1, b2, b3, b4, b5, b6, b7] = coefficients.b;
        let emissivity_term = (1.0 - avg_emissivity) / avg_emissivity;
        let delta_term = delta_emissivity / (avg_emissivity * avg_emissivity);

        b0 + (b1 + b2 * emissivity_term + b3 * delta_term) * (ti + tj) / 2.0
            + (b4 + b5 * emissivity_term + b6 * delta_term) * (ti - tj) / 2.0
            + b7 * (ti - tj) * (ti - tj)
    }

    /// One pixel: select coefficients for its CWV and evaluate. Returns NaN
    /// for out-of-domain CWV or invalid inputs.
    pub fn evaluate_pixel(
        &self,
        ti: f32,
        tj: f32,
        avg_emissivity: f32,
        delta_emissivity: f32,
        cwv: f32,
    ) -> f32 {
        if !ti.is_finite() || !tj.is_finite() || !avg_emissivity.is_finite() || !delta_emissivity.is_finite() {
            return f32::NAN;
        }

        let selection = if self.params.fixed_coefficients {
            self.table.select_whole_range()
        } else {
            self.table.select(cwv)
        };

        match selection {
            CoefficientSelection::Single(set) => Self::evaluate_single(
                &set,
                ti as f64,
                tj as f64,
                avg_emissivity as f64,
                delta_emissivity as f64,
            ) as f32,
            CoefficientSelection::Blend(first, second) => {
                let lst_a = Self::evaluate_single(
                    &first,
                    ti as f64,
                    tj as f64,
                    avg_emissivity as f64,
                    delta_emissivity as f64,
                );
                let lst_b = Self::evaluate_single(
                    &second,
                    ti as f64,
                    tj as f64,
                    avg_emissivity as f64,
                    delta_emissivity as f64,
                );
                (0.5 * (lst_a + lst_b)) as f32
            }
            CoefficientSelection::OutOfDomain => f32::NAN,
        }
    }

    /// Produce the LST raster (Kelvin). Cloud-excluded, no-data-propagated
    /// and CWV-out-of-domain pixels yield no-data, never a fabricated value.
    pub fn compose(
        &self,
        ti: &RasterGrid,
        tj: &RasterGrid,
        avg_emissivity: &RasterGrid,
        delta_emissivity: &RasterGrid,
        cwv: &RasterGrid,
        mask: &CloudMask,
    ) -> LstResult<RasterGrid> {
        let dim = ti.dim();
        for (name, extent) in [
            ("Tj", tj.dim()),
            ("average emissivity", avg_emissivity.dim()),
            ("delta emissivity", delta_emissivity.dim()),
            ("CWV", cwv.dim()),
            ("cloud mask", mask.dim()),
        ] {
            if extent != dim {
                return Err(LstError::Processing(format!(
                    "{} extent {:?} does not match Ti extent {:?}",
                    name, extent, dim
                )));
            }
        }

        log::info!(
            "Estimating land surface temperature over a {}x{} grid{}",
            dim.0,
            dim.1,
            if self.params.fixed_coefficients {
                " (fixed whole-range coefficients)"
            } else {
                ""
            }
        );

        if self.params.fixed_coefficients {
            log::debug!(
                "Whole-range coefficient set, published RMSE {} K",
                self.table.whole_range().coefficients.rmse
            );
        }

        let mut lst = RasterGrid::from_elem(ti.raw_dim(), f32::NAN);
        let zip = ndarray::Zip::indexed(&mut lst)
            .and(ti)
            .and(tj)
            .and(avg_emissivity)
            .and(delta_emissivity);
        // ndarray's Zip tops out at six producers, so CWV is read by index
        let evaluate =
            |(row, col): (usize, usize), out: &mut f32, &ti: &f32, &tj: &f32, &avg: &f32, &delta: &f32| {
                if !mask.is_excluded(row, col) {
                    *out = self.evaluate_pixel(ti, tj, avg, delta, cwv[[row, col]]);
                }
            };
        #[cfg(feature = "parallel")]
        zip.par_for_each(evaluate);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(evaluate);

        let nodata = lst.iter().filter(|v| v.is_nan()).count();
        log::debug!("LST no-data for {} of {} cells", nodata, lst.len());
        Ok(lst)
    }
}

/// Kelvin to Celsius, as a pure post-pass preserving no-data
pub fn kelvin_to_celsius(lst: &RasterGrid) -> RasterGrid {
    lst.mapv(|v| v - 273.15)
}

/// Round to a fixed number of decimals, preserving no-data
pub fn round_decimals(lst: &RasterGrid, decimals: u32) -> RasterGrid {
    let scale = 10f32.powi(decimals as i32);
    lst.mapv(|v| if v.is_finite() { (v * scale).round() / scale } else { v })
}
