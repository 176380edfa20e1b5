use crate::types::{BandCalibration, LstResult, RasterGrid};
use ndarray::Zip;

/// Radiometric calibration parameters
#[derive(Debug, Clone)]
pub struct CalibrationParams {
    /// Treat zero digital numbers as no-data (scene fill around the footprint)
    pub zero_dn_is_nodata: bool,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            zero_dn_is_nodata: false,
        }
    }
}

/// Converts raw thermal digital numbers to at-sensor brightness temperature.
///
/// The two-step rescaling follows the Landsat 8 handbook:
///
/// - spectral radiance:       `L = mult * DN + add`
/// - brightness temperature:  `T = K2 / ln(K1 / L + 1)`
///
/// Cells whose radiance leaves the logarithm's domain are marked no-data
/// instead of aborting the pass.
pub struct RadiometricCalibrator {
    band: BandCalibration,
    params: CalibrationParams,
}

impl RadiometricCalibrator {
    /// Create a calibrator for one thermal band
    pub fn new(band: BandCalibration, params: CalibrationParams) -> Self {
        Self { band, params }
    }

    /// Create a calibrator with default parameters
    pub fn standard(band: BandCalibration) -> Self {
        Self::new(band, CalibrationParams::default())
    }

    /// Rescale digital numbers to top-of-atmosphere spectral radiance
    pub fn dn_to_radiance(&self, dn: &RasterGrid) -> RasterGrid {
        log::debug!(
            "Rescaling digital numbers to spectral radiance (mult={}, add={})",
            self.band.radiance_mult,
            self.band.radiance_add
        );

        let mult = self.band.radiance_mult;
        let add = self.band.radiance_add;
        let zero_is_nodata = self.params.zero_dn_is_nodata;

        let mut radiance = RasterGrid::zeros(dn.raw_dim());
        let zip = Zip::from(&mut radiance).and(dn);
        let rescale = |out: &mut f32, &value: &f32| {
            *out = if !value.is_finite() || (zero_is_nodata && value == 0.0) {
                f32::NAN
            } else {
                (mult * value as f64 + add) as f32
            };
        };
        #[cfg(feature = "parallel")]
        zip.par_for_each(rescale);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(rescale);
        radiance
    }

    /// Convert spectral radiance to at-sensor brightness temperature (K)
    pub fn radiance_to_brightness_temperature(&self, radiance: &RasterGrid) -> RasterGrid {
        log::debug!(
            "Converting spectral radiance to at-sensor temperature (K1={}, K2={})",
            self.band.k1,
            self.band.k2
        );

        let k1 = self.band.k1;
        let k2 = self.band.k2;

        let mut temperature = RasterGrid::zeros(radiance.raw_dim());
        let zip = Zip::from(&mut temperature).and(radiance);
        let invert = |out: &mut f32, &value: &f32| {
            *out = Self::cell_temperature(value as f64, k1, k2);
        };
        #[cfg(feature = "parallel")]
        zip.par_for_each(invert);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(invert);
        temperature
    }

    /// Full calibration: digital numbers to brightness temperature
    pub fn brightness_temperature(&self, dn: &RasterGrid) -> LstResult<RasterGrid> {
        log::info!(
            "Calibrating {}x{} digital number raster to brightness temperature",
            dn.nrows(),
            dn.ncols()
        );
        let radiance = self.dn_to_radiance(dn);
        let temperature = self.radiance_to_brightness_temperature(&radiance);

        let invalid = temperature.iter().filter(|v| v.is_nan()).count();
        if invalid > 0 {
            log::debug!("{} cells outside the calibration domain", invalid);
        }
        Ok(temperature)
    }

    /// Planck inversion for a single cell. Non-positive radiance and
    /// non-positive logarithm arguments are domain failures, not panics.
    fn cell_temperature(radiance: f64, k1: f64, k2: f64) -> f32 {
        if !radiance.is_finite() || radiance <= 0.0 {
            return f32::NAN;
        }
        let argument = k1 / radiance + 1.0;
        if argument <= 0.0 {
            return f32::NAN;
        }
        let ln = argument.ln();
        if ln == 0.0 {
            return f32::NAN;
        }
        (k2 / ln) as f32
    }
}
