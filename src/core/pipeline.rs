use crate::core::calibrate::{CalibrationParams, RadiometricCalibrator};
use crate::core::cloud_mask::{CloudMask, DEFAULT_QA_CLOUD_VALUES};
use crate::core::coefficients::CwvCoefficientTable;
use crate::core::emissivity::{EmissivityLut, EmissivityRasters, EmissivityResolver};
use crate::core::split_window::{kelvin_to_celsius, round_decimals, CompositorParams, LstCompositor};
use crate::core::water_vapor::{ColumnWaterVaporEstimator, CwvParams, WindowStatistic};
use crate::types::{
    BandCalibration, ClassGrid, LandCoverClass, LstError, LstResult, RasterGrid,
};

/// One thermal channel input: raw digital numbers with their calibration
/// constants, or an already calibrated brightness temperature raster
#[derive(Debug, Clone)]
pub enum BandInput {
    DigitalNumbers {
        dn: RasterGrid,
        calibration: BandCalibration,
    },
    BrightnessTemperature(RasterGrid),
}

impl BandInput {
    fn dim(&self) -> (usize, usize) {
        match self {
            BandInput::DigitalNumbers { dn, .. } => dn.dim(),
            BandInput::BrightnessTemperature(bt) => bt.dim(),
        }
    }
}

/// Complete configuration of one processing run.
///
/// Mutually exclusive and missing options are rejected by [`validate`]
/// before any raster pass starts.
///
/// [`validate`]: LstPipelineConfig::validate
#[derive(Debug, Clone)]
pub struct LstPipelineConfig {
    /// Thermal channel i (TIRS band 10)
    pub band_i: BandInput,
    /// Thermal channel j (TIRS band 11)
    pub band_j: BandInput,

    /// Quality Assessment band for cloud screening
    pub qa_band: Option<ClassGrid>,
    /// QA pixel values marking cloud
    pub qa_cloud_values: Vec<u32>,
    /// Externally supplied cloud raster, applied as an inverted mask.
    /// Overrides the QA band.
    pub cloud_raster: Option<RasterGrid>,

    /// FROM-GLC land cover raster for per-pixel emissivity
    pub landcover: Option<ClassGrid>,
    /// Single land cover class for scene-wide constant emissivity.
    /// Mutually exclusive with `landcover`.
    pub fixed_landcover_class: Option<LandCoverClass>,
    /// Previously produced average emissivity raster, re-supplied to skip
    /// recomputation
    pub average_emissivity: Option<RasterGrid>,
    /// Previously produced delta emissivity raster
    pub delta_emissivity: Option<RasterGrid>,

    /// Spatial window size for CWV estimation (odd, >= 3)
    pub window_size: usize,
    /// Use the median instead of the mean as the window center statistic
    pub median_statistic: bool,
    /// Treat zero digital numbers as no-data
    pub zero_dn_is_nodata: bool,
    /// Skip CWV estimation and use the whole-range coefficient set
    pub fixed_coefficients: bool,
    /// Convert the final LST from Kelvin to Celsius
    pub celsius: bool,
    /// Round the final LST to two decimals
    pub rounding: bool,
}

impl LstPipelineConfig {
    /// A configuration with the recommended defaults, leaving only the band
    /// and emissivity inputs to fill in
    pub fn new(band_i: BandInput, band_j: BandInput) -> Self {
        Self {
            band_i,
            band_j,
            qa_band: None,
            qa_cloud_values: DEFAULT_QA_CLOUD_VALUES.to_vec(),
            cloud_raster: None,
            landcover: None,
            fixed_landcover_class: None,
            average_emissivity: None,
            delta_emissivity: None,
            window_size: 7,
            median_statistic: false,
            zero_dn_is_nodata: false,
            fixed_coefficients: false,
            celsius: false,
            rounding: false,
        }
    }

    /// Reject invalid and conflicting options before any raster pass
    pub fn validate(&self) -> LstResult<()> {
        if self.landcover.is_some() && self.fixed_landcover_class.is_some() {
            return Err(LstError::Configuration(
                "A land cover raster and a fixed land cover class are mutually exclusive"
                    .to_string(),
            ));
        }
        let precomputed = self.average_emissivity.is_some() && self.delta_emissivity.is_some();
        if self.landcover.is_none() && self.fixed_landcover_class.is_none() && !precomputed {
            return Err(LstError::Configuration(
                "No emissivity source: supply a land cover raster, a fixed class, \
                 or both precomputed emissivity rasters"
                    .to_string(),
            ));
        }
        if (self.average_emissivity.is_some() != self.delta_emissivity.is_some())
            && self.landcover.is_none()
            && self.fixed_landcover_class.is_none()
        {
            return Err(LstError::Configuration(
                "Average and delta emissivity rasters must be supplied together".to_string(),
            ));
        }
        if self.qa_band.is_some() && self.cloud_raster.is_some() {
            return Err(LstError::Configuration(
                "A QA band and an external cloud raster are mutually exclusive".to_string(),
            ));
        }
        if self.qa_band.is_some() && self.qa_cloud_values.is_empty() {
            return Err(LstError::Configuration(
                "QA cloud screening requires at least one QA pixel value".to_string(),
            ));
        }
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(LstError::Configuration(format!(
                "CWV window size must be an odd number >= 3, got {}",
                self.window_size
            )));
        }
        if self.band_i.dim() != self.band_j.dim() {
            return Err(LstError::Configuration(format!(
                "Thermal channel extents differ: {:?} vs {:?}",
                self.band_i.dim(),
                self.band_j.dim()
            )));
        }

        // every optional raster must share the thermal extent
        let dim = self.band_i.dim();
        let mut extents: Vec<(&str, (usize, usize))> = Vec::new();
        if let Some(qa) = &self.qa_band {
            extents.push(("QA band", qa.dim()));
        }
        if let Some(clouds) = &self.cloud_raster {
            extents.push(("cloud raster", clouds.dim()));
        }
        if let Some(landcover) = &self.landcover {
            extents.push(("land cover raster", landcover.dim()));
        }
        if let Some(average) = &self.average_emissivity {
            extents.push(("average emissivity raster", average.dim()));
        }
        if let Some(delta) = &self.delta_emissivity {
            extents.push(("delta emissivity raster", delta.dim()));
        }
        for (name, extent) in extents {
            if extent != dim {
                return Err(LstError::Configuration(format!(
                    "{} extent {:?} does not match the thermal extent {:?}",
                    name, extent, dim
                )));
            }
        }
        Ok(())
    }
}

/// All rasters produced by a run. Intermediates may be persisted and fed
/// back into later runs (emissivity in particular).
#[derive(Debug, Clone)]
pub struct LstProducts {
    pub brightness_temperature_i: RasterGrid,
    pub brightness_temperature_j: RasterGrid,
    pub emissivity: EmissivityRasters,
    pub cwv: RasterGrid,
    pub lst: RasterGrid,
}

/// End-to-end split-window processing: calibration, cloud screening,
/// emissivity, column water vapor, LST
pub struct LstPipeline {
    lut: EmissivityLut,
    table: CwvCoefficientTable,
}

impl LstPipeline {
    pub fn new(lut: EmissivityLut, table: CwvCoefficientTable) -> Self {
        Self { lut, table }
    }

    pub fn standard() -> Self {
        Self::new(EmissivityLut::default(), CwvCoefficientTable::default())
    }

    /// Run the whole pipeline. Per-pixel domain failures degrade to no-data;
    /// only configuration conflicts abort, and they do so before any raster
    /// pass begins.
    pub fn run(&self, config: LstPipelineConfig) -> LstResult<LstProducts> {
        config.validate()?;
        log::info!("Starting split-window LST processing");

        // 1. brightness temperatures
        let calibration_params = CalibrationParams {
            zero_dn_is_nodata: config.zero_dn_is_nodata,
        };
        let bt_i = self.brightness_temperature(&config.band_i, &calibration_params)?;
        let bt_j = self.brightness_temperature(&config.band_j, &calibration_params)?;
        let dim = bt_i.dim();

        // 2. cloud screening
        let mask = if let Some(clouds) = &config.cloud_raster {
            CloudMask::from_cloud_raster(clouds)
        } else if let Some(qa) = &config.qa_band {
            CloudMask::from_qa_band(qa, &config.qa_cloud_values)?
        } else {
            log::debug!("No cloud screening requested");
            CloudMask::clear(dim)
        };

        // 3. land surface emissivities
        let emissivity = self.resolve_emissivity(&config, dim)?;

        // 4. column water vapor
        let cwv = if config.fixed_coefficients {
            log::info!("Fixed-coefficient mode: skipping column water vapor estimation");
            RasterGrid::from_elem(dim, f32::NAN)
        } else {
            let estimator = ColumnWaterVaporEstimator::new(CwvParams {
                window_size: config.window_size,
                statistic: if config.median_statistic {
                    WindowStatistic::Median
                } else {
                    WindowStatistic::Mean
                },
                ..CwvParams::default()
            })?;
            estimator.estimate(&bt_i, &bt_j, &mask)?
        };

        // 5. land surface temperature
        let compositor = LstCompositor::new(
            self.table.clone(),
            CompositorParams {
                fixed_coefficients: config.fixed_coefficients,
            },
        );
        let mut lst = compositor.compose(
            &bt_i,
            &bt_j,
            &emissivity.average,
            &emissivity.delta,
            &cwv,
            &mask,
        )?;

        // post-passes
        if config.rounding {
            lst = round_decimals(&lst, 2);
        }
        if config.celsius {
            log::info!("Converting LST to Celsius");
            lst = kelvin_to_celsius(&lst);
        }

        log::info!("Split-window LST processing completed");
        Ok(LstProducts {
            brightness_temperature_i: bt_i,
            brightness_temperature_j: bt_j,
            emissivity,
            cwv,
            lst,
        })
    }

    fn brightness_temperature(
        &self,
        band: &BandInput,
        params: &CalibrationParams,
    ) -> LstResult<RasterGrid> {
        match band {
            BandInput::DigitalNumbers { dn, calibration } => {
                let calibrator = RadiometricCalibrator::new(*calibration, params.clone());
                calibrator.brightness_temperature(dn)
            }
            BandInput::BrightnessTemperature(bt) => {
                log::debug!("Brightness temperature supplied directly, skipping calibration");
                Ok(bt.clone())
            }
        }
    }

    fn resolve_emissivity(
        &self,
        config: &LstPipelineConfig,
        dim: (usize, usize),
    ) -> LstResult<EmissivityRasters> {
        // precomputed rasters short-circuit the derivation entirely
        if let (Some(average), Some(delta)) =
            (&config.average_emissivity, &config.delta_emissivity)
        {
            log::info!("Using precomputed average and delta emissivity rasters");
            return Ok(EmissivityRasters {
                average: average.clone(),
                delta: delta.clone(),
            });
        }

        let resolver = EmissivityResolver::new(self.lut.clone());
        let mut emissivity = if let Some(class) = config.fixed_landcover_class {
            resolver.resolve_fixed_class(class, dim)?
        } else if let Some(landcover) = &config.landcover {
            resolver.resolve_landcover(landcover)?
        } else {
            // validate() guarantees an emissivity source exists
            return Err(LstError::Configuration(
                "No emissivity source available".to_string(),
            ));
        };

        // a single precomputed raster may still override its derived half
        if let Some(average) = &config.average_emissivity {
            log::debug!("Overriding derived average emissivity with the supplied raster");
            emissivity.average = average.clone();
        }
        if let Some(delta) = &config.delta_emissivity {
            log::debug!("Overriding derived delta emissivity with the supplied raster");
            emissivity.delta = delta.clone();
        }
        Ok(emissivity)
    }
}
