//! Core split-window LST processing modules

pub mod calibrate;
pub mod cloud_mask;
pub mod coefficients;
pub mod emissivity;
pub mod pipeline;
pub mod split_window;
pub mod water_vapor;

// Re-export main types
pub use calibrate::{CalibrationParams, RadiometricCalibrator};
pub use cloud_mask::{CloudMask, DEFAULT_QA_CLOUD_VALUES};
pub use coefficients::{
    CoefficientSelection, CwvCoefficientTable, CwvSubrange, SplitWindowCoefficients,
};
pub use emissivity::{
    ChannelEmissivity, EmissivityLut, EmissivityRasters, EmissivityResolver,
};
pub use pipeline::{BandInput, LstPipeline, LstPipelineConfig, LstProducts};
pub use split_window::{kelvin_to_celsius, round_decimals, CompositorParams, LstCompositor};
pub use water_vapor::{ColumnWaterVaporEstimator, CwvParams, WindowStatistic};
