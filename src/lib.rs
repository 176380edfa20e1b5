//! swlst: A Fast, Modular Split-Window Land Surface Temperature Processor
//!
//! This library estimates land surface temperature from the two thermal
//! channels of Landsat 8 (TIRS bands 10 and 11) with the split-window
//! algorithm of Du et al. (2015): radiometric calibration, cloud screening,
//! land-cover driven emissivity, column water vapor retrieval and the final
//! coefficient-blended temperature estimate.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    BandCalibration, ClassGrid, GeoTransform, LandCoverClass, LstError, LstResult, MaskGrid,
    RasterGrid,
};

pub use io::{MtlMetadata, RasterReader, RasterWriter};

pub use core::{
    BandInput, CloudMask, ColumnWaterVaporEstimator, CwvCoefficientTable, EmissivityLut,
    EmissivityResolver, LstCompositor, LstPipeline, LstPipelineConfig, LstProducts,
    RadiometricCalibrator,
};
