//! Metadata and raster input/output

pub mod mtl;
pub mod raster;

// Re-export main types
pub use mtl::MtlMetadata;
pub use raster::{RasterReader, RasterWriter};
