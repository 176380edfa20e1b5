use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued raster data (brightness temperature, emissivity, CWV, LST).
/// Invalid / no-data cells are carried as `f32::NAN`.
pub type RasterGrid = Array2<f32>;

/// Categorical raster data (land cover codes, QA flags)
pub type ClassGrid = Array2<u32>;

/// Per-cell exclusion mask (true = excluded from statistics and output)
pub type MaskGrid = Array2<bool>;

/// Per-band radiometric calibration constants, as published in the
/// Landsat 8 MTL metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandCalibration {
    /// Band-specific multiplicative rescaling factor (RADIANCE_MULT_BAND_x)
    pub radiance_mult: f64,
    /// Band-specific additive rescaling factor (RADIANCE_ADD_BAND_x)
    pub radiance_add: f64,
    /// Thermal conversion constant K1 (K1_CONSTANT_BAND_x)
    pub k1: f64,
    /// Thermal conversion constant K2 (K2_CONSTANT_BAND_x)
    pub k2: f64,
}

/// Land cover classes of the FROM-GLC classification scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandCoverClass {
    Cropland,
    Forest,
    Grasslands,
    Shrublands,
    Wetlands,
    Waterbodies,
    Tundra,
    Impervious,
    BarrenLand,
    SnowIce,
}

impl LandCoverClass {
    /// All classes, in legend order
    pub const ALL: [LandCoverClass; 10] = [
        LandCoverClass::Cropland,
        LandCoverClass::Forest,
        LandCoverClass::Grasslands,
        LandCoverClass::Shrublands,
        LandCoverClass::Wetlands,
        LandCoverClass::Waterbodies,
        LandCoverClass::Tundra,
        LandCoverClass::Impervious,
        LandCoverClass::BarrenLand,
        LandCoverClass::SnowIce,
    ];

    /// Map a FROM-GLC level-2 numeric code to its class.
    ///
    /// Sub-codes fold into their level-1 class, with the legend's documented
    /// exceptions: 51 and 72 behave as Grasslands, 71 as Shrublands, 52 as
    /// BarrenLand. Cloud (120) and any unknown code yield `None`.
    pub fn from_glc_code(code: u32) -> Option<LandCoverClass> {
        match code {
            51 | 72 => Some(LandCoverClass::Grasslands),
            71 => Some(LandCoverClass::Shrublands),
            52 => Some(LandCoverClass::BarrenLand),
            10..=19 => Some(LandCoverClass::Cropland),
            20..=29 => Some(LandCoverClass::Forest),
            30..=39 => Some(LandCoverClass::Grasslands),
            40..=49 => Some(LandCoverClass::Shrublands),
            50 => Some(LandCoverClass::Wetlands),
            60..=69 => Some(LandCoverClass::Waterbodies),
            70 => Some(LandCoverClass::Tundra),
            80..=89 => Some(LandCoverClass::Impervious),
            90..=99 => Some(LandCoverClass::BarrenLand),
            100..=119 => Some(LandCoverClass::SnowIce),
            _ => None,
        }
    }
}

impl std::fmt::Display for LandCoverClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LandCoverClass::Cropland => "Cropland",
            LandCoverClass::Forest => "Forest",
            LandCoverClass::Grasslands => "Grasslands",
            LandCoverClass::Shrublands => "Shrublands",
            LandCoverClass::Wetlands => "Wetlands",
            LandCoverClass::Waterbodies => "Waterbodies",
            LandCoverClass::Tundra => "Tundra",
            LandCoverClass::Impervious => "Impervious",
            LandCoverClass::BarrenLand => "Barren_Land",
            LandCoverClass::SnowIce => "Snow_and_ice",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for LandCoverClass {
    type Err = LstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cropland" => Ok(LandCoverClass::Cropland),
            "Forest" => Ok(LandCoverClass::Forest),
            "Grasslands" => Ok(LandCoverClass::Grasslands),
            "Shrublands" => Ok(LandCoverClass::Shrublands),
            "Wetlands" => Ok(LandCoverClass::Wetlands),
            "Waterbodies" => Ok(LandCoverClass::Waterbodies),
            "Tundra" => Ok(LandCoverClass::Tundra),
            "Impervious" => Ok(LandCoverClass::Impervious),
            "Barren_Land" | "BarrenLand" => Ok(LandCoverClass::BarrenLand),
            "Snow_and_ice" | "SnowIce" => Ok(LandCoverClass::SnowIce),
            _ => Err(LstError::Configuration(format!(
                "Unknown land cover class name: {}",
                s
            ))),
        }
    }
}

/// Geospatial transformation parameters carried through raster I/O
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

/// Error types for LST processing
#[derive(Debug, thiserror::Error)]
pub enum LstError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for LST operations
pub type LstResult<T> = Result<T, LstError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glc_code_grouping() {
        assert_eq!(
            LandCoverClass::from_glc_code(11),
            Some(LandCoverClass::Cropland)
        );
        assert_eq!(
            LandCoverClass::from_glc_code(24),
            Some(LandCoverClass::Forest)
        );
        // herbaceous wetland and sparse tundra fold into grasslands
        assert_eq!(
            LandCoverClass::from_glc_code(51),
            Some(LandCoverClass::Grasslands)
        );
        assert_eq!(
            LandCoverClass::from_glc_code(72),
            Some(LandCoverClass::Grasslands)
        );
        assert_eq!(
            LandCoverClass::from_glc_code(52),
            Some(LandCoverClass::BarrenLand)
        );
        assert_eq!(
            LandCoverClass::from_glc_code(102),
            Some(LandCoverClass::SnowIce)
        );
        // cloud code is not a land cover class
        assert_eq!(LandCoverClass::from_glc_code(120), None);
        assert_eq!(LandCoverClass::from_glc_code(0), None);
    }

    #[test]
    fn test_class_name_round_trip() {
        for class in LandCoverClass::ALL {
            let parsed: LandCoverClass = class.to_string().parse().unwrap();
            assert_eq!(parsed, class);
        }
        assert!("Ocean".parse::<LandCoverClass>().is_err());
    }
}
