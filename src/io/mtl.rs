use crate::types::{BandCalibration, LstError, LstResult};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Parsed Landsat 8 MTL metadata file.
///
/// The MTL format is flat `KEY = VALUE` text grouped in named blocks; the
/// parser keeps every key and exposes typed accessors for the handful the
/// split-window pipeline needs.
#[derive(Debug, Clone)]
pub struct MtlMetadata {
    fields: HashMap<String, String>,
}

impl MtlMetadata {
    /// Read and parse an MTL metadata file
    pub fn from_file<P: AsRef<Path>>(path: P) -> LstResult<Self> {
        log::info!("Reading MTL metadata from: {}", path.as_ref().display());
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str_content(&content)
    }

    /// Parse MTL metadata from its text content
    pub fn from_str_content(content: &str) -> LstResult<Self> {
        // KEY = VALUE, values optionally double-quoted
        let line_re = Regex::new(r#"^\s*([A-Z0-9_]+)\s*=\s*"?([^"]*?)"?\s*$"#)
            .map_err(|e| LstError::Metadata(format!("Invalid MTL line pattern: {}", e)))?;

        let mut fields = HashMap::new();
        for line in content.lines() {
            if let Some(captures) = line_re.captures(line) {
                let key = captures[1].to_string();
                if key == "GROUP" || key == "END_GROUP" {
                    continue;
                }
                fields.insert(key, captures[2].to_string());
            }
        }

        if fields.is_empty() {
            return Err(LstError::Metadata(
                "No KEY = VALUE pairs found, not an MTL file".to_string(),
            ));
        }
        log::debug!("Parsed {} MTL fields", fields.len());
        Ok(Self { fields })
    }

    /// Raw string value of a metadata field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn float_field(&self, key: &str) -> LstResult<f64> {
        let raw = self
            .field(key)
            .ok_or_else(|| LstError::Metadata(format!("Missing MTL field: {}", key)))?;
        raw.parse::<f64>()
            .map_err(|_| LstError::Metadata(format!("MTL field {} is not a number: {}", key, raw)))
    }

    /// Radiometric calibration constants for one band
    pub fn band_calibration(&self, band: u8) -> LstResult<BandCalibration> {
        Ok(BandCalibration {
            radiance_mult: self.float_field(&format!("RADIANCE_MULT_BAND_{}", band))?,
            radiance_add: self.float_field(&format!("RADIANCE_ADD_BAND_{}", band))?,
            k1: self.float_field(&format!("K1_CONSTANT_BAND_{}", band))?,
            k2: self.float_field(&format!("K2_CONSTANT_BAND_{}", band))?,
        })
    }

    /// Landsat scene identifier
    pub fn scene_id(&self) -> Option<&str> {
        self.field("LANDSAT_SCENE_ID")
    }

    /// Acquisition date (YYYY-MM-DD)
    pub fn acquisition_date(&self) -> LstResult<chrono::NaiveDate> {
        let raw = self
            .field("DATE_ACQUIRED")
            .ok_or_else(|| LstError::Metadata("Missing MTL field: DATE_ACQUIRED".to_string()))?;
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| LstError::Metadata(format!("Invalid DATE_ACQUIRED {}: {}", raw, e)))
    }
}
