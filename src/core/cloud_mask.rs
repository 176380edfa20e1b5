use crate::types::{ClassGrid, LstError, LstResult, MaskGrid, RasterGrid};
use ndarray::Zip;

/// Default QA pixel value flagging high-confidence cloud
/// (source: Landsat 8 Quality Assessment band documentation)
pub const DEFAULT_QA_CLOUD_VALUES: [u32; 1] = [61440];

/// Per-cell cloud exclusion derived from the QA band or from an externally
/// supplied cloud raster.
///
/// The mask never carries a numeric value of its own; it only marks cells
/// that downstream statistics and output must skip.
#[derive(Debug, Clone)]
pub struct CloudMask {
    excluded: MaskGrid,
}

impl CloudMask {
    /// Build a mask from the Quality Assessment band: cells whose QA value
    /// equals one of the configured pixel values are excluded.
    pub fn from_qa_band(qa: &ClassGrid, qa_values: &[u32]) -> LstResult<Self> {
        if qa_values.is_empty() {
            return Err(LstError::Configuration(
                "QA cloud screening requires at least one QA pixel value".to_string(),
            ));
        }
        log::info!("Screening clouds with QA pixel values {:?}", qa_values);

        let mut excluded = MaskGrid::from_elem(qa.raw_dim(), false);
        Zip::from(&mut excluded).and(qa).for_each(|out, value| {
            *out = qa_values.contains(value);
        });

        let mask = Self { excluded };
        log::debug!("QA screening excluded {} cells", mask.excluded_count());
        Ok(mask)
    }

    /// Build a mask from a pre-built cloud raster, applied with inverted-mask
    /// semantics: any valid, non-zero cell marks a cloud and is excluded.
    pub fn from_cloud_raster(clouds: &RasterGrid) -> Self {
        log::info!("Using externally supplied cloud raster as an inverted mask");

        let mut excluded = MaskGrid::from_elem(clouds.raw_dim(), false);
        Zip::from(&mut excluded).and(clouds).for_each(|out, &value| {
            *out = value.is_finite() && value != 0.0;
        });

        let mask = Self { excluded };
        log::debug!("Cloud raster excluded {} cells", mask.excluded_count());
        mask
    }

    /// An all-clear mask for runs without cloud screening
    pub fn clear(dim: (usize, usize)) -> Self {
        Self {
            excluded: MaskGrid::from_elem(dim, false),
        }
    }

    pub fn is_excluded(&self, row: usize, col: usize) -> bool {
        self.excluded[[row, col]]
    }

    pub fn dim(&self) -> (usize, usize) {
        self.excluded.dim()
    }

    pub fn grid(&self) -> &MaskGrid {
        &self.excluded
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.iter().filter(|&&e| e).count()
    }
}
