use crate::types::{ClassGrid, LandCoverClass, LstResult, RasterGrid};
use ndarray::Zip;

/// Channel emissivities for the two TIRS thermal bands (10, 11)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelEmissivity {
    pub tirs10: f32,
    pub tirs11: f32,
}

impl ChannelEmissivity {
    /// Average emissivity of the two channels
    pub fn average(&self) -> f32 {
        0.5 * (self.tirs10 + self.tirs11)
    }

    /// Channel emissivity difference (band 10 minus band 11)
    pub fn delta(&self) -> f32 {
        self.tirs10 - self.tirs11
    }
}

/// Fixed look-up table mapping land cover classes to average channel
/// emissivities. Loaded once, shared read-only; injectable so tests can
/// substitute synthetic tables.
#[derive(Debug, Clone)]
pub struct EmissivityLut {
    entries: Vec<(LandCoverClass, ChannelEmissivity)>,
}

impl Default for EmissivityLut {
    /// The class-averaged emissivities shipped with the split-window
    /// algorithm (FROM-GLC classes, TIRS channels 10 and 11)
    fn default() -> Self {
        use LandCoverClass::*;
        let table = [
            (Cropland, 0.971, 0.968),
            (Forest, 0.995, 0.996),
            (Grasslands, 0.970, 0.971),
            (Shrublands, 0.969, 0.970),
            (Wetlands, 0.992, 0.998),
            (Waterbodies, 0.992, 0.998),
            (Tundra, 0.980, 0.984),
            (Impervious, 0.973, 0.981),
            (BarrenLand, 0.969, 0.978),
            (SnowIce, 0.992, 0.998),
        ];
        Self {
            entries: table
                .iter()
                .map(|&(class, tirs10, tirs11)| (class, ChannelEmissivity { tirs10, tirs11 }))
                .collect(),
        }
    }
}

impl EmissivityLut {
    /// Build a table from explicit entries (primarily for tests)
    pub fn from_entries(entries: Vec<(LandCoverClass, ChannelEmissivity)>) -> Self {
        Self { entries }
    }

    /// Channel emissivities for a land cover class
    pub fn lookup(&self, class: LandCoverClass) -> Option<ChannelEmissivity> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == class)
            .map(|&(_, emissivity)| emissivity)
    }
}

/// Average and delta emissivity rasters, ready for the split-window equation.
/// Both may be persisted and re-supplied directly on later runs.
#[derive(Debug, Clone)]
pub struct EmissivityRasters {
    pub average: RasterGrid,
    pub delta: RasterGrid,
}

/// Derives per-pixel surface emissivity from a land cover classification,
/// or a scene-wide constant from a single declared class.
pub struct EmissivityResolver {
    lut: EmissivityLut,
}

impl EmissivityResolver {
    pub fn new(lut: EmissivityLut) -> Self {
        Self { lut }
    }

    pub fn standard() -> Self {
        Self::new(EmissivityLut::default())
    }

    /// Constant emissivity for a whole scene from one declared class
    pub fn resolve_fixed_class(
        &self,
        class: LandCoverClass,
        dim: (usize, usize),
    ) -> LstResult<EmissivityRasters> {
        let emissivity = self.lut.lookup(class).ok_or_else(|| {
            crate::types::LstError::Configuration(format!(
                "No emissivity table entry for land cover class {}",
                class
            ))
        })?;
        log::info!(
            "Fixed land cover class {}: emissivities {} (TIRS10), {} (TIRS11)",
            class,
            emissivity.tirs10,
            emissivity.tirs11
        );

        Ok(EmissivityRasters {
            average: RasterGrid::from_elem(dim, emissivity.average()),
            delta: RasterGrid::from_elem(dim, emissivity.delta()),
        })
    }

    /// Per-pixel emissivity from a FROM-GLC land cover raster. Cells with a
    /// code that maps to no class in the table propagate as no-data.
    pub fn resolve_landcover(&self, landcover: &ClassGrid) -> LstResult<EmissivityRasters> {
        log::info!(
            "Deriving emissivity from a {}x{} land cover raster",
            landcover.nrows(),
            landcover.ncols()
        );

        let mut average = RasterGrid::from_elem(landcover.raw_dim(), f32::NAN);
        let mut delta = RasterGrid::from_elem(landcover.raw_dim(), f32::NAN);

        Zip::from(&mut average)
            .and(&mut delta)
            .and(landcover)
            .for_each(|avg, dlt, &code| {
                if let Some(emissivity) = LandCoverClass::from_glc_code(code)
                    .and_then(|class| self.lut.lookup(class))
                {
                    *avg = emissivity.average();
                    *dlt = emissivity.delta();
                }
            });

        let unresolved = average.iter().filter(|v| v.is_nan()).count();
        if unresolved > 0 {
            log::debug!("{} land cover cells without a table entry", unresolved);
        }
        Ok(EmissivityRasters { average, delta })
    }
}
