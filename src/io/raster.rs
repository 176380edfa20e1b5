use crate::types::{ClassGrid, GeoTransform, LstError, LstResult, RasterGrid};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;

/// Single-band raster reader backed by GDAL
pub struct RasterReader;

impl RasterReader {
    /// Read the first band of a raster as real-valued data.
    ///
    /// Cells equal to the file's declared no-data value are replaced with
    /// NaN so the processing passes see one uniform no-data convention.
    pub fn read_grid<P: AsRef<Path>>(path: P) -> LstResult<(RasterGrid, GeoTransform)> {
        log::info!("Reading raster: {}", path.as_ref().display());

        let dataset = Dataset::open(path.as_ref())?;
        let geo_transform = dataset.geo_transform()?;
        let (width, height) = dataset.raster_size();
        log::debug!("Raster size: {}x{}", width, height);

        let rasterband = dataset.rasterband(1)?;
        let no_data = rasterband.no_data_value();
        let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        let mut grid = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| LstError::Processing(format!("Failed to reshape raster data: {}", e)))?;
        if let Some(no_data) = no_data {
            let no_data = no_data as f32;
            grid.mapv_inplace(|v| if v == no_data { f32::NAN } else { v });
        }

        Ok((grid, Self::geo_transform_struct(&geo_transform)))
    }

    /// Read the first band of a categorical raster (land cover codes,
    /// QA flags)
    pub fn read_class_grid<P: AsRef<Path>>(path: P) -> LstResult<(ClassGrid, GeoTransform)> {
        log::info!("Reading categorical raster: {}", path.as_ref().display());

        let dataset = Dataset::open(path.as_ref())?;
        let geo_transform = dataset.geo_transform()?;
        let (width, height) = dataset.raster_size();

        let rasterband = dataset.rasterband(1)?;
        let band_data = rasterband.read_as::<u32>((0, 0), (width, height), (width, height), None)?;

        let grid = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| LstError::Processing(format!("Failed to reshape raster data: {}", e)))?;
        Ok((grid, Self::geo_transform_struct(&geo_transform)))
    }

    fn geo_transform_struct(geo_transform: &[f64; 6]) -> GeoTransform {
        GeoTransform {
            top_left_x: geo_transform[0],
            pixel_width: geo_transform[1],
            rotation_x: geo_transform[2],
            top_left_y: geo_transform[3],
            rotation_y: geo_transform[4],
            pixel_height: geo_transform[5],
        }
    }
}

/// Single-band GeoTIFF writer backed by GDAL
pub struct RasterWriter;

impl RasterWriter {
    /// Save a real-valued grid as a single-band GeoTIFF with NaN declared
    /// as the no-data value
    pub fn save_geotiff<P: AsRef<Path>>(
        grid: &RasterGrid,
        transform: &GeoTransform,
        output_path: P,
    ) -> LstResult<()> {
        log::info!("Saving GeoTIFF: {}", output_path.as_ref().display());

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let (height, width) = grid.dim();

        let mut dataset = driver.create_with_band_type::<f32, _>(
            output_path.as_ref(),
            width as isize,
            height as isize,
            1,
        )?;

        dataset.set_geo_transform(&[
            transform.top_left_x,
            transform.pixel_width,
            transform.rotation_x,
            transform.top_left_y,
            transform.rotation_y,
            transform.pixel_height,
        ])?;

        let mut rasterband = dataset.rasterband(1)?;
        let flat_data: Vec<f32> = grid.iter().cloned().collect();
        let buffer = gdal::raster::Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
        rasterband.set_no_data_value(Some(f32::NAN as f64))?;

        log::debug!("GeoTIFF written ({}x{})", width, height);
        Ok(())
    }
}
