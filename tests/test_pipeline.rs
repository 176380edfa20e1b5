use ndarray::Array2;
use swlst::core::{BandInput, LstPipeline, LstPipelineConfig};
use swlst::{LandCoverClass, LstError, MtlMetadata, RasterGrid};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const MTL_EXCERPT: &str = r#"
GROUP = L1_METADATA_FILE
  GROUP = METADATA_FILE_INFO
    LANDSAT_SCENE_ID = "LC81840332014146LGN00"
  END_GROUP = METADATA_FILE_INFO
  GROUP = PRODUCT_METADATA
    DATE_ACQUIRED = 2014-05-26
  END_GROUP = PRODUCT_METADATA
  GROUP = RADIOMETRIC_RESCALING
    RADIANCE_MULT_BAND_10 = 3.3420E-04
    RADIANCE_MULT_BAND_11 = 3.3420E-04
    RADIANCE_ADD_BAND_10 = 0.10000
    RADIANCE_ADD_BAND_11 = 0.10000
  END_GROUP = RADIOMETRIC_RESCALING
  GROUP = TIRS_THERMAL_CONSTANTS
    K1_CONSTANT_BAND_10 = 774.8853
    K2_CONSTANT_BAND_10 = 1321.0789
    K1_CONSTANT_BAND_11 = 480.8883
    K2_CONSTANT_BAND_11 = 1201.1442
  END_GROUP = TIRS_THERMAL_CONSTANTS
END_GROUP = L1_METADATA_FILE
END
"#;

/// Synthetic thermal digital numbers in the usual Landsat 8 range
fn dn_band(dim: (usize, usize), base: f32) -> RasterGrid {
    Array2::from_shape_fn(dim, |(r, c)| base + ((r * 11 + c * 7) % 23) as f32 * 40.0)
}

/// Brightness temperature pair whose covariance ratio lands the CWV
/// retrieval inside the model domain
fn correlated_bt_bands(dim: (usize, usize)) -> (BandInput, BandInput) {
    let ti = Array2::from_shape_fn(dim, |(r, c)| {
        288.0 + ((r * 7 + c * 3) % 11) as f32 * 0.37
    });
    let tj = ti.mapv(|v| v * 1.05 - 15.0);
    (
        BandInput::BrightnessTemperature(ti),
        BandInput::BrightnessTemperature(tj),
    )
}

#[test]
fn test_mtl_driven_calibration_run() {
    init_logging();

    // parse the calibration constants from an MTL file on disk
    let dir = tempfile::tempdir().unwrap();
    let mtl_path = dir.path().join("LC81840332014146LGN00_MTL.txt");
    std::fs::write(&mtl_path, MTL_EXCERPT).unwrap();
    let mtl = MtlMetadata::from_file(&mtl_path).unwrap();
    assert_eq!(mtl.scene_id(), Some("LC81840332014146LGN00"));

    let dim = (12, 12);
    let mut config = LstPipelineConfig::new(
        BandInput::DigitalNumbers {
            dn: dn_band(dim, 20000.0),
            calibration: mtl.band_calibration(10).unwrap(),
        },
        BandInput::DigitalNumbers {
            dn: dn_band(dim, 20400.0),
            calibration: mtl.band_calibration(11).unwrap(),
        },
    );
    config.fixed_landcover_class = Some(LandCoverClass::Cropland);
    config.window_size = 5;
    // whole-range coefficients keep the run independent of the CWV field
    config.fixed_coefficients = true;

    // a few cloudy QA pixels
    let mut qa = Array2::zeros(dim);
    qa[[2, 2]] = 61440_u32;
    qa[[7, 9]] = 61440_u32;
    config.qa_band = Some(qa);

    let products = LstPipeline::standard().run(config).unwrap();
    assert_eq!(products.lst.dim(), dim);
    assert!(products.brightness_temperature_i[[0, 0]].is_finite());

    // cloud pixels are excluded from the output
    assert!(products.lst[[2, 2]].is_nan());
    assert!(products.lst[[7, 9]].is_nan());

    // everything else is a plausible Kelvin surface temperature
    let mut finite = 0;
    for &value in products.lst.iter() {
        if value.is_finite() {
            assert!(value > 230.0 && value < 350.0, "implausible LST {}", value);
            finite += 1;
        }
    }
    assert_eq!(finite, dim.0 * dim.1 - 2);
}

#[test]
fn test_cwv_driven_run_stays_in_model_domain() {
    init_logging();

    let dim = (11, 11);
    let (band_i, band_j) = correlated_bt_bands(dim);
    let mut config = LstPipelineConfig::new(band_i, band_j);
    config.fixed_landcover_class = Some(LandCoverClass::Grasslands);
    config.window_size = 5;

    let products = LstPipeline::standard().run(config).unwrap();

    // the affine band relation pins the covariance ratio near its slope,
    // so the retrieved CWV sits in the low sub-range
    let center = products.cwv[[5, 5]];
    assert!(center.is_finite());
    assert!(center > 0.0 && center < 2.5, "unexpected CWV {}", center);

    assert!(products.lst[[5, 5]].is_finite());
    assert!(products.lst[[5, 5]] > 230.0 && products.lst[[5, 5]] < 350.0);
}

#[test]
fn test_landcover_emissivity_run() {
    init_logging();

    let dim = (10, 10);
    let (band_i, band_j) = correlated_bt_bands(dim);
    let mut config = LstPipelineConfig::new(band_i, band_j);
    config.window_size = 5;
    // forest in the top half, water below, one unmappable cloud code
    let mut landcover = Array2::from_elem(dim, 20_u32);
    for r in 5..10 {
        for c in 0..10 {
            landcover[[r, c]] = 60;
        }
    }
    landcover[[0, 0]] = 120;
    config.landcover = Some(landcover);

    let products = LstPipeline::standard().run(config).unwrap();
    assert!((products.emissivity.average[[1, 1]] - 0.9955).abs() < 1e-5);
    assert!((products.emissivity.average[[6, 6]] - 0.995).abs() < 1e-5);
    // the cell without an emissivity stays no-data through to the LST
    assert!(products.emissivity.average[[0, 0]].is_nan());
    assert!(products.lst[[0, 0]].is_nan());
    assert!(products.lst[[6, 6]].is_finite());
}

#[test]
fn test_configuration_conflicts_abort_before_processing() {
    init_logging();

    let dim = (8, 8);
    let (band_i, band_j) = correlated_bt_bands(dim);
    let mut config = LstPipelineConfig::new(band_i, band_j);
    config.fixed_landcover_class = Some(LandCoverClass::Forest);
    config.landcover = Some(Array2::from_elem(dim, 20_u32));

    match LstPipeline::standard().run(config) {
        Err(LstError::Configuration(message)) => {
            assert!(message.contains("mutually exclusive"));
        }
        other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
    }
}
