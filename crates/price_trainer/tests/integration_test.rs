//! Integration tests for the train-or-load estimator
//!
//! Exercises dataset loading, training, persistence and inference together
//! against temporary files.

use anyhow::Result;
use fipe_price_core::{CarQuery, ModelStore, PriceError};
use fipe_price_trainer::{ArtifactSource, EstimatorConfig, PriceEstimator, TrainerError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str =
    "year_of_reference,month_of_reference,fipe_code,brand,model,fuel,gear,engine_size,year_model,avg_price_brl";

/// Rows for three brands; `Citro\xEBn` is windows-1252 for "Citroën"
fn dataset_bytes(extra_rows: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut push = |line: &[u8]| {
        bytes.extend_from_slice(line);
        bytes.push(b'\n');
    };
    push(HEADER.as_bytes());
    push(b"2023,January,001,A,A1,Flex,manual,1.0,2019,30000.5");
    push(b"2023,January,002,A,A2,Flex,manual,1.6,2020,42000");
    push(b"2023,January,003,B,B1,Flex,automatic,2.0,2021,95000");
    push(b"2023,January,004,B,B2,Gasoline,automatic,2.0,2017,61000");
    push(b"2023,January,005,Citro\xEBn,C3,Flex,manual,1.2,2018,38000");
    push(b"2023,January,005,Citro\xEBn,C3,Flex,manual,1.2,2018,38000");
    push(b"2023,January,006,Citro\xEBn,C4,Diesel,automatic,1.6,2016,");
    for row in extra_rows {
        push(row.as_bytes());
    }
    bytes
}

fn setup(dir: &Path, extra_rows: &[&str]) -> Result<EstimatorConfig> {
    let dataset_path = dir.join("fipe_cars.csv");
    fs::write(&dataset_path, dataset_bytes(extra_rows))?;
    Ok(EstimatorConfig {
        dataset_path,
        artifact_path: dir.join("models").join("car_price_model.json"),
        holdout_fraction: 0.0,
        ..EstimatorConfig::default()
    })
}

fn query(brand: &str, model: &str, fuel: &str, gear: &str, engine_size: f64, year_model: i64) -> CarQuery {
    CarQuery {
        year_of_reference: 2023,
        brand: brand.to_string(),
        model: model.to_string(),
        fuel: fuel.to_string(),
        gear: gear.to_string(),
        engine_size,
        year_model,
    }
}

#[test]
fn test_end_to_end_train_and_predict() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;

    let estimator = PriceEstimator::initialize(&config)?;
    assert_eq!(estimator.source(), ArtifactSource::Trained);
    assert!(config.artifact_path.is_file());

    let metadata = &estimator.artifact().metadata;
    assert_eq!(metadata.duplicates_removed, 1);
    assert_eq!(metadata.rows_dropped, 1);
    assert_eq!(metadata.rows_trained, 5);

    assert_eq!(
        estimator.predict(&query("A", "A1", "Flex", "manual", 1.0, 2019))?,
        30000.5
    );
    assert_eq!(
        estimator.predict(&query("Citroën", "C3", "Flex", "manual", 1.2, 2018))?,
        38000.0
    );

    // Unseen fuel leaves the fuel group all zero but still predicts
    let price = estimator.predict(&query("B", "B1", "Electric", "automatic", 2.0, 2021))?;
    assert!(price > 0.0);

    Ok(())
}

#[test]
fn test_unknown_brand_is_an_explicit_error() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    let estimator = PriceEstimator::initialize(&config)?;

    let err = estimator
        .predict(&query("Zzz", "A1", "Flex", "manual", 1.0, 2019))
        .unwrap_err();
    assert!(matches!(
        err,
        PriceError::UnknownCategory { field: "brand", .. }
    ));
    Ok(())
}

#[test]
fn test_choice_lists_and_models() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    let estimator = PriceEstimator::initialize(&config)?;

    let choices = estimator.choice_lists();
    assert_eq!(choices.brands, vec!["A", "B", "Citroën"]);
    assert_eq!(choices.fuels, vec!["Diesel", "Flex", "Gasoline"]);
    assert_eq!(choices.gears, vec!["automatic", "manual"]);
    assert_eq!(choices.year_range, Some((2016, 2021)));

    assert_eq!(estimator.models_for_brand("Citroën"), vec!["C3", "C4"]);
    assert!(estimator.models_for_brand("Nope").is_empty());
    Ok(())
}

#[test]
fn test_reload_is_bit_identical_and_skips_training() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;

    let first = PriceEstimator::initialize(&config)?;
    let second = PriceEstimator::initialize(&config)?;
    assert_eq!(second.source(), ArtifactSource::Loaded);
    assert_eq!(first.artifact(), second.artifact());

    for q in [
        query("A", "A2", "Flex", "manual", 1.6, 2020),
        query("B", "B2", "Gasoline", "automatic", 2.0, 2017),
        query("Citroën", "C4", "Diesel", "automatic", 1.6, 2016),
        query("A", "B1", "Gasoline", "manual", 1.4, 2022),
    ] {
        let a = first.predict(&q)?;
        let b = second.predict(&q)?;
        assert_eq!(a.to_bits(), b.to_bits());
    }
    Ok(())
}

#[test]
fn test_corrupt_artifact_triggers_retrain() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    let trained = PriceEstimator::initialize(&config)?;

    let bytes = fs::read(&config.artifact_path)?;
    fs::write(&config.artifact_path, &bytes[..bytes.len() / 2])?;

    let store = ModelStore::new(&config.artifact_path);
    assert!(store.load().unwrap_err().is_missing_or_corrupt_artifact());

    let retrained = PriceEstimator::initialize(&config)?;
    assert_eq!(retrained.source(), ArtifactSource::Trained);
    assert_eq!(retrained.artifact().regressor, trained.artifact().regressor);
    assert!(store.load().is_ok());
    Ok(())
}

#[test]
fn test_changed_dataset_triggers_retrain() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    let before = PriceEstimator::initialize(&config)?;

    fs::write(
        &config.dataset_path,
        dataset_bytes(&["2023,January,007,D,D1,Flex,manual,1.0,2022,55000"]),
    )?;

    let after = PriceEstimator::initialize(&config)?;
    assert_eq!(after.source(), ArtifactSource::Trained);
    assert_ne!(
        before.artifact().metadata.dataset_fingerprint,
        after.artifact().metadata.dataset_fingerprint
    );
    assert_eq!(
        after.predict(&query("D", "D1", "Flex", "manual", 1.0, 2022))?,
        55000.0
    );
    Ok(())
}

#[test]
fn test_force_retrains_current_artifact() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    PriceEstimator::initialize(&config)?;

    let forced = PriceEstimator::initialize_with(&config, true)?;
    assert_eq!(forced.source(), ArtifactSource::Trained);
    Ok(())
}

#[test]
fn test_missing_dataset_is_reported() -> Result<()> {
    let dir = TempDir::new()?;
    let config = EstimatorConfig {
        dataset_path: dir.path().join("missing.csv"),
        artifact_path: dir.path().join("model.json"),
        ..EstimatorConfig::default()
    };

    let err = PriceEstimator::initialize(&config).err().expect("missing dataset must fail");
    assert!(matches!(
        err,
        TrainerError::Core(PriceError::DatasetNotFound(_))
    ));
    assert!(!config.artifact_path.exists());
    Ok(())
}

#[test]
fn test_training_is_reproducible_across_directories() -> Result<()> {
    let dir_a = TempDir::new()?;
    let dir_b = TempDir::new()?;
    let a = PriceEstimator::initialize(&setup(dir_a.path(), &[])?)?;
    let b = PriceEstimator::initialize(&setup(dir_b.path(), &[])?)?;

    assert_eq!(a.artifact().regressor, b.artifact().regressor);
    assert_eq!(a.artifact().encoder, b.artifact().encoder);
    Ok(())
}

#[test]
fn test_missing_fuel_row_is_trained_on() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &["2023,January,008,E,E1,,manual,1.0,2022,77000"])?;
    let estimator = PriceEstimator::initialize(&config)?;

    let metadata = &estimator.artifact().metadata;
    assert_eq!(metadata.rows_trained, 6);
    assert_eq!(metadata.rows_dropped, 1);

    // A fuel outside the schema encodes the same all-zero group
    assert_eq!(
        estimator.predict(&query("E", "E1", "Hydrogen", "manual", 1.0, 2022))?,
        77000.0
    );
    Ok(())
}

#[test]
fn test_changed_encoding_triggers_retrain() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    let before = PriceEstimator::initialize(&config)?;
    assert_eq!(before.artifact().metadata.encoding, "windows-1252");

    let utf8 = EstimatorConfig {
        encoding: "utf-8".to_string(),
        ..config
    };
    let after = PriceEstimator::initialize(&utf8)?;
    assert_eq!(after.source(), ArtifactSource::Trained);
    assert_eq!(after.artifact().metadata.encoding, "UTF-8");

    // Every brand the estimator offers must be accepted by predict
    for brand in after.choice_lists().brands {
        let model = after.models_for_brand(&brand).remove(0);
        after.predict(&query(&brand, &model, "Flex", "manual", 1.0, 2019))?;
    }
    Ok(())
}

#[test]
fn test_changed_training_settings_trigger_retrain() -> Result<()> {
    let dir = TempDir::new()?;
    let config = setup(dir.path(), &[])?;
    PriceEstimator::initialize(&config)?;

    let mut shallow = config.clone();
    shallow.tree.max_depth = Some(0);
    let stump = PriceEstimator::initialize(&shallow)?;
    assert_eq!(stump.source(), ArtifactSource::Trained);
    assert_eq!(stump.artifact().regressor.tree.leaf_count(), 1);
    assert_eq!(
        PriceEstimator::initialize(&shallow)?.source(),
        ArtifactSource::Loaded
    );

    let reseeded = EstimatorConfig {
        seed: 7,
        ..shallow.clone()
    };
    let estimator = PriceEstimator::initialize(&reseeded)?;
    assert_eq!(estimator.source(), ArtifactSource::Trained);
    assert_eq!(estimator.artifact().metadata.seed, 7);

    let held_out = EstimatorConfig {
        holdout_fraction: 0.2,
        ..reseeded
    };
    let estimator = PriceEstimator::initialize(&held_out)?;
    assert_eq!(estimator.source(), ArtifactSource::Trained);
    assert_eq!(estimator.artifact().metadata.rows_holdout, 1);
    Ok(())
}
