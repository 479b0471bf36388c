// tests/pipeline_test.rs
//
// End-to-end: synthetic corpus → training → persisted artifacts → inference.

mod test_utils;

use test_utils::*;

use kwspot::core::decoder::{decode_file, write_wav};
use kwspot::core::{train_from_dataset, CorpusBuilder, InferenceEngine, ModelKind};
use kwspot::testgen;
use kwspot::{FeatureConfig, FeaturePipeline, KwsError, Label};

#[test]
fn silence_classifies_as_background() {
    let corpus = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    write_corpus(corpus.path(), 12, 0);

    let config = fast_config();
    let (dataset, _) = CorpusBuilder::new(&config.features)
        .unwrap()
        .build_from_dir(corpus.path())
        .unwrap();
    train_from_dataset(&dataset, &config)
        .unwrap()
        .save(models.path())
        .unwrap();

    for kind in [ModelKind::FullPrecision, ModelKind::Quantized] {
        let engine = InferenceEngine::load(models.path(), &config.features, kind).unwrap();
        let result = engine
            .classify(&testgen::silence(SAMPLE_RATE, CLIP_LEN))
            .unwrap();
        assert_eq!(result.label, Label::Background, "{kind:?}: {result:?}");
        assert!((result.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn training_and_inference_extract_identical_features() {
    let corpus = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    write_corpus(corpus.path(), 6, 0);

    // A clip of odd length so padding is exercised on both paths
    let probe = corpus.path().join("yes_probe.wav");
    write_wav(&probe, &testgen::tone(1_234.0, 0.4, SAMPLE_RATE, 11_025)).unwrap();

    let config = fast_config();
    let builder = CorpusBuilder::new(&config.features).unwrap();
    let (dataset, _) = builder.build_from_dir(corpus.path()).unwrap();
    let idx = dataset
        .sources
        .iter()
        .position(|p| p == &probe)
        .expect("probe not in dataset");

    let trained = train_from_dataset(&dataset, &config).unwrap();
    trained.save(models.path()).unwrap();

    // Raw features: a fresh pipeline on the same file
    let pipeline = FeaturePipeline::new(&config.features).unwrap();
    assert_eq!(pipeline.extract_file(&probe).unwrap(), dataset.features[idx]);

    // Normalized features: what the loaded engine feeds its classifier
    let engine = InferenceEngine::builder()
        .artifacts_dir(models.path())
        .build()
        .unwrap();
    let clip = decode_file(&probe, SAMPLE_RATE).unwrap();
    assert_eq!(
        engine.features(&clip).unwrap(),
        trained.statistics.apply(&dataset.features[idx]).unwrap()
    );
}

#[test]
fn engine_classifies_held_out_clips() {
    let corpus = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    write_corpus(corpus.path(), 12, 0);

    let config = fast_config();
    let (dataset, _) = CorpusBuilder::new(&config.features)
        .unwrap()
        .build_from_dir(corpus.path())
        .unwrap();
    train_from_dataset(&dataset, &config)
        .unwrap()
        .save(models.path())
        .unwrap();

    let engine = InferenceEngine::load(models.path(), &config.features, ModelKind::Quantized).unwrap();
    let mut correct = 0;
    for (i, label) in Label::ALL.into_iter().cycle().take(30).enumerate() {
        let clip = testgen::keyword_clip(label, SAMPLE_RATE, CLIP_LEN, 10_000 + i as u64);
        if engine.classify(&clip).unwrap().label == label {
            correct += 1;
        }
    }
    assert!(correct >= 27, "{correct}/30 correct");
}

#[test]
fn mismatched_feature_config_is_rejected() {
    let corpus = tempfile::tempdir().unwrap();
    let models = tempfile::tempdir().unwrap();
    write_corpus(corpus.path(), 4, 0);

    let config = fast_config();
    let (dataset, _) = CorpusBuilder::new(&config.features)
        .unwrap()
        .build_from_dir(corpus.path())
        .unwrap();
    train_from_dataset(&dataset, &config)
        .unwrap()
        .save(models.path())
        .unwrap();

    let other = FeatureConfig {
        hop_length: 256,
        ..Default::default()
    };
    let err = InferenceEngine::load(models.path(), &other, ModelKind::FullPrecision).unwrap_err();
    assert!(matches!(err, KwsError::ConfigMismatch { .. }), "{err}");
}

#[test]
fn missing_artifacts_are_reported() {
    let empty = tempfile::tempdir().unwrap();
    for kind in [ModelKind::FullPrecision, ModelKind::Quantized] {
        let err = InferenceEngine::load(empty.path(), &FeatureConfig::default(), kind).unwrap_err();
        assert!(matches!(err, KwsError::ArtifactMissing { .. }), "{err}");
    }
}
