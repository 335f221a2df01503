use std::path::PathBuf;

use aeroglo::{CompileConfig, Compiler, GloError, Labels, parse_glo_path};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn label_files_load_in_every_dialect() {
    let cfg = CompileConfig::default();

    let audacity = Labels::from_path(&data("show_audacity.txt"), &cfg).unwrap();
    assert_eq!(audacity.get("intro"), Some((150, 200)));
    assert_eq!(audacity.get("drop"), Some((400, 450)));

    let markers = Labels::from_path(&data("show_markers.csv"), &cfg).unwrap();
    assert_eq!(markers.get("intro"), Some((150, 150)));
    assert_eq!(markers.label_start("drop").unwrap(), 400);

    let bars = Labels::from_path(&data("bars_beats.csv"), &cfg).unwrap();
    assert_eq!(bars.get("a"), Some((2373, 2373)));
    assert_eq!(bars.get("b"), Some((6012, 6012)));
}

#[test]
fn missing_label_file_is_an_error() {
    let err = Labels::from_path(&data("no_such_labels.txt"), &CompileConfig::default());
    assert!(err.is_err());
}

#[test]
fn anchors_resolve_against_loaded_labels() {
    let cfg = CompileConfig::default();
    let labels = Labels::from_path(&data("show_markers.csv"), &cfg).unwrap();
    let mut file = parse_glo_path(&data("show.glo")).unwrap();

    let stats = Compiler::new(cfg)
        .unwrap()
        .compile(&mut file, Some(&labels))
        .unwrap();
    assert_eq!(stats.anchors_resolved, 2);
    // 150 to reach intro, 4 * 20 of flashes, pad to drop + 50, ramp 300, 600 * 4
    assert_eq!(stats.duration_ticks, 450 + 300 + 2400);
}

#[test]
fn anchors_without_labels_fail_to_resolve() {
    let mut file = parse_glo_path(&data("show.glo")).unwrap();
    let err = Compiler::new(CompileConfig::default())
        .unwrap()
        .compile(&mut file, None)
        .unwrap_err();
    assert!(matches!(err, GloError::Resolution(_)));
}
