//! Compiler passes that claim to be lossless must keep the rendered timeline.

use std::path::PathBuf;

use aeroglo::{CompileConfig, Compiler, GloFile, Labels, parse_glo, parse_glo_path};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn samples() -> Vec<(String, GloFile)> {
    let mut out = vec![
        ("chase".to_string(), parse_glo_path(&data("chase.glo")).unwrap()),
        ("show".to_string(), parse_glo_path(&data("show.glo")).unwrap()),
    ];
    let mut strobe = String::new();
    for i in 0..40 {
        strobe.push_str(&format!("color ({0}, {0}, {0})\ndelay (3)\n", (i % 4) * 60));
        if i % 10 == 9 {
            strobe.push_str("delay (0)\ndelay (70000)\n");
        }
    }
    strobe.push_str("end\n");
    out.push(("strobe".to_string(), parse_glo(&strobe).unwrap()));
    out
}

fn compile(file: &GloFile, cfg: CompileConfig) -> GloFile {
    let labels = Labels::from_path(&data("show_audacity.txt"), &cfg).unwrap();
    let mut file = file.clone();
    Compiler::new(cfg)
        .unwrap()
        .compile(&mut file, Some(&labels))
        .unwrap();
    file
}

fn reference(file: &GloFile) -> GloFile {
    compile(
        file,
        CompileConfig {
            resolve_limits: false,
            ..CompileConfig::default()
        },
    )
}

#[test]
fn lossless_passes_preserve_the_timeline() {
    let variants = [
        CompileConfig::default(),
        CompileConfig {
            compress: true,
            ..CompileConfig::default()
        },
        CompileConfig {
            compress: true,
            resolve_limits: false,
            ..CompileConfig::default()
        },
        CompileConfig {
            compress: true,
            strip_comments: true,
            ..CompileConfig::default()
        },
    ];

    for (name, file) in samples() {
        let expected = reference(&file).render().unwrap();
        for cfg in variants.iter().cloned() {
            let compiled = compile(&file, cfg.clone());
            assert_eq!(compiled.render().unwrap(), expected, "{name} with {cfg:?}");
        }
    }
}

#[test]
fn lossy_simplification_keeps_the_duration() {
    for (name, file) in samples() {
        let expected = reference(&file).duration().unwrap();
        let compiled = compile(
            &file,
            CompileConfig {
                compress: true,
                epsilon: 4.0,
                ..CompileConfig::default()
            },
        );
        assert_eq!(compiled.duration().unwrap(), expected, "{name}");
    }
}

#[test]
fn compiled_output_parses_back() {
    for (name, file) in samples() {
        let compiled = compile(
            &file,
            CompileConfig {
                compress: true,
                ..CompileConfig::default()
            },
        );
        let text = compiled.export(&aeroglo::ExportOpts::default());
        let reparsed = parse_glo(&text).unwrap();
        assert_eq!(
            reparsed.render().unwrap(),
            compiled.render().unwrap(),
            "{name}"
        );
    }
}
