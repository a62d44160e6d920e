use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use belt_sorter::classify::{HsvRange, Material};
use belt_sorter::config::SorterConfig;
use belt_sorter::BeltRegion;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SORTER_CONFIG",
        "SORTER_SOURCE",
        "SORTER_SERIAL_PORT",
        "SORTER_SERIAL_BAUD",
        "SORTER_BELT_POINTS",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SorterConfig::load().expect("load config");
    assert_eq!(cfg.source.uri, "stub://belt");
    assert_eq!((cfg.source.width, cfg.source.height), (640, 480));
    assert_eq!(cfg.serial.baud_rate, 9600);
    assert_eq!(
        cfg.pipeline.belt.points(),
        &[(230, 0), (420, 0), (480, 480), (170, 480)]
    );
    assert_eq!(cfg.pipeline.detector.gray_threshold, 70);
    assert_eq!(cfg.pipeline.classifier.min_pixels, 800);
    assert_eq!(cfg.pipeline.debounce.label_cooldown, 10);
    assert_eq!(cfg.pipeline.debounce.departure_cooldown, 5);
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{
            "source": { "uri": "dir:///var/lib/sorter/captures", "width": 800, "height": 600 },
            "serial": { "port": "/dev/ttyUSB1", "baud_rate": 19200, "write_timeout_ms": 250 },
            "detector": { "gray_threshold": 60, "min_area": 1500, "band": [0.25, 0.75] },
            "classifier": { "min_pixels": 1200, "ambiguity_ratio": 2.0 },
            "debounce": { "label_cooldown": 12 }
        }"#,
    );

    std::env::set_var("SORTER_CONFIG", file.path());
    std::env::set_var("SORTER_SERIAL_PORT", "COM11");
    std::env::set_var("SORTER_BELT_POINTS", "200,0; 440,0; 500,600; 140,600");

    let cfg = SorterConfig::load().expect("load config");

    assert_eq!(cfg.source.uri, "dir:///var/lib/sorter/captures");
    assert_eq!((cfg.source.width, cfg.source.height), (800, 600));
    assert_eq!(cfg.serial.port, "COM11");
    assert_eq!(cfg.serial.baud_rate, 19200);
    assert_eq!(cfg.serial.write_timeout, Some(Duration::from_millis(250)));
    assert_eq!(cfg.pipeline.detector.gray_threshold, 60);
    assert_eq!(cfg.pipeline.detector.min_area, 1500);
    assert_eq!(cfg.pipeline.detector.band, (0.25, 0.75));
    assert_eq!(cfg.pipeline.classifier.min_pixels, 1200);
    assert_eq!(cfg.pipeline.classifier.ambiguity_ratio, 2.0);
    assert_eq!(cfg.pipeline.debounce.label_cooldown, 12);
    assert_eq!(cfg.pipeline.debounce.departure_cooldown, 5);
    assert_eq!(
        cfg.pipeline.belt,
        BeltRegion::new([(200, 0), (440, 0), (500, 600), (140, 600)])
    );

    clear_env();
}

#[test]
fn loads_toml_config_with_palette() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
[source]
uri = "stub://belt?materials=TS"

[belt]
points = [[220, 0], [430, 0], [490, 480], [160, 480]]

[[palette.steel_gray]]
low = [95, 20, 70]
high = [125, 150, 255]
"#,
    );

    let cfg = SorterConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.source.uri, "stub://belt?materials=TS");
    assert_eq!(
        cfg.pipeline.belt.points(),
        &[(220, 0), (430, 0), (490, 480), (160, 480)]
    );
    assert_eq!(
        cfg.pipeline.palette.signature(Material::SteelGray).ranges(),
        &[HsvRange::new([95, 20, 70], [125, 150, 255])]
    );
}

#[test]
fn invalid_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SORTER_SERIAL_BAUD", "fast");
    assert!(SorterConfig::load().is_err());
    std::env::set_var("SORTER_SERIAL_BAUD", "0");
    assert!(SorterConfig::load().is_err());
    std::env::remove_var("SORTER_SERIAL_BAUD");

    std::env::set_var("SORTER_BELT_POINTS", "1,2;3,4;5,6");
    let err = SorterConfig::load().expect_err("three points must fail");
    assert!(err.to_string().contains("SORTER_BELT_POINTS"));

    clear_env();
}

#[test]
fn malformed_config_file_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(".json", r#"{ "source": { "uri": 42 } }"#);
    let err = SorterConfig::load_from(Some(file.path())).expect_err("bad type must fail");
    assert!(err.to_string().contains("invalid config file"));

    assert!(SorterConfig::load_from(Some(std::path::Path::new("/nonexistent/sorter.json"))).is_err());
}
