use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use odol_counter::config::CounterConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ODOL_CONFIG",
        "ODOL_VEHICLE_LABELS",
        "ODOL_CARGO_LABEL",
        "ODOL_LABELS_PATH",
        "ODOL_ASSOC_IOU",
        "ODOL_DUP_IOU",
        "ODOL_MIN_CONFIDENCE",
        "ODOL_SOURCE_URL",
        "ODOL_REPORT_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let labels_path = file.path().with_extension("labels");
    let json = format!(
        r#"{{
            "labels": {{
                "vehicles": ["box_truck", "dump_truck"],
                "cargo": "overdimension_load",
                "path": "{}"
            }},
            "thresholds": {{
                "association_iou": 0.35,
                "duplicate_iou": 0.6
            }},
            "detector": {{
                "min_confidence": 0.4
            }},
            "source": {{
                "url": "stub://gate_1",
                "width": 640,
                "height": 480,
                "target_fps": 15
            }},
            "report": {{
                "interval_secs": 10
            }}
        }}"#,
        labels_path.display()
    );
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ODOL_CONFIG", file.path());
    std::env::set_var("ODOL_DUP_IOU", "0.45");
    std::env::set_var("ODOL_REPORT_SECS", "3");

    let cfg = CounterConfig::load().expect("load config");

    let vehicles: Vec<_> = cfg.labels.vehicles.iter().cloned().collect();
    assert_eq!(vehicles, vec!["box_truck", "dump_truck"]);
    assert_eq!(cfg.labels.cargo, "overdimension_load");
    assert_eq!(cfg.labels.path.unwrap(), labels_path);
    assert_eq!(cfg.thresholds.association_iou, 0.35);
    assert_eq!(cfg.thresholds.duplicate_iou, 0.45);
    assert_eq!(cfg.min_confidence, 0.4);
    assert_eq!(cfg.source.url, "stub://gate_1");
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 480);
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.report_interval, Duration::from_secs(3));

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
        [labels]
        vehicles = ["tank_truck"]
        cargo = "overload"

        [thresholds]
        association_iou = 0.25
    "#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = CounterConfig::load_from(Some(file.path())).expect("load config");
    assert!(cfg.labels.vehicles.contains("tank_truck"));
    assert_eq!(cfg.labels.vehicles.len(), 1);
    assert_eq!(cfg.labels.cargo, "overload");
    assert_eq!(cfg.thresholds.association_iou, 0.25);
    assert_eq!(cfg.thresholds.duplicate_iou, 0.5);

    clear_env();
}

#[test]
fn env_overrides_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ODOL_VEHICLE_LABELS", "truck, trailer_truck");
    std::env::set_var("ODOL_CARGO_LABEL", "oversize");

    let cfg = CounterConfig::load().expect("load config");
    assert_eq!(cfg.labels.vehicles.len(), 2);
    assert!(cfg.labels.vehicles.contains("trailer_truck"));
    assert_eq!(cfg.labels.cargo, "oversize");

    clear_env();
}

#[test]
fn empty_report_interval_means_default() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ODOL_REPORT_SECS", "");
    let cfg = CounterConfig::load().expect("load config");
    assert_eq!(cfg.report_interval, Duration::from_secs(5));

    std::env::set_var("ODOL_REPORT_SECS", " 7 ");
    let cfg = CounterConfig::load().expect("load config");
    assert_eq!(cfg.report_interval, Duration::from_secs(7));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ODOL_ASSOC_IOU", "not-a-number");
    assert!(CounterConfig::load().is_err());
    clear_env();

    std::env::set_var("ODOL_DUP_IOU", "1.2");
    assert!(CounterConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"labels": {"vehicle": ["typo"]}}"#)
        .expect("write config");
    assert!(CounterConfig::load_from(Some(file.path())).is_err());

    clear_env();
}
