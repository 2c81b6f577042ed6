use std::fs;
use std::path::Path;

use gcode_interleaver_lib::{process_files, InterleaveConfig, InterleaveError, DEFAULT_LAYER_MARKER};
use tempfile::TempDir;

const FIRST: &str = "\
; first toolpath
M83
;LAYER_CHANGE
;Z:0.2
G1 X10 Y10 Z0.2 E0.5
;LAYER_CHANGE
;Z:0.4
G1 X10 Y10 Z0.4 E0.5
;LAYER_CHANGE
;Z:0.6
G1 X10 Y10 Z0.6 E0.5
";

const SECOND: &str = "\
; second toolpath header
M83
G28
;LAYER_CHANGE
;Z:0.2
G1 X5 Y5 Z0.2 E1
;LAYER_CHANGE
;Z:0.4
G1 X5 Y5 Z0.4 E1
";

fn write_pair(dir: &TempDir) -> (String, std::path::PathBuf) {
    let first = dir.path().join("first.gcode");
    let second = dir.path().join("second.gcode");
    fs::write(&first, FIRST).unwrap();
    fs::write(&second, SECOND).unwrap();
    (first.display().to_string(), second)
}

fn run(arguments: &str, target: &Path) -> Result<String, InterleaveError> {
    let config = InterleaveConfig::parse(arguments, "")?;
    process_files(&config, target, target, DEFAULT_LAYER_MARKER)?;
    Ok(fs::read_to_string(target).unwrap())
}

#[test]
fn merges_in_place_with_preamble() {
    let dir = tempfile::tempdir().unwrap();
    let (first, second) = write_pair(&dir);
    let merged = run(&format!("G-code1:{},X_offset:1", first), &second).unwrap();

    let lines: Vec<&str> = merged.lines().collect();
    assert_eq!(&lines[..3], &["; second toolpath header", "M83", "G28"]);
    assert_eq!(lines[3], "; --- Combined G-code with alternating layers and fan control ---");
    assert_eq!(lines[4], "; --- Interleaving starts from layer 1 ---");

    // the first toolpath is never offset, the second always is
    assert!(lines.contains(&"G1 X10 Y10 Z0.2 E0.5"));
    assert!(lines.contains(&"G1 X6.000 Y5.000 Z0.200 E1.00000"));
    assert!(!lines.contains(&"G1 X5 Y5 Z0.2 E1"));

    let annotations: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("; --- Layer")).collect();
    assert_eq!(
        annotations,
        vec![
            "; --- Layer 1 from Model 1 ---",
            "; --- Layer 1 from Model 2 (offset) ---",
            "; --- Layer 2 from Model 1 ---",
            "; --- Layer 2 from Model 2 (offset) ---",
            "; --- Layer 3 from Model 1 ---",
            "; --- Layer 3 from Model 2 (offset) ---",
            "; --- Layer 4 from Model 1 ---",
        ]
    );
}

#[test]
fn swap_sequence_around_second_toolpath() {
    let dir = tempfile::tempdir().unwrap();
    let (first, second) = write_pair(&dir);
    let merged = run(
        &format!(
            "G-code1:{},fan_control:on,start_layer:2,rest1_position:100_200,rest1_time:1.5,\
             rest2_position:0_200,rest2_time:2,retraction:0.8,extrusion_multiplier:0.5",
            first
        ),
        &second,
    )
    .unwrap();

    let commands: Vec<&str> = merged
        .lines()
        .filter(|l| !l.starts_with(';') && !l.starts_with("G28") && !l.starts_with("M83"))
        .map(|l| l.split(" ;").next().unwrap())
        .collect();
    assert_eq!(
        commands,
        vec![
            // layer 1 is the first toolpath's header; the second toolpath joins at layer 2
            "G1 E-0.800 F3000",
            // layer 2
            "G1 E0.800 F3000",
            "M107",
            "G1 X10 Y10 Z0.2 E0.5",
            "G1 E-0.800 F3000",
            "G0 X100.000 Y200.000",
            "G4 P1500",
            "M106 S255",
            "G0 Z0.200",
            "G0 X5.000 Y5.000",
            "G1 X5.000 Y5.000 Z0.200 E0.50000",
            "G0 X0.000 Y200.000",
            "M107",
            "G4 P2000",
            // layer 3
            "G1 E0.800 F3000",
            "M107",
            "G1 X10 Y10 Z0.4 E0.5",
            "G1 E-0.800 F3000",
            "G0 X100.000 Y200.000",
            "G4 P1500",
            "M106 S255",
            "G0 Z0.400",
            "G0 X5.000 Y5.000",
            "G1 X5.000 Y5.000 Z0.400 E0.50000",
            "G0 X0.000 Y200.000",
            "M107",
            "G4 P2000",
            // layer 4, first toolpath only
            "G1 E0.800 F3000",
            "M107",
            "G1 X10 Y10 Z0.6 E0.5",
        ]
    );
}

#[test]
fn malformed_values_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (first, second) = write_pair(&dir);
    let arguments = format!("G-code1:{},extrusion_multiplier:abc,start_layer:zero,retraction:-3", first);

    let config = InterleaveConfig::parse(&arguments, "").unwrap();
    assert_eq!(config.warnings.len(), 3);

    let merged = run(&arguments, &second).unwrap();
    assert!(merged.contains("G1 X5.000 Y5.000 Z0.200 E1.00000\n"));
    assert!(!merged.contains("F3000"));
}

#[test]
fn latin1_comment_does_not_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let (first, second) = write_pair(&dir);
    let mut bytes = b"; bed 60\xB0C\n".to_vec();
    bytes.extend_from_slice(FIRST.as_bytes());
    fs::write(&first, bytes).unwrap();

    let merged = run(&format!("G-code1:{}", first), &second).unwrap();
    assert!(merged.contains("; bed 60\u{FFFD}C\n; first toolpath\n"));
    assert!(merged.contains("G1 X5.000 Y5.000 Z0.200 E1.00000\n"));
}

#[test]
fn missing_first_toolpath_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (_, second) = write_pair(&dir);
    let missing = dir.path().join("nope.gcode");

    let err = run(&format!("G-code1:{}", missing.display()), &second).unwrap_err();
    assert!(matches!(err, InterleaveError::NotFound { .. }));
    assert_eq!(fs::read_to_string(&second).unwrap(), SECOND);
}

#[test]
fn missing_gcode1_key_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (_, second) = write_pair(&dir);
    let err = run("X_offset:1", &second).unwrap_err();
    assert!(matches!(err, InterleaveError::Config(_)));
    assert_eq!(fs::read_to_string(&second).unwrap(), SECOND);
}

#[test]
fn separate_output_keeps_target() {
    let dir = tempfile::tempdir().unwrap();
    let (first, second) = write_pair(&dir);
    let out = dir.path().join("merged.gcode");
    let config = InterleaveConfig::parse(&format!("G-code1:{}", first), "").unwrap();

    let summary = process_files(&config, &second, &out, DEFAULT_LAYER_MARKER).unwrap();
    assert_eq!(summary.layers1, 4);
    assert_eq!(summary.layers2, 3);
    assert_eq!(summary.preamble_lines, 3);
    assert_eq!(fs::read_to_string(&second).unwrap(), SECOND);
    assert!(fs::read_to_string(&out).unwrap().starts_with("; second toolpath header\n"));
}
