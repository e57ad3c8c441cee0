use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::NamedTempFile;

const HEADER: &[&str] = &[
    "NAXIS   =                    2",
    "NAXIS1  =                  200",
    "NAXIS2  =                  100",
    "CTYPE1  = 'RA---CAR'",
    "CTYPE2  = 'DEC--CAR'",
    "CRPIX1  =                100.0",
    "CRPIX2  =                 50.0",
    "CRVAL1  =                 30.0",
    "CRVAL2  =                  0.0",
    "CDELT1  =                 -0.1",
    "CDELT2  =                  0.1",
    "END",
];

fn header_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for card in HEADER {
        write!(file, "{:<80}", card).unwrap();
    }
    file.flush().unwrap();
    file
}

fn wcsconv(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_wcsconv"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    if let Some(text) = stdin {
        child.stdin.take().unwrap().write_all(text.as_bytes()).unwrap();
    }
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "wcsconv failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn info_prints_summary() {
    let file = header_file();
    let text = stdout(&wcsconv(&["info", file.path().to_str().unwrap()], None));
    assert!(text.contains("RA---CAR"));
    assert!(text.contains("NAXIS : 200  100"));
}

#[test]
fn info_json_reports_projection() {
    let file = header_file();
    let text = stdout(&wcsconv(&["info", "--json", file.path().to_str().unwrap()], None));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["projection"], "CAR");
    assert_eq!(value["image_shape"][0], 200);
    assert_eq!(value["sip"], false);
}

#[test]
fn pix2world_from_arguments() {
    let file = header_file();
    let path = file.path().to_str().unwrap();
    let text = stdout(&wcsconv(&["pix2world", path, "--json", "90", "60"], None));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let lon = value[0]["output"][0].as_f64().unwrap();
    let lat = value[0]["output"][1].as_f64().unwrap();
    assert!((lon - 31.0).abs() < 1e-9);
    assert!((lat - 1.0).abs() < 1e-9);
}

#[test]
fn world2pix_from_stdin_with_origin_zero() {
    let file = header_file();
    let path = file.path().to_str().unwrap();
    let text = stdout(&wcsconv(
        &["world2pix", path, "--origin", "0", "--json"],
        Some("30 0\n29.5 -1\n"),
    ));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!((value[0]["output"][0].as_f64().unwrap() - 99.0).abs() < 1e-9);
    assert!((value[0]["output"][1].as_f64().unwrap() - 49.0).abs() < 1e-9);
    assert!((value[1]["output"][0].as_f64().unwrap() - 104.0).abs() < 1e-9);
    assert!((value[1]["output"][1].as_f64().unwrap() - 39.0).abs() < 1e-9);
}

#[test]
fn footprint_lists_four_corners() {
    let file = header_file();
    let text = stdout(&wcsconv(&["footprint", file.path().to_str().unwrap()], None));
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn odd_coordinate_count_fails() {
    let file = header_file();
    let output = wcsconv(&["pix2world", file.path().to_str().unwrap(), "1", "2", "3"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pairs"));
}

#[test]
fn missing_header_fails_with_path() {
    let output = wcsconv(&["info", "/nonexistent/wcs.hdr"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("wcs.hdr"));
}
