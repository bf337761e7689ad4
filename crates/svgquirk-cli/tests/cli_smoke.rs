use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

#[test]
fn cli_measures_stroked_rect() {
    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    let out = Command::new(exe)
        .args(["measure", fixture("stroked_rect.svg").to_string_lossy().as_ref()])
        .output()
        .expect("run cli");
    assert!(out.status.success());

    let m: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(m["x"].as_f64(), Some(19.0));
    assert_eq!(m["y"].as_f64(), Some(9.0));
    assert_eq!(m["width"].as_f64(), Some(42.0));
    assert_eq!(m["height"].as_f64(), Some(32.0));
}

#[test]
fn cli_measures_text_only_document() {
    if svgquirk::system_fontdb().is_empty() {
        return;
    }
    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    let out = Command::new(exe)
        .args(["measure", fixture("text_only.svg").to_string_lossy().as_ref()])
        .output()
        .expect("run cli");
    assert!(
        out.status.success(),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );

    // Three lines advance 1.2em (16.8 at the default 14px) each.
    let m: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    let width = m["width"].as_f64().expect("width");
    let height = m["height"].as_f64().expect("height");
    assert!(width > 20.0, "{m}");
    assert!(height > 2.0 * 16.8, "{m}");
}

#[test]
fn cli_normalizes_text_quirks() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("normalized.svg");

    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    Command::new(exe)
        .args([
            "normalize",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture("quirks_text.svg").to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read svg");
    assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    assert!(svg.contains(r#"alignment-baseline="text-before-edge""#));
    assert!(svg.contains(r#"<tspan x="0" dy="1.2em">Hi</tspan>"#));
    assert!(svg.contains(r#"<tspan x="0" dy="1.2em">There</tspan>"#));
    assert!(!svg.contains(r#"viewBox="0 0 10 10""#));
}

#[test]
fn cli_renders_png_with_default_out_path_for_file_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tmp_fixture = tmp.path().join("stroked_rect.svg");
    fs::copy(fixture("stroked_rect.svg"), &tmp_fixture).expect("copy fixture");

    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    Command::new(exe)
        .args([
            "render",
            "--scale",
            "2",
            tmp_fixture.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(tmp_fixture.with_extension("png")).expect("read png");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "output is not a PNG"
    );

    let decoder = png::Decoder::new(bytes.as_slice());
    let reader = decoder.read_info().expect("png header");
    assert_eq!((reader.info().width, reader.info().height), (84, 64));
}

#[test]
fn cli_renders_jpg_smoke() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.jpg");

    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    Command::new(exe)
        .args([
            "render",
            "--format",
            "jpg",
            "--background",
            "#ffffff",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture("stroked_rect.svg").to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read jpg");
    assert!(bytes.starts_with(&[0xFF, 0xD8]), "output is not a JPG");
}

#[test]
fn cli_rejects_non_svg_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("bad.svg");
    fs::write(&input, "<notsvg/>").expect("write input");

    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    Command::new(exe)
        .args(["measure", input.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}

#[test]
fn cli_rejects_unknown_flags() {
    let exe = assert_cmd::cargo_bin!("svgquirk-cli");
    Command::new(exe).args(["--bogus"]).assert().code(2);
}
