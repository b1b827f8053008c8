use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn voronoi() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_voronoi"));
    command.env_remove("VORONOI_CONFIG").env("RUST_LOG", "warn");
    command
}

#[test]
fn check_shaders_accepts_builtin_programs() {
    let output = voronoi()
        .arg("check-shaders")
        .output()
        .expect("failed to run voronoi check-shaders");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("distance pass: ok"));
    assert!(stdout.contains("edge pass: ok"));
}

#[test]
fn check_shaders_reports_the_failing_stage() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.frag");
    fs::write(&broken, "#version 450\nvoid main() { this is not glsl }\n").unwrap();

    let output = voronoi()
        .args(["check-shaders", "--edge-shader"])
        .arg(&broken)
        .output()
        .expect("failed to run voronoi check-shaders");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("edge pass"), "{stderr}");
    assert!(stderr.contains("fragment shader failed to compile"), "{stderr}");
}

#[test]
fn check_shaders_reads_overrides_from_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("distance.frag"), "#version 450\nvoid main() {}\n").unwrap();
    let config = dir.path().join("diagram.toml");
    fs::write(&config, "version = 1\n[shaders]\ndistance = \"distance.frag\"\n").unwrap();

    let output = voronoi()
        .args(["check-shaders", "--config"])
        .arg(&config)
        .output()
        .expect("failed to run voronoi check-shaders");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("distance pass"), "{stderr}");
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("diagram.toml");
    fs::write(&config, "version = 3\n").unwrap();

    let output = voronoi()
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(dir.path().join("out.png"))
        .output()
        .expect("failed to run voronoi");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported config version"), "{stderr}");
    assert!(!dir.path().join("out.png").exists());
}

#[test]
fn zero_points_is_rejected_by_the_parser() {
    let output = voronoi()
        .args(["--points", "0"])
        .output()
        .expect("failed to run voronoi");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least one point"));
}
