use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_impulse_cli"))
}

fn tmp_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name)
}

/// 2 s of 16-bit PCM at 1 kHz: floor of 8 with one 10 ms burst of 64 at 1.0 s
fn write_burst_wav(name: &str) -> String {
    let path = tmp_file(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 1000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for i in 0..2000 {
        let sample: i16 = if (1000..1010).contains(&i) { 64 } else { 8 };
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path.to_string_lossy().into_owned()
}

fn write_config(name: &str) -> String {
    let path = tmp_file(name);
    let config = serde_json::json!({
        "detection": {
            "global_loud_amplitude": 20.0,
            "averaging_aperture": 0.02,
            "averaging_impulse_aperture": 0.005,
            "local_max_aperture": 0.05,
            "local_max_wide_aperture": 0.4,
            "max_impulse_duration": 0.1,
            "min_silence_near_impulse_duration": 0.1
        }
    });
    std::fs::write(&path, config.to_string()).expect("write config");
    path.to_string_lossy().into_owned()
}

fn analyse(args: &[&str]) -> std::process::Output {
    cli()
        .arg("analyse")
        .args(args)
        .output()
        .expect("failed to run impulse_cli analyse")
}

#[test]
fn analyse_reports_good_maximum() {
    let wav = write_burst_wav("cli_good.wav");
    let config = write_config("cli_good.json");
    let output = analyse(&["--input", &wav, "--config", &config]);
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("detection report JSON payload");
    assert_eq!(json["sample_rate"], 1000);
    assert_eq!(json["sample_count"], 2000);
    assert_eq!(json["max_absolute_signal"], 64.0);
    let good = json["good_maxima"].as_array().expect("good_maxima array");
    assert_eq!(good.len(), 1);
    assert_eq!(good[0]["sample_index"], 1000);
    assert_eq!(good[0]["short_impulse"], true);
}

#[test]
fn loud_amplitude_override_suppresses_detection() {
    let wav = write_burst_wav("cli_override.wav");
    let config = write_config("cli_override.json");
    // burst averages to about 45.6 units
    let output = analyse(&["--input", &wav, "--config", &config, "--loud-amplitude", "50"]);
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("report JSON");
    assert_eq!(json["good_maxima"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["local_maxima"].as_array().map(Vec::len), Some(0));
}

#[test]
fn analyse_writes_output_file_and_text() {
    let wav = write_burst_wav("cli_output.wav");
    let config = write_config("cli_output.json");
    let report_path = tmp_file("cli_output_report.txt");
    let report = report_path.to_string_lossy().into_owned();

    let output = analyse(&["--input", &wav, "--config", &config, "--text", "--output", &report]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let text = std::fs::read_to_string(&report_path).expect("report file");
    assert!(text.contains("local maximum info: GOOD (short impulse)"), "{text}");
    assert!(text.contains("1 good maxima of 1 local maxima"), "{text}");
}

#[test]
fn missing_input_fails() {
    let output = analyse(&["--input", "/nonexistent/cry.wav"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("reading /nonexistent/cry.wav"), "{stderr}");
}

#[test]
fn invalid_config_fails() {
    let wav = write_burst_wav("cli_bad_config.wav");
    let config = tmp_file("cli_bad_config.json");
    std::fs::write(&config, r#"{"detection": {"typical_signal_percentile": 4.0}}"#)
        .expect("write config");

    let output = analyse(&["--input", &wav, "--config", &config.to_string_lossy()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("typical_signal_percentile"), "{stderr}");
}

#[test]
fn defaults_prints_config() {
    let output = cli()
        .arg("defaults")
        .output()
        .expect("failed to run impulse_cli defaults");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    assert_eq!(json["detection"]["averaging_aperture"], 0.2);
    assert_eq!(json["detection"]["global_loud_amplitude"], Value::Null);
}

#[test]
fn analyse_draws_graph_of_requested_size() {
    let wav = write_burst_wav("cli_graph.wav");
    let config = write_config("cli_graph.json");
    let graph_path = tmp_file("cli_graph.png");
    std::fs::remove_file(&graph_path).ok();
    let graph = graph_path.to_string_lossy().into_owned();

    let output = analyse(&[
        "--input",
        &wav,
        "--config",
        &config,
        "--graph",
        &graph,
        "--graph-width",
        "640",
        "--graph-height",
        "120",
    ]);
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(graph_path.exists());
    let dimensions = image::image_dimensions(&graph_path).expect("readable PNG");
    assert_eq!(dimensions, (640, 120));

    // report still goes to stdout
    let json: Value = serde_json::from_slice(&output.stdout).expect("report JSON");
    assert_eq!(json["good_maxima"].as_array().map(Vec::len), Some(1));
}

#[test]
fn analyse_logs_phase_timing() {
    let wav = write_burst_wav("cli_timing.wav");
    let config = write_config("cli_timing.json");
    let output = analyse(&["--input", &wav, "--config", &config]);
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Analysing time"), "{stderr}");
    assert!(stderr.contains("ms preprocessing"), "{stderr}");
    assert!(stderr.contains("ms analysis"), "{stderr}");
}

#[test]
fn zero_graph_width_fails() {
    let wav = write_burst_wav("cli_graph_zero.wav");
    let graph = tmp_file("cli_graph_zero.png");
    let output = analyse(&[
        "--input",
        &wav,
        "--graph",
        &graph.to_string_lossy(),
        "--graph-width",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("drawing graph"), "{stderr}");
}
