/// Smoke tests: the binary runs, prints, and fails without panicking
use std::io::Write;
use std::process::{Command, Output};

fn hopglobe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hopglobe"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute hopglobe")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "hopglobe failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn binary_shows_help() {
    let stdout = stdout_of(&hopglobe(&["--help"]));
    assert!(stdout.contains("hopglobe"), "Help output should mention hopglobe");
    for command in ["fly", "route", "heatmap", "cables"] {
        assert!(stdout.contains(command), "Help should list {}", command);
    }
}

#[test]
fn binary_shows_version() {
    let stdout = stdout_of(&hopglobe(&["--version"]));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn invalid_subcommand_fails_gracefully() {
    let output = hopglobe(&["nonexistent-command"]);
    assert!(!output.status.success(), "Invalid subcommand should return error status");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked at"), "Invalid subcommand should not cause panic");
}

#[test]
fn route_prints_simulated_trace() {
    let stdout = stdout_of(&hopglobe(&["route", "--seed", "1"]));
    assert!(stdout.contains("Trace to example.com from San Francisco, US (completed, 10 hops)"));
    assert!(stdout.contains("210.152.135.178"));
    assert!(stdout.contains("10 flight segments"));

    let stdout = stdout_of(&hopglobe(&["route", "-T", "www.bbc.co.uk", "--seed", "1"]));
    assert!(stdout.contains("from New York, US"));
    assert!(stdout.contains("7 flight segments"));
}

#[test]
fn route_replays_hop_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"type":"started","data":{{"sessionId":"a","target":"replayed.net","source":{{"latitude":48.85,"longitude":2.35,"city":"Paris","countryCode":"FR"}}}}}}"#).unwrap();
    writeln!(file, r#"{{"type":"hop","data":{{"sessionId":"a","hop":{{"hopNumber":1,"ipAddress":"*","isTimeout":true}}}}}}"#).unwrap();
    writeln!(file, r#"{{"type":"hop","data":{{"sessionId":"a","hop":{{"hopNumber":2,"ipAddress":"192.0.2.1","hostname":"x.1e100.net","avgRtt":80.0,"location":{{"latitude":40.7,"longitude":-74.0}}}}}}}}"#).unwrap();
    writeln!(file, r#"{{"type":"completed","data":{{"sessionId":"a","totalHops":2}}}}"#).unwrap();

    let path = file.path().to_str().unwrap();
    let stdout = stdout_of(&hopglobe(&["route", "--hops", path]));
    assert!(stdout.contains("Trace to replayed.net from Paris, FR (completed, 2 hops)"));
    assert!(stdout.contains("[Google Cloud]"));
    assert!(stdout.contains("1 flight segments"));
    assert!(stdout.contains("hop 2"));
}

#[test]
fn route_tags_provider_from_location_org() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"type":"started","data":{{"sessionId":"b","target":"hetzner.de","source":{{"latitude":52.52,"longitude":13.40}}}}}}"#).unwrap();
    writeln!(file, r#"{{"type":"hop","data":{{"sessionId":"b","hop":{{"hopNumber":1,"ipAddress":"88.198.0.1","avgRtt":12.0,"location":{{"latitude":50.47,"longitude":12.37,"isp":"Hetzner Online GmbH","org":"Hetzner"}}}}}}}}"#).unwrap();
    writeln!(file, r#"{{"type":"completed","data":{{"sessionId":"b","totalHops":1}}}}"#).unwrap();

    let stdout = stdout_of(&hopglobe(&["route", "--hops", file.path().to_str().unwrap()]));
    assert!(stdout.contains("[Hetzner]"));
}

#[test]
fn bad_hop_file_reports_line() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "not json").unwrap();
    let output = hopglobe(&["route", "--hops", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 1"));
}

#[test]
fn heatmap_raw_grid() {
    let stdout = stdout_of(&hopglobe(&["heatmap", "--lat", "0", "--lng", "0", "--step", "40", "--raw"]));
    let lines: Vec<&str> = stdout.lines().collect();
    // -80..=80 by 40 is 5 rows, -180..=180 by 40 is 10 columns
    assert_eq!(lines.len(), 50);
    assert!(lines[0].starts_with("-80\t-180\t"));
}

#[test]
fn heatmap_rejects_tiny_step() {
    let output = hopglobe(&["heatmap", "--lat", "0", "--lng", "0", "--step", "1e-9", "--raw"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("grid step must be at least"));
}

#[test]
fn heatmap_requires_both_coordinates() {
    let output = hopglobe(&["heatmap", "--lat", "10"]);
    assert!(!output.status.success());
}

#[test]
fn cables_from_local_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"type":"FeatureCollection","features":[
            {{"properties":{{"id":"pacific","name":"Pacific Link"}},
              "geometry":{{"type":"LineString","coordinates":[[-118.2,34.0],[-157.8,21.3],[139.6,35.6]]}}}},
            {{"properties":{{"id":"atlantic","name":"Atlantic Link"}},
              "geometry":{{"type":"LineString","coordinates":[[-74.0,40.7],[-0.1,51.5]]}}}}
        ]}}"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap();
    let stdout = stdout_of(&hopglobe(&["cables", "--seed", "2", "--file", path]));
    assert!(stdout.contains("Route americas -> asia"));
    assert!(stdout.contains("1 of 2 cables on route"));
    assert!(stdout.contains("pacific-0"));
    assert!(!stdout.contains("atlantic-0"));
}
