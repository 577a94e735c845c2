//! End-to-end scenarios: synthesized MRT archives pushed through the
//! full pipeline via the same configuration layer the CLI uses.

use mrtdump::config::{build_dump_config, RunConfig};
use mrtdump::encoder::UpdateBuilder;
use mrtdump::format::read_series;
use mrtdump::pipeline::run_dump;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const T_2020_01_01_00_00: u32 = 1_577_836_800;
const T_2020_01_01_00_30: u32 = 1_577_838_600;
const T_2020_01_01_23_59: u32 = 1_577_923_199;

struct Advert {
    timestamp: u32,
    path: Vec<u32>,
    prefix: &'static str,
}

fn advert(timestamp: u32, path: &[u32], prefix: &'static str) -> Advert {
    Advert {
        timestamp,
        path: path.to_vec(),
        prefix,
    }
}

fn encode_archive(records: &[Advert]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for record in records {
        let frame = UpdateBuilder::new()
            .timestamp(record.timestamp)
            .peer(Ipv4Addr::new(10, 0, 0, 2), *record.path.first().unwrap_or(&65001))
            .local(Ipv4Addr::new(10, 0, 0, 1), 64512)
            .as_path(&record.path)
            .announce(record.prefix.parse().unwrap())
            .build();
        bytes.extend_from_slice(&frame);
    }
    bytes
}

fn write_archive(dir: &TempDir, name: &str, records: &[Advert]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, encode_archive(records)).unwrap();
    path
}

/// Run the pipeline exactly as the CLI would, with sinks redirected to
/// files, and return (dump, log, stat) contents.
fn run(dir: &TempDir, config: RunConfig, inputs: &[PathBuf]) -> (String, String, String) {
    let dump_path = dir.path().join("out.dump");
    let log_path = dir.path().join("out.log");
    let stat_path = dir.path().join("out.stat");
    let config = RunConfig {
        dump_out: dump_path.to_string_lossy().into_owned(),
        lo: log_path.to_string_lossy().into_owned(),
        so: stat_path.to_string_lossy().into_owned(),
        ..config
    };
    let args: Vec<String> = inputs
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let dump_config = build_dump_config(config, &args).unwrap();
    run_dump(&dump_config);

    let read = |path: &Path| std::fs::read_to_string(path).unwrap_or_default();
    (read(&dump_path), read(&log_path), read(&stat_path))
}

fn s1_records() -> Vec<Advert> {
    vec![
        advert(T_2020_01_01_00_00, &[65001, 65002, 65003], "10.0.0.0/8"),
        advert(T_2020_01_01_00_30, &[65001, 65002, 65003], "10.0.0.0/8"),
        advert(T_2020_01_01_23_59, &[65001, 65002, 65003], "10.0.0.0/8"),
    ]
}

#[test]
fn s1_day_histogram() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(&dir, "updates.mrt", &s1_records());

    let config = RunConfig {
        fmtr: "day".to_string(),
        ..Default::default()
    };
    let (dump, _, stat) = run(&dir, config, &[input]);

    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), 24);
    assert_eq!(lines[0], "0 2");
    assert_eq!(lines[23], "23 1");
    for line in &lines[1..23] {
        assert!(line.ends_with(" 0"), "unexpected count: {}", line);
    }
    assert!(stat.contains("3 entries, 3 passed filters"));
}

#[test]
fn s2_unique_prefix_list() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(&dir, "updates.mrt", &s1_records());

    let config = RunConfig {
        fmtr: "pup".to_string(),
        ..Default::default()
    };
    let (dump, _, _) = run(&dir, config, &[input]);
    assert_eq!(dump, "10.0.0.0/8 1577836800\n");
}

#[test]
fn s3_more_specific_prefix_dropped() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(
        &dir,
        "updates.mrt",
        &[
            advert(1_000, &[65001], "10.0.0.0/8"),
            advert(2_000, &[65001], "10.1.0.0/16"),
        ],
    );

    let config = RunConfig {
        fmtr: "pup".to_string(),
        ..Default::default()
    };
    let (dump, _, _) = run(&dir, config, &[input]);
    assert_eq!(dump, "10.0.0.0/8 1000\n");
}

#[test]
fn s4_source_as_filter() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(&dir, "updates.mrt", &s1_records());

    let config = RunConfig {
        fmtr: "day".to_string(),
        srcas: "65003".to_string(),
        ..Default::default()
    };
    let (dump, _, stat) = run(&dir, config, &[input.clone()]);
    assert!(stat.contains("3 passed filters"));
    assert_eq!(dump.lines().next(), Some("0 2"));

    let config = RunConfig {
        fmtr: "day".to_string(),
        srcas: "65999".to_string(),
        ..Default::default()
    };
    let (dump, _, stat) = run(&dir, config, &[input]);
    assert!(stat.contains("0 passed filters"));
    for line in dump.lines() {
        assert!(line.ends_with(" 0"));
    }
}

#[test]
fn s5_as_map_graph() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(
        &dir,
        "updates.mrt",
        &[
            advert(1_000, &[65100, 65200, 65300], "10.0.0.0/8"),
            advert(2_000, &[65100, 65200, 65300], "10.0.0.0/8"),
            advert(3_000, &[65200, 65300], "10.0.0.0/8"),
        ],
    );

    let config = RunConfig {
        fmtr: "ml".to_string(),
        ..Default::default()
    };
    let (dump, _, _) = run(&dir, config, &[input]);

    assert!(dump.starts_with("digraph as_map {"));
    assert!(dump.contains("65300 -> { 65200 };"));
    assert!(dump.contains("65200 -> { 65100 };"));
    assert!(dump.contains("65300 [style=\"filled\",fillcolor=\"cornflowerblue\"]; // appeared: 3"));
    assert!(dump.contains("65200 ; // appeared: 3"));
    assert!(dump.contains("65100 ; // appeared: 2"));
    // the origin never gained an edge back toward the peers
    assert!(!dump.contains("65100 -> "));
}

#[test]
fn s6_prefix_lock_conflicts() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(
        &dir,
        "updates.mrt",
        &[
            advert(10, &[64512, 1], "192.0.2.0/24"),
            advert(20, &[64512, 1], "192.0.2.0/24"),
            advert(30, &[64512, 2], "192.0.2.0/24"),
            advert(40, &[64512, 2], "192.0.2.0/24"),
            advert(50, &[64512, 3], "192.0.2.0/24"),
        ],
    );

    let config = RunConfig {
        fmtr: "prefixlock".to_string(),
        ..Default::default()
    };
    let (dump, _, _) = run(&dir, config, &[input]);

    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("owner:1") && lines[0].contains("intruder:2"));
    assert!(lines[1].contains("owner:1") && lines[1].contains("intruder:3"));
}

#[test]
fn bz2_input_is_transparent() {
    let dir = TempDir::new().unwrap();
    let plain = encode_archive(&s1_records());

    let bz2_path = dir.path().join("updates.mrt.bz2");
    let file = std::fs::File::create(&bz2_path).unwrap();
    let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::best());
    encoder.write_all(&plain).unwrap();
    encoder.finish().unwrap();

    let config = RunConfig {
        fmtr: "pup".to_string(),
        ..Default::default()
    };
    let (dump, _, _) = run(&dir, config, &[bz2_path]);
    assert_eq!(dump, "10.0.0.0/8 1577836800\n");
}

#[test]
fn identity_formatter_reframes_byte_identical() {
    let dir = TempDir::new().unwrap();
    let original = encode_archive(&s1_records());
    let input = dir.path().join("updates.mrt");
    std::fs::write(&input, &original).unwrap();

    let config = RunConfig {
        fmtr: "id".to_string(),
        ..Default::default()
    };
    let dump_path = dir.path().join("out.dump");
    let config = RunConfig {
        dump_out: dump_path.to_string_lossy().into_owned(),
        lo: dir.path().join("out.log").to_string_lossy().into_owned(),
        so: dir.path().join("out.stat").to_string_lossy().into_owned(),
        ..config
    };
    let dump_config =
        build_dump_config(config, &[input.to_string_lossy().into_owned()]).unwrap();
    run_dump(&dump_config);

    let dumped = std::fs::read(&dump_path).unwrap();
    assert_eq!(dumped, original);
}

#[test]
fn identity_with_filter_emits_subset() {
    let dir = TempDir::new().unwrap();
    let keep = advert(1_000, &[65001, 65002], "10.0.0.0/8");
    let drop = advert(2_000, &[65001, 65009], "10.0.0.0/8");
    let input = write_archive(&dir, "updates.mrt", &[keep, drop]);

    let config = RunConfig {
        fmtr: "id".to_string(),
        srcas: "65002".to_string(),
        ..Default::default()
    };
    let dump_path = dir.path().join("out.dump");
    let config = RunConfig {
        dump_out: dump_path.to_string_lossy().into_owned(),
        lo: dir.path().join("out.log").to_string_lossy().into_owned(),
        so: dir.path().join("out.stat").to_string_lossy().into_owned(),
        ..config
    };
    let dump_config =
        build_dump_config(config, &[input.to_string_lossy().into_owned()]).unwrap();
    run_dump(&dump_config);

    let expected = encode_archive(&[advert(1_000, &[65001, 65002], "10.0.0.0/8")]);
    let dumped = std::fs::read(&dump_path).unwrap();
    assert_eq!(dumped, expected);
}

#[test]
fn series_output_round_trips() {
    let dir = TempDir::new().unwrap();
    let input = write_archive(
        &dir,
        "updates.mrt",
        &[
            advert(3_000, &[65001, 65003], "10.0.0.0/8"),
            advert(1_000, &[65001, 65003], "10.0.0.0/8"),
            advert(2_000, &[65001, 65003], "10.1.0.0/16"),
            advert(2_500, &[65001, 65004], "198.51.100.0/24"),
        ],
    );

    let config = RunConfig {
        fmtr: "pts".to_string(),
        ..Default::default()
    };
    let dump_path = dir.path().join("out.dump");
    let config = RunConfig {
        dump_out: dump_path.to_string_lossy().into_owned(),
        lo: dir.path().join("out.log").to_string_lossy().into_owned(),
        so: dir.path().join("out.stat").to_string_lossy().into_owned(),
        ..config
    };
    let dump_config =
        build_dump_config(config, &[input.to_string_lossy().into_owned()]).unwrap();
    run_dump(&dump_config);

    let data = std::fs::read(&dump_path).unwrap();
    let mut histories = read_series(data.as_slice()).unwrap();
    histories.sort_by(|a, b| a.prefix.cmp(&b.prefix));

    assert_eq!(histories.len(), 2);
    assert_eq!(histories[0].prefix, "10.0.0.0/8");
    let times: Vec<i64> = histories[0].events.iter().map(|e| e.timestamp).collect();
    assert_eq!(times, vec![1_000, 3_000]);
    assert_eq!(histories[0].events[0].as_path, vec![65001, 65003]);
    assert_eq!(histories[1].prefix, "198.51.100.0/24");
}

#[test]
fn multiple_files_and_workers() {
    let dir = TempDir::new().unwrap();
    let mut inputs = Vec::new();
    for i in 0u32..8 {
        let records = vec![
            advert(1_000 + i, &[65001, 65003], "10.0.0.0/8"),
            advert(2_000 + i, &[65001, 65003], "192.0.2.0/24"),
        ];
        inputs.push(write_archive(&dir, &format!("updates.{}.mrt", i), &records));
    }

    let config = RunConfig {
        fmtr: "pup".to_string(),
        wc: 4,
        ..Default::default()
    };
    let (dump, _, stat) = run(&dir, config, &inputs);

    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "10.0.0.0/8 1000");
    assert_eq!(lines[1], "192.0.2.0/24 2000");
    assert_eq!(stat.matches("passed filters").count(), 8);
}

#[test]
fn config_file_mode_expands_collector_directories() {
    let dir = TempDir::new().unwrap();
    let archive_root = dir.path().join("archive");

    // archive/rrc00/2020.01/ and archive/rrc00/2020.02/
    for month in ["2020.01", "2020.02"] {
        let month_dir = archive_root.join("rrc00").join(month);
        std::fs::create_dir_all(&month_dir).unwrap();
        std::fs::write(
            month_dir.join("updates.mrt"),
            encode_archive(&[advert(T_2020_01_01_00_00, &[65001, 65003], "10.0.0.0/8")]),
        )
        .unwrap();
    }

    let colfmt_path = dir.path().join("collectors.txt");
    std::fs::write(
        &colfmt_path,
        format!("{{base}} {}/\n{{default}} {{x}}/{{yyyy.mm}}/\n", archive_root.display()),
    )
    .unwrap();

    let dump_path = dir.path().join("out.dump");
    let run_config_path = dir.path().join("run.json");
    std::fs::write(
        &run_config_path,
        format!(
            r#"{{"Collist": ["rrc00"], "Start": "2020.01", "End": "2020.02",
                "Fmtr": "day", "Wc": 2, "Do": "{}", "Lo": "{}", "So": "{}"}}"#,
            dump_path.display(),
            dir.path().join("out.log").display(),
            dir.path().join("out.stat").display(),
        ),
    )
    .unwrap();

    let config = RunConfig {
        conf: true,
        ..Default::default()
    };
    let dump_config = build_dump_config(
        config,
        &[
            colfmt_path.to_string_lossy().into_owned(),
            run_config_path.to_string_lossy().into_owned(),
        ],
    )
    .unwrap();
    run_dump(&dump_config);

    let dump = std::fs::read_to_string(&dump_path).unwrap();
    // two files, one record each, both at hour 0
    assert_eq!(dump.lines().next(), Some("0 2"));
}

#[test]
fn corrupt_file_logged_other_files_continue() {
    let dir = TempDir::new().unwrap();
    let good = write_archive(
        &dir,
        "good.mrt",
        &[advert(1_000, &[65001, 65003], "10.0.0.0/8")],
    );
    let broken_path = dir.path().join("broken.mrt");
    let mut bytes = encode_archive(&[advert(2_000, &[65001, 65003], "192.0.2.0/24")]);
    bytes.truncate(bytes.len() - 4);
    std::fs::write(&broken_path, &bytes).unwrap();

    let config = RunConfig {
        fmtr: "pup".to_string(),
        ..Default::default()
    };
    let (dump, log, _) = run(&dir, config, &[broken_path, good]);

    assert!(log.contains("framing error"));
    assert_eq!(dump, "10.0.0.0/8 1000\n");
}
