//! Run configuration: flag values, the optional JSON config file, and
//! the collector-format directory expansion.

use crate::error::ConfigError;
use crate::filter::{AsDirection, Filter, PrefixScope};
use crate::format::make_formatter;
use crate::parser::DEFAULT_MAX_RECORD_LEN;
use crate::pipeline::DumpConfig;
use crate::sink::SerialWriter;
use crate::source::{DirWalk, PathList, PathSource};
use chrono::{Months, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

/// Every run option, deserializable from the JSON run-config file. The
/// same struct carries flag values in plain CLI mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RunConfig {
    /// Collector names, config-file mode only.
    pub collist: Vec<String>,
    /// Inclusive YYYY.MM month range, config-file mode only.
    pub start: String,
    pub end: String,
    /// Log, stat and dump sink targets; empty means stdout.
    pub lo: String,
    pub so: String,
    #[serde(rename = "Do")]
    pub dump_out: String,
    /// Worker count, clamped to [1, 16].
    pub wc: usize,
    /// Formatter name.
    pub fmtr: String,
    pub conf: bool,
    pub srcas: String,
    pub destas: String,
    #[serde(rename = "prefixes")]
    pub prefixes: String,
    #[serde(rename = "PrefLoc")]
    pub prefloc: String,
    pub debug: bool,
}

/// Build the complete dump parameter set from a [RunConfig] and the
/// positional arguments: input paths, or with `conf` exactly two paths
/// naming the collector-format file and the JSON run config.
pub fn build_dump_config(
    mut config: RunConfig,
    args: &[String],
) -> Result<DumpConfig, ConfigError> {
    let source: Box<dyn PathSource> = if config.conf {
        if args.len() != 2 {
            return Err(ConfigError::BadArgs(
                "config mode takes exactly two arguments: <collector formats> <config file>"
                    .to_string(),
            ));
        }
        let (file_config, dirs) = parse_config_files(&args[0], &args[1])?;
        config = file_config;
        Box::new(DirWalk::new(dirs))
    } else {
        Box::new(PathList::new(args.iter().map(PathBuf::from).collect()))
    };

    let dump = Arc::new(SerialWriter::open(&config.dump_out));
    let log = Arc::new(SerialWriter::open(&config.lo));
    let stat = Arc::new(SerialWriter::open(&config.so));
    let formatter = make_formatter(&config.fmtr, &dump, config.debug);
    let filters = build_filters(&config)?;

    Ok(DumpConfig {
        workers: config.wc.clamp(1, crate::pipeline::MAX_WORKERS),
        source,
        formatter,
        filters,
        dump,
        log,
        stat,
        max_record_len: DEFAULT_MAX_RECORD_LEN,
    })
}

fn build_filters(config: &RunConfig) -> Result<Vec<Filter>, ConfigError> {
    let mut filters = Vec::new();
    if !config.srcas.is_empty() {
        filters.push(Filter::origin_as(&config.srcas, AsDirection::Source)?);
    }
    if !config.destas.is_empty() {
        filters.push(Filter::origin_as(&config.destas, AsDirection::Destination)?);
    }
    if !config.prefixes.is_empty() {
        let scope = PrefixScope::from_flag(&config.prefloc);
        filters.push(Filter::prefixes(&config.prefixes, scope)?);
    }
    Ok(filters)
}

/// Parse the collector-format file and the JSON run config, expanding
/// the month range into one directory path per collector and month.
fn parse_config_files(
    colfmt_path: &str,
    config_path: &str,
) -> Result<(RunConfig, Vec<PathBuf>), ConfigError> {
    let formats = read_collector_format(colfmt_path)?;

    let file = File::open(config_path)?;
    let config: RunConfig = serde_json::from_reader(file)
        .map_err(|e| ConfigError::BadConfig(e.to_string()))?;

    let start = parse_month(&config.start)?;
    let end = parse_month(&config.end)?;
    if start > end {
        return Err(ConfigError::BadDate(format!(
            "start month {} is after end month {}",
            config.start, config.end
        )));
    }

    let mut dirs = Vec::new();
    let mut month = start;
    while month <= end {
        let stamp = month.format("%Y.%m").to_string();
        for collector in &config.collist {
            let template = match formats.get(collector) {
                Some(path) => path.clone(),
                None => formats
                    .get("_default")
                    .ok_or_else(|| {
                        ConfigError::BadCollectorFormat("missing default rule".to_string())
                    })?
                    .replace("{x}", collector),
            };
            dirs.push(PathBuf::from(template.replace("{yyyy.mm}", &stamp)));
        }
        month = month
            .checked_add_months(Months::new(1))
            .ok_or_else(|| ConfigError::BadDate("month range overflow".to_string()))?;
    }

    Ok((config, dirs))
}

fn parse_month(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(&format!("{}.01", value), "%Y.%m.%d")
        .map_err(|_| ConfigError::BadDate(value.to_string()))
}

/// Read the collector-format file: a `{base}` line, a `{default}` line
/// with `{x}` and `{yyyy.mm}` placeholders, then one suffix line per
/// specially-handled collector.
fn read_collector_format(path: &str) -> Result<HashMap<String, String>, ConfigError> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let base = expect_pair(&mut lines, "{base}")?;
    let default_suffix = expect_pair(&mut lines, "{default}")?;

    let mut formats = HashMap::new();
    formats.insert("_default".to_string(), base.clone() + &default_suffix);

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (name, suffix) = split_pair(&line)?;
        formats.insert(name, base.clone() + &suffix);
    }

    Ok(formats)
}

fn expect_pair(
    lines: &mut std::io::Lines<BufReader<File>>,
    rule: &str,
) -> Result<String, ConfigError> {
    let line = lines
        .next()
        .ok_or_else(|| ConfigError::BadCollectorFormat(format!("missing {} line", rule)))??;
    let (first, second) = split_pair(&line)?;
    if first != rule {
        return Err(ConfigError::BadCollectorFormat(format!(
            "expected {} line, found {:?}",
            rule, first
        )));
    }
    Ok(second)
}

fn split_pair(line: &str) -> Result<(String, String), ConfigError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => Ok((first.to_string(), second.to_string())),
        _ => Err(ConfigError::BadCollectorFormat(format!(
            "badly formatted line: {:?}",
            line
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_collector_format_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let colfmt = write_file(
            &dir,
            "collectors.txt",
            "{base} /archive/\n{default} {x}/{yyyy.mm}/UPDATES/\nspecial special-route/{yyyy.mm}/\n",
        );
        let config = write_file(
            &dir,
            "run.json",
            r#"{"Collist": ["rrc00", "special"], "Start": "2019.11", "End": "2020.01", "Fmtr": "day", "Wc": 4}"#,
        );

        let (cfg, dirs) = parse_config_files(&colfmt, &config).unwrap();
        assert_eq!(cfg.wc, 4);
        assert_eq!(cfg.fmtr, "day");
        // 3 months x 2 collectors, months in order
        assert_eq!(dirs.len(), 6);
        assert_eq!(dirs[0], PathBuf::from("/archive/rrc00/2019.11/UPDATES/"));
        assert_eq!(dirs[1], PathBuf::from("/archive/special-route/2019.11/"));
        assert_eq!(dirs[4], PathBuf::from("/archive/rrc00/2020.01/UPDATES/"));
    }

    #[test]
    fn test_bad_month_rejected() {
        assert!(parse_month("2020.01").is_ok());
        assert!(parse_month("2020-01").is_err());
        assert!(parse_month("января").is_err());
    }

    #[test]
    fn test_malformed_collector_format() {
        let dir = tempfile::tempdir().unwrap();
        let missing_default = write_file(&dir, "bad1.txt", "{base} /archive/\n");
        assert!(read_collector_format(&missing_default).is_err());

        let bad_pair = write_file(&dir, "bad2.txt", "{base} /a/ extra\n{default} x\n");
        assert!(read_collector_format(&bad_pair).is_err());
    }

    #[test]
    fn test_build_filters_from_flags() {
        let config = RunConfig {
            srcas: "65001,65002".to_string(),
            prefixes: "10.0.0.0/8".to_string(),
            prefloc: "mystery".to_string(),
            ..Default::default()
        };
        let filters = build_filters(&config).unwrap();
        assert_eq!(filters.len(), 2);

        let config = RunConfig {
            srcas: "not-a-number".to_string(),
            ..Default::default()
        };
        assert!(build_filters(&config).is_err());
    }

    #[test]
    fn test_config_mode_needs_two_args() {
        let config = RunConfig {
            conf: true,
            ..Default::default()
        };
        let result = build_dump_config(config, &["one".to_string()]);
        assert!(matches!(result, Err(ConfigError::BadArgs(_))));
    }
}
