//! The worker pool driving the whole dump: pull a path, frame it, parse
//! each record, filter, format, stream output.

use crate::filter::{matches_all, Filter};
use crate::format::{Formatter, RecordInfo};
use crate::parser::{open_record_reader, parse_record, FileContext, RecordFramer};
use crate::sink::SerialWriter;
use crate::source::PathSource;
use crate::ParserError;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 16;

/// The complete parameter set of one dump run.
pub struct DumpConfig {
    pub workers: usize,
    pub source: Box<dyn PathSource>,
    pub formatter: Box<dyn Formatter>,
    pub filters: Vec<Filter>,
    pub dump: Arc<SerialWriter>,
    pub log: Arc<SerialWriter>,
    pub stat: Arc<SerialWriter>,
    pub max_record_len: u32,
}

/// Run the pool to completion, then summarize and close every sink.
/// Per-file errors are logged and never abort the run.
pub fn run_dump(config: &DumpConfig) {
    let start = Instant::now();
    let workers = config.workers.clamp(1, MAX_WORKERS);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| worker_loop(config));
        }
    });

    config.formatter.summarize();
    let _ = config
        .stat
        .write_str(&format!("Total time taken: {:?}\n", start.elapsed()));
    config.dump.close();
    config.log.close();
    config.stat.close();
}

fn worker_loop(config: &DumpConfig) {
    loop {
        match config.source.next_path() {
            Ok(Some(path)) => dump_file(&path, config),
            Ok(None) => break,
            Err(e) => {
                let _ = config
                    .log
                    .write_str(&format!("path source failed: {}\n", e));
                break;
            }
        }
    }
}

/// Process one file end to end. Framing and parse errors abandon the
/// file; format errors skip the record; everything is logged with file
/// context and record index.
fn dump_file(path: &Path, config: &DumpConfig) {
    let name = path.display().to_string();
    let reader = match open_record_reader(path) {
        Ok(reader) => reader,
        Err(e) => {
            let _ = config
                .log
                .write_str(&format!("error opening file {}: {}\n", name, e));
            return;
        }
    };

    let mut framer = RecordFramer::new(reader).with_max_record_len(config.max_record_len);
    let mut ctx = FileContext::default();
    let file_label: Arc<str> = Arc::from(name.as_str());
    let start = Instant::now();
    let mut entries = 0usize;
    let mut passed = 0usize;
    let mut size = 0usize;

    loop {
        let frame = match framer.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                let _ = config
                    .log
                    .write_str(&format!("[{}] framing error in {}: {}\n", entries + 1, name, e));
                return;
            }
        };
        entries += 1;
        size += frame.total_len();

        let record = match parse_record(frame, &mut ctx) {
            Ok(Some(record)) => record,
            // context records and non-routing payloads
            Ok(None) => continue,
            Err(ParserError::Unsupported(reason)) => {
                debug!("skipping record {} of {}: {}", entries, name, reason);
                continue;
            }
            Err(e) => {
                let _ = config
                    .log
                    .write_str(&format!("[{}] parse error in {}: {}\n", entries, name, e));
                break;
            }
        };

        if !matches_all(&config.filters, &record) {
            continue;
        }
        passed += 1;

        let info = RecordInfo::new(file_label.clone(), entries);
        match config.formatter.format(&record, &info) {
            Ok(Some(output)) => {
                // a failed dump write is silent data loss
                let _ = config.dump.write(&output);
            }
            Ok(None) => {}
            Err(e) => {
                let _ = config
                    .log
                    .write_str(&format!("[{}] format error in {}: {}\n", entries, name, e));
            }
        }
    }

    let _ = config.stat.write_str(&format!(
        "Scanned {}: {} entries, {} passed filters, {} bytes in {:?}\n",
        name,
        entries,
        passed,
        size,
        start.elapsed()
    ));
}
