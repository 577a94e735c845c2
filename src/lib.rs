/*!
`mrtdump` is a batch analysis tool for MRT routing archives (RFC 6396).

It ingests collections of MRT files, optionally bzip2-compressed,
parses each contained record into a layered view, filters records by
origin AS, peer AS or prefix membership, and emits one of several
outputs: per-record dumps (text, JSON, or the raw bytes for
re-framing), hour-of-day histograms, unique top-level prefix lists and
per-prefix event series, AS-graph descriptions, and prefix-ownership
conflict reports.

A fixed pool of worker threads processes one file at a time each;
summarizing formatters aggregate across the whole run and emit their
output once, after all workers have joined.

# Example

```no_run
use mrtdump::config::{build_dump_config, RunConfig};
use mrtdump::pipeline::run_dump;

let config = RunConfig {
    fmtr: "pup".to_string(),
    wc: 4,
    ..Default::default()
};
let dump = build_dump_config(config, &["updates.20200101.0000.bz2".to_string()]).unwrap();
run_dump(&dump);
```
*/

pub mod bucket;
pub mod config;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod format;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod radix;
pub mod sink;
pub mod source;

pub use error::{ConfigError, ParserError};
pub use models::RecordStack;
