use clap::Parser;
use mrtdump::config::{build_dump_config, RunConfig};
use mrtdump::pipeline::run_dump;

/// Batch analysis of MRT routing archives.
#[derive(Parser, Debug)]
#[clap(name = "mrtdump", version)]
struct Opts {
    /// Input MRT file paths; with --conf, exactly two paths:
    /// <collector formats> <config file>
    #[clap(name = "PATHS")]
    paths: Vec<String>,

    /// File to place log output
    #[clap(long, default_value = "stdout")]
    lo: String,

    /// File to place stat output
    #[clap(long, default_value = "stdout")]
    so: String,

    /// File to place dump output
    #[clap(short = 'o', long = "out", default_value = "stdout")]
    out: String,

    /// Output format: pup, pts, day, json, text, ml, prefixlock, id
    #[clap(long, default_value = "text")]
    fmtr: String,

    /// Comma-separated AS list (e.g. 1,2,3) filtering by message source
    #[clap(long, default_value = "")]
    srcas: String,

    /// Comma-separated AS list filtering by message destination
    #[clap(long, default_value = "")]
    destas: String,

    /// Comma-separated prefix list; messages containing any of them pass
    #[clap(long, default_value = "")]
    prefixes: String,

    /// Where to filter for prefixes: one of [any, advertised, withdrawn]
    #[clap(long, default_value = "")]
    prefloc: String,

    /// Draw configuration from a file
    #[clap(long)]
    conf: bool,

    /// Enable debug annotations in string outputs
    #[clap(long)]
    debug: bool,

    /// Number of worker threads (max 16)
    #[clap(long, default_value_t = 1)]
    wc: usize,
}

fn main() {
    env_logger::init();
    let opts = Opts::parse();

    let config = RunConfig {
        lo: opts.lo,
        so: opts.so,
        dump_out: opts.out,
        fmtr: opts.fmtr,
        srcas: opts.srcas,
        destas: opts.destas,
        prefixes: opts.prefixes,
        prefloc: opts.prefloc,
        conf: opts.conf,
        debug: opts.debug,
        wc: opts.wc,
        ..Default::default()
    };

    let dump_config = match build_dump_config(config, &opts.paths) {
        Ok(dump_config) => dump_config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    run_dump(&dump_config);
}
