// Copyright (c) 2017-2021 Fabian Schuiki

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use anyhow::{anyhow, Context, Result};
use clap::Arg;
use ssir::{
    assembly::{parse_module, write_module},
    pass::{CommonSubexprElim, Mem2Reg, Pass, PassContext},
    stats::Statistics,
    verifier::Verifier,
};
use std::{
    fs::File,
    io::{BufWriter, Read},
};

fn main() {
    match main_inner() {
        Ok(_) => (),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn main_inner() -> Result<()> {
    let matches = app_from_crate!()
        .about("Optimizes SSA assembly.")
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help(HELP_VERBOSITY.lines().next().unwrap())
                .long_help(HELP_VERBOSITY),
        )
        .arg(
            Arg::with_name("input")
                .help("IR file to optimize; `-` reads stdin")
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .help("File to write the rewritten IR to")
                .default_value("out.bc"),
        )
        .arg(
            Arg::with_name("mem2reg")
                .long("mem2reg")
                .help("Promote memory slots to SSA registers before CSE"),
        )
        .arg(
            Arg::with_name("no-cse")
                .long("no-cse")
                .help("Do not perform the CSE optimization"),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .help("Print collected statistics to stderr"),
        )
        .arg(
            Arg::with_name("no-verify")
                .long("no")
                .help("Skip post-pass IR verification"),
        )
        .get_matches();

    // Configure the logger.
    let verbose = std::cmp::max(1, matches.occurrences_of("verbosity") as usize) - 1;
    let quiet = !matches.is_present("verbosity");
    stderrlog::new()
        .module("ssir")
        .module("ssir_opt")
        .quiet(quiet)
        .verbosity(verbose)
        .init()
        .unwrap();

    // Read the input.
    let t0 = time::precise_time_ns();
    let path = matches.value_of("input").unwrap();
    let mut contents = String::new();
    if path == "-" {
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("failed to read stdin")?;
    } else {
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .with_context(|| format!("failed to read {}", path))?;
    }
    let mut module = parse_module(&contents).with_context(|| format!("failed to parse {}", path))?;
    let t1 = time::precise_time_ns();
    debug!("Parsed {} in {:.3} ms", path, (t1 - t0) as f64 * 1.0e-6);

    // Apply the optimization passes.
    let ctx = PassContext::for_module(&module);
    let t0 = time::precise_time_ns();
    if matches.is_present("mem2reg") {
        Mem2Reg::run_on_module(&ctx, &mut module);
    }
    let mut stats = Statistics::default();
    if !matches.is_present("no-cse") {
        stats = CommonSubexprElim::run_on_module(&ctx, &mut module);
    }
    let t1 = time::precise_time_ns();
    info!("Optimized in {:.3} ms", (t1 - t0) as f64 * 1.0e-6);

    // Collect statistics on the final module.
    stats.summarize(&module);

    // Verify the modified module, by default.
    if !matches.is_present("no-verify") {
        let mut verifier = Verifier::new();
        verifier.verify_module(&module);
        verifier
            .finish()
            .map_err(|errs| anyhow!("verification failed after optimization:\n{}", errs))?;
    }

    // Write the output and the statistics sidecar.
    let out_path = matches.value_of("output").unwrap();
    let output = File::create(out_path).with_context(|| format!("failed to create {}", out_path))?;
    write_module(BufWriter::with_capacity(1 << 20, output), &module)
        .with_context(|| format!("failed to write {}", out_path))?;
    let stats_path = format!("{}.stats", out_path);
    let stats_file =
        File::create(&stats_path).with_context(|| format!("failed to create {}", stats_path))?;
    stats
        .write_csv(stats_file)
        .with_context(|| format!("failed to write {}", stats_path))?;

    // Print the statistics if requested by the user.
    if matches.is_present("verbose") {
        for (name, value) in &stats.rows() {
            eprintln!("{:>8}  {}", value, name);
        }
    }

    Ok(())
}

static HELP_VERBOSITY: &str = "Increase message verbosity

This option can be specified multiple times to increase the level of verbosity \
in the output:

-v      Only print errors
-vv     Also print warnings
-vvv    Also print info messages
-vvvv   Also print debug messages
-vvvvv  Also print detailed tracing messages
";
