use anyhow::{anyhow, bail, Result};
use clap::{crate_authors, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use ksketch::SketchOptions;
use std::str::FromStr;

pub fn build_cli() -> App<'static, 'static> {
    App::new("ksketch")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Tool for building bottom-k MinHash sketches of genomic data")
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::ArgRequiredElseHelp)
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .global(true)
                .help("Only log warnings and errors"),
        )
        .subcommand(sketch_command())
        .subcommand(info_command())
        .subcommand(paste_command())
}

fn sketch_command() -> App<'static, 'static> {
    let mut sketch_command = SubCommand::with_name("sketch")
        .about("Create a sketch file from FASTA/Q file(s), or - for standard input")
        .arg(
            Arg::with_name("INPUT")
                .help("The file(s) to sketch")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("list")
                .short("l")
                .long("list")
                .help("Inputs are files listing the paths to sketch, one per line"),
        )
        .arg(
            Arg::with_name("output_file")
                .short("o")
                .long("output")
                .help("Output prefix (the first input by default); `.ksk` is added if missing")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("threads")
                .short("p")
                .long("threads")
                .takes_value(true)
                .default_value("1")
                .help("Number of threads to sketch with"),
        );
    sketch_command = add_sketch_options(sketch_command);
    sketch_command
}

fn info_command() -> App<'static, 'static> {
    SubCommand::with_name("info")
        .about("Display the parameters and contents of sketch file(s)")
        .arg(
            Arg::with_name("INPUT")
                .help("Sketch file(s) to describe")
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::with_name("json")
                .short("d")
                .long("json")
                .help("Dump the full sketch(es) as JSON"),
        )
}

fn paste_command() -> App<'static, 'static> {
    SubCommand::with_name("paste")
        .about("Combine sketch files built with compatible parameters into one")
        .arg(
            Arg::with_name("OUTPUT")
                .help("Output prefix; `.ksk` is added if missing")
                .required(true),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Sketch files to combine, in order")
                .multiple(true)
                .required(true),
        )
}

fn add_sketch_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(Arg::with_name("kmer_length")
         .short("k")
         .long("kmer-length")
         .takes_value(true)
         .help("Length of kmers to use [default: 21, or 9 with --protein]"))
    .arg(Arg::with_name("sketch_size")
         .short("s")
         .long("sketch-size")
         .takes_value(true)
         .default_value("1000")
         .help("How many of the smallest hashes to keep per sketch"))
    .arg(Arg::with_name("seed")
         .short("S")
         .long("seed")
         .takes_value(true)
         .default_value("42")
         .help("Seed murmurhash with this value"))
    .arg(Arg::with_name("individual")
         .short("i")
         .long("individual")
         .conflicts_with_all(&["reads", "min_cov", "target_cov"])
         .help("Sketch every sequence separately instead of every file"))
    .arg(Arg::with_name("warning")
         .short("w")
         .long("warning")
         .takes_value(true)
         .default_value("0.01")
         .help("Warn when the chance of a random kmer match in a sequence is above this probability (0 disables the check)"))
    .arg(Arg::with_name("reads")
         .short("r")
         .long("reads")
         .help("Inputs are noisy reads; filter out kmers seen fewer than --min-cov times"))
    .arg(Arg::with_name("min_cov")
         .short("m")
         .long("min-cov")
         .takes_value(true)
         .help("Minimum times a kmer must be seen to be sketched (implies --reads) [default: 1]"))
    .arg(Arg::with_name("target_cov")
         .short("c")
         .long("target-cov")
         .takes_value(true)
         .help("Stop reading a file once its estimated coverage reaches this (implies --reads)"))
    .arg(Arg::with_name("noncanonical")
         .short("n")
         .long("noncanonical")
         .help("Keep kmers as they appear instead of merging them with their reverse complements"))
    .arg(Arg::with_name("protein")
         .short("a")
         .long("protein")
         .help("Inputs are amino acid sequences (implies --noncanonical)"))
    .arg(Arg::with_name("counts")
         .long("counts")
         .help("Store how many times each hash was seen"))
}

pub fn get_int_arg<T: FromStr>(matches: &ArgMatches, key: &str) -> Result<T> {
    let display_key = key.replace('_', "-");
    matches
        .value_of(key)
        .ok_or_else(|| anyhow!("Bad {}", display_key))?
        .parse::<T>()
        .map_err(|_| anyhow!("{} must be a positive integer", display_key))
}

pub fn get_float_arg(matches: &ArgMatches, key: &str, limit: f64) -> Result<f64> {
    let display_key = key.replace('_', "-");
    matches
        .value_of(key)
        .ok_or_else(|| anyhow!("Bad {}", display_key))?
        .parse::<f64>()
        .map_err(|_| anyhow!("{} must be a number", display_key))
        .and_then(|r| {
            if 0f64 <= r && r <= limit {
                return Ok(r);
            }
            bail!("{} must be between 0 and {}", display_key, limit)
        })
}

pub fn parse_sketch_options(matches: &ArgMatches) -> Result<SketchOptions> {
    let kmer_length = if matches.occurrences_of("kmer_length") > 0 {
        Some(get_int_arg::<u8>(matches, "kmer_length")?)
    } else {
        None
    };

    let min_cov = if matches.occurrences_of("min_cov") > 0 {
        Some(get_int_arg::<u32>(matches, "min_cov")?)
    } else {
        None
    };

    let target_cov = if matches.occurrences_of("target_cov") > 0 {
        Some(get_float_arg(matches, "target_cov", f64::MAX)?)
    } else {
        None
    };

    Ok(SketchOptions {
        kmer_length,
        sketch_size: get_int_arg(matches, "sketch_size")?,
        individual: matches.is_present("individual"),
        noncanonical: matches.is_present("noncanonical"),
        reads: matches.is_present("reads"),
        min_cov,
        target_cov,
        warning: get_float_arg(matches, "warning", 1f64)?,
        protein: matches.is_present("protein"),
        hash_seed: get_int_arg(matches, "seed")?,
        keep_counts: matches.is_present("counts"),
        threads: get_int_arg(matches, "threads")?,
    })
}
