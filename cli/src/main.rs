use std::fs::File;
use std::io::{stdout, BufRead, BufReader, Write};

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use env_logger::{Builder, Env};
use log::{info, warn};

use crate::cli::parse_sketch_options;
use ksketch::serialization::{Sketch, SKETCH_EXT};
use ksketch::sketch_schemes::SketchMode;
use ksketch::statistics::reference_cardinality;
use ksketch::{open_sketch_file, sketch_files, write_sketch_file};

mod cli;

// if the filename doesn't have the right extension add it on
fn output_filename(prefix: &str) -> String {
    if prefix.ends_with(SKETCH_EXT) {
        prefix.to_string()
    } else {
        format!("{}{}", prefix, SKETCH_EXT)
    }
}

fn collect_inputs(matches: &ArgMatches) -> Result<Vec<String>> {
    let inputs = matches.values_of("INPUT").map_or_else(Vec::new, |values| {
        values.map(|s| s.to_string()).collect::<Vec<_>>()
    });
    if !matches.is_present("list") {
        return Ok(inputs);
    }

    let mut listed = Vec::new();
    for list in inputs {
        let file = File::open(&list).context(format!("unable to open list '{}'", list))?;
        for line in BufReader::new(file).lines() {
            let line = line.context(format!("unable to read list '{}'", list))?;
            let line = line.trim();
            if !line.is_empty() {
                listed.push(line.to_string());
            }
        }
    }
    if listed.is_empty() {
        bail!("No inputs were listed");
    }
    Ok(listed)
}

fn sketch(matches: &ArgMatches) -> Result<()> {
    let options = parse_sketch_options(matches)?;
    let params = options.to_params()?;
    let threads = options.threads()?;

    let inputs = collect_inputs(matches)?;
    let prefix = match (matches.value_of("output_file"), inputs.first()) {
        (Some(output), _) => output.to_string(),
        (None, Some(first)) if first == "-" => "stdin".to_string(),
        (None, Some(first)) => first.clone(),
        (None, None) => bail!("Nothing to sketch"),
    };
    let output = output_filename(&prefix);

    let input_refs: Vec<&str> = inputs.iter().map(|s| s.as_str()).collect();
    let outcome = sketch_files(&input_refs, &params, threads)?;
    if !outcome.failures.is_empty() {
        warn!(
            "{} of {} inputs could not be sketched",
            outcome.failures.len(),
            inputs.len()
        );
    }

    info!("Writing to {}...", output);
    write_sketch_file(&output, &outcome.sketch).context(format!("unable to write '{}'", output))?;

    if let Some(warning) = outcome.sketch.kmer_size_warning() {
        warn!("{}", warning);
    }
    Ok(())
}

fn mode_name(mode: &SketchMode) -> String {
    match mode {
        SketchMode::Concatenated => "per file".to_string(),
        SketchMode::Individual => "per sequence".to_string(),
        SketchMode::Reads {
            min_cov,
            target_cov: Some(target),
        } => format!("reads (min coverage {}, target coverage {})", min_cov, target),
        SketchMode::Reads { min_cov, .. } => format!("reads (min coverage {})", min_cov),
    }
}

fn print_info(out: &mut dyn Write, filename: &str, sketch: &Sketch) -> Result<()> {
    let params = &sketch.params;
    writeln!(out, "{}", filename)?;
    writeln!(out, "  Hash function (seed):  MurmurHash3_x64_128 ({})", params.hash_seed)?;
    writeln!(out, "  K-mer size:            {} ({:?})", params.kmer_length, params.alphabet)?;
    writeln!(out, "  Canonical:             {}", params.canonical)?;
    writeln!(out, "  Sketch size:           {}", params.sketch_size)?;
    writeln!(out, "  Mode:                  {}", mode_name(&params.mode))?;
    writeln!(out, "  Counts kept:           {}", params.keep_counts)?;
    writeln!(out, "  Sketches:              {}", sketch.len())?;
    writeln!(out, "  [Hashes]\t[Length]\t[Est. unique kmers]\t[ID]\t[Comment]")?;
    for reference in &sketch.references {
        writeln!(
            out,
            "  {}\t{}\t{}\t{}\t{}",
            reference.len(),
            reference.length,
            reference_cardinality(reference),
            reference.name,
            reference.comment
        )?;
    }
    Ok(())
}

fn info(matches: &ArgMatches) -> Result<()> {
    let stdout = stdout();
    let mut out = stdout.lock();
    let filenames = matches.values_of("INPUT").map_or_else(Vec::new, |v| v.collect());
    if matches.is_present("json") {
        let sketches = filenames
            .iter()
            .map(|filename| {
                open_sketch_file(filename).context(format!("unable to read '{}'", filename))
            })
            .collect::<Result<Vec<Sketch>>>()?;
        serde_json::to_writer_pretty(&mut out, &sketches)?;
        writeln!(out)?;
        return Ok(());
    }
    for filename in filenames {
        let sketch =
            open_sketch_file(filename).context(format!("unable to read '{}'", filename))?;
        print_info(&mut out, filename, &sketch)?;
    }
    Ok(())
}

fn paste(matches: &ArgMatches) -> Result<()> {
    let output = output_filename(matches.value_of("OUTPUT").unwrap_or_default());
    let mut inputs = matches.values_of("INPUT").into_iter().flatten();
    let first = match inputs.next() {
        Some(first) => first,
        None => bail!("No sketches to combine"),
    };
    let mut combined =
        open_sketch_file(first).context(format!("unable to read '{}'", first))?;
    for filename in inputs {
        let sketch = open_sketch_file(filename).context(format!("unable to read '{}'", filename))?;
        combined
            .merge(sketch)
            .context(format!("unable to combine '{}'", filename))?;
    }

    info!("Writing to {}...", output);
    write_sketch_file(&output, &combined).context(format!("unable to write '{}'", output))?;
    Ok(())
}

fn run() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    let quiet = matches.is_present("quiet")
        || matches
            .subcommand()
            .1
            .map_or(false, |sub| sub.is_present("quiet"));
    let default_level = if quiet {
        "warn"
    } else {
        "info"
    };
    Builder::from_env(Env::default().default_filter_or(default_level)).init();

    match matches.subcommand() {
        ("sketch", Some(matches)) => sketch(matches)?,
        ("info", Some(matches)) => info(matches)?,
        ("paste", Some(matches)) => paste(matches)?,
        other => bail!("Unknown subcommand: {:?}", other.0),
    };

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}
