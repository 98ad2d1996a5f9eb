use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

use ksketch::open_sketch_file;
use ksketch::serialization::Sketch;

fn data_file(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../lib/tests/data");
    path.push(name);
    path.to_string_lossy().into_owned()
}

fn read_output(path: &Path) -> Sketch {
    open_sketch_file(path.to_str().unwrap()).unwrap()
}

#[test]
fn file_doesnt_exist() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .arg("-o")
        .arg(dir.path().join("out"))
        .arg("test/file/doesnt/exist");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No such file or directory"))
        .stderr(predicate::str::contains("no input could be sketched"));
    assert!(!dir.path().join("out.ksk").exists());

    Ok(())
}

#[test]
fn sketch_to_prefix() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .arg("-o")
        .arg(dir.path().join("genomes"))
        .arg(data_file("genome_a.fa"))
        .arg(data_file("genome_b.fa"));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Writing to"))
        .stderr(predicate::str::contains("genomes.ksk"));

    let sketch = read_output(&dir.path().join("genomes.ksk"));
    assert_eq!(sketch.len(), 2);
    assert_eq!(sketch.params.kmer_length, 21);
    assert_eq!(sketch.params.sketch_size, 1000);
    assert_eq!(sketch.params.hash_seed, 42);
    assert!(sketch.references[0].name.ends_with("genome_a.fa"));
    assert_eq!(sketch.references[0].comment, "genome_a synthetic test genome A");
    assert_eq!(sketch.references[0].len(), 1000);
    Ok(())
}

#[test]
fn sketch_next_to_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("genome_a.fa");
    fs::copy(data_file("genome_a.fa"), &input)?;

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch").args(&["-s", "10"]).arg(&input);
    cmd.assert().success();

    let sketch = read_output(&dir.path().join("genome_a.fa.ksk"));
    assert_eq!(sketch.len(), 1);
    assert_eq!(sketch.references[0].len(), 10);
    Ok(())
}

#[test]
fn sketch_individual() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("multi.ksk");
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .arg("-i")
        .args(&["-k", "11", "-p", "2"])
        .arg("-o")
        .arg(&output)
        .arg(data_file("multi.fa"));
    cmd.assert().success();

    let sketch = read_output(&output);
    let names: Vec<&str> = sketch.references.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["seq1", "seq2", "seq3"]);
    assert_eq!(sketch.params.kmer_length, 11);
    Ok(())
}

#[test]
fn sketch_reads() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .args(&["-m", "2", "-k", "15", "-s", "100", "--counts"])
        .arg("-o")
        .arg(dir.path().join("reads"))
        .arg(data_file("reads.fq"));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("estimated coverage"))
        .stderr(predicate::str::contains("k-mer size").not());

    let sketch = read_output(&dir.path().join("reads.ksk"));
    assert!(sketch.params.is_reads());
    let counts = sketch.references[0].counts.as_ref().unwrap();
    assert_eq!(counts.len(), 100);
    assert!(counts.iter().all(|c| *c >= 2));
    Ok(())
}

#[test]
fn sketch_from_list() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("inputs.txt");
    fs::write(
        &list,
        format!("{}\n\n{}\n", data_file("genome_b.fa"), data_file("genome_a.fa")),
    )?;

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .arg("-l")
        .arg("-o")
        .arg(dir.path().join("listed"))
        .arg(&list);
    cmd.assert().success();

    let sketch = read_output(&dir.path().join("listed.ksk"));
    assert_eq!(sketch.len(), 2);
    assert!(sketch.references[0].name.ends_with("genome_b.fa"));
    Ok(())
}

#[test]
fn sketch_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("piped.ksk");
    assert_cmd::Command::cargo_bin("ksketch")?
        .arg("sketch")
        .arg("-o")
        .arg(&output)
        .arg("-")
        .write_stdin(fs::read(data_file("genome_a.fa"))?)
        .assert()
        .success();

    let sketch = read_output(&output);
    assert_eq!(sketch.references[0].name, "-");
    assert_eq!(sketch.references[0].length, 5000);
    Ok(())
}

#[test]
fn small_kmers_warn() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .args(&["-k", "5"])
        .arg("-o")
        .arg(dir.path().join("small_k"))
        .arg(data_file("genome_a.fa"));
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("a k-mer size of at least"));
    Ok(())
}

#[test]
fn reads_conflict_with_individual() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .args(&["-i", "-m", "2"])
        .arg(data_file("reads.fq"));
    cmd.assert().failure();

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .args(&["-p", "0"])
        .arg(data_file("genome_a.fa"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("thread count"));
    Ok(())
}

#[test]
fn info_and_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("info.ksk");
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("sketch")
        .arg("-o")
        .arg(&output)
        .arg(data_file("genome_a.fa"));
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("info").arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("K-mer size:            21"))
        .stdout(predicate::str::contains("genome_a synthetic test genome A"));

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("info").arg("--json").arg(&output);
    let out = cmd.output()?;
    assert!(out.status.success());
    let sketches: serde_json::Value = serde_json::from_slice(&out.stdout)?;
    assert_eq!(sketches[0]["params"]["kmer_length"], 21);
    assert_eq!(sketches[0]["params"]["hash_seed"], 42);
    assert_eq!(sketches[0]["references"][0]["hashes"].as_array().unwrap().len(), 1000);
    Ok(())
}

#[test]
fn info_rejects_non_sketch() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("info").arg(data_file("genome_a.fa"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not a sketch file"));
    Ok(())
}

#[test]
fn paste_sketches() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let sketch_to = |name: &str, k: &str, input: &str| -> Result<PathBuf, Box<dyn std::error::Error>> {
        let output = dir.path().join(name);
        let mut cmd = Command::cargo_bin("ksketch")?;
        cmd.arg("sketch")
            .args(&["-k", k])
            .arg("-o")
            .arg(&output)
            .arg(data_file(input));
        cmd.assert().success();
        Ok(output)
    };
    let a = sketch_to("a.ksk", "21", "genome_a.fa")?;
    let b = sketch_to("b.ksk", "21", "genome_b.fa")?;
    let c = sketch_to("c.ksk", "15", "genome_b.fa")?;

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("paste").arg(dir.path().join("both")).arg(&a).arg(&b);
    cmd.assert().success();
    let both = read_output(&dir.path().join("both.ksk"));
    assert_eq!(both.len(), 2);
    assert!(both.references[1].name.ends_with("genome_b.fa"));

    let mut cmd = Command::cargo_bin("ksketch")?;
    cmd.arg("paste").arg(dir.path().join("mixed")).arg(&a).arg(&c);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unable to combine"));
    Ok(())
}
