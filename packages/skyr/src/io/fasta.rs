use eyre::{eyre, Report, WrapErr};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{stdout, BufRead, BufReader, Read, Write};
use std::path::Path;

const FASTA_LINE_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
  pub id: String,
  pub seq: String,
}

impl FastaRecord {
  pub fn new(id: impl Into<String>, seq: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      seq: seq.into(),
    }
  }
}

fn is_gz(filepath: impl AsRef<Path>) -> bool {
  filepath
    .as_ref()
    .extension()
    .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Reads all records from a FASTA file, transparently gunzipping `.gz` files.
/// Sequences are uppercased; line breaks inside sequences are joined.
pub fn read_fasta(filepath: impl AsRef<Path>) -> Result<Vec<FastaRecord>, Report> {
  let filepath = filepath.as_ref();
  let file = File::open(filepath).wrap_err_with(|| format!("When opening FASTA file {filepath:#?}"))?;

  let reader: Box<dyn Read> = if is_gz(filepath) {
    Box::new(MultiGzDecoder::new(file))
  } else {
    Box::new(file)
  };

  read_fasta_impl(BufReader::new(reader)).wrap_err_with(|| format!("When reading FASTA file {filepath:#?}"))
}

pub fn read_fasta_str(contents: &str) -> Result<Vec<FastaRecord>, Report> {
  read_fasta_impl(BufReader::new(contents.as_bytes()))
}

fn read_fasta_impl(reader: impl BufRead) -> Result<Vec<FastaRecord>, Report> {
  let mut records = Vec::new();
  let mut id: Option<String> = None;
  let mut seq = String::new();

  for line in reader.lines() {
    let line = line.wrap_err("When reading a FASTA line")?;
    let line = line.trim_end();

    if let Some(header) = line.strip_prefix('>') {
      if let Some(id) = id.take() {
        records.push(FastaRecord::new(id, std::mem::take(&mut seq)));
      }
      id = Some(header.to_owned());
    } else if !line.is_empty() {
      if id.is_none() {
        return Err(eyre!("FASTA contains sequence data before the first '>' header"));
      }
      seq.push_str(&line.to_ascii_uppercase());
    }
  }

  if let Some(id) = id {
    records.push(FastaRecord::new(id, seq));
  }

  Ok(records)
}

/// Writes records as FASTA, 80 columns per sequence line. `-` writes to
/// stdout; a `.gz` suffix selects gzip compression.
pub fn write_fasta(filepath: impl AsRef<Path>, records: &[FastaRecord]) -> Result<(), Report> {
  let filepath = filepath.as_ref();

  let writer: Box<dyn Write> = if filepath == Path::new("-") {
    Box::new(stdout())
  } else {
    let file = File::create(filepath).wrap_err_with(|| format!("When creating FASTA file {filepath:#?}"))?;
    if is_gz(filepath) {
      Box::new(GzEncoder::new(file, Compression::default()))
    } else {
      Box::new(file)
    }
  };

  write_fasta_impl(writer, records).wrap_err_with(|| format!("When writing FASTA file {filepath:#?}"))
}

fn write_fasta_impl(mut writer: impl Write, records: &[FastaRecord]) -> Result<(), Report> {
  for record in records {
    writeln!(writer, ">{}", record.id)?;
    let seq = record.seq.as_bytes();
    for chunk in seq.chunks(FASTA_LINE_WIDTH) {
      writer.write_all(chunk)?;
      writeln!(writer)?;
    }
  }
  Ok(())
}

/// Reverse complement of a nucleotide sequence. Everything outside ACGT
/// (case-insensitive) maps to `N`.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
  seq
    .iter()
    .rev()
    .map(|b| match b {
      b'A' | b'a' => b'T',
      b'C' | b'c' => b'G',
      b'G' | b'g' => b'C',
      b'T' | b't' => b'A',
      _ => b'N',
    })
    .collect()
}
