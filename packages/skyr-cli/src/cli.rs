use clap::{Parser, Subcommand, ValueHint};
use eyre::{Report, WrapErr};
use itertools::Itertools;
use log::{warn, LevelFilter};
use skyr::align::cigar::cigar_string;
use skyr::align::params::{AlignParams, AlignParamsOptional};
use skyr::align::results::AlignmentStats;
use skyr::align::{align_extension, align_pairwise};
use skyr::io::fasta::{read_fasta, write_fasta, FastaRecord};
use skyr::io::vcf::{prepare_variants_for_vcf, Vcf};
use skyr::Skyr;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "skyr")]
#[clap(author, version)]
#[clap(verbatim_doc_comment)]
/// Pairwise alignment and multi-sequence variant discovery for nucleotide
/// sequences, built on a striped SIMD dynamic-programming aligner.
pub struct SkyrArgs {
  #[clap(subcommand)]
  pub command: SkyrCommands,

  /// Set verbosity level of console output
  #[clap(long, global = true, default_value = "warn")]
  pub verbosity: LevelFilter,

  /// Disable all console output. Same as --verbosity=off
  #[clap(long, global = true, conflicts_with = "verbosity")]
  pub silent: bool,
}

#[derive(Subcommand, Debug)]
pub enum SkyrCommands {
  /// Globally align the second sequence of a FASTA file against the first
  /// and print the score, the aligned pair and the CIGAR string.
  Pairwise(Box<AlignRunArgs>),

  /// Extension alignment of a contig against a reference: trailing contig
  /// bases are free and the alignment may be soft-clipped, for a penalty.
  Extend(Box<AlignRunArgs>),

  /// Align every sequence of a FASTA file against the first one, discover
  /// variants and write them as VCF.
  Msa(Box<MsaRunArgs>),
}

#[derive(Parser, Debug)]
pub struct AlignRunArgs {
  /// Path to a FASTA file with at least two sequences: the reference first,
  /// the query second. GZipped files are supported.
  #[clap(value_hint = ValueHint::FilePath)]
  pub input_fasta: PathBuf,

  /// Path to a JSON file with alignment parameters. Command-line parameters
  /// override values from the file.
  #[clap(long)]
  #[clap(value_hint = ValueHint::FilePath)]
  pub params_json: Option<PathBuf>,

  #[clap(flatten)]
  pub params: AlignParamsOptional,
}

#[derive(Parser, Debug)]
pub struct MsaRunArgs {
  /// Path to a FASTA file with the reference sequence first, followed by the
  /// sample sequences. GZipped files are supported.
  #[clap(value_hint = ValueHint::FilePath)]
  pub input_fasta: PathBuf,

  /// Output filename for the gap-padded aligned sequences (`-` for stdout).
  #[clap(long, short = 'f')]
  #[clap(value_hint = ValueHint::AnyPath)]
  pub fasta_output: Option<PathBuf>,

  /// Output filename for the variant records (`-` for stdout).
  #[clap(long, short = 'o', default_value = "-")]
  #[clap(value_hint = ValueHint::AnyPath)]
  pub vcf_output: PathBuf,

  /// Path to a JSON file with alignment parameters. Command-line parameters
  /// override values from the file.
  #[clap(long)]
  #[clap(value_hint = ValueHint::FilePath)]
  pub params_json: Option<PathBuf>,

  #[clap(flatten)]
  pub params: AlignParamsOptional,
}

pub fn setup_logger(args: &SkyrArgs) {
  let filter_level = if args.silent { LevelFilter::Off } else { args.verbosity };
  env_logger::Builder::new().filter_level(filter_level).init();
}

/// Resolves the effective alignment parameters: defaults, then the optional
/// JSON file, then the command-line overrides.
fn resolve_params(params_json: &Option<PathBuf>, cli_params: &AlignParamsOptional) -> Result<AlignParams, Report> {
  let mut params = AlignParams::default();

  if let Some(filepath) = params_json {
    let data = fs::read_to_string(filepath).wrap_err_with(|| format!("When reading params file {filepath:#?}"))?;
    let from_file: AlignParamsOptional =
      serde_json::from_str(&data).wrap_err_with(|| format!("When parsing params file {filepath:#?}"))?;
    params.merge_opt(from_file);
  }

  params.merge_opt(cli_params.clone());
  Ok(params)
}

pub fn run(args: SkyrArgs) -> Result<(), Report> {
  match args.command {
    SkyrCommands::Pairwise(run_args) => run_pairwise(&run_args, false),
    SkyrCommands::Extend(run_args) => run_pairwise(&run_args, true),
    SkyrCommands::Msa(run_args) => run_msa(&run_args),
  }
}

fn run_pairwise(args: &AlignRunArgs, extension: bool) -> Result<(), Report> {
  let mut params = resolve_params(&args.params_json, &args.params)?;
  params.backtracking = true;
  params.get_aligned_strings = true;
  params.get_cigar = true;

  let records = read_fasta(&args.input_fasta)?;
  if records.len() < 2 {
    warn!(
      "Cannot align, only {} sequences found in {:#?}",
      records.len(),
      args.input_fasta
    );
    return Ok(());
  }

  let ref_seq = records[0].seq.as_bytes();
  let qry_seq = records[1].seq.as_bytes();

  let results = if extension {
    align_extension(ref_seq, qry_seq, &params)?
  } else {
    align_pairwise(ref_seq, qry_seq, &params)?
  };

  println!("score: {}", results.score);
  if extension {
    println!("reference end: {}", results.ref_end);
    println!("query end: {}", results.qry_end);
  }

  if let Some(aligned) = &results.aligned {
    println!("{}", aligned.0);
    println!("{}", aligned.1);

    let stats = AlignmentStats::from_aligned(aligned);
    println!(
      "identity: {:.1}% ({} matches, {} mismatches, {} insertions, {} deletions)",
      stats.identity() * 100.0,
      stats.matches,
      stats.mismatches,
      stats.insertions,
      stats.deletions
    );
  }

  if let Some(cigar) = &results.cigar {
    println!("cigar: {}", cigar_string(cigar));
  }

  Ok(())
}

fn run_msa(args: &MsaRunArgs) -> Result<(), Report> {
  let params = resolve_params(&args.params_json, &args.params)?;

  let records = read_fasta(&args.input_fasta)?;
  if records.len() < 2 {
    warn!(
      "Cannot align, only {} sequences found in {:#?}",
      records.len(),
      args.input_fasta
    );
    return Ok(());
  }

  let ids = records.iter().map(|r| r.id.clone()).collect_vec();
  let seqs = records.into_iter().map(|r| r.seq.into_bytes()).collect_vec();

  let mut skyr = Skyr::with_params(seqs, params);
  skyr.find_all_edits()?;
  skyr.find_variants_from_edits();
  skyr.populate_variants_with_calls();

  if let Some(fasta_output) = &args.fasta_output {
    let gapped = skyr
      .gapped_sequences()
      .into_iter()
      .zip(ids.iter())
      .map(|(seq, id)| FastaRecord::new(id.clone(), seq))
      .collect_vec();
    write_fasta(fasta_output, &gapped)?;
  }

  let (anchored_ref, vars) = prepare_variants_for_vcf(&skyr.seqs[0], &skyr.vars);

  let mut vcf = Vcf::new();
  vcf.reference = anchored_ref;
  for id in &ids {
    vcf.add_sample_name(id.clone());
  }
  for var in vars {
    vcf.add_variant(var);
  }

  vcf.write(&args.vcf_output)?;
  Ok(())
}
