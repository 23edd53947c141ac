use crate::msa::variant::Variant;
use eyre::{Report, WrapErr};
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::Path;

/// Minimal VCF v4.2 writer for the variants produced by the MSA layer.
///
/// Positions are written 1-based; callers are expected to have anchored the
/// variants first (see [prepare_variants_for_vcf]).
#[derive(Debug, Default)]
pub struct Vcf {
  pub chrom: String,
  pub reference: String,
  sample_names: Vec<String>,
  vars: Vec<Variant>,
}

impl Vcf {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_sample_name(&mut self, sample_name: impl Into<String>) {
    self.sample_names.push(sample_name.into());
  }

  pub fn add_variant(&mut self, var: Variant) {
    self.vars.push(var);
  }

  fn contig(&self) -> String {
    if !self.chrom.is_empty() {
      self.chrom.clone()
    } else if let Some(first) = self.sample_names.first() {
      format!("N{first}")
    } else {
      "chr1".to_owned()
    }
  }

  fn write_header(&self, writer: &mut impl Write) -> Result<(), Report> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(writer, "##contig=<ID={}>", self.contig())?;
    writeln!(
      writer,
      "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">"
    )?;
    write!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT")?;
    for sample_name in &self.sample_names {
      write!(writer, "\t{sample_name}")?;
    }
    writeln!(writer)?;
    Ok(())
  }

  fn write_record(&self, writer: &mut impl Write, var: &Variant) -> Result<(), Report> {
    debug_assert_eq!(var.calls.len(), self.sample_names.len());

    write!(writer, "{}\t{}\t.\t{}\t{}", self.contig(), var.pos + 1, var.seqs[0], var.seqs[1])?;
    for alt in &var.seqs[2..] {
      write!(writer, ",{alt}")?;
    }

    write!(writer, "\t0\t.\t.\tGT")?;
    for call in &var.calls {
      write!(writer, "\t{call}")?;
    }
    writeln!(writer)?;
    Ok(())
  }

  pub fn write_impl(&self, mut writer: impl Write) -> Result<(), Report> {
    self.write_header(&mut writer)?;
    for var in &self.vars {
      self.write_record(&mut writer, var)?;
    }
    Ok(())
  }

  /// Writes the VCF to a file, or to stdout when the path is `-`.
  pub fn write(&self, filepath: impl AsRef<Path>) -> Result<(), Report> {
    let filepath = filepath.as_ref();
    let result = if filepath == Path::new("-") {
      self.write_impl(stdout())
    } else {
      let file = File::create(filepath).wrap_err_with(|| format!("When creating VCF file {filepath:#?}"))?;
      self.write_impl(BufWriter::new(file))
    };
    result.wrap_err_with(|| format!("When writing VCF to {filepath:#?}"))
  }
}

/// Anchors variants for VCF emission: the reference gains a synthetic `N` in
/// front, every position shifts one to the right, and non-SNP variants absorb
/// the preceding reference base into all of their alleles.
pub fn prepare_variants_for_vcf(ref_seq: &[u8], vars: &[Variant]) -> (String, Vec<Variant>) {
  let mut anchored_ref = String::with_capacity(ref_seq.len() + 1);
  anchored_ref.push('N');
  anchored_ref.push_str(&String::from_utf8_lossy(ref_seq));

  let vars = vars
    .iter()
    .map(|var| {
      let mut var = var.clone();
      var.pos += 1;
      if !var.is_snp() {
        var.add_base_to_front(anchored_ref.as_bytes());
      }
      var
    })
    .collect();

  (anchored_ref, vars)
}
