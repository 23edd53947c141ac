use eyre::Report;
use pretty_assertions::assert_eq;
use rstest::rstest;
use skyr::align::params::AlignParams;
use skyr::align::results::score_from_aligned;
use skyr::io::fasta::read_fasta_str;
use skyr::io::vcf::{prepare_variants_for_vcf, Vcf};
use skyr::{Aligner, Skyr};

/// FASTA in, VCF out: the full variant discovery pipeline on the worked
/// example with a SNP and a deletion at the same locus.
#[rstest]
fn msa_pipeline_writes_anchored_vcf() -> Result<(), Report> {
  let records = read_fasta_str(">ref\nAAAATAAA\n>s1\nAAAACAAA\n>s2\nAAAAAAA\n")?;
  let seqs: Vec<Vec<u8>> = records.iter().map(|r| r.seq.clone().into_bytes()).collect();

  let mut skyr = Skyr::new(seqs);
  skyr.find_all_edits()?;
  skyr.find_variants_from_edits();
  skyr.populate_variants_with_calls();

  let (anchored_ref, vars) = prepare_variants_for_vcf(&skyr.seqs[0], &skyr.vars);
  assert_eq!(anchored_ref, "NAAAATAAA");

  let mut vcf = Vcf::new();
  vcf.chrom = "ref".to_owned();
  vcf.reference = anchored_ref;
  for record in &records {
    vcf.add_sample_name(record.id.clone());
  }
  for var in vars {
    vcf.add_variant(var);
  }

  let mut out = Vec::new();
  vcf.write_impl(&mut out)?;
  let text = String::from_utf8(out)?;

  assert_eq!(
    text,
    "##fileformat=VCFv4.2\n\
     ##contig=<ID=ref>\n\
     ##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
     #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tref\ts1\ts2\n\
     ref\t5\t.\tAT\tA\t0\t.\t.\tGT\t0\t0\t1\n\
     ref\t6\t.\tT\tC\t0\t.\t.\tGT\t0\t1\t0\n"
  );

  Ok(())
}

/// Three samples with one edit each (SNP, deletion, insertion) at distant
/// loci; insertions are left-shifted to their canonical anchor and the
/// gap-padded output keeps one column per insertion allele.
#[rstest]
fn msa_discovers_independent_edits_across_samples() -> Result<(), Report> {
  let reference = b"ACGTACGTAC".to_vec();
  let snp_sample = b"ACATACGTAC".to_vec(); // G>A at position 2
  let del_sample = b"ACGTAGTAC".to_vec(); // C at position 5 deleted
  let ins_sample = b"ACGTACGTTAC".to_vec(); // T inserted in the TT run

  let mut skyr = Skyr::new(vec![reference, snp_sample, del_sample, ins_sample]);
  skyr.find_all_edits()?;
  skyr.find_variants_from_edits();
  skyr.populate_variants_with_calls();

  assert_eq!(skyr.vars.len(), 3);

  assert_eq!(skyr.vars[0].pos, 2);
  assert_eq!(skyr.vars[0].seqs, vec!["G", "A"]);
  assert_eq!(skyr.vars[0].calls, vec![0, 1, 0, 0]);

  assert_eq!(skyr.vars[1].pos, 5);
  assert_eq!(skyr.vars[1].seqs, vec!["C", ""]);
  assert_eq!(skyr.vars[1].calls, vec![0, 0, 1, 0]);

  // the inserted T shifts left through the reference T at position 7
  assert_eq!(skyr.vars[2].pos, 7);
  assert_eq!(skyr.vars[2].seqs, vec!["", "T"]);
  assert_eq!(skyr.vars[2].calls, vec![0, 0, 0, 1]);

  let gapped = skyr.gapped_sequences();
  assert_eq!(
    gapped,
    vec!["ACGTACG-TAC", "ACATACG-TAC", "ACGTA-G-TAC", "ACGTACGTTAC"]
  );

  Ok(())
}

fn pseudo_random_seq(len: usize, mut state: u64) -> Vec<u8> {
  (0..len)
    .map(|_| {
      state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      b"ACGT"[(state >> 33) as usize % 4]
    })
    .collect()
}

/// Lane widths must agree and the traceback must re-score to the matrix
/// score, also on sequences long enough to force repeated rescaling.
#[rstest]
#[case(2, 2, 5, 1)]
#[case(3, 1, 6, 0)]
#[case(1, 4, 4, 1)]
fn lane_widths_agree_on_long_noisy_sequences(
  #[case] score_match: u32,
  #[case] penalty_mismatch: u32,
  #[case] penalty_gap_open: u32,
  #[case] penalty_gap_extend: u32,
) -> Result<(), Report> {
  let params = AlignParams {
    score_match,
    penalty_mismatch,
    penalty_gap_open,
    penalty_gap_extend,
    get_aligned_strings: true,
    ..AlignParams::default()
  };

  let ref_seq = pseudo_random_seq(300, 42);

  // a mutated copy: a SNP, a short deletion and a short insertion
  let mut qry_seq = ref_seq.clone();
  qry_seq[40] = match qry_seq[40] {
    b'A' => b'C',
    b'C' => b'G',
    b'G' => b'T',
    _ => b'A',
  };
  qry_seq.drain(120..123);
  qry_seq.splice(200..200, *b"GATTA");

  let narrow = Aligner::<u8>::new(params.clone())?.align(&ref_seq, &qry_seq)?;
  let medium = Aligner::<u16>::new(params.clone())?.align(&ref_seq, &qry_seq)?;
  let wide = Aligner::<u32>::new(params.clone())?.align(&ref_seq, &qry_seq)?;

  assert_eq!(narrow.score, medium.score);
  assert_eq!(medium.score, wide.score);

  let aligned = narrow.aligned.expect("aligned strings were requested");
  assert_eq!(score_from_aligned(&params, &aligned), narrow.score);

  Ok(())
}
