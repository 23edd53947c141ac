use criterion::{criterion_group, criterion_main, Criterion};
use skyr::align::params::AlignParams;
use skyr::{Aligner, Skyr};
use std::hint::black_box;

fn pseudo_random_seq(len: usize, mut state: u64) -> Vec<u8> {
  (0..len)
    .map(|_| {
      state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      b"ACGT"[(state >> 33) as usize % 4]
    })
    .collect()
}

fn mutate(seq: &[u8], every: usize) -> Vec<u8> {
  seq
    .iter()
    .enumerate()
    .map(|(i, &b)| {
      if i % every == 0 {
        match b {
          b'A' => b'C',
          b'C' => b'G',
          b'G' => b'T',
          _ => b'A',
        }
      } else {
        b
      }
    })
    .collect()
}

fn bench_global_alignment(c: &mut Criterion) {
  let ref_seq = pseudo_random_seq(2000, 7);
  let qry_seq = mutate(&ref_seq, 97);

  let score_only = AlignParams {
    backtracking: false,
    get_aligned_strings: false,
    get_cigar: false,
    get_edit_script: false,
    ..AlignParams::default()
  };

  c.bench_function("global 2kb score only u8", |b| {
    let mut aligner = Aligner::<u8>::new(score_only.clone()).expect("valid parameters");
    b.iter(|| {
      let results = aligner
        .align(black_box(&ref_seq), black_box(&qry_seq))
        .expect("alignment succeeds");
      results.score
    });
  });

  c.bench_function("global 2kb score only u16", |b| {
    let mut aligner = Aligner::<u16>::new(score_only.clone()).expect("valid parameters");
    b.iter(|| {
      let results = aligner
        .align(black_box(&ref_seq), black_box(&qry_seq))
        .expect("alignment succeeds");
      results.score
    });
  });

  let with_traceback = AlignParams {
    get_aligned_strings: true,
    ..AlignParams::default()
  };

  c.bench_function("global 2kb with traceback u16", |b| {
    let mut aligner = Aligner::<u16>::new(with_traceback.clone()).expect("valid parameters");
    b.iter(|| {
      let results = aligner
        .align(black_box(&ref_seq), black_box(&qry_seq))
        .expect("alignment succeeds");
      results.score
    });
  });
}

fn bench_msa(c: &mut Criterion) {
  let reference = pseudo_random_seq(500, 11);
  let seqs: Vec<Vec<u8>> = std::iter::once(reference.clone())
    .chain((0..4).map(|i| mutate(&reference, 50 + i)))
    .collect();

  c.bench_function("msa 5x500bp", |b| {
    b.iter(|| {
      let mut skyr = Skyr::new(black_box(seqs.clone()));
      skyr.find_all_edits().expect("discovery succeeds");
      skyr.find_variants_from_edits();
      skyr.vars.len()
    });
  });
}

criterion_group!(benches, bench_global_alignment, bench_msa);
criterion_main!(benches);
