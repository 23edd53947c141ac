use crate::align::backtrack::Backtrack;
use crate::align::event::Event;
use crate::align::params::AlignParams;
use crate::align::profile::ScoreProfile;
use crate::align::simd::{LaneUint, Row};
use std::collections::BTreeSet;

/// Per-aligner state that survives between alignments.
///
/// The striped profile and the derived scoring constants depend only on the
/// reference sequence and the parameters, so they are rebuilt only when the
/// reference changes; aligning the same reference against many queries (as
/// the MSA loop does) reuses them. Score rows and the traceback matrix are
/// kept around to amortise allocations.
#[derive(Debug)]
pub struct AlignCache<T: LaneUint> {
  ref_seq: Vec<u8>,
  valid: bool,

  pub m: usize,
  pub t: usize,
  pub p: usize,

  pub x_gain: T,
  pub y_gain: T,
  pub gap_open_val_x: T,
  /// Encoded gap open above; negative when `y_gain` exceeds the gap open
  /// penalty, hence the wide type.
  pub gap_open_val_y: i64,
  pub gap_open_val: T,
  pub match_val: T,
  pub mismatch_val: T,
  pub max_score_val: T,
  pub top_left_score: T,

  pub profile: ScoreProfile<T>,
  pub vh_up: Row<T>,
  pub vf_up: Row<T>,
  pub vh: Row<T>,
  pub vf: Row<T>,
  pub ve: Row<T>,
  pub reductions: Vec<i64>,
  pub backtrack: Backtrack<T>,

  free_snps: BTreeSet<(usize, u8)>,
}

fn lane<T: LaneUint>(value: u32) -> T {
  T::clamp_i64(i64::from(value))
}

impl<T: LaneUint> AlignCache<T> {
  pub fn new() -> Self {
    let zero = T::zero();
    Self {
      ref_seq: Vec::new(),
      valid: false,
      m: 0,
      t: 1,
      p: T::lanes(),
      x_gain: zero,
      y_gain: zero,
      gap_open_val_x: zero,
      gap_open_val_y: 0,
      gap_open_val: zero,
      match_val: zero,
      mismatch_val: zero,
      max_score_val: zero,
      top_left_score: zero,
      profile: ScoreProfile::build(&[], 1, zero, zero),
      vh_up: Row::new(1, zero),
      vf_up: Row::new(1, zero),
      vh: Row::new(1, zero),
      vf: Row::new(1, zero),
      ve: Row::new(1, zero),
      reductions: vec![0; T::lanes()],
      backtrack: Backtrack::new(),
      free_snps: BTreeSet::new(),
    }
  }

  pub fn ref_seq(&self) -> &[u8] {
    &self.ref_seq
  }

  /// (Re)derives all reference-dependent state. A no-op when the reference
  /// is unchanged, so the profile build stays cached across queries.
  pub fn set_ref(&mut self, ref_seq: &[u8], params: &AlignParams) {
    if self.valid && self.ref_seq == ref_seq {
      return;
    }

    self.ref_seq = ref_seq.to_vec();
    self.m = ref_seq.len();
    self.t = (self.m + self.p) / self.p;

    let x_gain = params.x_gain();
    let y_gain = params.y_gain();
    let gap_open_val_x = params.penalty_gap_open - x_gain;
    let gap_open_val_y = i64::from(params.penalty_gap_open) - i64::from(y_gain);

    self.x_gain = lane(x_gain);
    self.y_gain = lane(y_gain);
    self.gap_open_val_x = lane(gap_open_val_x);
    self.gap_open_val_y = gap_open_val_y;
    self.gap_open_val = lane::<T>(gap_open_val_x).max(T::clamp_i64(gap_open_val_y));
    self.match_val = lane(x_gain + y_gain + params.score_match);
    self.mismatch_val = lane((x_gain + y_gain).saturating_sub(params.penalty_mismatch));
    self.max_score_val = T::max_value()
      .saturating_sub(self.match_val)
      .saturating_sub(self.gap_open_val);
    self.top_left_score = self.gap_open_val.saturating_add(self.gap_open_val);

    self.profile = ScoreProfile::build(ref_seq, self.t, self.match_val, self.mismatch_val);
    for &(pos, alt) in &self.free_snps {
      if pos < self.m {
        self.profile.set_free_snp(pos, alt, self.t, self.match_val);
      }
    }

    self.vh_up = Row::new(self.t, T::zero());
    self.vf_up = Row::new(self.t, T::zero());
    self.vh = Row::new(self.t, T::zero());
    self.vf = Row::new(self.t, T::zero());
    self.ve = Row::new(self.t, T::zero());
    self.valid = true;
  }

  /// Resets the carried rows and reductions for a fresh alignment:
  /// `H_up[0][0]` holds the top-left origin, the rest of the top row pays one
  /// gap open, and `F` starts at the encoded minimum.
  pub fn init_rows(&mut self) {
    self.vh_up.fill(self.gap_open_val);
    self.vh_up.set(0, 0, self.top_left_score);
    self.vf_up.fill(T::zero());
    self.reductions.fill(0);
  }

  /// Registers SNP edits whose rediscovery should be free. Indel edits are
  /// accepted but ignored; only SNPs receive a profile bonus.
  pub fn add_free_snps<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
    for event in events {
      if !event.is_snp() {
        continue;
      }
      let key = (event.pos, event.alternate.as_bytes()[0]);
      if self.free_snps.insert(key) && self.valid && key.0 < self.m {
        self.profile.set_free_snp(key.0, key.1, self.t, self.match_val);
      }
    }
  }
}

#[cfg(test)]
mod cache_tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  fn derived_values_for_default_params() {
    let params = AlignParams::default();
    let mut cache = AlignCache::<u8>::new();
    cache.set_ref(b"ACGT", &params);

    assert_eq!(cache.x_gain, 1);
    assert_eq!(cache.y_gain, 1);
    assert_eq!(cache.gap_open_val_x, 4);
    assert_eq!(cache.gap_open_val_y, 4);
    assert_eq!(cache.gap_open_val, 4);
    assert_eq!(cache.match_val, 4);
    assert_eq!(cache.mismatch_val, 0);
    assert_eq!(cache.max_score_val, 255 - 4 - 4);
    assert_eq!(cache.top_left_score, 8);
    assert_eq!(cache.t, 1);
  }

  #[rstest]
  fn asymmetric_gains_when_mismatch_dominates() {
    let params = AlignParams {
      penalty_mismatch: 4,
      ..AlignParams::default()
    };
    let mut cache = AlignCache::<u8>::new();
    cache.set_ref(b"ACGT", &params);

    // y_gain = max(1, 4 - 1) = 3, so the gap open values differ per axis
    assert_eq!(cache.y_gain, 3);
    assert_eq!(cache.gap_open_val_x, 4);
    assert_eq!(cache.gap_open_val_y, 2);
    assert_eq!(cache.gap_open_val, 4);
    assert_eq!(cache.mismatch_val, 0);
  }

  #[rstest]
  fn stripe_count_follows_reference_length() {
    let params = AlignParams::default();
    let mut cache = AlignCache::<u8>::new();

    cache.set_ref(&vec![b'A'; 15], &params);
    assert_eq!(cache.t, 1);

    cache.set_ref(&vec![b'A'; 16], &params);
    assert_eq!(cache.t, 2);

    cache.set_ref(&vec![b'A'; 33], &params);
    assert_eq!(cache.t, 3);
  }
}
