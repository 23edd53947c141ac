use crate::align::simd::LaneUint;
use crate::error::AlignError;
use clap::Parser;
use optfield::optfield;
use serde::{Deserialize, Serialize};

// NOTE: The `optfield` attribute creates a struct that has the same fields, but which are wrapped into `Option`,
// as well as adds a method `.merge_opt(&opt)` to the original struct, which merges values from the optional counterpart
// into self (mutably).

#[allow(clippy::struct_excessive_bools)]
#[optfield(pub AlignParamsOptional, attrs, doc, field_attrs, field_doc, merge_fn = pub)]
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
pub struct AlignParams {
  /// Score for a pair of matching bases. `N` matches every base.
  #[clap(long)]
  pub score_match: u32,

  /// Penalty for a pair of differing bases.
  #[clap(long)]
  pub penalty_mismatch: u32,

  /// Penalty for opening a gap. A higher penalty results in fewer gaps and more mismatches. Must not be smaller than `--penalty-gap-extend`.
  #[clap(long)]
  pub penalty_gap_open: u32,

  /// Penalty for extending a gap by one base. If zero, all gaps regardless of length incur the same penalty.
  #[clap(long)]
  pub penalty_gap_extend: u32,

  /// Soft-clip penalty charged by the extension aligner when the alignment ends before the end of the reference.
  #[clap(long)]
  pub penalty_clip: u32,

  /// Do not charge gap penalties for skipping leading query bases (semi-global alignment).
  #[clap(long)]
  #[clap(num_args=0..=1, default_missing_value = "true")]
  pub left_column_free: bool,

  /// Do not charge gap penalties for skipping trailing query bases (semi-global alignment).
  #[clap(long)]
  #[clap(num_args=0..=1, default_missing_value = "true")]
  pub right_column_free: bool,

  /// Reject bytes other than A, C, G, T and N instead of scoring them as mismatches.
  #[clap(long)]
  #[clap(num_args=0..=1, default_missing_value = "true")]
  pub strict_alphabet: bool,

  // Internal alignment parameter: record traceback bits during the score sweep.
  // Without it only the score is available and no artefact can be reconstructed.
  #[clap(skip)]
  pub backtracking: bool,

  // Internal alignment parameter
  #[clap(skip)]
  pub get_aligned_strings: bool,

  // Internal alignment parameter
  #[clap(skip)]
  pub get_cigar: bool,

  // Internal alignment parameter
  #[clap(skip)]
  pub get_edit_script: bool,

  // Internal alignment parameter: left-shift indel events to their leftmost
  // equivalent anchor when extracting the edit script.
  #[clap(skip)]
  pub normalize_edits: bool,
}

impl Default for AlignParams {
  fn default() -> Self {
    Self {
      score_match: 2,
      penalty_mismatch: 2,
      penalty_gap_open: 5,
      penalty_gap_extend: 1,
      penalty_clip: 5,
      left_column_free: false,
      right_column_free: false,
      strict_alphabet: false,
      backtracking: true,
      get_aligned_strings: true,
      get_cigar: false,
      get_edit_script: false,
      normalize_edits: true,
    }
  }
}

impl AlignParams {
  /// Encoded gain per query row. Rows advance by at least the gap-extend
  /// cost, and by the mismatch remainder when mismatches dominate.
  pub fn y_gain(&self) -> u32 {
    self
      .penalty_gap_extend
      .max(self.penalty_mismatch.saturating_sub(self.penalty_gap_extend))
  }

  /// Encoded gain per reference column.
  pub fn x_gain(&self) -> u32 {
    self.penalty_gap_extend
  }

  /// Checks that the scoring scheme can be encoded into lanes of type `T`
  /// with headroom for one row of growth plus one gap open.
  pub fn validate<T: LaneUint>(&self) -> Result<(), AlignError> {
    if self.penalty_gap_open < self.penalty_gap_extend {
      return Err(AlignError::InvalidConfig(format!(
        "gap open penalty ({}) must not be smaller than gap extend penalty ({})",
        self.penalty_gap_open, self.penalty_gap_extend
      )));
    }

    let gap_open_val = u64::from(self.penalty_gap_open - self.x_gain());
    let lane_max: u64 = T::max_value().as_();
    let needed = u64::from(self.score_match) + u64::from(self.penalty_mismatch) + u64::from(self.penalty_gap_open);

    if needed > lane_max.saturating_sub(gap_open_val) {
      return Err(AlignError::InvalidConfig(format!(
        "match ({}) + mismatch ({}) + gap open ({}) cannot be encoded into {}-bit lanes",
        self.score_match, self.penalty_mismatch, self.penalty_gap_open, T::BITS
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod params_tests {
  use super::*;
  use rstest::rstest;

  #[rstest]
  fn default_params_fit_all_lane_widths() {
    let params = AlignParams::default();
    assert!(params.validate::<u8>().is_ok());
    assert!(params.validate::<u16>().is_ok());
    assert!(params.validate::<u32>().is_ok());
  }

  #[rstest]
  fn oversized_scores_are_rejected_for_narrow_lanes() {
    let params = AlignParams {
      score_match: 120,
      penalty_mismatch: 120,
      penalty_gap_open: 30,
      penalty_gap_extend: 1,
      ..AlignParams::default()
    };
    assert!(matches!(params.validate::<u8>(), Err(AlignError::InvalidConfig(_))));
    assert!(params.validate::<u16>().is_ok());
  }

  #[rstest]
  fn gap_open_below_gap_extend_is_rejected() {
    let params = AlignParams {
      penalty_gap_open: 1,
      penalty_gap_extend: 3,
      ..AlignParams::default()
    };
    assert!(matches!(params.validate::<u16>(), Err(AlignError::InvalidConfig(_))));
  }

  #[rstest]
  fn optional_params_merge_into_defaults() {
    let mut params = AlignParams::default();
    let opt = AlignParamsOptional {
      score_match: Some(3),
      penalty_mismatch: None,
      penalty_gap_open: Some(7),
      penalty_gap_extend: None,
      penalty_clip: None,
      left_column_free: None,
      right_column_free: None,
      strict_alphabet: None,
      backtracking: None,
      get_aligned_strings: None,
      get_cigar: None,
      get_edit_script: None,
      normalize_edits: None,
    };
    params.merge_opt(opt);
    assert_eq!(params.score_match, 3);
    assert_eq!(params.penalty_mismatch, 2);
    assert_eq!(params.penalty_gap_open, 7);
  }
}
