use crate::align::backtrack::Backtrack;
use crate::align::cigar::cigar_from_aligned;
use crate::align::params::AlignParams;
use crate::align::profile::{check_alphabet, ScoreProfile};
use crate::align::results::{aligned_strings, edit_script_from_aligned, AlignmentResults};
use crate::align::simd::{add_packs, max_greater, shift_one_right, sub_scalar, sub_scalar_wide, LaneUint, Row};
use crate::error::AlignError;

/// State of the extension aligner.
///
/// The extension variant drops the per-column gain (`x_gain = 0`): scores are
/// comparable across columns without per-lane bookkeeping, which is what the
/// per-row clip scan needs. The trade-off is that deletions are charged a
/// flat gap-open cost with free extension. A single scalar reduction keeps
/// the encoding in range.
#[derive(Debug)]
pub struct ExtCache<T: LaneUint> {
  ref_seq: Vec<u8>,
  valid: bool,

  pub m: usize,
  pub t: usize,
  pub p: usize,

  pub y_gain: T,
  pub gap_open_x: T,
  /// Encoded gap open above; negative when `y_gain` exceeds the gap open
  /// penalty, hence the wide type.
  pub gap_open_y: i64,
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
  pub reduction: i64,
  pub backtrack: Backtrack<T>,

  no_reductions: Vec<i64>,
}

fn lane<T: LaneUint>(value: u32) -> T {
  T::clamp_i64(i64::from(value))
}

impl<T: LaneUint> ExtCache<T> {
  pub fn new() -> Self {
    let zero = T::zero();
    Self {
      ref_seq: Vec::new(),
      valid: false,
      m: 0,
      t: 1,
      p: T::lanes(),
      y_gain: zero,
      gap_open_x: zero,
      gap_open_y: 0,
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
      reduction: 0,
      backtrack: Backtrack::new(),
      no_reductions: vec![0; T::lanes()],
    }
  }

  pub fn set_ref(&mut self, ref_seq: &[u8], params: &AlignParams) {
    if self.valid && self.ref_seq == ref_seq {
      return;
    }

    self.ref_seq = ref_seq.to_vec();
    self.m = ref_seq.len();
    self.t = (self.m + self.p) / self.p;

    let y_gain = params.penalty_gap_extend.max(params.penalty_mismatch);

    self.y_gain = lane(y_gain);
    self.gap_open_x = lane(params.penalty_gap_open);
    self.gap_open_y = i64::from(params.penalty_gap_open) - i64::from(y_gain);
    self.gap_open_val = self.gap_open_x.max(T::clamp_i64(self.gap_open_y));
    self.match_val = lane(y_gain + params.score_match);
    self.mismatch_val = lane(y_gain.saturating_sub(params.penalty_mismatch));
    self.max_score_val = T::max_value()
      .saturating_sub(self.match_val)
      .saturating_sub(self.gap_open_val);
    self.top_left_score = self.gap_open_val.saturating_add(self.gap_open_val);

    self.profile = ScoreProfile::build(ref_seq, self.t, self.match_val, self.mismatch_val);

    self.vh_up = Row::new(self.t, T::zero());
    self.vf_up = Row::new(self.t, T::zero());
    self.vh = Row::new(self.t, T::zero());
    self.vf = Row::new(self.t, T::zero());
    self.ve = Row::new(self.t, T::zero());
    self.valid = true;
  }

  pub fn init_rows(&mut self) {
    self.vh_up.fill(self.gap_open_val);
    self.vh_up.set(0, 0, self.top_left_score);
    self.vf_up.fill(T::zero());
    let top_left: i64 = self.top_left_score.as_();
    self.reduction = -top_left;
  }
}

/// Extension ("contig vs reference") alignment.
///
/// Like the global aligner, but the alignment may stop before either
/// sequence is exhausted: trailing query rows are always free, and ending
/// before the last reference column costs the soft-clip penalty. The row
/// loop terminates early once no continuation can beat the running best.
#[allow(clippy::too_many_lines)]
pub fn ext_alignment<T: LaneUint>(
  ref_seq: &[u8],
  qry_seq: &[u8],
  params: &AlignParams,
  cache: &mut ExtCache<T>,
) -> Result<AlignmentResults, AlignError> {
  let wants_artefacts = params.get_aligned_strings || params.get_cigar || params.get_edit_script;
  if wants_artefacts && !params.backtracking {
    return Err(AlignError::TracebackUnavailable);
  }

  if params.strict_alphabet {
    check_alphabet(ref_seq)?;
    check_alphabet(qry_seq)?;
  }

  cache.set_ref(ref_seq, params);
  cache.init_rows();

  let t = cache.t;
  let p = cache.p;
  let m = cache.m;
  let n = qry_seq.len();
  let backtracking = params.backtracking;

  if backtracking {
    cache.backtrack.reset(n, t);
  }

  let clip = i64::from(params.penalty_clip);
  let match_score = i64::from(params.score_match);
  let y_gain_wide: i64 = cache.y_gain.as_();
  let max_score_wide: i64 = cache.max_score_val.as_();
  let drift_fix = cache.y_gain.saturating_sub(lane(params.penalty_gap_extend));

  let mut tmp = vec![T::zero(); p];
  let mut ve0r = vec![0_i64; p];

  // running best over clipped row ends: (score, row, column)
  let mut best: Option<(i64, usize, usize)> = None;
  let mut completed = true;

  for i in 0..n {
    if i > 0 && drift_fix > T::zero() {
      cache.vf_up.add_scalar(drift_fix);
    }

    let w = cache.profile.class_row(qry_seq[i]);

    {
      let open_above = {
        let origin: i64 = cache.vh_up.get(0, 0).as_();
        T::clamp_i64(origin - cache.gap_open_y)
      };
      let left = cache.vf_up.get(0, 0).max(open_above);

      add_packs(cache.vh_up.pack(t - 1), w.pack(t - 1), &mut tmp);
      shift_one_right(&tmp, left, &cache.no_reductions, cache.vh.pack_mut(0));

      sub_scalar_wide(cache.vh_up.pack(0), cache.gap_open_y, cache.vf.pack_mut(0));

      let ins_extend = max_greater(cache.vf.pack_mut(0), cache.vf_up.pack(0));
      let ins = max_greater(cache.vh.pack_mut(0), cache.vf.pack(0));
      if backtracking {
        cache.backtrack.set_ins_extend(i, 0, ins_extend);
        cache.backtrack.set_ins(i, 0, ins);
      }
    }

    for v in 1..t {
      add_packs(cache.vh_up.pack(v - 1), w.pack(v - 1), cache.vh.pack_mut(v));
      sub_scalar_wide(cache.vh_up.pack(v), cache.gap_open_y, cache.vf.pack_mut(v));

      let ins_extend = max_greater(cache.vf.pack_mut(v), cache.vf_up.pack(v));
      let ins = max_greater(cache.vh.pack_mut(v), cache.vf.pack(v));
      if backtracking {
        cache.backtrack.set_ins_extend(i, v, ins_extend);
        cache.backtrack.set_ins(i, v, ins);
      }
    }

    sub_scalar(cache.vh.pack(t - 1), cache.gap_open_x, &mut tmp);
    shift_one_right(&tmp, T::zero(), &cache.no_reductions, cache.ve.pack_mut(0));

    for v in 1..t {
      sub_scalar(cache.vh.pack(v - 1), cache.gap_open_x, cache.ve.pack_mut(v));
      let (prev, cur) = cache.ve.pair_mut(v);
      let del_extend = max_greater(cur, prev);
      if backtracking {
        cache.backtrack.set_del_extend(i, v, del_extend);
      }
    }

    let improved = {
      ve0r[0] = 0;
      for e in 1..p {
        let shifted: i64 = cache.ve.get(t - 1, e - 1).as_();
        ve0r[e] = shifted;
      }

      let mut improved = false;
      for e in 1..p {
        if ve0r[e - 1] > ve0r[e] {
          ve0r[e] = ve0r[e - 1];
        }
        let orig: i64 = cache.ve.get(0, e).as_();
        if ve0r[e] > orig {
          improved = true;
        } else {
          ve0r[e] = orig;
        }
      }
      improved
    };

    if improved {
      for e in 0..p {
        tmp[e] = T::clamp_i64(ve0r[e]);
      }
      let del_extend = max_greater(cache.ve.pack_mut(0), &tmp);
      if backtracking {
        cache.backtrack.set_del_extend(i, 0, del_extend);
      }
    }

    let del = max_greater(cache.vh.pack_mut(0), cache.ve.pack(0));
    if backtracking {
      cache.backtrack.set_del(i, 0, del);
    }

    if improved {
      for v in 1..t {
        let (prev, cur) = cache.ve.pair_mut(v);
        let del_extend = max_greater(cur, prev);
        if backtracking {
          cache.backtrack.set_del_extend(i, v, del_extend);
        }
      }
    }

    for v in 1..t {
      let del = max_greater(cache.vh.pack_mut(v), cache.ve.pack(v));
      if backtracking {
        cache.backtrack.set_del(i, v, del);
      }
    }

    std::mem::swap(&mut cache.vh, &mut cache.vh_up);
    std::mem::swap(&mut cache.vf, &mut cache.vf_up);

    // Track the best clipped end. The last row is handled by the final
    // global decode, so only interior rows are scanned.
    if i + 1 < n {
      let right_raw: i64 = cache.vh_up.at_pos(m).as_();
      let mut cur_max = right_raw;
      let mut cur_j = m;

      for j in 0..m {
        let raw: i64 = cache.vh_up.at_pos(j).as_();
        if raw - clip > cur_max {
          cur_max = raw - clip;
          cur_j = j;
        }
      }

      let corrected = cur_max + cache.reduction - (i as i64 + 1) * y_gain_wide;

      if best.is_none_or(|(score, ..)| corrected >= score) {
        best = Some((corrected, i, cur_j));
      } else if let Some((score, ..)) = best {
        let potential = corrected + match_score * (n as i64 - 1 - i as i64) + clip;
        if potential < score {
          completed = false;
          break;
        }
      }

      if cur_max + clip >= max_score_wide {
        let amount = cache.gap_open_val.saturating_add(cache.match_val);
        let floor = amount.saturating_add(amount);
        let amount_wide: i64 = amount.as_();
        cache.reduction += amount_wide;
        for v in 0..t {
          for e in 0..p {
            let h = cache.vh_up.get(v, e).max(floor).saturating_sub(amount);
            cache.vh_up.set(v, e, h);
            let f = cache.vf_up.get(v, e).max(floor).saturating_sub(amount);
            cache.vf_up.set(v, e, f);
          }
        }
      }
    }
  }

  let (score, ref_end, qry_end) = {
    let clipped = best.unwrap_or((i64::MIN, 0, 0));
    if completed {
      let raw: i64 = cache.vh_up.at_pos(m).as_();
      let global = raw + cache.reduction - n as i64 * y_gain_wide;
      if clipped.0 > global {
        (clipped.0, clipped.2, clipped.1 + 1)
      } else {
        (global, m, n)
      }
    } else {
      (clipped.0, clipped.2, clipped.1 + 1)
    }
  };

  let mut results = AlignmentResults {
    score,
    ref_end,
    qry_end,
    aligned: None,
    cigar: None,
    edits: None,
  };

  if wants_artefacts {
    let aligned = aligned_strings(&cache.backtrack, t, ref_seq, &qry_seq[..qry_end], ref_end, qry_end);
    if params.get_cigar {
      results.cigar = Some(cigar_from_aligned(&aligned.0, &aligned.1));
    }
    if params.get_edit_script {
      results.edits = Some(edit_script_from_aligned(&aligned, ref_seq, params.normalize_edits));
    }
    if params.get_aligned_strings {
      results.aligned = Some(aligned);
    }
  }

  Ok(results)
}

#[cfg(test)]
mod extend_tests {
  use super::*;
  use crate::align::{align_extension, ExtAligner};
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  fn params(score_match: u32, penalty_mismatch: u32, penalty_gap_open: u32, penalty_gap_extend: u32) -> AlignParams {
    AlignParams {
      score_match,
      penalty_mismatch,
      penalty_gap_open,
      penalty_gap_extend,
      get_aligned_strings: true,
      ..AlignParams::default()
    }
  }

  fn run(ref_seq: &str, qry_seq: &str, params: &AlignParams) -> AlignmentResults {
    ExtAligner::<u8>::new(params.clone())
      .expect("test parameters are valid")
      .align(ref_seq.as_bytes(), qry_seq.as_bytes())
      .expect("test alignments succeed")
  }

  #[rstest]
  #[case("G", "G", 1, 1, 4, 6, 1)]
  #[case("GG", "GG", 2, 1, 4, 6, 1)]
  #[case("GG", "GA", -3, 1, 4, 6, 1)]
  #[case("GGG", "GAA", -4, 1, 4, 6, 1)]
  #[case("GGAGG", "GGGGG", 0, 1, 4, 6, 1)]
  #[case("GGAAA", "GGGGG", -3, 1, 4, 6, 1)]
  #[case("GGAAA", "GGGGGGGGGGGGGGG", -3, 1, 4, 6, 1)]
  #[case("GGAAA", "GGGGGGGGGGGGGGGA", -3, 1, 4, 6, 1)]
  #[case("GGAAA", "GGAAA", 5, 1, 4, 6, 1)]
  #[case("GGAAA", "GGGAAA", 3, 1, 2, 2, 1)]
  #[case("GGAAA", "GGGAAA", 3, 1, 4, 2, 1)]
  #[case("GGAAA", "GGGAAA", 2, 1, 4, 3, 1)]
  #[case("GGAAA", "GGGAAA", 2, 1, 5, 3, 1)]
  #[case("GGAAA", "GGGAAA", 2, 1, 6, 3, 1)]
  #[case("GGAAA", "GGGAAA", 2, 1, 7, 3, 1)]
  #[case("GGAAA", "GGGAAA", 1, 1, 3, 4, 1)]
  #[case("GGAAA", "GGGAAA", 0, 1, 4, 5, 1)]
  #[case("GGAAA", "GGGAAA", 1, 1, 3, 5, 1)]
  #[case("GGAAA", "GGGAAAAAAAAAAAAA", 1, 1, 3, 5, 1)]
  #[case("GGAAA", "GGGAAAAAAAAAAAAA", 0, 1, 4, 6, 1)]
  #[case("GGCCCCCCCCCCCCC", "GGGAAAAAAAAAAAAAAAAA", -3, 1, 4, 6, 1)]
  #[case("GGAAA", "GGGAAAAAAAAAAAAA", 4, 2, 4, 6, 1)]
  #[case("GGAAA", "GGGAAAAAAAAAAAAA", 2, 1, 2, 6, 1)]
  #[case("GGGAAA", "GGAAA", 0, 1, 4, 5, 1)]
  #[case("GGGAAA", "GGAAA", 0, 1, 3, 5, 1)]
  #[case("GGGAAA", "GGAAACCCCCCC", -1, 1, 4, 6, 1)]
  #[case("GGAAA", "GGGAAACCCCCCC", 0, 1, 4, 6, 1)]
  fn extension_scores_match_the_reference_table(
    #[case] ref_seq: &str,
    #[case] qry_seq: &str,
    #[case] expected_score: i64,
    #[case] score_match: u32,
    #[case] penalty_mismatch: u32,
    #[case] penalty_gap_open: u32,
    #[case] penalty_gap_extend: u32,
  ) {
    let params = params(score_match, penalty_mismatch, penalty_gap_open, penalty_gap_extend);
    let results = run(ref_seq, qry_seq, &params);
    assert_eq!(results.score, expected_score, "score for {ref_seq} vs {qry_seq}");
  }

  #[rstest]
  fn mismatch_in_one_sequence_with_a_mutated_middle() {
    // one substitution inside a long run keeps the full-length alignment
    let params = params(1, 4, 6, 1);
    let ref_seq = format!("GG{}", "C".repeat(28));
    let qry_seq = format!("GGCCA{}", "C".repeat(42));
    let results = run(&ref_seq, &qry_seq, &params);
    assert_eq!(results.score, 25);
  }

  #[rstest]
  fn long_perfect_prefix_drops_the_trailing_rows_for_free() {
    let gentle_params = params(1, 4, 6, 1);
    let ref_seq = "C".repeat(60);
    let qry_seq = "C".repeat(76);
    let results = run(&ref_seq, &qry_seq, &gentle_params);
    assert_eq!(results.score, 60);
    assert_eq!(results.ref_end, 60);

    // a steeper scoring scheme does not change the outcome
    let steep = params(1, 8, 12, 1);
    let results = run(&ref_seq, &qry_seq, &steep);
    assert_eq!(results.score, 60);
  }

  #[rstest]
  fn clipping_reports_where_the_alignment_stopped() {
    let params = params(1, 4, 6, 1);
    let results = run("GGAAA", "GGGGG", &params);
    assert_eq!(results.score, -3);
    assert_eq!(results.ref_end, 2);
    assert_eq!(results.qry_end, 2);

    let aligned = results.aligned.expect("aligned strings were requested");
    // the clipped reference tail is padded with gaps, the query tail is cut
    assert_eq!(aligned.0, "GGAAA");
    assert_eq!(aligned.1, "GG---");
  }

  #[rstest]
  fn extension_cache_is_reusable_across_queries() {
    let params = params(1, 4, 6, 1);
    let mut aligner = ExtAligner::<u8>::new(params.clone()).expect("parameters are valid");

    let first = aligner.align(b"GGAAA", b"GGAAA").expect("alignment succeeds");
    let second = aligner.align(b"GGAAA", b"GGGGG").expect("alignment succeeds");
    assert_eq!(first.score, 5);
    assert_eq!(second.score, -3);
  }

  #[rstest]
  fn lane_widening_applies_to_extension_alignments() {
    let params = AlignParams {
      score_match: 120,
      penalty_mismatch: 120,
      penalty_gap_open: 30,
      penalty_gap_extend: 1,
      ..AlignParams::default()
    };
    let results = align_extension(b"GGGGG", b"GGGGG", &params).expect("widening succeeds");
    assert_eq!(results.score, 600);
  }
}
