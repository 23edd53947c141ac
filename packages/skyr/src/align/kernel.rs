use crate::align::cache::AlignCache;
use crate::align::cigar::cigar_from_aligned;
use crate::align::params::AlignParams;
use crate::align::profile::check_alphabet;
use crate::align::results::{aligned_strings, edit_script_from_aligned, AlignmentResults};
use crate::align::simd::{add_packs, max_greater, reduce_max, shift_one_right, sub_scalar, sub_scalar_wide, LaneUint};
use crate::error::AlignError;

/// Global pairwise alignment of `qry_seq` against the striped profile of
/// `ref_seq`, with affine gaps and optional free query ends.
///
/// The reference runs along the columns of the score matrix and the query
/// along the rows. Scores are encoded unsigned with the per-row/per-column
/// gain baked in (see the cache for the derived constants), so one row is
/// computed with three lane sweeps: substitution + insertion, deletion open,
/// deletion extension across stripe boundaries.
pub fn global_alignment<T: LaneUint>(
  ref_seq: &[u8],
  qry_seq: &[u8],
  params: &AlignParams,
  cache: &mut AlignCache<T>,
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

  let n = qry_seq.len();
  if params.backtracking {
    cache.backtrack.reset(n, cache.t);
  }

  calculate_scores(qry_seq, params, cache)?;

  let mut results = AlignmentResults {
    score: decode_score(cache, n),
    ref_end: cache.m,
    qry_end: n,
    aligned: None,
    cigar: None,
    edits: None,
  };

  if wants_artefacts {
    let aligned = aligned_strings(&cache.backtrack, cache.t, ref_seq, qry_seq, cache.m, n);
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

fn decode_score<T: LaneUint>(cache: &AlignCache<T>, n: usize) -> i64 {
  let raw: i64 = cache.vh_up.at_pos(cache.m).as_();
  let top_left: i64 = cache.top_left_score.as_();
  let y_gain: i64 = cache.y_gain.as_();
  let x_gain: i64 = cache.x_gain.as_();
  raw + cache.reductions[cache.m / cache.t] - top_left - n as i64 * y_gain - cache.m as i64 * x_gain
}

#[allow(clippy::too_many_lines)]
fn calculate_scores<T: LaneUint>(
  qry_seq: &[u8],
  params: &AlignParams,
  cache: &mut AlignCache<T>,
) -> Result<(), AlignError> {
  let t = cache.t;
  let p = cache.p;
  let m = cache.m;
  let n = qry_seq.len();
  let right_v = m % t;
  let right_e = m / t;
  let backtracking = params.backtracking;

  // F rows drift by y_gain per row in the encoding, but extending a gap only
  // costs gap_extend; the carried F row must be topped up by the difference.
  let drift_fix = cache.y_gain.saturating_sub(cache.x_gain);

  let two_gap_open = cache.gap_open_val.saturating_add(cache.gap_open_val);
  let two_gap_open_x: i64 = {
    let gov_x: i64 = cache.gap_open_val_x.as_();
    2 * gov_x
  };

  let mut tmp = vec![T::zero(); p];
  let mut ve0r = vec![0_i64; p];
  let mut new_reductions = vec![0_i64; p];

  for i in 0..n {
    if i > 0 && drift_fix > T::zero() {
      cache.vf_up.add_scalar(drift_fix);
    }

    let w = cache.profile.class_row(qry_seq[i]);

    // Stripe 0: the substitution inputs come from the previous row's last
    // stripe, shifted one lane right; lane 0 is the column-0 boundary.
    {
      let open_above = {
        let origin: i64 = cache.vh_up.get(0, 0).as_();
        T::clamp_i64(origin - cache.gap_open_val_y)
      };
      let left = cache.vf_up.get(0, 0).max(open_above);

      add_packs(cache.vh_up.pack(t - 1), w.pack(t - 1), &mut tmp);
      shift_one_right(&tmp, left, &cache.reductions, cache.vh.pack_mut(0));

      sub_scalar_wide(cache.vh_up.pack(0), cache.gap_open_val_y, cache.vf.pack_mut(0));

      if params.left_column_free {
        let free = cache.vh_up.get(0, 0).saturating_add(cache.y_gain);
        cache.vf.set(0, 0, free);
      }

      if params.right_column_free && right_v == 0 {
        let free = cache.vh_up.get(0, right_e).saturating_add(cache.y_gain);
        cache.vf.set(0, right_e, free);
      }

      let ins_extend = max_greater(cache.vf.pack_mut(0), cache.vf_up.pack(0));
      let ins = max_greater(cache.vh.pack_mut(0), cache.vf.pack(0));
      if backtracking {
        cache.backtrack.set_ins_extend(i, 0, ins_extend);
        cache.backtrack.set_ins(i, 0, ins);
      }
    }

    // Stripes 1..t: substitution and insertion candidates
    for v in 1..t {
      add_packs(cache.vh_up.pack(v - 1), w.pack(v - 1), cache.vh.pack_mut(v));
      sub_scalar_wide(cache.vh_up.pack(v), cache.gap_open_val_y, cache.vf.pack_mut(v));

      if params.right_column_free && v == right_v {
        let free = cache.vh_up.get(v, right_e).saturating_add(cache.y_gain);
        cache.vf.set(v, right_e, free);
      }

      let ins_extend = max_greater(cache.vf.pack_mut(v), cache.vf_up.pack(v));
      let ins = max_greater(cache.vh.pack_mut(v), cache.vf.pack(v));
      if backtracking {
        cache.backtrack.set_ins_extend(i, v, ins_extend);
        cache.backtrack.set_ins(i, v, ins);
      }
    }

    // Deletions pass 1: gap opens, plus the within-sweep extension
    sub_scalar(cache.vh.pack(t - 1), cache.gap_open_val_x, &mut tmp);
    shift_one_right(&tmp, T::zero(), &cache.reductions, cache.ve.pack_mut(0));

    for v in 1..t {
      sub_scalar(cache.vh.pack(v - 1), cache.gap_open_val_x, cache.ve.pack_mut(v));
      let (prev, cur) = cache.ve.pair_mut(v);
      let del_extend = max_greater(cur, prev);
      if backtracking {
        cache.backtrack.set_del_extend(i, v, del_extend);
      }
    }

    // Deletions crossing the stripe boundary wrap the last stripe back into
    // stripe 0, one lane over; chaining the lane sweep covers multi-stripe
    // gaps. Lane arithmetic is widened because adjacent lanes may carry
    // different reductions.
    let improved = {
      ve0r[0] = 0;
      for e in 1..p {
        let shifted: i64 = cache.ve.get(t - 1, e - 1).as_();
        ve0r[e] = shifted + cache.reductions[e - 1] - cache.reductions[e];
      }

      let mut improved = false;
      for e in 1..p {
        let val = ve0r[e - 1] + cache.reductions[e - 1] - cache.reductions[e];
        if val > ve0r[e] {
          ve0r[e] = val;
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

    // Deletions pass 2: re-run the extension sweep when the wrap improved
    // stripe 0, then fold E into H
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

    // Rescale stage 1: siphon the per-lane excess of F over 2*gap_open_x
    // into the reductions so the encoding keeps its headroom
    {
      let mut any_reductions = false;
      new_reductions[0] = 0;
      for e in 1..p {
        let excess: i64 = {
          let f0: i64 = cache.vf.get(0, e).as_();
          f0 - two_gap_open_x
        };
        if excess > 0 {
          new_reductions[e] = excess;
          cache.reductions[e] += excess;
          any_reductions = true;
        } else {
          new_reductions[e] = 0;
        }
      }

      if any_reductions {
        for v in 0..t {
          for e in 1..p {
            if new_reductions[e] > 0 {
              let amount = T::clamp_i64(new_reductions[e]);
              let h = cache.vh.get(v, e).saturating_sub(amount);
              cache.vh.set(v, e, h);
              let f = cache.vf.get(v, e).saturating_sub(amount);
              cache.vf.set(v, e, f);
            }
          }
        }
      }
    }

    // Rescale stage 2: lanes that crossed the overflow threshold drop by two
    // gap opens; if a lane is still at the threshold afterwards the row is
    // unreducible and the caller must retry with wider lanes
    if reduce_max(cache.vh.pack(t - 1)) >= cache.max_score_val {
      for e in 0..p {
        if cache.vh.get(t - 1, e) >= cache.max_score_val {
          let overflow_reduction: i64 = two_gap_open.as_();
          cache.reductions[e] += overflow_reduction;
          for v in 0..t {
            let h = cache.vh.get(v, e).saturating_sub(two_gap_open).max(two_gap_open);
            cache.vh.set(v, e, h);
            let f = cache.vf.get(v, e).saturating_sub(two_gap_open).max(two_gap_open);
            cache.vf.set(v, e, f);
          }
        }
      }

      if reduce_max(cache.vh.pack(t - 1)) >= cache.max_score_val {
        return Err(AlignError::Overflow { bits: T::BITS });
      }
    }

    std::mem::swap(&mut cache.vh, &mut cache.vh_up);
    std::mem::swap(&mut cache.vf, &mut cache.vf_up);
  }

  Ok(())
}
