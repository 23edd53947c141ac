use crate::align::backtrack::Backtrack;
use crate::align::cigar::Cigar;
use crate::align::event::Event;
use crate::align::params::AlignParams;
use crate::align::simd::LaneUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of one pairwise alignment.
///
/// `ref_end`/`qry_end` are the matrix coordinates where the alignment ends;
/// for a global alignment they equal the sequence lengths, the extension
/// aligner may clip earlier. Artefacts are present only when requested in the
/// parameters (and require traceback).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentResults {
  pub score: i64,
  pub ref_end: usize,
  pub qry_end: usize,
  pub aligned: Option<(String, String)>,
  pub cigar: Option<Vec<Cigar>>,
  pub edits: Option<BTreeSet<Event>>,
}

/// Walks the traceback store backwards from `(qry_end, ref_end)` and emits
/// the aligned pair, gaps as `-`. Reference bases beyond `ref_end` are padded
/// as trailing deletions; query rows beyond `qry_end` are clipped.
pub(crate) fn aligned_strings<T: LaneUint>(
  backtrack: &Backtrack<T>,
  t: usize,
  ref_seq: &[u8],
  qry_seq: &[u8],
  ref_end: usize,
  qry_end: usize,
) -> (String, String) {
  let mut i = qry_end;
  let mut j = ref_end;

  // built in reverse, flipped at the end
  let mut ref_aligned: Vec<u8> = Vec::with_capacity(ref_seq.len() + qry_seq.len());
  let mut qry_aligned: Vec<u8> = Vec::with_capacity(ref_seq.len() + qry_seq.len());

  for &b in ref_seq[ref_end..].iter().rev() {
    ref_aligned.push(b);
    qry_aligned.push(b'-');
  }

  while i > 0 || j > 0 {
    if j == 0 {
      while i > 0 {
        ref_aligned.push(b'-');
        qry_aligned.push(qry_seq[i - 1]);
        i -= 1;
      }
      break;
    }

    if i == 0 {
      while j > 0 {
        ref_aligned.push(ref_seq[j - 1]);
        qry_aligned.push(b'-');
        j -= 1;
      }
      break;
    }

    let v = j % t;
    let e = j / t;

    if backtrack.is_del(i - 1, v, e) {
      while j > 1 && backtrack.is_del_extend(i - 1, j % t, j / t) {
        ref_aligned.push(ref_seq[j - 1]);
        qry_aligned.push(b'-');
        j -= 1;
      }
      ref_aligned.push(ref_seq[j - 1]);
      qry_aligned.push(b'-');
      j -= 1;
    } else if backtrack.is_ins(i - 1, v, e) {
      while i > 1 && backtrack.is_ins_extend(i - 1, v, e) {
        ref_aligned.push(b'-');
        qry_aligned.push(qry_seq[i - 1]);
        i -= 1;
      }
      ref_aligned.push(b'-');
      qry_aligned.push(qry_seq[i - 1]);
      i -= 1;
    } else {
      ref_aligned.push(ref_seq[j - 1]);
      qry_aligned.push(qry_seq[i - 1]);
      i -= 1;
      j -= 1;
    }
  }

  ref_aligned.reverse();
  qry_aligned.reverse();

  (
    String::from_utf8(ref_aligned).expect("sequences are ASCII"),
    String::from_utf8(qry_aligned).expect("sequences are ASCII"),
  )
}

fn flush_run(
  edits: &mut BTreeSet<Event>,
  pos: usize,
  ref_run: &mut Vec<u8>,
  alt_run: &mut Vec<u8>,
  ref_seq: &[u8],
  normalize: bool,
) {
  if ref_run.is_empty() && alt_run.is_empty() {
    return;
  }

  let event = Event::new(
    pos - ref_run.len(),
    String::from_utf8(std::mem::take(ref_run)).expect("sequences are ASCII"),
    String::from_utf8(std::mem::take(alt_run)).expect("sequences are ASCII"),
  );

  edits.insert(if normalize { event.normalize(ref_seq) } else { event });
}

/// Linear scan over an aligned pair, emitting one event per indel run and one
/// single-base event per mismatching column. Positions are 0-based reference
/// coordinates.
pub fn edit_script_from_aligned(aligned: &(String, String), ref_seq: &[u8], normalize: bool) -> BTreeSet<Event> {
  let mut edits = BTreeSet::new();
  let mut ref_run: Vec<u8> = Vec::new();
  let mut alt_run: Vec<u8> = Vec::new();
  let mut pos = 0_usize;

  for (c1, c2) in aligned.0.bytes().zip(aligned.1.bytes()) {
    debug_assert!(c1 != b'-' || c2 != b'-');

    if c1 == b'-' {
      // insertion column; a pending deletion run ends here
      if !ref_run.is_empty() {
        flush_run(&mut edits, pos, &mut ref_run, &mut alt_run, ref_seq, normalize);
      }
      alt_run.push(c2);
    } else if c2 == b'-' {
      // deletion column; a pending insertion run ends here
      if !alt_run.is_empty() {
        flush_run(&mut edits, pos, &mut ref_run, &mut alt_run, ref_seq, normalize);
      }
      ref_run.push(c1);
      pos += 1;
    } else if c1 != c2 {
      flush_run(&mut edits, pos, &mut ref_run, &mut alt_run, ref_seq, normalize);
      pos += 1;
      ref_run.push(c1);
      alt_run.push(c2);
      flush_run(&mut edits, pos, &mut ref_run, &mut alt_run, ref_seq, normalize);
    } else {
      flush_run(&mut edits, pos, &mut ref_run, &mut alt_run, ref_seq, normalize);
      pos += 1;
    }
  }

  flush_run(&mut edits, pos, &mut ref_run, &mut alt_run, ref_seq, normalize);
  edits
}

/// Per-column tallies of an aligned pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentStats {
  pub matches: usize,
  pub mismatches: usize,
  /// Gap columns in the aligned query (reference bases deleted).
  pub deletions: usize,
  /// Gap columns in the aligned reference (query bases inserted).
  pub insertions: usize,
}

impl AlignmentStats {
  pub fn from_aligned(aligned: &(String, String)) -> Self {
    let mut stats = Self::default();
    for (c1, c2) in aligned.0.bytes().zip(aligned.1.bytes()) {
      debug_assert!(c1 != b'-' || c2 != b'-');
      if c1 == b'-' {
        stats.insertions += 1;
      } else if c2 == b'-' {
        stats.deletions += 1;
      } else if c1 == c2 || c1 == b'N' || c2 == b'N' {
        stats.matches += 1;
      } else {
        stats.mismatches += 1;
      }
    }
    stats
  }

  pub fn columns(&self) -> usize {
    self.matches + self.mismatches + self.deletions + self.insertions
  }

  /// Fraction of columns that are matches, in `[0, 1]`.
  pub fn identity(&self) -> f64 {
    if self.columns() == 0 {
      0.0
    } else {
      self.matches as f64 / self.columns() as f64
    }
  }
}

/// Re-scores an aligned pair from scratch with the given parameters. Used to
/// cross-check the kernel: the decoded matrix score and the re-scored pair
/// must agree for every valid input.
pub fn score_from_aligned(params: &AlignParams, aligned: &(String, String)) -> i64 {
  let match_score = i64::from(params.score_match);
  let mismatch = i64::from(params.penalty_mismatch);
  let gap_open = i64::from(params.penalty_gap_open);
  let gap_extend = i64::from(params.penalty_gap_extend);

  let mut score = 0_i64;
  let mut in_del = false;
  let mut in_ins = false;

  for (c1, c2) in aligned.0.bytes().zip(aligned.1.bytes()) {
    debug_assert!(c1 != b'-' || c2 != b'-');

    if c1 == b'-' {
      score -= if in_ins { gap_extend } else { gap_open };
      in_ins = true;
      in_del = false;
    } else if c2 == b'-' {
      score -= if in_del { gap_extend } else { gap_open };
      in_del = true;
      in_ins = false;
    } else {
      if c1 == c2 || c1 == b'N' || c2 == b'N' {
        score += match_score;
      } else {
        score -= mismatch;
      }
      in_del = false;
      in_ins = false;
    }
  }

  // Free query ends give their gap costs back
  if params.left_column_free {
    for (k, c) in aligned.0.bytes().take_while(|&c| c == b'-').enumerate() {
      debug_assert_eq!(c, b'-');
      score += if k == 0 { gap_open } else { gap_extend };
    }
  }

  if params.right_column_free {
    for (k, c) in aligned.0.bytes().rev().take_while(|&c| c == b'-').enumerate() {
      debug_assert_eq!(c, b'-');
      score += if k == 0 { gap_open } else { gap_extend };
    }
  }

  score
}
