use crate::align::simd::{LaneUint, Row};
use crate::error::AlignError;

/// Number of byte classes in the profile: A, C, G, T, N, other.
pub const N_BASE_CLASSES: usize = 6;

const CLASS_OTHER: usize = 5;

/// Maps a sequence byte to its profile class.
#[inline]
pub fn base_class(b: u8) -> usize {
  match b {
    b'A' => 0,
    b'C' => 1,
    b'G' => 2,
    b'T' => 3,
    b'N' => 4,
    _ => CLASS_OTHER,
  }
}

/// Rejects bytes outside the nucleotide alphabet. Used only in strict mode;
/// by default unknown bytes fall into the all-mismatch class.
pub fn check_alphabet(seq: &[u8]) -> Result<(), AlignError> {
  match seq.iter().find(|&&b| base_class(b) == CLASS_OTHER) {
    Some(&b) => Err(AlignError::UnsupportedAlphabet(b)),
    None => Ok(()),
  }
}

/// Striped substitution profile of the reference sequence.
///
/// One row per query byte class; lane `(v, e)` of class `c` holds the score
/// contribution of putting a class-`c` query base against reference position
/// `e * t + v`. Lanes past the reference length score as mismatches.
#[derive(Debug, Clone)]
pub struct ScoreProfile<T: LaneUint> {
  classes: Vec<Row<T>>,
}

impl<T: LaneUint> ScoreProfile<T> {
  pub fn build(ref_seq: &[u8], t: usize, match_val: T, mismatch_val: T) -> Self {
    let m = ref_seq.len();
    let mut classes = Vec::with_capacity(N_BASE_CLASSES);

    for class in 0..4 {
      let base = b"ACGT"[class];
      let mut row = Row::new(t, mismatch_val);

      for v in 0..t {
        for (e, j) in (v..m).step_by(t).enumerate() {
          if ref_seq[j] == base || ref_seq[j] == b'N' {
            row.set(v, e, match_val);
          }
        }
      }

      classes.push(row);
    }

    // An N in the query matches everything
    classes.push(Row::new(t, match_val));

    // Anything outside the alphabet mismatches everything
    classes.push(Row::new(t, mismatch_val));

    Self { classes }
  }

  #[inline]
  pub fn class_row(&self, b: u8) -> &Row<T> {
    &self.classes[base_class(b)]
  }

  /// Grants a previously discovered SNP a bonus so that re-alignment keeps
  /// reproducing it instead of paying the mismatch penalty elsewhere: the
  /// lane of `alt` at `pos` is raised one above a plain match.
  pub fn set_free_snp(&mut self, pos: usize, alt: u8, t: usize, match_val: T) {
    let row = &mut self.classes[base_class(alt)];
    row.set(pos % t, pos / t, match_val.saturating_add(T::one()));
  }
}
