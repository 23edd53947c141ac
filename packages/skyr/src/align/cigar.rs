use serde::{Deserialize, Serialize};
use std::fmt;

/// Alignment operation of one CIGAR run. Insertions consume query bases
/// (gap in the aligned reference string), deletions consume reference bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CigarOp {
  Match,
  Insertion,
  Deletion,
}

impl CigarOp {
  pub const fn as_char(self) -> char {
    match self {
      CigarOp::Match => 'M',
      CigarOp::Insertion => 'I',
      CigarOp::Deletion => 'D',
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cigar {
  pub count: u32,
  pub op: CigarOp,
}

impl fmt::Display for Cigar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.count, self.op.as_char())
  }
}

/// Run-length encodes the per-column operations of an aligned pair.
pub fn cigar_from_aligned(ref_aligned: &str, qry_aligned: &str) -> Vec<Cigar> {
  debug_assert_eq!(ref_aligned.len(), qry_aligned.len());
  let mut cigar = Vec::new();

  let op_of = |c1: u8, c2: u8| -> CigarOp {
    debug_assert!(c1 != b'-' || c2 != b'-');
    if c1 == b'-' {
      CigarOp::Insertion
    } else if c2 == b'-' {
      CigarOp::Deletion
    } else {
      CigarOp::Match
    }
  };

  for (c1, c2) in ref_aligned.bytes().zip(qry_aligned.bytes()) {
    let op = op_of(c1, c2);
    match cigar.last_mut() {
      Some(Cigar { count, op: prev }) if *prev == op => *count += 1,
      _ => cigar.push(Cigar { count: 1, op }),
    }
  }

  cigar
}

pub fn cigar_string(cigar: &[Cigar]) -> String {
  cigar.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod cigar_tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  #[rstest]
  #[case("GGG", "GGG", "3M")]
  #[case("GGGG", "GGG-", "3M1D")]
  #[case("GG-G", "GGGG", "2M1I1M")]
  #[case("--GGG", "AAGGG", "2I3M")]
  #[case("AC-GT", "A-CGT", "1M1D1I2M")]
  fn run_length_encoding(#[case] s1: &str, #[case] s2: &str, #[case] expected: &str) {
    assert_eq!(cigar_string(&cigar_from_aligned(s1, s2)), expected);
  }

  #[rstest]
  fn empty_alignment_has_empty_cigar() {
    assert_eq!(cigar_from_aligned("", ""), vec![]);
  }
}
