use serde::{Deserialize, Serialize};
use std::fmt;

/// A single edit of the reference: SNP, insertion or deletion.
///
/// `pos` is a 0-based reference coordinate. The derived ordering is
/// `(pos, reference, alternate)`, which the variant synthesiser relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Event {
  pub pos: usize,
  pub reference: String,
  pub alternate: String,
}

impl Event {
  pub fn new(pos: usize, reference: impl Into<String>, alternate: impl Into<String>) -> Self {
    Self {
      pos,
      reference: reference.into(),
      alternate: alternate.into(),
    }
  }

  pub fn is_snp(&self) -> bool {
    self.reference.len() == 1 && self.alternate.len() == 1
  }

  pub fn is_insertion(&self) -> bool {
    self.reference.is_empty()
  }

  pub fn is_deletion(&self) -> bool {
    self.alternate.is_empty()
  }

  /// Left-shifts an indel to its leftmost equivalent anchor: as long as the
  /// reference base before the event equals the last base of the indel, the
  /// event can be rotated one position to the left without changing the
  /// alignment it describes. SNPs are left untouched.
  pub fn normalize(self, ref_seq: &[u8]) -> Self {
    let Self {
      mut pos,
      reference,
      alternate,
    } = self;

    let shift_left = |slice: String, pos: &mut usize| -> String {
      let mut bytes = slice.into_bytes();
      while *pos > 0 && ref_seq[*pos - 1] == bytes[bytes.len() - 1] {
        bytes.rotate_right(1);
        *pos -= 1;
      }
      String::from_utf8(bytes).expect("sequence slices are ASCII")
    };

    if reference.is_empty() && !alternate.is_empty() {
      let alternate = shift_left(alternate, &mut pos);
      Self { pos, reference, alternate }
    } else if alternate.is_empty() && !reference.is_empty() {
      let reference = shift_left(reference, &mut pos);
      Self { pos, reference, alternate }
    } else {
      Self { pos, reference, alternate }
    }
  }
}

impl fmt::Display for Event {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let reference = if self.reference.is_empty() { "-" } else { &self.reference };
    let alternate = if self.alternate.is_empty() { "-" } else { &self.alternate };
    write!(f, "{} {reference} {alternate}", self.pos)
  }
}
