use crate::align::event::Event;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allele marker for "this locus is swallowed by an upstream deletion".
pub const SPANNING_ALLELE: &str = "*";

/// A multi-allelic variant: one reference allele followed by the alternative
/// alleles merged from co-located edits. `calls[sample]` holds the allele
/// index chosen for each sample once calls are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
  pub pos: usize,
  pub seqs: Vec<String>,
  pub event_to_allele: BTreeMap<Event, usize>,
  pub calls: Vec<u16>,
}

impl Variant {
  pub fn from_event(event: &Event) -> Self {
    let mut var = Self {
      pos: event.pos,
      seqs: vec![event.reference.clone()],
      ..Self::default()
    };
    var.add_event(event);
    var
  }

  /// Appends the event's alternative as a new allele and remembers which
  /// allele index the event maps to (needed for per-sample calls).
  pub fn add_event(&mut self, event: &Event) {
    self.event_to_allele.insert(event.clone(), self.seqs.len());
    self.seqs.push(event.alternate.clone());
  }

  pub fn has_sequences(&self) -> bool {
    self.seqs.len() > 1
  }

  pub fn is_insertion(&self) -> bool {
    self.has_sequences() && self.seqs[0].is_empty()
  }

  pub fn is_deletion(&self) -> bool {
    self.has_sequences() && self.seqs[1..].iter().any(String::is_empty)
  }

  pub fn is_snp(&self) -> bool {
    self.has_sequences() && self.seqs[0].len() == 1 && self.seqs[1].len() == 1
  }

  pub fn has_spanning_allele(&self) -> bool {
    self.seqs.last().is_some_and(|s| s == SPANNING_ALLELE)
  }

  pub fn get_call(&self, sample: usize) -> u16 {
    self.calls[sample]
  }

  pub fn add_call(&mut self, call: u16) {
    self.calls.push(call);
  }

  /// Prepends the preceding reference base to every allele and moves the
  /// variant one base left. `reference` must already carry the synthetic
  /// anchor base, and the position must already be shifted accordingly, so
  /// this is safe for variants at the very start of the sequence. VCF
  /// requires this for indel records.
  pub fn add_base_to_front(&mut self, reference: &[u8]) {
    self.pos -= 1;
    let base = reference[self.pos] as char;
    for seq in &mut self.seqs {
      if seq != SPANNING_ALLELE {
        seq.insert(0, base);
      }
    }
  }
}
