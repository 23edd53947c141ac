use crate::align::event::Event;
use crate::align::params::AlignParams;
use crate::align::simd::LaneUint;
use crate::align::Aligner;
use crate::error::AlignError;
use crate::msa::variant::{Variant, SPANNING_ALLELE};
use itertools::Itertools;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};

pub mod variant;

/// Returns true when the shorter of the two strings is a prefix of the other.
fn prefix_matches(s1: &str, s2: &str) -> bool {
  s1.bytes().zip(s2.bytes()).all(|(a, b)| a == b)
}

/// Greedy multi-sequence variant discovery.
///
/// Every sequence is aligned against `seqs[0]` (the reference) and the edit
/// scripts are accumulated. Each round the most similar haplotype that still
/// carries an unrewarded SNP donates its SNPs to the free-edit set, which
/// biases the next round of alignments towards rediscovering them; the loop
/// stops when no sample has anything new. The collected edits are then
/// merged into multi-allelic variants.
#[derive(Debug)]
pub struct Skyr {
  pub seqs: Vec<Vec<u8>>,
  pub free_edits: BTreeSet<Event>,
  pub edits: Vec<BTreeSet<Event>>,
  pub all_edits: BTreeMap<Event, usize>,
  pub vars: Vec<Variant>,
  params: AlignParams,
}

impl Skyr {
  pub fn new(seqs: Vec<Vec<u8>>) -> Self {
    Self::with_params(seqs, AlignParams::default())
  }

  pub fn with_params(seqs: Vec<Vec<u8>>, params: AlignParams) -> Self {
    let params = AlignParams {
      backtracking: true,
      get_edit_script: true,
      get_aligned_strings: false,
      get_cigar: false,
      ..params
    };
    let n_seqs = seqs.len();
    Self {
      seqs,
      free_edits: BTreeSet::new(),
      edits: vec![BTreeSet::new(); n_seqs],
      all_edits: BTreeMap::new(),
      vars: Vec::new(),
      params,
    }
  }

  /// Runs the iterative re-alignment until the free-edit set stops growing.
  /// Starts with 8-bit lanes and widens on overflow.
  pub fn find_all_edits(&mut self) -> Result<(), AlignError> {
    if self.seqs.len() < 2 {
      return Err(AlignError::EmptyInput(self.seqs.len()));
    }

    match self.find_all_edits_with::<u8>() {
      Err(AlignError::Overflow { .. }) => match self.find_all_edits_with::<u16>() {
        Err(AlignError::Overflow { .. }) => self.find_all_edits_with::<u32>(),
        other => other,
      },
      other => other,
    }
  }

  fn find_all_edits_with<T: LaneUint>(&mut self) -> Result<(), AlignError> {
    self.free_edits.clear();
    for edits in &mut self.edits {
      edits.clear();
    }

    let mut scores = vec![i64::MIN; self.seqs.len()];
    let mut iteration = 0_usize;

    loop {
      iteration += 1;
      debug!("skyr: iteration #{iteration}, {} free edits", self.free_edits.len());

      // One aligner per round: the reference profile is built once and the
      // current free-edit bonuses are baked into it.
      let mut aligner = Aligner::<T>::new(self.params.clone())?;
      aligner.add_free_edits(self.free_edits.iter());
      self.all_edits.clear();

      for i in 1..self.seqs.len() {
        let results = aligner.align(&self.seqs[0], &self.seqs[i])?;
        scores[i] = results.score;
        trace!("skyr: sample {i} aligned with score {}", results.score);

        let edits = results.edits.ok_or(AlignError::TracebackUnavailable)?;
        for event in &edits {
          *self.all_edits.entry(event.clone()).or_insert(0) += 1;
        }
        self.edits[i] = edits;
      }

      match self.find_most_similar_haplotype(&scores) {
        Some(best) => {
          let snps = self.edits[best].iter().filter(|e| e.is_snp()).cloned().collect_vec();
          debug!("skyr: promoting {} SNPs of sample {best}", snps.len());
          self.free_edits.extend(snps);
        }
        None => break,
      }
    }

    Ok(())
  }

  /// Picks the sample whose SNPs to promote next: it must carry at least one
  /// SNP that is not free yet; ties are broken by score, then by fewest
  /// edits, then by how often its edits were seen across all samples.
  fn find_most_similar_haplotype(&self, scores: &[i64]) -> Option<usize> {
    let mut max_score = i64::MIN;
    let mut max_events = usize::MAX;
    let mut max_events_seen = 0_usize;
    let mut best: Option<usize> = None;

    for i in 1..self.edits.len() {
      let has_novel_snp = self.edits[i].iter().any(|e| e.is_snp() && !self.free_edits.contains(e));
      if !has_novel_snp {
        continue;
      }

      let events_seen: usize = self.edits[i]
        .iter()
        .map(|e| self.all_edits.get(e).copied().unwrap_or(0))
        .sum();

      if scores[i] > max_score
        || (scores[i] == max_score && self.edits[i].len() < max_events)
        || (scores[i] == max_score && self.edits[i].len() == max_events && events_seen > max_events_seen)
      {
        max_score = scores[i];
        max_events = self.edits[i].len();
        max_events_seen = events_seen;
        best = Some(i);
      }
    }

    best
  }

  /// Merges the accumulated edits into multi-allelic variants and marks loci
  /// masked by longer upstream deletions with a `*` allele.
  pub fn find_variants_from_edits(&mut self) {
    self.vars.clear();
    let mut cur: Option<Variant> = None;

    for event in self.all_edits.keys() {
      let Some(var) = cur.as_mut() else {
        cur = Some(Variant::from_event(event));
        continue;
      };

      let same_pos = event.pos == var.pos;

      if same_pos
        && event.is_insertion()
        && var.is_insertion()
        && prefix_matches(var.seqs.last().map_or("", String::as_str), &event.alternate)
      {
        // insertions at the same position, each a prefix of the next
        var.add_event(event);
      } else if same_pos && event.is_deletion() && var.is_deletion() {
        // a longer deletion at the same position: widen the reference
        // allele and every existing allele with the extra suffix
        debug_assert!(event.reference.len() > var.seqs[0].len());
        let suffix = event.reference[var.seqs[0].len()..].to_owned();
        for seq in &mut var.seqs {
          seq.push_str(&suffix);
        }
        var.add_event(event);
      } else if same_pos && event.is_snp() && var.seqs[0].len() == 1 && var.seqs[1].len() == 1 {
        var.add_event(event);
      } else {
        if let Some(done) = cur.take() {
          self.vars.push(done);
        }
        cur = Some(Variant::from_event(event));
      }
    }

    if let Some(done) = cur {
      if done.has_sequences() {
        self.vars.push(done);
      }
    }

    // Mark loci swallowed by an earlier, longer deletion
    let mut del_start = 0_usize;
    let mut del_reach = 0_usize;
    for var in &mut self.vars {
      if var.pos > del_start && var.pos + var.seqs[0].len() <= del_reach {
        var.seqs.push(SPANNING_ALLELE.to_owned());
      }
      del_start = var.pos;
      del_reach = del_reach.max(var.pos + var.seqs[0].len());
    }
  }

  /// Chooses one allele per (sample, variant): the allele whose originating
  /// edit the sample produced; the `*` allele when the locus sits inside a
  /// deletion the sample called upstream; the reference otherwise.
  pub fn populate_variants_with_calls(&mut self) {
    for var in &mut self.vars {
      var.calls.clear();
    }

    for i in 0..self.seqs.len() {
      let edits = &self.edits[i];
      let mut del_reach = 0_usize;

      for var in &mut self.vars {
        let call = var
          .event_to_allele
          .iter()
          .find_map(|(event, &allele)| edits.contains(event).then_some(allele as u16))
          .or_else(|| {
            (var.pos < del_reach && var.has_spanning_allele()).then(|| (var.seqs.len() - 1) as u16)
          })
          .unwrap_or(0);

        var.add_call(call);

        if var.is_deletion() {
          let called_len = var.seqs[call as usize].len();
          del_reach = del_reach.max(var.pos + var.seqs[0].len().saturating_sub(called_len));
        }
      }
    }
  }

  /// Reconstructs one gap-padded sequence per sample from the called
  /// variants: deletions pad with `-` in place, insertions open columns wide
  /// enough for the longest inserted allele in every sample.
  pub fn gapped_sequences(&self) -> Vec<String> {
    (0..self.seqs.len())
      .map(|i| {
        let mut gapped: Vec<u8> = self.seqs[0].clone();
        let mut shift = 0_i64;

        for var in &self.vars {
          let call = usize::from(var.get_call(i));
          let allele = &var.seqs[call];
          let gpos = usize::try_from(var.pos as i64 + shift).expect("variant positions stay in range");
          let ref_len = var.seqs[0].len();
          let longest = var
            .seqs
            .iter()
            .filter(|s| s.as_str() != SPANNING_ALLELE)
            .map(String::len)
            .max()
            .unwrap_or(0);

          if allele == SPANNING_ALLELE {
            // the sample's bases here are already gapped out by an upstream
            // deletion, but insertion columns still have to open
            if var.is_insertion() {
              gapped.splice(gpos..gpos, std::iter::repeat_n(b'-', longest));
              shift += longest as i64;
            }
            continue;
          }

          if call != 0 {
            gapped.splice(gpos..gpos + ref_len, allele.bytes());
          }

          if var.is_insertion() {
            let pad = longest - allele.len();
            gapped.splice(gpos + allele.len()..gpos + allele.len(), std::iter::repeat_n(b'-', pad));
            shift += longest as i64;
          } else if var.is_deletion() {
            let pad = ref_len - allele.len();
            gapped.splice(gpos..gpos, std::iter::repeat_n(b'-', pad));
          }
        }

        String::from_utf8(gapped).expect("sequences are ASCII")
      })
      .collect_vec()
  }
}

#[cfg(test)]
mod skyr_tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use rstest::rstest;

  fn seqs(list: &[&str]) -> Vec<Vec<u8>> {
    list.iter().map(|s| s.as_bytes().to_vec()).collect()
  }

  #[rstest]
  fn fewer_than_two_sequences_is_an_error() {
    let mut skyr = Skyr::new(seqs(&["AAAA"]));
    assert_eq!(skyr.find_all_edits(), Err(AlignError::EmptyInput(1)));
  }

  #[rstest]
  fn snp_and_deletion_become_two_variants() -> Result<(), AlignError> {
    // reference AAAATAAA; one sample with T>C, one with the T deleted
    let mut skyr = Skyr::new(seqs(&["AAAATAAA", "AAAACAAA", "AAAAAAA"]));
    skyr.find_all_edits()?;
    skyr.find_variants_from_edits();
    skyr.populate_variants_with_calls();

    assert_eq!(skyr.vars.len(), 2);

    let del = &skyr.vars[0];
    assert_eq!(del.pos, 4);
    assert_eq!(del.seqs, vec!["T", ""]);
    assert_eq!(del.calls, vec![0, 0, 1]);

    let snp = &skyr.vars[1];
    assert_eq!(snp.pos, 4);
    assert_eq!(snp.seqs, vec!["T", "C"]);
    assert_eq!(snp.calls, vec![0, 1, 0]);

    Ok(())
  }

  #[rstest]
  fn same_position_snps_merge_into_one_variant() -> Result<(), AlignError> {
    let mut skyr = Skyr::new(seqs(&["AAAATAAA", "AAAACAAA", "AAAAGAAA"]));
    skyr.find_all_edits()?;
    skyr.find_variants_from_edits();
    skyr.populate_variants_with_calls();

    assert_eq!(skyr.vars.len(), 1);
    let var = &skyr.vars[0];
    assert_eq!(var.seqs, vec!["T", "C", "G"]);
    assert!(var.is_snp());
    assert_eq!(var.calls, vec![0, 1, 2]);

    Ok(())
  }

  #[rstest]
  fn nested_deletions_share_one_widened_variant() {
    let mut skyr = Skyr::new(seqs(&["GGTAGG", "GGGG", "GGAGG"]));
    skyr.all_edits.insert(Event::new(2, "T", ""), 1);
    skyr.all_edits.insert(Event::new(2, "TA", ""), 1);
    skyr.find_variants_from_edits();

    assert_eq!(skyr.vars.len(), 1);
    // the shorter deletion keeps the suffix the longer one removes
    assert_eq!(skyr.vars[0].seqs, vec!["TA", "A", ""]);
  }

  #[rstest]
  fn spanned_variant_gets_the_asterisk_allele() {
    let mut skyr = Skyr::new(seqs(&["GGTAGG", "GGGG", "GGTGGG"]));
    skyr.all_edits.insert(Event::new(2, "TA", ""), 1);
    skyr.all_edits.insert(Event::new(3, "A", "G"), 1);
    skyr.find_variants_from_edits();

    assert_eq!(skyr.vars.len(), 2);
    assert_eq!(skyr.vars[0].seqs, vec!["TA", ""]);
    assert_eq!(skyr.vars[1].seqs, vec!["A", "G", "*"]);
  }

  #[rstest]
  fn spanned_calls_use_the_asterisk_index() -> Result<(), AlignError> {
    // sample 1 deletes TA entirely, sample 2 only mutates the A
    let mut skyr = Skyr::new(seqs(&["GGTAGG", "GGGG", "GGTGGG"]));
    skyr.edits[1].insert(Event::new(2, "TA", ""));
    skyr.edits[2].insert(Event::new(3, "A", "G"));
    skyr.all_edits.insert(Event::new(2, "TA", ""), 1);
    skyr.all_edits.insert(Event::new(3, "A", "G"), 1);
    skyr.find_variants_from_edits();
    skyr.populate_variants_with_calls();

    // at the SNP locus, the deleted sample calls `*` (allele 2)
    assert_eq!(skyr.vars[0].calls, vec![0, 1, 0]);
    assert_eq!(skyr.vars[1].calls, vec![0, 2, 1]);

    Ok(())
  }

  #[rstest]
  fn gapped_sequences_align_deletions_with_dashes() -> Result<(), AlignError> {
    let mut skyr = Skyr::new(seqs(&["AAAATAAA", "AAAACAAA", "AAAAAAA"]));
    skyr.find_all_edits()?;
    skyr.find_variants_from_edits();
    skyr.populate_variants_with_calls();

    let gapped = skyr.gapped_sequences();
    assert_eq!(gapped, vec!["AAAATAAA", "AAAACAAA", "AAAA-AAA"]);

    Ok(())
  }

  #[rstest]
  fn gapped_sequences_open_columns_for_insertions() -> Result<(), AlignError> {
    let mut skyr = Skyr::new(seqs(&["AATT", "AAGTT"]));
    skyr.find_all_edits()?;
    skyr.find_variants_from_edits();
    skyr.populate_variants_with_calls();

    let gapped = skyr.gapped_sequences();
    assert_eq!(gapped, vec!["AA-TT", "AAGTT"]);

    Ok(())
  }

  #[rstest]
  fn prefix_matching_is_symmetric_in_length() {
    assert!(prefix_matches("A", "AA"));
    assert!(prefix_matches("AA", "A"));
    assert!(prefix_matches("", "ACGT"));
    assert!(!prefix_matches("AC", "AG"));
  }
}
