use crate::align::cache::AlignCache;
use crate::align::event::Event;
use crate::align::extend::ExtCache;
use crate::align::params::AlignParams;
use crate::align::results::AlignmentResults;
use crate::align::simd::LaneUint;
use crate::error::AlignError;

pub mod backtrack;
pub mod cache;
pub mod cigar;
pub mod event;
pub mod extend;
pub mod kernel;
pub mod params;
pub mod profile;
pub mod results;
pub mod simd;

/// Reusable pairwise aligner with a fixed lane width.
///
/// The striped profile of the reference is cached, so aligning one reference
/// against many queries only builds it once. Free SNP edits registered here
/// receive a profile bonus on rediscovery (used by the MSA loop).
#[derive(Debug)]
pub struct Aligner<T: LaneUint> {
  params: AlignParams,
  cache: AlignCache<T>,
}

impl<T: LaneUint> Aligner<T> {
  pub fn new(params: AlignParams) -> Result<Self, AlignError> {
    params.validate::<T>()?;
    Ok(Self {
      params,
      cache: AlignCache::new(),
    })
  }

  pub fn params(&self) -> &AlignParams {
    &self.params
  }

  pub fn add_free_edits<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
    self.cache.add_free_snps(events);
  }

  /// Global alignment of `qry_seq` against `ref_seq`.
  pub fn align(&mut self, ref_seq: &[u8], qry_seq: &[u8]) -> Result<AlignmentResults, AlignError> {
    kernel::global_alignment(ref_seq, qry_seq, &self.params, &mut self.cache)
  }
}

/// Reusable extension aligner (clip and early exit, see [extend]).
#[derive(Debug)]
pub struct ExtAligner<T: LaneUint> {
  params: AlignParams,
  cache: ExtCache<T>,
}

impl<T: LaneUint> ExtAligner<T> {
  pub fn new(params: AlignParams) -> Result<Self, AlignError> {
    params.validate::<T>()?;
    Ok(Self {
      params,
      cache: ExtCache::new(),
    })
  }

  pub fn align(&mut self, ref_seq: &[u8], qry_seq: &[u8]) -> Result<AlignmentResults, AlignError> {
    extend::ext_alignment(ref_seq, qry_seq, &self.params, &mut self.cache)
  }
}

/// Global alignment with the recommended lane-width policy: run with 8-bit
/// lanes and widen to 16, then 32 bits if the scores overflow.
pub fn align_pairwise(ref_seq: &[u8], qry_seq: &[u8], params: &AlignParams) -> Result<AlignmentResults, AlignError> {
  fn run<T: LaneUint>(ref_seq: &[u8], qry_seq: &[u8], params: &AlignParams) -> Result<AlignmentResults, AlignError> {
    Aligner::<T>::new(params.clone())?.align(ref_seq, qry_seq)
  }

  widen_on_overflow(
    || run::<u8>(ref_seq, qry_seq, params),
    || run::<u16>(ref_seq, qry_seq, params),
    || run::<u32>(ref_seq, qry_seq, params),
  )
}

/// Extension alignment with the same lane-width policy as [align_pairwise].
pub fn align_extension(ref_seq: &[u8], qry_seq: &[u8], params: &AlignParams) -> Result<AlignmentResults, AlignError> {
  fn run<T: LaneUint>(ref_seq: &[u8], qry_seq: &[u8], params: &AlignParams) -> Result<AlignmentResults, AlignError> {
    ExtAligner::<T>::new(params.clone())?.align(ref_seq, qry_seq)
  }

  widen_on_overflow(
    || run::<u8>(ref_seq, qry_seq, params),
    || run::<u16>(ref_seq, qry_seq, params),
    || run::<u32>(ref_seq, qry_seq, params),
  )
}

// A config that does not fit the narrow lanes is also worth a retry: the
// wider width may well encode it.
fn widen_on_overflow(
  narrow: impl FnOnce() -> Result<AlignmentResults, AlignError>,
  medium: impl FnOnce() -> Result<AlignmentResults, AlignError>,
  wide: impl FnOnce() -> Result<AlignmentResults, AlignError>,
) -> Result<AlignmentResults, AlignError> {
  let retryable = |e: &AlignError| matches!(e, AlignError::Overflow { .. } | AlignError::InvalidConfig(_));
  match narrow() {
    Err(e) if retryable(&e) => match medium() {
      Err(e) if retryable(&e) => wide(),
      other => other,
    },
    other => other,
  }
}
