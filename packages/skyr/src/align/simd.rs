use num_traits::{AsPrimitive, FromPrimitive, PrimInt, Unsigned};
use std::fmt::Debug;

/// Width of one score band in bytes. Lane count per stripe is
/// `BAND_BYTES / size_of::<T>()`, so narrower lane types pack more positions
/// into one stripe.
pub const BAND_BYTES: usize = 16;

/// Bitset over the lanes of one stripe (at most 16 lanes with u8 lanes).
pub type LaneMask = u16;

/// Unsigned integer usable as the encoded-score lane type.
///
/// Scores are stored with the per-row/per-column gain baked in, so lane values
/// only ever grow; `i64` is wide enough to hold any decoded score.
pub trait LaneUint:
  PrimInt + Unsigned + FromPrimitive + AsPrimitive<i64> + AsPrimitive<u64> + Default + Debug + Send + Sync + 'static
{
  const BITS: u32;

  #[must_use]
  fn lanes() -> usize {
    BAND_BYTES / (Self::BITS as usize / 8)
  }

  /// Converts a widened intermediate back into a lane, clamping into the
  /// representable range instead of wrapping.
  #[must_use]
  fn clamp_i64(value: i64) -> Self {
    if value <= 0 {
      Self::zero()
    } else {
      Self::from_i64(value).unwrap_or_else(Self::max_value)
    }
  }
}

impl LaneUint for u8 {
  const BITS: u32 = 8;
}

impl LaneUint for u16 {
  const BITS: u32 = 16;
}

impl LaneUint for u32 {
  const BITS: u32 = 32;
}

/// One striped score row: `t` stripes of `p` packed lanes, stored flat.
/// Query position `j` lives in stripe `j % t`, lane `j / t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<T: LaneUint> {
  t: usize,
  p: usize,
  data: Vec<T>,
}

impl<T: LaneUint> Row<T> {
  pub fn new(t: usize, value: T) -> Self {
    let p = T::lanes();
    Self {
      t,
      p,
      data: vec![value; t * p],
    }
  }

  #[inline]
  pub fn stripes(&self) -> usize {
    self.t
  }

  #[inline]
  pub fn pack(&self, v: usize) -> &[T] {
    &self.data[v * self.p..(v + 1) * self.p]
  }

  #[inline]
  pub fn pack_mut(&mut self, v: usize) -> &mut [T] {
    &mut self.data[v * self.p..(v + 1) * self.p]
  }

  #[inline]
  pub fn get(&self, v: usize, e: usize) -> T {
    self.data[v * self.p + e]
  }

  #[inline]
  pub fn set(&mut self, v: usize, e: usize, value: T) {
    self.data[v * self.p + e] = value;
  }

  /// Value at striped position `j` (stripe `j % t`, lane `j / t`).
  #[inline]
  pub fn at_pos(&self, j: usize) -> T {
    self.get(j % self.t, j / self.t)
  }

  /// Borrows stripe `v - 1` immutably together with stripe `v` mutably, for
  /// the in-row deletion sweeps.
  #[inline]
  pub fn pair_mut(&mut self, v: usize) -> (&[T], &mut [T]) {
    debug_assert!(v >= 1);
    let (head, tail) = self.data.split_at_mut(v * self.p);
    (&head[(v - 1) * self.p..], &mut tail[..self.p])
  }

  pub fn fill(&mut self, value: T) {
    self.data.fill(value);
  }

  /// Adds `value` to every lane of every stripe, saturating.
  pub fn add_scalar(&mut self, value: T) {
    for x in &mut self.data {
      *x = x.saturating_add(value);
    }
  }
}

/// Shifts one stripe a single lane to the right: lane 0 receives `fill`, lane
/// `e` receives lane `e - 1` re-expressed in lane `e`'s coordinates (adjacent
/// lanes may carry different accumulated reductions).
///
/// This is the boundary primitive of the striped layout and the usual home of
/// off-by-one bugs, hence its own unit tests below.
pub fn shift_one_right<T: LaneUint>(src: &[T], fill: T, reductions: &[i64], out: &mut [T]) {
  debug_assert_eq!(src.len(), out.len());
  debug_assert_eq!(src.len(), reductions.len());
  out[0] = fill;
  for e in 1..src.len() {
    let val: i64 = AsPrimitive::<i64>::as_(src[e - 1]) + reductions[e - 1] - reductions[e];
    out[e] = T::clamp_i64(val);
  }
}

/// Lane-wise `dst = max(dst, src)`, returning the mask of lanes where `src`
/// was strictly greater. The mask feeds the traceback bit writers.
pub fn max_greater<T: LaneUint>(dst: &mut [T], src: &[T]) -> LaneMask {
  debug_assert_eq!(dst.len(), src.len());
  let mut mask: LaneMask = 0;
  for e in 0..dst.len() {
    if src[e] > dst[e] {
      dst[e] = src[e];
      mask |= 1 << e;
    }
  }
  mask
}

/// Lane-wise saturating `out = a + b`.
pub fn add_packs<T: LaneUint>(a: &[T], b: &[T], out: &mut [T]) {
  for e in 0..out.len() {
    out[e] = a[e].saturating_add(b[e]);
  }
}

/// Lane-wise saturating `out = src - value`.
pub fn sub_scalar<T: LaneUint>(src: &[T], value: T, out: &mut [T]) {
  for e in 0..out.len() {
    out[e] = src[e].saturating_sub(value);
  }
}

/// Lane-wise `out = src - value` where `value` may be negative (the encoded
/// gap-open-above cost goes negative when the row gain exceeds the gap open
/// penalty), clamped into the lane range.
pub fn sub_scalar_wide<T: LaneUint>(src: &[T], value: i64, out: &mut [T]) {
  for e in 0..out.len() {
    let wide: i64 = src[e].as_();
    out[e] = T::clamp_i64(wide - value);
  }
}

/// Highest lane value of one stripe.
pub fn reduce_max<T: LaneUint>(pack: &[T]) -> T {
  pack.iter().copied().fold(T::zero(), |acc, x| if x > acc { x } else { acc })
}
