//! Striped SIMD pairwise alignment and multi-sequence variant discovery.
//!
//! The core is a vectorised Gotoh/Farrar-style global aligner over a striped
//! score layout, with affine gap penalties, semi-global variants and an
//! extension (clipping) mode. On top of it sits the Skyr loop: iterative
//! re-alignment of samples against a reference, with edit accumulation and
//! multi-allelic variant synthesis.

pub mod align;
pub mod error;
pub mod io;
pub mod msa;

pub use crate::align::event::Event;
pub use crate::align::params::AlignParams;
pub use crate::align::results::AlignmentResults;
pub use crate::align::{align_extension, align_pairwise, Aligner, ExtAligner};
pub use crate::error::AlignError;
pub use crate::msa::Skyr;
