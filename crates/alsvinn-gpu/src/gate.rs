//! The single-qubit gate input structure.
//!
//! The engine consumes gates as four complex coefficients and nothing else;
//! building named gates, decompositions, or parameterized families is the
//! job of the layer above. A pair of amplitudes `(amp0, amp1)` differing
//! only in the target bit is replaced by
//!
//! ```text
//! amp0' = a·amp0 + b·amp1
//! amp1' = c·amp0 + d·amp1
//! ```
//!
//! The engine assumes `[[a, b], [c, d]]` is unitary and never verifies it;
//! feeding a non-unitary matrix silently denormalizes the state.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// A 2×2 unitary acting on one qubit, row-major: `[[a, b], [c, d]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Row 0, column 0.
    pub a: Complex32,
    /// Row 0, column 1.
    pub b: Complex32,
    /// Row 1, column 0.
    pub c: Complex32,
    /// Row 1, column 1.
    pub d: Complex32,
}

impl Gate {
    /// Create a gate from its four coefficients.
    pub fn new(a: Complex32, b: Complex32, c: Complex32, d: Complex32) -> Self {
        Self { a, b, c, d }
    }

    /// Create a gate from real coefficients.
    pub fn from_reals(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            a: Complex32::new(a, 0.0),
            b: Complex32::new(b, 0.0),
            c: Complex32::new(c, 0.0),
            d: Complex32::new(d, 0.0),
        }
    }

    /// The conjugate transpose. For a unitary this is the exact inverse,
    /// so `apply(g)` followed by `apply(g.adjoint())` restores the state.
    pub fn adjoint(&self) -> Self {
        Self {
            a: self.a.conj(),
            b: self.c.conj(),
            c: self.b.conj(),
            d: self.d.conj(),
        }
    }
}
