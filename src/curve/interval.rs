//! Closed numeric ranges.
use super::CurveError;
use std::ops::Sub;

/// A closed range `[lo, hi]`.
///
/// Used both for domains and as the result of evaluating a curve, where a degenerate interval is an
/// ordinary value and a proper range is a set of equally valid outcomes (e.g. on a vertical piece).
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Add, derive_more::Display)]
#[display("[{lo}, {hi}]")]
pub struct Interval {
    lo: f64,
    hi: f64,
}

impl Interval {
    /// Create a new interval, swapping the bounds if necessary
    pub fn new(lo: f64, hi: f64) -> Self {
        if lo > hi {
            Self { lo: hi, hi: lo }
        } else {
            Self { lo, hi }
        }
    }

    /// A degenerate interval holding a single value
    pub fn point(x: f64) -> Self {
        Self { lo: x, hi: x }
    }

    /// Lower bound
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper bound
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Distance between the bounds
    pub fn length(&self) -> f64 {
        self.hi - self.lo
    }

    /// Whether the interval holds exactly one value
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    /// The single value held by a degenerate interval
    pub fn single_point(&self) -> Result<f64, CurveError> {
        if self.is_point() {
            Ok(self.lo)
        } else {
            Err(CurveError::NotAPoint(*self))
        }
    }

    /// Whether `x` lies in the interval
    pub fn contains(&self, x: f64) -> bool {
        self.lo <= x && x <= self.hi
    }

    /// Whether `x` lies in the interval once both bounds are relaxed by `tolerance`
    pub fn contains_approx(&self, x: f64, tolerance: f64) -> bool {
        self.lo - tolerance <= x && x <= self.hi + tolerance
    }

    /// Whether the two intervals share a point once both are relaxed by `tolerance`
    pub fn overlaps_approx(&self, other: &Self, tolerance: f64) -> bool {
        self.lo <= other.hi + tolerance && other.lo <= self.hi + tolerance
    }

    /// The common part of two intervals, if there is one
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        (lo <= hi).then_some(Self { lo, hi })
    }

    /// The value a fraction `lambda` of the way from `lo` to `hi`
    pub fn at_fraction(&self, lambda: f64) -> f64 {
        self.lo + self.length() * lambda
    }

    /// How far along the interval `x` lies, as a fraction of its length.
    ///
    /// A degenerate interval reports `0` for its only value.
    pub fn fraction_of(&self, x: f64) -> Result<f64, CurveError> {
        if !self.contains(x) {
            return Err(CurveError::OutOfDomain { x, domain: *self });
        }
        if self.is_point() {
            return Ok(0.0);
        }

        Ok((x - self.lo) / self.length())
    }
}

impl Sub for Interval {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.lo - rhs.lo, self.hi - rhs.hi)
    }
}
