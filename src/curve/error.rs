//! Errors raised by the piecewise-linear algebra.
use super::Interval;

/// Errors that can occur when building or evaluating curves
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    /// The `y` coefficient of a line was zero
    #[error("Line is vertical (b = 0)")]
    VerticalLine,
    /// A horizontal line cannot be inverted into a function
    #[error("Horizontal line has no inverse")]
    HorizontalInverse,
    /// A vertical piece was given a range whose bounds are the wrong way round
    #[error("Vertical range is inverted: {lo} > {hi}")]
    InvertedRange {
        /// Requested lower bound
        lo: f64,
        /// Requested upper bound
        hi: f64,
    },
    /// A linear piece was given a segment whose end precedes its start
    #[error("Segment is inverted: {x_start} > {x_end}")]
    InvertedSegment {
        /// Requested start of the segment
        x_start: f64,
        /// Requested end of the segment
        x_end: f64,
    },
    /// A linear piece was given a segment of zero length
    #[error("Segment at x = {0} has zero length")]
    EmptySegment(f64),
    /// A single value was requested from an interval of positive length
    #[error("Interval {0} is not a single point")]
    NotAPoint(Interval),
    /// A point was looked up outside the region where it is defined
    #[error("Point {x} lies outside {domain}")]
    OutOfDomain {
        /// The point that was looked up
        x: f64,
        /// Where lookups are allowed
        domain: Interval,
    },
    /// Two pieces were combined although they cover different segments
    #[error("Pieces cover different segments: {0} and {1}")]
    SegmentMismatch(Interval, Interval),
    /// Two curves were combined although their domains don't intersect
    #[error("Domains {0} and {1} don't intersect")]
    DisjointDomains(Interval, Interval),
    /// A curve was built from no pieces
    #[error("Curve has no pieces")]
    Empty,
    /// The declared domain doesn't match the span of the pieces
    #[error("Domain {domain} doesn't match pieces spanning {span}")]
    DomainMismatch {
        /// The declared domain
        domain: Interval,
        /// The span actually covered by the pieces
        span: Interval,
    },
    /// Consecutive pieces leave a gap or overlap
    #[error("Pieces leave a gap or overlap between x = {0} and x = {1}")]
    Gap(f64, f64),
    /// Consecutive pieces disagree in value at their shared point
    #[error("Curve is discontinuous at x = {0}")]
    Discontinuous(f64),
    /// Integration bounds were supplied the wrong way round
    #[error("Integration bounds are reversed: {from} > {to}")]
    ReversedBounds {
        /// Lower bound
        from: f64,
        /// Upper bound
        to: f64,
    },
    /// The domain of a curve ending in a vertical piece cannot be stretched
    #[error("Cannot extend a curve that ends in a vertical piece")]
    VerticalTail,
    /// The curve never reaches zero
    #[error("Curve has no zero crossing")]
    NoZeroCrossing,
    /// Supply or demand coefficients must be strictly positive
    #[error("Market coefficients must be positive (c = {c}, d = {d})")]
    NonPositiveCoefficients {
        /// Slope coefficient
        c: f64,
        /// Intercept coefficient
        d: f64,
    },
    /// A line was requested from a vertical piece
    #[error("Vertical piece at x = {0} has no linear function")]
    NotLinear(f64),
    /// A vertical range was requested from a linear piece
    #[error("Piece on {0} is not vertical")]
    NotVertical(Interval),
}
