//! Individual pieces of a piecewise-linear curve.
use super::{CurveError, Interval, LinearFunction};

/// One piece of a piecewise-linear curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Piece {
    /// A line restricted to `[x_start, x_end]`
    Linear {
        /// The line
        line: LinearFunction,
        /// Start of the segment
        x_start: f64,
        /// End of the segment
        x_end: f64,
    },
    /// Every value in `range` at the single point `x`
    Vertical {
        /// Where the piece stands
        x: f64,
        /// The values taken at `x`
        range: Interval,
    },
}

impl Piece {
    /// A line restricted to `[x_start, x_end]`, where `x_start < x_end`
    pub fn linear(line: LinearFunction, x_start: f64, x_end: f64) -> Result<Self, CurveError> {
        if x_start == x_end {
            return Err(CurveError::EmptySegment(x_start));
        }

        Self::linear_closed(line, x_start, x_end)
    }

    /// Like [`Piece::linear`], but a segment may shrink to a single point.
    ///
    /// Points pair with vertical pieces when curves are combined or inverted.
    pub(super) fn linear_closed(
        line: LinearFunction,
        x_start: f64,
        x_end: f64,
    ) -> Result<Self, CurveError> {
        if x_start > x_end {
            return Err(CurveError::InvertedSegment { x_start, x_end });
        }

        Ok(Self::Linear {
            line,
            x_start,
            x_end,
        })
    }

    /// A vertical piece at `x` spanning `[y_min, y_max]`
    pub fn vertical(y_min: f64, y_max: f64, x: f64) -> Result<Self, CurveError> {
        if y_min > y_max {
            return Err(CurveError::InvertedRange {
                lo: y_min,
                hi: y_max,
            });
        }

        Ok(Self::Vertical {
            x,
            range: Interval::new(y_min, y_max),
        })
    }

    /// The linear piece joining two points.
    ///
    /// The points must have distinct `x` coordinates.
    pub fn through((x1, y1): (f64, f64), (x2, y2): (f64, f64)) -> Result<Self, CurveError> {
        let line = LinearFunction::new(y1 - y2, x2 - x1, x2 * y1 - x1 * y2)?;
        Self::linear(line, x1.min(x2), x1.max(x2))
    }

    /// Where the piece begins
    pub fn x_start(&self) -> f64 {
        match self {
            Self::Linear { x_start, .. } => *x_start,
            Self::Vertical { x, .. } => *x,
        }
    }

    /// Where the piece ends
    pub fn x_end(&self) -> f64 {
        match self {
            Self::Linear { x_end, .. } => *x_end,
            Self::Vertical { x, .. } => *x,
        }
    }

    /// The segment covered by the piece
    pub fn segment(&self) -> Interval {
        Interval::new(self.x_start(), self.x_end())
    }

    /// The middle of the segment covered by the piece
    pub fn midpoint(&self) -> f64 {
        (self.x_start() + self.x_end()) / 2.0
    }

    /// Whether the piece covers `x`
    pub fn covers(&self, x: f64) -> bool {
        self.x_start() <= x && x <= self.x_end()
    }

    /// Whether this is a vertical piece
    pub fn is_vertical(&self) -> bool {
        matches!(self, Self::Vertical { .. })
    }

    /// Whether this is a linear piece with zero slope
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Linear { line, .. } if line.is_horizontal())
    }

    /// The line of a linear piece
    pub fn line(&self) -> Result<LinearFunction, CurveError> {
        match self {
            Self::Linear { line, .. } => Ok(*line),
            Self::Vertical { x, .. } => Err(CurveError::NotLinear(*x)),
        }
    }

    /// The range of a vertical piece
    pub fn vertical_range(&self) -> Result<Interval, CurveError> {
        match self {
            Self::Vertical { range, .. } => Ok(*range),
            Self::Linear { .. } => Err(CurveError::NotVertical(self.segment())),
        }
    }

    /// Move the start of the piece (a vertical piece moves as a whole)
    pub fn set_x_start(&mut self, value: f64) {
        match self {
            Self::Linear { x_start, .. } => *x_start = value,
            Self::Vertical { x, .. } => *x = value,
        }
    }

    /// Move the end of the piece (a vertical piece moves as a whole)
    pub fn set_x_end(&mut self, value: f64) {
        match self {
            Self::Linear { x_end, .. } => *x_end = value,
            Self::Vertical { x, .. } => *x = value,
        }
    }

    /// The values the piece takes at `x`
    pub fn value_at(&self, x: f64) -> Result<Interval, CurveError> {
        if !self.covers(x) {
            return Err(CurveError::OutOfDomain {
                x,
                domain: self.segment(),
            });
        }

        Ok(self.value_unchecked(x))
    }

    /// The values at the start of the piece
    pub fn start_value(&self) -> Interval {
        self.value_unchecked(self.x_start())
    }

    /// The values at the end of the piece
    pub fn end_value(&self) -> Interval {
        self.value_unchecked(self.x_end())
    }

    fn value_unchecked(&self, x: f64) -> Interval {
        match self {
            Self::Linear { line, .. } => Interval::point(line.value_at(x)),
            Self::Vertical { range, .. } => *range,
        }
    }

    /// Definite integral over `[from, to]`. Vertical pieces have no area.
    pub fn integrate(&self, from: f64, to: f64) -> Result<f64, CurveError> {
        if from > to {
            return Err(CurveError::ReversedBounds { from, to });
        }

        Ok(match self {
            Self::Linear { line, .. } => line.primitive(to) - line.primitive(from),
            Self::Vertical { .. } => 0.0,
        })
    }

    /// The piece reflected about `y = x`
    pub fn inverse(&self) -> Result<Self, CurveError> {
        match *self {
            Self::Vertical { x, range } => {
                Self::linear_closed(LinearFunction::constant(x), range.lo(), range.hi())
            }
            Self::Linear {
                line,
                x_start,
                x_end,
            } => {
                if line.is_horizontal() {
                    Self::vertical(x_start, x_end, line.c)
                } else {
                    let y_start = line.value_at(x_start);
                    let y_end = line.value_at(x_end);
                    Self::linear_closed(line.inverse()?, y_start.min(y_end), y_start.max(y_end))
                }
            }
        }
    }

    /// The piece reflected about the origin
    pub fn mirror(&self) -> Self {
        match *self {
            Self::Vertical { x, range } => Self::Vertical {
                x: -x,
                range: Interval::new(-range.hi(), -range.lo()),
            },
            Self::Linear {
                line,
                x_start,
                x_end,
            } => Self::Linear {
                line: line.mirror(),
                x_start: -x_end,
                x_end: -x_start,
            },
        }
    }

    /// Pointwise sum of two pieces covering the same segment
    pub fn try_add(&self, other: &Self) -> Result<Self, CurveError> {
        self.combine(other, |a, b| a + b, |a, b| a + b)
    }

    /// Pointwise difference of two pieces covering the same segment
    pub fn try_sub(&self, other: &Self) -> Result<Self, CurveError> {
        self.combine(other, |a, b| a - b, |a, b| a - b)
    }

    fn combine(
        &self,
        other: &Self,
        line_op: fn(LinearFunction, LinearFunction) -> LinearFunction,
        range_op: fn(Interval, Interval) -> Interval,
    ) -> Result<Self, CurveError> {
        if self.x_start() != other.x_start() || self.x_end() != other.x_end() {
            return Err(CurveError::SegmentMismatch(
                self.segment(),
                other.segment(),
            ));
        }

        Ok(match (self, other) {
            (
                Self::Linear {
                    line,
                    x_start,
                    x_end,
                },
                Self::Linear { line: rhs, .. },
            ) => Self::Linear {
                line: line_op(*line, *rhs),
                x_start: *x_start,
                x_end: *x_end,
            },
            (Self::Vertical { x, .. }, _) | (_, Self::Vertical { x, .. }) => Self::Vertical {
                x: *x,
                range: range_op(self.start_value(), other.start_value()),
            },
        })
    }
}
