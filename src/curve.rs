//! Piecewise-linear curves and the algebra used to combine them.
//!
//! Curves map price to quantity (supply, demand) or quantity to price (marginal cost), and may
//! contain vertical pieces where a single input maps to a whole range of outputs.
use float_cmp::approx_eq;
use std::cmp::Ordering;

mod error;
pub use error::CurveError;
mod interval;
pub use interval::Interval;
mod linear;
pub use linear::LinearFunction;
mod piece;
pub use piece::Piece;

/// Tolerance used when comparing breakpoints and values
pub const EPS: f64 = 1e-7;

/// Stand-in for an unbounded coordinate
pub const INF: f64 = 1e4;

/// Width below which the zero search stops bisecting
const ZERO_SEARCH_TOLERANCE: f64 = 1e-11;

/// Which pointwise operation to apply when combining two curves
#[derive(Debug, Clone, Copy)]
enum Operation {
    Add,
    Sub,
}

impl Operation {
    fn apply(self, lhs: &Piece, rhs: &Piece) -> Result<Piece, CurveError> {
        match self {
            Self::Add => lhs.try_add(rhs),
            Self::Sub => lhs.try_sub(rhs),
        }
    }
}

/// A continuous sequence of pieces tiling a domain
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCurve {
    pieces: Vec<Piece>,
    domain: Interval,
}

impl PiecewiseCurve {
    /// Build a curve from its pieces, in any order.
    ///
    /// The pieces must tile `domain` without gaps or overlaps and agree in value where they meet.
    /// A vertical piece meets a neighbour if its range contains the neighbour's value there.
    /// Breakpoints are snapped together and adjacent horizontal pieces merged.
    pub fn new(mut pieces: Vec<Piece>, domain: Interval) -> Result<Self, CurveError> {
        if pieces.is_empty() {
            return Err(CurveError::Empty);
        }

        pieces.sort_by(compare_pieces);

        let first = pieces[0];
        let last = pieces[pieces.len() - 1];
        if !approx_eq!(f64, first.x_start(), domain.lo(), epsilon = EPS)
            || !approx_eq!(f64, last.x_end(), domain.hi(), epsilon = EPS)
        {
            return Err(CurveError::DomainMismatch {
                domain,
                span: Interval::new(first.x_start(), last.x_end()),
            });
        }

        for (prev, cur) in pieces.iter().zip(pieces.iter().skip(1)) {
            check_join(prev, cur)?;
        }

        // Snap each start onto the previous end
        for i in 1..pieces.len() {
            let prev_end = pieces[i - 1].x_end();
            pieces[i].set_x_start(prev_end);
        }

        let domain = Interval::new(pieces[0].x_start(), pieces[pieces.len() - 1].x_end());

        let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match merged.last_mut() {
                Some(prev) if prev.is_horizontal() && piece.is_horizontal() => {
                    prev.set_x_end(piece.x_end());
                }
                _ => merged.push(piece),
            }
        }

        Ok(Self {
            pieces: merged,
            domain,
        })
    }

    /// Build a curve whose domain is the span of its pieces
    pub fn from_pieces(pieces: Vec<Piece>) -> Result<Self, CurveError> {
        if pieces.is_empty() {
            return Err(CurveError::Empty);
        }

        let lo = pieces
            .iter()
            .map(Piece::x_start)
            .fold(f64::INFINITY, f64::min);
        let hi = pieces
            .iter()
            .map(Piece::x_end)
            .fold(f64::NEG_INFINITY, f64::max);

        Self::new(pieces, Interval::new(lo, hi))
    }

    /// The pieces, in order
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Where the curve is defined
    pub fn domain(&self) -> Interval {
        self.domain
    }

    /// Clamp `x` into the domain, allowing it to overshoot by at most [`EPS`]
    fn clamp_to_domain(&self, x: f64) -> Result<f64, CurveError> {
        if !self.domain.contains_approx(x, EPS) {
            return Err(CurveError::OutOfDomain {
                x,
                domain: self.domain,
            });
        }

        Ok(x.clamp(self.domain.lo(), self.domain.hi()))
    }

    /// The values the curve takes at `x`.
    ///
    /// A vertical piece at `x` takes precedence; otherwise the last piece covering `x` is used.
    pub fn value_at(&self, x: f64) -> Result<Interval, CurveError> {
        let x = self.clamp_to_domain(x)?;
        let mut value = None;
        for piece in self.pieces.iter().filter(|piece| piece.covers(x)) {
            if piece.is_vertical() {
                return piece.value_at(x);
            }
            value = Some(piece.value_at(x)?);
        }

        value.ok_or(CurveError::OutOfDomain {
            x,
            domain: self.domain,
        })
    }

    /// The segment of the last horizontal piece covering `x`, if any
    pub fn horizontal_segment_containing(&self, x: f64) -> Option<Interval> {
        let x = self.clamp_to_domain(x).ok()?;
        self.pieces
            .iter()
            .rfind(|piece| piece.is_horizontal() && piece.covers(x))
            .map(Piece::segment)
    }

    /// The curve reflected about `y = x`.
    ///
    /// Only meaningful for monotone curves, where the result is again a valid curve.
    pub fn inverse(&self) -> Result<Self, CurveError> {
        let pieces = self
            .pieces
            .iter()
            .map(|piece| {
                let mut inverse = piece.inverse()?;
                if approx_eq!(f64, inverse.x_start(), 0.0, epsilon = EPS) {
                    inverse.set_x_start(0.0);
                }
                Ok(inverse)
            })
            .collect::<Result<Vec<_>, CurveError>>()?;

        Self::from_pieces(pieces)
    }

    /// The curve reflected about the origin, i.e. `x -> -f(-x)`
    pub fn mirror(&self) -> Self {
        Self {
            pieces: self.pieces.iter().rev().map(Piece::mirror).collect(),
            domain: Interval::new(-self.domain.hi(), -self.domain.lo()),
        }
    }

    /// Pointwise sum over the intersection of the two domains
    pub fn try_add(&self, other: &Self) -> Result<Self, CurveError> {
        self.combine(other, Operation::Add)
    }

    /// Pointwise difference over the intersection of the two domains
    pub fn try_sub(&self, other: &Self) -> Result<Self, CurveError> {
        self.combine(other, Operation::Sub)
    }

    fn combine(&self, other: &Self, op: Operation) -> Result<Self, CurveError> {
        let domain = self
            .domain
            .intersection(&other.domain)
            .ok_or(CurveError::DisjointDomains(self.domain, other.domain))?;

        let mut lhs = self.clip_to(domain);
        let mut rhs = other.clip_to(domain);
        if lhs.is_empty() || rhs.is_empty() {
            return Err(CurveError::DisjointDomains(self.domain, other.domain));
        }

        // If only one side ends in a vertical piece, give the other a matching point to pair with
        add_vertical_stub(&lhs, &mut rhs)?;
        add_vertical_stub(&rhs, &mut lhs)?;

        let mut pieces = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            let (left, right) = (lhs[i], rhs[j]);
            assert!(
                left.x_start() == right.x_start(),
                "Pieces paired for {op:?} start at different points: {} and {}",
                left.x_start(),
                right.x_start()
            );

            match left.x_end().total_cmp(&right.x_end()) {
                Ordering::Less => {
                    let mut head = right;
                    head.set_x_end(left.x_end());
                    rhs[j].set_x_start(left.x_end());
                    pieces.push(op.apply(&left, &head)?);
                    i += 1;
                }
                Ordering::Greater => {
                    let mut head = left;
                    head.set_x_end(right.x_end());
                    lhs[i].set_x_start(right.x_end());
                    pieces.push(op.apply(&head, &right)?);
                    j += 1;
                }
                Ordering::Equal => {
                    pieces.push(op.apply(&left, &right)?);
                    i += 1;
                    j += 1;
                }
            }
        }

        Self::new(pieces, domain)
    }

    /// The pieces overlapping `domain`, with linear pieces cut to fit inside it
    fn clip_to(&self, domain: Interval) -> Vec<Piece> {
        let mut clipped = Vec::with_capacity(self.pieces.len());
        for piece in &self.pieces {
            let (start, end) = (piece.x_start(), piece.x_end());
            if start >= domain.lo() && end <= domain.hi() {
                clipped.push(*piece);
            } else if start <= domain.hi() && end >= domain.lo() {
                if piece.is_vertical() {
                    clipped.push(*piece);
                } else if start != domain.hi() && end != domain.lo() {
                    let mut piece = *piece;
                    piece.set_x_start(start.max(domain.lo()));
                    piece.set_x_end(end.min(domain.hi()));
                    clipped.push(piece);
                }
            }
        }

        clipped
    }

    /// Definite integral over `[from, to]`, ignoring vertical pieces
    pub fn integrate(&self, from: f64, to: f64) -> Result<f64, CurveError> {
        if from > to {
            return Err(CurveError::ReversedBounds { from, to });
        }

        let mut total = 0.0;
        for piece in &self.pieces {
            if piece.is_vertical() || piece.x_start() >= to || piece.x_end() <= from {
                continue;
            }
            total += piece.integrate(piece.x_start().max(from), piece.x_end().min(to))?;
        }

        Ok(total)
    }

    /// Where the curve first reaches zero.
    ///
    /// Returns a degenerate interval for a single crossing, or the whole segment of a piece that
    /// is identically zero.
    pub fn find_zero(&self) -> Result<Interval, CurveError> {
        for piece in &self.pieces {
            let line = match piece {
                Piece::Vertical { x, range } => {
                    if range.contains(0.0) {
                        return Ok(Interval::point(*x));
                    }
                    continue;
                }
                Piece::Linear { line, .. } => *line,
            };

            let (start, end) = (piece.x_start(), piece.x_end());
            if line.a == 0.0 && line.c == 0.0 {
                return Ok(piece.segment());
            }

            let (v_start, v_end) = (line.value_at(start), line.value_at(end));
            if v_start == 0.0 {
                return Ok(Interval::point(start));
            }
            if v_end == 0.0 {
                return Ok(Interval::point(end));
            }
            if v_start < 0.0 && v_end > 0.0 {
                return Ok(Interval::point(bisect(&line, start, end, true)));
            }
            if v_start > 0.0 && v_end < 0.0 {
                return Ok(Interval::point(bisect(&line, start, end, false)));
            }
        }

        Err(CurveError::NoZeroCrossing)
    }

    /// Stretch the final piece so the domain reaches `x`.
    ///
    /// Does nothing if the domain already reaches `x`.
    pub fn extend_domain_to(&mut self, x: f64) -> Result<(), CurveError> {
        let last = self.pieces.last_mut().ok_or(CurveError::Empty)?;
        if last.is_vertical() {
            return Err(CurveError::VerticalTail);
        }
        if x > self.domain.hi() {
            last.set_x_end(x);
            self.domain = Interval::new(self.domain.lo(), x);
        }

        Ok(())
    }

    /// Supply curve `c x / 2` up to the demand-zeroing price `2d/c`, then `c x - d`
    pub fn create_supply_curve(c: f64, d: f64) -> Result<Self, CurveError> {
        let zeroing_price = demand_zeroing_price(c, d)?;
        let end = zeroing_price + 10.0;
        let pieces = vec![
            Piece::linear(LinearFunction::new(-c, 2.0, 0.0)?, 0.0, zeroing_price)?,
            Piece::linear(LinearFunction::new(-c, 1.0, -d)?, zeroing_price, end)?,
        ];

        Self::new(pieces, Interval::new(0.0, end))
    }

    /// Demand curve `d - c x / 2` up to the demand-zeroing price `2d/c`, then zero
    pub fn create_demand_curve(c: f64, d: f64) -> Result<Self, CurveError> {
        let zeroing_price = demand_zeroing_price(c, d)?;
        let end = zeroing_price + 10.0;
        let pieces = vec![
            Piece::linear(LinearFunction::new(c, 2.0, 2.0 * d)?, 0.0, zeroing_price)?,
            Piece::linear(LinearFunction::constant(0.0), zeroing_price, end)?,
        ];

        Self::new(pieces, Interval::new(0.0, end))
    }
}

/// Order pieces by the middle of their segment, vertical pieces first on ties
fn compare_pieces(lhs: &Piece, rhs: &Piece) -> Ordering {
    lhs.midpoint()
        .total_cmp(&rhs.midpoint())
        .then_with(|| rhs.is_vertical().cmp(&lhs.is_vertical()))
}

/// Check that `cur` starts where `prev` ends, with a matching value
fn check_join(prev: &Piece, cur: &Piece) -> Result<(), CurveError> {
    if !approx_eq!(f64, prev.x_end(), cur.x_start(), epsilon = EPS) {
        return Err(CurveError::Gap(prev.x_end(), cur.x_start()));
    }

    let (end, start) = (prev.end_value(), cur.start_value());
    let joined = if prev.is_vertical() || cur.is_vertical() {
        end.overlaps_approx(&start, EPS)
    } else {
        approx_eq!(f64, end.lo(), start.lo(), epsilon = EPS)
    };
    if !joined {
        return Err(CurveError::Discontinuous(cur.x_start()));
    }

    Ok(())
}

/// Append a point-sized vertical piece to `other` if only `pieces` ends in a vertical piece
fn add_vertical_stub(pieces: &[Piece], other: &mut Vec<Piece>) -> Result<(), CurveError> {
    let (Some(tail), Some(other_tail)) = (pieces.last(), other.last()) else {
        return Ok(());
    };
    if tail.is_vertical() && !other_tail.is_vertical() {
        let value = other_tail.end_value().lo();
        let stub = Piece::vertical(value, value, other_tail.x_end())?;
        other.push(stub);
    }

    Ok(())
}

/// Bisect for the zero of `line` on `[l, r]`, where it rises through zero if `increasing`
fn bisect(line: &LinearFunction, mut l: f64, mut r: f64, increasing: bool) -> f64 {
    while r - l > ZERO_SEARCH_TOLERANCE {
        let mid = (l + r) / 2.0;
        if mid == l || mid == r {
            break;
        }
        if (line.value_at(mid) <= 0.0) == increasing {
            l = mid;
        } else {
            r = mid;
        }
    }

    if increasing { l } else { r }
}

fn demand_zeroing_price(c: f64, d: f64) -> Result<f64, CurveError> {
    if c <= 0.0 || d <= 0.0 {
        return Err(CurveError::NonPositiveCoefficients { c, d });
    }

    Ok(2.0 * d / c)
}
