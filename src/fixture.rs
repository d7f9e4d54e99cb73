//! Fixtures for tests
use crate::curve::{LinearFunction, Piece, PiecewiseCurve};
use crate::edge::{EdgeKind, EdgeParameters};
use crate::market::Market;
use crate::node::Node;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Edge parameters with the given unit cost and capacity, and cheap expansion
pub fn edge_params(unit_cost: f64, base_capacity: f64) -> EdgeParameters {
    EdgeParameters {
        unit_cost,
        base_capacity,
        fixed_expand_cost: 0.5,
        expand_coeff: 0.5,
    }
}

fn line(a: f64, b: f64, c: f64) -> LinearFunction {
    LinearFunction::new(a, b, c).unwrap()
}

/// A curve following `first` on `[0, kink]` and `second` on `[kink, end]`
fn kinked(first: LinearFunction, second: LinearFunction, kink: f64, end: f64) -> PiecewiseCurve {
    PiecewiseCurve::from_pieces(vec![
        Piece::linear(first, 0.0, kink).unwrap(),
        Piece::linear(second, kink, end).unwrap(),
    ])
    .unwrap()
}

/// A curve through the given points, joined by straight lines
fn through(points: &[(f64, f64)]) -> PiecewiseCurve {
    let pieces = points
        .windows(2)
        .map(|pair| Piece::through(pair[0], pair[1]).unwrap())
        .collect();
    PiecewiseCurve::from_pieces(pieces).unwrap()
}

/// A node whose demand vanishes at `kink`, with curves defined up to a price of 20
fn kinked_node(
    id: &str,
    demand: LinearFunction,
    supply: (LinearFunction, LinearFunction),
    kink: f64,
) -> Node {
    Node::new(
        id.into(),
        kinked(demand, LinearFunction::constant(0.0), kink, 20.0),
        kinked(supply.0, supply.1, kink, 20.0),
    )
    .unwrap()
}

/// Add edges given as `(from, to, kind, [unit_cost, base_capacity, fixed_expand_cost, expand_coeff])`
fn add_edges(market: &mut Market, edges: &[(&str, &str, EdgeKind, [f64; 4])]) {
    for &(from, to, kind, [unit_cost, base_capacity, fixed_expand_cost, expand_coeff]) in edges {
        let params = EdgeParameters {
            unit_cost,
            base_capacity,
            fixed_expand_cost,
            expand_coeff,
        };
        market
            .add_edge(&from.into(), &to.into(), kind, params)
            .unwrap();
    }
}

/// A hub with two suppliers and one customer
#[fixture]
pub fn four_node_market() -> Market {
    let mut market = Market::new();
    let nodes = [
        kinked_node(
            "hub",
            line(1.0, 1.0, 6.0),
            (line(1.0, -1.0, 0.0), line(-2.0, 1.0, -6.0)),
            6.0,
        ),
        kinked_node(
            "n1",
            line(2.0, 1.0, 4.0),
            (line(-2.0, 1.0, 0.0), line(-4.0, 1.0, -4.0)),
            2.0,
        ),
        kinked_node(
            "n2",
            line(1.0, 1.0, 8.0),
            (line(-1.0, 1.0, 0.0), line(-2.0, 1.0, -8.0)),
            8.0,
        ),
        kinked_node(
            "n3",
            line(2.0, 1.0, 6.0),
            (line(-2.0, 1.0, 0.0), line(-4.0, 1.0, -6.0)),
            3.0,
        ),
    ];
    for (i, node) in nodes.into_iter().enumerate() {
        market.add_node(node, i == 0).unwrap();
    }

    add_edges(
        &mut market,
        &[
            ("n1", "hub", EdgeKind::StarToCenter, [1.0, 2.0, 2.0, 2.0]),
            ("n2", "hub", EdgeKind::StarToCenter, [2.0, 3.0, 1.0, 2.0]),
            ("hub", "n3", EdgeKind::StarFromCenter, [3.0, 3.0, 1.0, 1.0]),
        ],
    );

    market
}

/// A hub feeding two customers and fed by one supplier
#[fixture]
pub fn subtask2_market() -> Market {
    let mut market = Market::new();
    let nodes = [
        kinked_node(
            "hub",
            line(2.0, 1.0, 8.0),
            (line(-2.0, 1.0, 0.0), line(-4.0, 1.0, -8.0)),
            4.0,
        ),
        kinked_node(
            "n1",
            line(1.0, 1.0, 4.0),
            (line(-1.0, 1.0, 0.0), line(-2.0, 1.0, -4.0)),
            4.0,
        ),
        kinked_node(
            "n2",
            line(1.0, 1.0, 6.0),
            (line(-1.0, 1.0, 0.0), line(-2.0, 1.0, -6.0)),
            6.0,
        ),
        kinked_node(
            "n3",
            line(0.5, 1.0, 4.0),
            (line(-0.5, 1.0, 0.0), line(-1.0, 1.0, -4.0)),
            8.0,
        ),
    ];
    for (i, node) in nodes.into_iter().enumerate() {
        market.add_node(node, i == 0).unwrap();
    }

    add_edges(
        &mut market,
        &[
            ("hub", "n1", EdgeKind::StarFromCenter, [3.0, 2.0, 1.0, 1.0]),
            ("n2", "hub", EdgeKind::StarToCenter, [2.0, 2.0, 1.0, 1.0]),
            ("hub", "n3", EdgeKind::StarFromCenter, [2.0, 3.0, 1.0, 1.0]),
        ],
    );

    market
}

/// A hub whose only customer is reached over a congested edge
#[fixture]
pub fn subtask3_market() -> Market {
    let mut market = Market::new();
    let nodes = [
        (
            "hub",
            through(&[(0.0, 9.0), (6.0, 0.0), (16.0, 0.0)]),
            through(&[(0.0, 0.0), (6.0, 9.0), (16.0, 39.0)]),
        ),
        (
            "n1",
            through(&[(0.0, 15.0), (10.0, 0.0), (20.0, 0.0)]),
            through(&[(0.0, 0.0), (10.0, 15.0), (20.0, 45.0)]),
        ),
        (
            "n2",
            through(&[(0.0, 2.0), (4.0, 0.0), (14.0, 0.0)]),
            through(&[(0.0, 0.0), (4.0, 2.0), (14.0, 12.0)]),
        ),
        (
            "n3",
            through(&[(0.0, 8.0), (4.0, 0.0), (14.0, 0.0)]),
            through(&[(0.0, 0.0), (4.0, 8.0), (14.0, 48.0)]),
        ),
    ];
    for (i, (id, demand, supply)) in nodes.into_iter().enumerate() {
        let node = Node::new(id.into(), demand, supply).unwrap();
        market.add_node(node, i == 0).unwrap();
    }

    add_edges(
        &mut market,
        &[
            ("hub", "n1", EdgeKind::StarFromCenter, [1.0, 1.0, 4.0, 4.0]),
            ("n2", "hub", EdgeKind::StarToCenter, [3.0, 5.0, 1.0, 2.0]),
            ("n3", "hub", EdgeKind::StarToCenter, [3.0, 2.0, 1.0, 3.0]),
        ],
    );

    market
}

/// A hub fed by one cheap supplier over an edge that is worth expanding
#[fixture]
pub fn two_node_market() -> Market {
    let mut market = Market::new();
    market
        .add_node(Node::with_coefficients("A".into(), 1.0, 10.0).unwrap(), true)
        .unwrap();
    market
        .add_node(Node::with_coefficients("B".into(), 1.0, 2.0).unwrap(), false)
        .unwrap();
    add_edges(
        &mut market,
        &[("B", "A", EdgeKind::StarToCenter, [1.0, 1.0, 0.5, 0.5])],
    );
    market.extend_curves_to_common_price().unwrap();

    market
}

/// A hub with `importers` and `exporters` attached directly and a chain of `chain` nodes whose
/// links alternate in direction, starting away from the hub.
///
/// Nodes are added as the hub, then importers, exporters and the chain in order.
pub fn star_chain_market(importers: usize, exporters: usize, chain: usize) -> Market {
    let mut market = Market::new();
    let mut edge_count = 0;
    let mut link = |market: &mut Market, from: String, to: String, kind: EdgeKind| {
        let params = edge_params(1.0, 1.0 + 0.5 * edge_count as f64);
        edge_count += 1;
        market
            .add_edge(&from.into(), &to.into(), kind, params)
            .unwrap();
    };
    let add = |market: &mut Market, id: &str, d: f64| {
        let node = Node::with_coefficients(id.into(), 1.0, d).unwrap();
        market.add_node(node, id == "hub").unwrap();
    };

    add(&mut market, "hub", 10.0);
    for i in 0..importers {
        let id = format!("importer{i}");
        add(&mut market, &id, 16.0 + i as f64);
        link(&mut market, "hub".into(), id, EdgeKind::StarFromCenter);
    }
    for i in 0..exporters {
        let id = format!("exporter{i}");
        add(&mut market, &id, 2.0 + i as f64);
        link(&mut market, id, "hub".into(), EdgeKind::StarToCenter);
    }

    let mut previous = String::from("hub");
    for i in 0..chain {
        let id = format!("chain{i}");
        if i % 2 == 0 {
            add(&mut market, &id, 16.0 + i as f64);
            link(&mut market, previous, id.clone(), EdgeKind::ChainFromCenter);
        } else {
            add(&mut market, &id, 2.0 + i as f64);
            link(&mut market, id.clone(), previous, EdgeKind::ChainToCenter);
        }
        previous = id;
    }

    market
}
