//! Multi-way joins over a join graph.

use super::JoinExecutor;
use crate::ast::JoinCondition;
use crate::executor::Relation;
use pipedb_core::{Error, Result, SpillConfig};
use tracing::debug;

/// A relation still waiting to be joined, with the inputs merged into it.
struct Node {
    relation: Relation,
    /// Indices of the original relations this node contains.
    members: Vec<usize>,
    /// Position of the earliest original relation, used for tie-breaking.
    order: usize,
}

/// A join condition whose columns have been attributed to input relations.
struct Edge {
    left: String,
    right: String,
    left_owner: usize,
    right_owner: usize,
}

/// Joins any number of relations along equi-join conditions.
///
/// Each step joins the two connected relations whose larger member is
/// smallest (ties go to the earlier pair in input order), with the relation
/// that came first in `relations` on the left. Conditions between relations
/// that have already been merged are applied as raw-text equality filters.
/// A join graph that does not connect every relation is an
/// [`Error::InvalidPlan`].
pub fn join_all(
    relations: Vec<Relation>,
    conditions: &[JoinCondition],
    config: &SpillConfig,
) -> Result<Relation> {
    if relations.is_empty() {
        return Err(Error::invalid_plan("a join needs at least one relation"));
    }

    let mut pending = conditions
        .iter()
        .map(|c| {
            Ok(Edge {
                left: c.left.clone(),
                right: c.right.clone(),
                left_owner: owner(&relations, &c.left)?,
                right_owner: owner(&relations, &c.right)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut nodes: Vec<Node> = Vec::with_capacity(relations.len());
    for (i, mut relation) in relations.into_iter().enumerate() {
        // Conditions within one relation are plain selections.
        let (local, rest): (Vec<Edge>, Vec<Edge>) = pending
            .into_iter()
            .partition(|e| e.left_owner == i && e.right_owner == i);
        pending = rest;
        for edge in local {
            relation = retain_equal(relation, &edge.left, &edge.right)?;
        }
        nodes.push(Node {
            relation,
            members: vec![i],
            order: i,
        });
    }

    while nodes.len() > 1 {
        let (i, j) = pick_pair(&nodes, &pending).ok_or_else(|| {
            Error::invalid_plan(format!(
                "join graph is disconnected: {} cannot be joined",
                nodes
                    .iter()
                    .map(|n| n.relation.name().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        // i < j and nodes stay sorted by `order`, so i is the left input.
        let right = nodes.remove(j);
        let left = nodes.remove(i);

        let (connecting, rest): (Vec<Edge>, Vec<Edge>) = pending
            .into_iter()
            .partition(|e| connects(e, &left.members, &right.members));
        pending = rest;

        let mut edges = connecting.into_iter();
        let Some(first) = edges.next() else {
            return Err(Error::invalid_plan("selected join pair has no condition"));
        };
        let (left_key, right_key) = if left.members.contains(&first.left_owner) {
            (first.left, first.right)
        } else {
            (first.right, first.left)
        };

        debug!(
            left = left.relation.name(),
            right = right.relation.name(),
            left_rows = left.relation.len(),
            right_rows = right.relation.len(),
            %left_key,
            %right_key,
            "joining pair"
        );

        let mut joined = JoinExecutor::new(left_key, right_key, config.clone())
            .execute(left.relation, right.relation)?;
        for extra in edges {
            joined = retain_equal(joined, &extra.left, &extra.right)?;
        }

        let mut members = left.members;
        members.extend(right.members);
        nodes.insert(
            i,
            Node {
                relation: joined,
                members,
                order: left.order,
            },
        );
    }

    nodes
        .pop()
        .map(|n| n.relation)
        .ok_or_else(|| Error::invalid_plan("a join needs at least one relation"))
}

/// Finds which input relation a condition column belongs to.
fn owner(relations: &[Relation], column: &str) -> Result<usize> {
    let mut found = relations
        .iter()
        .enumerate()
        .filter(|(_, r)| r.schema().resolve(column).is_ok());
    match (found.next(), found.next()) {
        (Some((i, _)), None) => Ok(i),
        (Some((i, a)), Some((j, b))) => Err(Error::AmbiguousColumn {
            column: column.to_string(),
            candidates: vec![
                format!("{}#{i}", a.name()),
                format!("{}#{j}", b.name()),
            ],
        }),
        (None, _) => Err(Error::column_not_found(
            relations
                .iter()
                .map(Relation::name)
                .collect::<Vec<_>>()
                .join(", "),
            column,
        )),
    }
}

fn connects(edge: &Edge, a: &[usize], b: &[usize]) -> bool {
    (a.contains(&edge.left_owner) && b.contains(&edge.right_owner))
        || (b.contains(&edge.left_owner) && a.contains(&edge.right_owner))
}

fn pick_pair(nodes: &[Node], pending: &[Edge]) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize, usize, usize), (usize, usize))> = None;
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let (a, b) = (&nodes[i], &nodes[j]);
            if !pending.iter().any(|e| connects(e, &a.members, &b.members)) {
                continue;
            }
            let (la, lb) = (a.relation.len(), b.relation.len());
            let rank = (la.max(lb), la.min(lb), a.order, b.order);
            if best.as_ref().map_or(true, |(r, _)| rank < *r) {
                best = Some((rank, (i, j)));
            }
        }
    }
    best.map(|(_, pair)| pair)
}

/// Keeps the rows whose two columns hold identical text.
fn retain_equal(relation: Relation, a: &str, b: &str) -> Result<Relation> {
    let pa = relation.schema().resolve(a)?;
    let pb = relation.schema().resolve(b)?;
    let name = relation.name().to_string();
    let schema = relation.schema().clone();
    let rows = relation
        .into_rows()
        .into_iter()
        .filter(|t| t.get(pa) == t.get(pb))
        .collect();
    Ok(Relation::assemble(name, schema, rows))
}
