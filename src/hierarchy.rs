//! Derived tree view over the flat agent directory.
//!
//! `project` is a pure function: same directory + log state in, structurally
//! identical forest out. Nothing here is cached on the agent records; any
//! structural change to the directory means a rebuild.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::{Agent, AgentId};
use crate::store::AgentStats;

/// An agent with resolved children and log aggregates. Never authoritative,
/// never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentNode {
    pub agent: Agent,
    pub children: Vec<AgentNode>,
    pub message_count: usize,
    pub last_activity: DateTime<Utc>,
}

/// Build the navigation forest from the flat directory.
///
/// Roots are agents without a parent. An agent whose `parent_id` points at a
/// missing record is treated as an orphaned root rather than dropped; the
/// directory's own invariants make that impossible, so seeing one is worth a
/// warning but never a crash. The same goes for parent chains that loop back
/// on themselves: no member of such a chain is reachable from any root, so
/// each one left unvisited after the root walk is promoted to a root itself.
///
/// Sibling order is two-tier: ids present in `recent` come first, in the
/// order `recent` gives them; everyone else follows by `created_at`
/// ascending, with the id as a final tie-break so the result is fully
/// deterministic.
pub fn project(
    agents: &[Agent],
    stats: &BTreeMap<AgentId, AgentStats>,
    recent: &[AgentId],
) -> Vec<AgentNode> {
    let known: BTreeMap<&AgentId, &Agent> = agents.iter().map(|a| (&a.id, a)).collect();

    let mut children_of: BTreeMap<&AgentId, Vec<&Agent>> = BTreeMap::new();
    let mut roots: Vec<&Agent> = Vec::new();

    for agent in agents {
        match &agent.parent_id {
            Some(parent_id) if known.contains_key(parent_id) => {
                children_of.entry(parent_id).or_default().push(agent);
            }
            Some(parent_id) => {
                warn!(agent = %agent.id, parent = %parent_id, "dangling parent, treating as root");
                roots.push(agent);
            }
            None => roots.push(agent),
        }
    }

    sort_siblings(&mut roots, recent);
    let mut visited: BTreeSet<AgentId> = BTreeSet::new();
    let mut forest: Vec<AgentNode> = roots
        .into_iter()
        .map(|root| build_node(root, &children_of, stats, recent, &mut visited))
        .collect();

    for agent in agents {
        if !visited.contains(&agent.id) {
            warn!(agent = %agent.id, "parent chain never reaches a root, treating as root");
            forest.push(build_node(agent, &children_of, stats, recent, &mut visited));
        }
    }
    forest
}

fn build_node(
    agent: &Agent,
    children_of: &BTreeMap<&AgentId, Vec<&Agent>>,
    stats: &BTreeMap<AgentId, AgentStats>,
    recent: &[AgentId],
    visited: &mut BTreeSet<AgentId>,
) -> AgentNode {
    visited.insert(agent.id.clone());

    let mut child_agents = children_of.get(&agent.id).cloned().unwrap_or_default();
    sort_siblings(&mut child_agents, recent);

    let mut children = Vec::with_capacity(child_agents.len());
    for child in child_agents {
        // a looping chain promoted to a root lists its own entry point as a
        // child again; skip anything already placed
        if visited.contains(&child.id) {
            continue;
        }
        children.push(build_node(child, children_of, stats, recent, visited));
    }

    let agent_stats = stats.get(&agent.id).cloned().unwrap_or_default();
    AgentNode {
        message_count: agent_stats.message_count,
        last_activity: agent_stats.last_activity.unwrap_or(agent.created_at),
        agent: agent.clone(),
        children,
    }
}

fn sort_siblings(siblings: &mut [&Agent], recent: &[AgentId]) {
    siblings.sort_by(|a, b| {
        let rank = |agent: &Agent| {
            recent
                .iter()
                .position(|id| *id == agent.id)
                .unwrap_or(usize::MAX)
        };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
