//! Geometric layout for the agent forest.
//!
//! A layout heuristic, not a force-directed solver: the same forest and
//! canvas always produce the same coordinates, which is what keeps the
//! picture stable across rebuilds. Children land in one of three polar
//! buckets depending on how many siblings they have.

use std::collections::{BTreeSet, VecDeque};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::hierarchy::AgentNode;
use crate::model::AgentId;

/// Canvas border no node center may cross.
const MARGIN: f64 = 40.0;
const MAIN_RADIUS: f64 = 32.0;
const BRANCH_RADIUS: f64 = 22.0;
/// Distance from a parent's center to each child's candidate center.
const CHILD_OFFSET: f64 = 140.0;
/// Ring radius when several main roots share the canvas.
const ROOT_RING_RADIUS: f64 = 180.0;
/// A lone main root sits this far left of the canvas center.
const ROOT_LEFT_SHIFT: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: AgentId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub selected: bool,
}

/// Connecting segment, clipped to the two circle boundaries rather than
/// running center to center.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub from: AgentId,
    pub to: AgentId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
}

/// Compute renderable positions for every node in the forest.
///
/// Deterministic: traversal follows the forest's own ordering, so two calls
/// over the same projection and canvas agree exactly. A visited set guards
/// against residual duplicate ids in the input; a duplicate subtree is
/// skipped, never placed twice.
pub fn compute_layout(
    roots: &[AgentNode],
    current: Option<&AgentId>,
    width: f64,
    height: f64,
) -> Layout {
    let mut layout = Layout::default();
    let mut visited: BTreeSet<AgentId> = BTreeSet::new();

    // (node, center, direction the edge into this node was travelling)
    let mut worklist: VecDeque<(&AgentNode, (f64, f64), f64)> = VecDeque::new();

    let center = (width / 2.0, height / 2.0);
    if roots.len() == 1 {
        let pos = clamp_point((center.0 - ROOT_LEFT_SHIFT, center.1), width, height);
        worklist.push_back((&roots[0], pos, 0.0));
    } else {
        for (i, root) in roots.iter().enumerate() {
            let angle = -FRAC_PI_2 + i as f64 * TAU / roots.len() as f64;
            let pos = clamp_point(
                (
                    center.0 + ROOT_RING_RADIUS * angle.cos(),
                    center.1 + ROOT_RING_RADIUS * angle.sin(),
                ),
                width,
                height,
            );
            worklist.push_back((root, pos, angle));
        }
    }

    while let Some((node, (x, y), incoming)) = worklist.pop_front() {
        if !visited.insert(node.agent.id.clone()) {
            continue;
        }

        let radius = node_radius(node);
        layout.nodes.push(NodeLayout {
            id: node.agent.id.clone(),
            x,
            y,
            radius,
            selected: current == Some(&node.agent.id),
        });

        for (i, child) in node.children.iter().enumerate() {
            let angle = child_angle(incoming, i, node.children.len());
            let candidate = (x + CHILD_OFFSET * angle.cos(), y + CHILD_OFFSET * angle.sin());
            let child_pos = clamp_point(candidate, width, height);

            if let Some(edge) = boundary_edge(node, (x, y), radius, child, child_pos) {
                layout.edges.push(edge);
            }
            worklist.push_back((child, child_pos, angle));
        }
    }

    layout
}

fn node_radius(node: &AgentNode) -> f64 {
    if node.agent.is_main() {
        MAIN_RADIUS
    } else {
        BRANCH_RADIUS
    }
}

/// Polar bucket for the i-th of n siblings:
/// one child continues straight along the incoming direction; 2-4 fan across
/// a half circle centered on it; more than 4 wrap the full circle.
fn child_angle(incoming: f64, i: usize, n: usize) -> f64 {
    match n {
        0 | 1 => incoming,
        2..=4 => incoming - FRAC_PI_2 + i as f64 * PI / (n - 1) as f64,
        _ => incoming + i as f64 * TAU / n as f64,
    }
}

fn clamp_point((x, y): (f64, f64), width: f64, height: f64) -> (f64, f64) {
    (
        x.min(width - MARGIN).max(MARGIN),
        y.min(height - MARGIN).max(MARGIN),
    )
}

/// Segment from the parent circle's boundary to the child circle's boundary,
/// along the unit vector between centers. `None` when the centers coincide
/// (clamping can collapse them on a degenerate canvas).
fn boundary_edge(
    parent: &AgentNode,
    (px, py): (f64, f64),
    parent_radius: f64,
    child: &AgentNode,
    (cx, cy): (f64, f64),
) -> Option<EdgeLayout> {
    let dx = cx - px;
    let dy = cy - py;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= f64::EPSILON {
        return None;
    }
    let (ux, uy) = (dx / dist, dy / dist);
    let child_radius = node_radius(child);

    Some(EdgeLayout {
        from: parent.agent.id.clone(),
        to: child.agent.id.clone(),
        x1: px + ux * parent_radius,
        y1: py + uy * parent_radius,
        x2: cx - ux * child_radius,
        y2: cy - uy * child_radius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Agent, AgentType, ContextData};
    use chrono::Utc;

    fn node(id: &str, main: bool, children: Vec<AgentNode>) -> AgentNode {
        let agent = Agent {
            id: id.into(),
            session_id: "s1".into(),
            parent_id: None,
            agent_type: if main { AgentType::Main } else { AgentType::Branch },
            topic: id.to_string(),
            context_data: ContextData::new(),
            stack_depth: 0,
            status: crate::model::AgentStatus::Active,
            created_at: Utc::now(),
        };
        AgentNode {
            agent,
            children,
            message_count: 0,
            last_activity: Utc::now(),
        }
    }

    fn find<'a>(layout: &'a Layout, id: &str) -> &'a NodeLayout {
        layout
            .nodes
            .iter()
            .find(|n| n.id.as_str() == id)
            .expect("node placed")
    }

    #[test]
    fn single_main_root_sits_left_of_center() {
        let roots = vec![node("root", true, vec![])];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        let root = find(&layout, "root");
        assert!(root.x < 400.0);
        assert_eq!(root.y, 300.0);
        assert_eq!(root.radius, MAIN_RADIUS);
    }

    #[test]
    fn multiple_main_roots_ring_the_center() {
        let roots = vec![
            node("r1", true, vec![]),
            node("r2", true, vec![]),
            node("r3", true, vec![]),
        ];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        assert_eq!(layout.nodes.len(), 3);
        let positions: Vec<_> = layout.nodes.iter().map(|n| (n.x, n.y)).collect();
        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        // all at the ring distance from the canvas center (no clamping here)
        for (x, y) in positions {
            let d = ((x - 400.0).powi(2) + (y - 300.0).powi(2)).sqrt();
            assert!((d - ROOT_RING_RADIUS).abs() < 1e-9);
        }
    }

    #[test]
    fn branch_nodes_get_the_smaller_radius() {
        let roots = vec![node("root", true, vec![node("b", false, vec![])])];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        assert_eq!(find(&layout, "b").radius, BRANCH_RADIUS);
    }

    #[test]
    fn single_child_continues_along_incoming_direction() {
        let roots = vec![node("root", true, vec![node("only", false, vec![])])];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        let root = find(&layout, "root");
        let child = find(&layout, "only");
        // single root's incoming direction points right
        assert!((child.x - (root.x + CHILD_OFFSET)).abs() < 1e-9);
        assert!((child.y - root.y).abs() < 1e-9);
    }

    #[test]
    fn three_children_fan_across_half_circle() {
        let children = vec![
            node("c1", false, vec![]),
            node("c2", false, vec![]),
            node("c3", false, vec![]),
        ];
        let roots = vec![node("root", true, children)];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        let root = find(&layout, "root");
        let c1 = find(&layout, "c1");
        let c2 = find(&layout, "c2");
        let c3 = find(&layout, "c3");

        // middle child straight ahead, outer two perpendicular
        assert!((c2.x - (root.x + CHILD_OFFSET)).abs() < 1e-9);
        assert!((c1.y - (root.y - CHILD_OFFSET)).abs() < 1e-9);
        assert!((c3.y - (root.y + CHILD_OFFSET)).abs() < 1e-9);
    }

    #[test]
    fn six_children_wrap_the_full_circle_with_distinct_positions() {
        let children: Vec<_> = (0..6)
            .map(|i| node(&format!("c{i}"), false, vec![]))
            .collect();
        let roots = vec![node("root", true, children)];
        let layout = compute_layout(&roots, None, 2000.0, 2000.0);

        let positions: Vec<_> = layout
            .nodes
            .iter()
            .filter(|n| n.id.as_str() != "root")
            .map(|n| (n.x, n.y))
            .collect();
        assert_eq!(positions.len(), 6);
        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                assert!((a.0 - b.0).abs() > 1e-9 || (a.1 - b.1).abs() > 1e-9);
            }
        }
    }

    #[test]
    fn coordinates_stay_inside_margins() {
        // deep chain pointed at the right edge forces clamping
        let mut tree = node("leaf", false, vec![]);
        for i in 0..8 {
            tree = node(&format!("n{i}"), false, vec![tree]);
        }
        let roots = vec![node("root", true, vec![tree])];
        let layout = compute_layout(&roots, None, 400.0, 300.0);

        for n in &layout.nodes {
            assert!(n.x >= MARGIN && n.x <= 400.0 - MARGIN, "x out of range: {}", n.x);
            assert!(n.y >= MARGIN && n.y <= 300.0 - MARGIN, "y out of range: {}", n.y);
        }
    }

    #[test]
    fn edges_run_boundary_to_boundary() {
        let roots = vec![node("root", true, vec![node("b", false, vec![])])];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        let root = find(&layout, "root");
        let child = find(&layout, "b");
        let edge = &layout.edges[0];

        let from_parent = ((edge.x1 - root.x).powi(2) + (edge.y1 - root.y).powi(2)).sqrt();
        let from_child = ((edge.x2 - child.x).powi(2) + (edge.y2 - child.y).powi(2)).sqrt();
        assert!((from_parent - root.radius).abs() < 1e-9);
        assert!((from_child - child.radius).abs() < 1e-9);
    }

    #[test]
    fn selected_flag_follows_current_id() {
        let roots = vec![node("root", true, vec![node("b", false, vec![])])];
        let current = AgentId::new("b");
        let layout = compute_layout(&roots, Some(&current), 800.0, 600.0);

        assert!(!find(&layout, "root").selected);
        assert!(find(&layout, "b").selected);
    }

    #[test]
    fn layout_is_deterministic() {
        let children: Vec<_> = (0..5)
            .map(|i| node(&format!("c{i}"), false, vec![]))
            .collect();
        let roots = vec![node("root", true, children)];

        let first = compute_layout(&roots, None, 800.0, 600.0);
        let second = compute_layout(&roots, None, 800.0, 600.0);

        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_ids_are_placed_once() {
        let roots = vec![
            node("dup", true, vec![]),
            node("dup", true, vec![]),
            node("other", true, vec![]),
        ];
        let layout = compute_layout(&roots, None, 800.0, 600.0);

        let dups = layout.nodes.iter().filter(|n| n.id.as_str() == "dup").count();
        assert_eq!(dups, 1);
        assert_eq!(layout.nodes.len(), 2);
    }
}
