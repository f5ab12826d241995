// ── Spring-embedder layout ──
//
// Deterministic visual heuristic, not a solver: a fixed number of
// refinement iterations over an initial circular placement. The only
// hard requirement is that every position stays inside the canvas
// margins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Canvas, LayoutConfig};
use crate::model::{Connection, Device, DeviceId, Position};

const INTEGRATION_STEP: f64 = 0.1;
const RING_RADIUS_FACTOR: f64 = 0.35;

/// Assigns 2-D presentation coordinates to devices.
pub struct LayoutEngine {
    canvas: Canvas,
    config: LayoutConfig,
}

struct Node {
    id: DeviceId,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

impl LayoutEngine {
    pub fn new(canvas: Canvas, config: LayoutConfig) -> Self {
        Self { canvas, config }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Compute positions for the given devices and connections.
    ///
    /// Initial placement centers the coordinator (if any) and spreads
    /// the rest evenly on a ring; refinement applies pairwise repulsion
    /// `k²/d`, per-edge attraction `d²/k` with `k = sqrt(area / n)`,
    /// damped velocity integration, and a bounds clamp every iteration.
    pub fn layout(
        &self,
        devices: &[Arc<Device>],
        connections: &[Arc<Connection>],
    ) -> Vec<(DeviceId, Position)> {
        if devices.is_empty() {
            return Vec::new();
        }

        let mut nodes = self.initial_placement(devices);
        let index: HashMap<DeviceId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let edges: Vec<(usize, usize)> = connections
            .iter()
            .filter_map(|c| Some((*index.get(&c.from)?, *index.get(&c.to)?)))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let k = (self.canvas.area() / nodes.len() as f64).sqrt();

        for _ in 0..self.config.iterations {
            self.step(&mut nodes, &edges, k);
        }

        nodes
            .into_iter()
            .map(|n| (n.id, Position { x: n.x, y: n.y }))
            .collect()
    }

    fn initial_placement(&self, devices: &[Arc<Device>]) -> Vec<Node> {
        let cx = self.canvas.width / 2.0;
        let cy = self.canvas.height / 2.0;
        let radius = RING_RADIUS_FACTOR * self.canvas.width.min(self.canvas.height);

        let coordinator = devices.iter().position(|d| d.coordinator);
        let ring_count = match coordinator {
            Some(_) => devices.len().saturating_sub(1),
            None => devices.len(),
        };

        let mut nodes = Vec::with_capacity(devices.len());
        let mut ring_slot = 0usize;
        for (i, device) in devices.iter().enumerate() {
            let (x, y) = if Some(i) == coordinator {
                (cx, cy)
            } else {
                #[allow(clippy::cast_precision_loss)]
                let angle = std::f64::consts::TAU * ring_slot as f64 / ring_count.max(1) as f64;
                ring_slot += 1;
                (cx + radius * angle.cos(), cy + radius * angle.sin())
            };
            nodes.push(Node {
                id: device.id,
                x,
                y,
                vx: 0.0,
                vy: 0.0,
            });
        }
        nodes
    }

    fn step(&self, nodes: &mut [Node], edges: &[(usize, usize)], k: f64) {
        let repulsion = k * k;

        // Pairwise repulsion, magnitude k²/d.
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let dx = nodes[i].x - nodes[j].x;
                let dy = nodes[i].y - nodes[j].y;
                let distance = (dx * dx + dy * dy).sqrt().max(1.0);

                let force = repulsion / distance;
                let fx = dx / distance * force;
                let fy = dy / distance * force;

                nodes[i].vx += fx;
                nodes[i].vy += fy;
                nodes[j].vx -= fx;
                nodes[j].vy -= fy;
            }
        }

        // Attraction along edges, magnitude d²/k.
        for &(a, b) in edges {
            if a == b {
                continue;
            }
            let dx = nodes[b].x - nodes[a].x;
            let dy = nodes[b].y - nodes[a].y;
            let distance = (dx * dx + dy * dy).sqrt().max(1.0);

            let force = distance * distance / k;
            let fx = dx / distance * force;
            let fy = dy / distance * force;

            nodes[a].vx += fx;
            nodes[a].vy += fy;
            nodes[b].vx -= fx;
            nodes[b].vy -= fy;
        }

        // Integrate, damp, clamp. A canvas narrower than twice the
        // margin collapses that axis onto the margin line instead of
        // producing inverted clamp bounds.
        let margin = self.canvas.margin;
        let max_x = (self.canvas.width - margin).max(margin);
        let max_y = (self.canvas.height - margin).max(margin);
        for node in nodes.iter_mut() {
            node.x += node.vx * INTEGRATION_STEP;
            node.y += node.vy * INTEGRATION_STEP;
            node.vx *= self.config.damping;
            node.vy *= self.config.damping;
            node.x = node.x.clamp(margin, max_x);
            node.y = node.y.clamp(margin, max_y);
        }
    }
}
