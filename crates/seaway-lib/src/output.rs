//! Route summaries for display and serialization.

use std::fmt::Write;

use serde::Serialize;

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::routing::{RouteAlgorithm, RoutePlan};

/// Presentation style for turning a [`RouteSummary`] into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRenderMode {
    PlainText,
    Markdown,
}

/// Endpoint of a planned route: what was asked for and where it snapped.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub requested: Coordinate,
    pub node: NodeId,
    pub snapped: Coordinate,
    /// Distance between the requested and snapped coordinates.
    pub snap_km: f64,
}

impl RouteEndpoint {
    fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.requested.to_string(),
        }
    }
}

/// Waypoint along a planned route.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteStep {
    pub index: usize,
    pub node: NodeId,
    pub coordinate: Coordinate,
    /// Length of the leg arriving at this step.
    pub leg_km: f64,
    pub cumulative_km: f64,
}

/// Structured representation of a planned route that consumers can serialise.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSummary {
    pub algorithm: RouteAlgorithm,
    pub hops: usize,
    pub total_km: f64,
    pub expanded: usize,
    pub start: RouteEndpoint,
    pub goal: RouteEndpoint,
    pub steps: Vec<RouteStep>,
}

impl RouteSummary {
    /// Convert a [`RoutePlan`] into a summary with per-leg distances.
    pub fn from_plan(plan: &RoutePlan) -> Result<Self> {
        let coordinates = &plan.path.coordinates;
        let (Some(&first), Some(&last)) = (coordinates.first(), coordinates.last()) else {
            return Err(Error::InvalidPath { start: plan.start });
        };

        let mut cumulative_km = 0.0;
        let steps = plan
            .path
            .nodes
            .iter()
            .zip(coordinates)
            .enumerate()
            .map(|(index, (&node, &coordinate))| {
                let leg_km = if index == 0 {
                    0.0
                } else {
                    coordinates[index - 1].distance_km(&coordinate)
                };
                cumulative_km += leg_km;
                RouteStep {
                    index,
                    node,
                    coordinate,
                    leg_km,
                    cumulative_km,
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            algorithm: plan.algorithm,
            hops: plan.hop_count(),
            total_km: plan.length_km(),
            expanded: plan.expanded,
            start: RouteEndpoint {
                name: None,
                requested: plan.requested_start,
                node: plan.start,
                snapped: first,
                snap_km: plan.requested_start.distance_km(&first),
            },
            goal: RouteEndpoint {
                name: None,
                requested: plan.requested_goal,
                node: plan.goal,
                snapped: last,
                snap_km: plan.requested_goal.distance_km(&last),
            },
            steps,
        })
    }

    /// Attach display names (port names) to the endpoints.
    pub fn with_names(mut self, start: Option<String>, goal: Option<String>) -> Self {
        self.start.name = start;
        self.goal.name = goal;
        self
    }

    /// Render the summary using the requested textual mode.
    pub fn render(&self, mode: RouteRenderMode) -> String {
        match mode {
            RouteRenderMode::PlainText => self.render_plain(),
            RouteRenderMode::Markdown => self.render_markdown(),
        }
    }

    fn render_plain(&self) -> String {
        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "Route: {} -> {} ({:.1} km, {} hops, algorithm: {})",
            self.start.display_name(),
            self.goal.display_name(),
            self.total_km,
            self.hops,
            self.algorithm
        );
        for endpoint in [&self.start, &self.goal] {
            if endpoint.snap_km > 0.0 {
                let _ = writeln!(
                    buffer,
                    "  snapped {} to {} ({:.1} km)",
                    endpoint.requested, endpoint.snapped, endpoint.snap_km
                );
            }
        }
        for step in &self.steps {
            let _ = writeln!(
                buffer,
                "{:>4}: {} {:>9.1} km",
                step.index, step.coordinate, step.cumulative_km
            );
        }
        buffer
    }

    fn render_markdown(&self) -> String {
        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "**Route** _{} to {}_ ({:.1} km, {} hops, algorithm: `{}`)",
            self.start.display_name(),
            self.goal.display_name(),
            self.total_km,
            self.hops,
            self.algorithm
        );
        let _ = writeln!(buffer);
        let _ = writeln!(buffer, "| # | lat | lon | leg km | total km |");
        let _ = writeln!(buffer, "|---|-----|-----|--------|----------|");
        for step in &self.steps {
            let _ = writeln!(
                buffer,
                "| {} | {:.3} | {:.3} | {:.1} | {:.1} |",
                step.index,
                step.coordinate.lat,
                step.coordinate.lon,
                step.leg_km,
                step.cumulative_km
            );
        }
        buffer
    }
}
