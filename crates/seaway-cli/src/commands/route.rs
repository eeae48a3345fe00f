//! Route command handler for planning a path between two coordinates or ports.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use seaway_lib::{
    route, Coordinate, Graph, PortDirectory, RouteAlgorithm, RouteRequest, RouteSummary,
};

use crate::output::OutputFormat;

/// Search algorithm choice on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AlgorithmArg {
    #[default]
    AStar,
    Dijkstra,
}

impl From<AlgorithmArg> for RouteAlgorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::AStar => RouteAlgorithm::AStar,
            AlgorithmArg::Dijkstra => RouteAlgorithm::Dijkstra,
        }
    }
}

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    /// Start as `lat,lon` or a port name.
    pub from: String,
    /// Destination as `lat,lon` or a port name.
    pub to: String,
    pub algorithm: AlgorithmArg,
    pub coastal_threshold_km: f64,
    pub snap_radius_km: f64,
    pub max_expansions: Option<usize>,
    /// Port directory used to resolve names.
    pub ports: Option<PathBuf>,
}

/// A resolved endpoint and, when it came from the port directory, its name.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub coordinate: Coordinate,
    pub name: Option<String>,
}

/// Parse `lat,lon`, falling back to a port lookup.
pub fn parse_endpoint(value: &str, ports: Option<&PortDirectory>) -> Result<Endpoint> {
    if let Some((lat, lon)) = value.split_once(',') {
        if let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
            let coordinate = Coordinate::new(lat, lon)
                .with_context(|| format!("invalid coordinate '{}'", value))?;
            return Ok(Endpoint {
                coordinate,
                name: None,
            });
        }
    }

    let Some(ports) = ports else {
        bail!(
            "'{}' is not a lat,lon pair and no port directory was given (pass --ports)",
            value
        );
    };
    let coordinate = ports.resolve(value)?;
    Ok(Endpoint {
        coordinate,
        name: Some(value.trim().to_string()),
    })
}

impl RouteCommandArgs {
    /// Resolve both endpoints into a library request.
    pub fn to_request(&self) -> Result<(RouteRequest, Endpoint, Endpoint)> {
        let ports = match &self.ports {
            Some(path) => Some(
                PortDirectory::from_path(path)
                    .with_context(|| format!("failed to load ports from {}", path.display()))?,
            ),
            None => None,
        };
        let start = parse_endpoint(&self.from, ports.as_ref())?;
        let goal = parse_endpoint(&self.to, ports.as_ref())?;

        let request = RouteRequest::new(start.coordinate, goal.coordinate)
            .with_algorithm(self.algorithm.into())
            .with_coastal_threshold(self.coastal_threshold_km)
            .with_snap_radius(self.snap_radius_km)
            .with_max_expansions(self.max_expansions);
        Ok((request, start, goal))
    }
}

/// Plan a route against `graph` and print it in the requested format.
pub fn handle_route(graph: &Graph, args: &RouteCommandArgs, format: OutputFormat) -> Result<()> {
    let (request, start, goal) = args.to_request()?;
    let plan = route(graph, &request)
        .with_context(|| format!("failed to plan a route from {} to {}", args.from, args.to))?;
    let summary = RouteSummary::from_plan(&plan)?.with_names(start.name, goal.name);
    print!("{}", format.render_route(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_pairs() {
        let endpoint = parse_endpoint("51.95, 4.14", None).unwrap();
        assert_eq!(endpoint.coordinate, Coordinate { lat: 51.95, lon: 4.14 });
        assert!(endpoint.name.is_none());
        assert!(parse_endpoint("95.0,0.0", None).is_err());
    }

    #[test]
    fn falls_back_to_port_names() {
        let mut ports = PortDirectory::new();
        ports.insert("Rotterdam", Coordinate { lat: 51.95, lon: 4.14 });

        let endpoint = parse_endpoint("rotterdam", Some(&ports)).unwrap();
        assert_eq!(endpoint.coordinate.lat, 51.95);
        assert_eq!(endpoint.name.as_deref(), Some("rotterdam"));

        let error = parse_endpoint("Roterdam", Some(&ports)).unwrap_err();
        assert!(error.to_string().contains("Did you mean 'Rotterdam'?"));
        assert!(parse_endpoint("Rotterdam", None).is_err());
    }
}
