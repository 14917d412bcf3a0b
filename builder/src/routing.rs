//! Routing table mapping packages to their places in the compose tree.
//!
//! Each CDN-in-a-Box image copies a fixed file name out of its build context,
//! so every package role has one destination path relative to the compose
//! directory. [`CIAB_ROUTES`] lists those roles; [`plan_routes`] pairs each
//! rule with the artifact that satisfies it.

use crate::artifact::Artifact;
use crate::error::{BuilderError, Result};
use camino::Utf8Path;
use log::{error, warn};
use std::fmt;

/// Case-insensitive substring predicate over an artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPattern {
    contains: &'static str,
    excludes: &'static [&'static str],
}

impl MatchPattern {
    /// Matches names containing `needle`.
    ///
    /// `needle` must be lowercase; artifact names are lowercased before
    /// matching.
    #[must_use]
    pub const fn containing(needle: &'static str) -> Self {
        Self {
            contains: needle,
            excludes: &[],
        }
    }

    /// Additionally rejects names containing any of `excluded`.
    #[must_use]
    pub const fn excluding(self, excluded: &'static [&'static str]) -> Self {
        Self {
            contains: self.contains,
            excludes: excluded,
        }
    }

    /// The substring a matching name must contain.
    #[must_use]
    pub const fn needle(&self) -> &'static str {
        self.contains
    }

    /// Returns `true` if the lowercase `name` satisfies this pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.contains(self.contains) && !self.excludes.iter().any(|ex| name.contains(ex))
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}*", self.contains)
    }
}

/// Maps packages matching a pattern to a destination in the compose tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingRule {
    /// Human-readable package role.
    pub description: &'static str,
    /// Predicate selecting the package.
    pub pattern: MatchPattern,
    /// Whether the run fails when no package matches.
    pub required: bool,
    /// Destination relative to the compose directory.
    pub destination: &'static str,
}

impl RoutingRule {
    /// A rule whose package must be present.
    #[must_use]
    pub const fn required(
        description: &'static str,
        pattern: MatchPattern,
        destination: &'static str,
    ) -> Self {
        Self {
            description,
            pattern,
            required: true,
            destination,
        }
    }

    /// A rule whose package may be absent.
    #[must_use]
    pub const fn optional(
        description: &'static str,
        pattern: MatchPattern,
        destination: &'static str,
    ) -> Self {
        Self {
            description,
            pattern,
            required: false,
            destination,
        }
    }

    /// Returns `true` if `artifact` can be routed by this rule.
    ///
    /// Source packages never match.
    #[must_use]
    pub fn accepts(&self, artifact: &Artifact) -> bool {
        !artifact.is_source_package() && self.pattern.matches(artifact.name())
    }
}

/// Package placement expected by the CDN-in-a-Box compose files.
pub const CIAB_ROUTES: &[RoutingRule] = &[
    RoutingRule::required(
        "Apache Traffic Server",
        MatchPattern::containing("trafficserver"),
        "cache/trafficserver.rpm",
    ),
    RoutingRule::required(
        "t3c cache configuration",
        MatchPattern::containing("t3c"),
        "cache/t3c.rpm",
    ),
    RoutingRule::required(
        "Traffic Control health client",
        MatchPattern::containing("tc-health-client"),
        "health/tc-health-client.rpm",
    ),
    RoutingRule::required(
        "Traffic Monitor",
        MatchPattern::containing("traffic_monitor"),
        "traffic_monitor/traffic_monitor.rpm",
    ),
    RoutingRule::required(
        "Traffic Ops",
        MatchPattern::containing("traffic_ops").excluding(&["traffic_ops_ort"]),
        "traffic_ops/traffic_ops.rpm",
    ),
    RoutingRule::required(
        "Traffic Portal",
        MatchPattern::containing("traffic_portal").excluding(&["traffic_portal_v2"]),
        "traffic_portal/traffic_portal.rpm",
    ),
    RoutingRule::optional(
        "Traffic Portal v2",
        MatchPattern::containing("traffic_portal_v2"),
        "traffic_portal_v2/traffic_portal_v2.rpm",
    ),
    RoutingRule::required(
        "Traffic Router",
        MatchPattern::containing("traffic_router"),
        "traffic_router/traffic_router.rpm",
    ),
    RoutingRule::required(
        "Apache Tomcat",
        MatchPattern::containing("tomcat"),
        "traffic_router/tomcat.rpm",
    ),
    RoutingRule::required(
        "Traffic Stats",
        MatchPattern::containing("traffic_stats"),
        "traffic_stats/traffic_stats.rpm",
    ),
];

/// A rule paired with the artifact selected for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<'r> {
    /// The rule being satisfied.
    pub rule: &'r RoutingRule,
    /// The artifact chosen for the rule.
    pub artifact: Artifact,
    /// How many artifacts satisfied the rule in total.
    pub candidates: usize,
}

/// Result of matching every rule against the discovered artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePlan<'r> {
    /// Rules that found an artifact, in table order.
    pub routes: Vec<Route<'r>>,
    /// Optional rules that found nothing.
    pub unmatched_optional: Vec<&'r RoutingRule>,
}

/// Selects an artifact for every rule.
///
/// `artifacts` should already be in a stable order (see
/// [`crate::artifact::discover`]); the first acceptable artifact wins and a
/// warning lists the others. Nothing is copied here, so a missing package
/// fails the run before any destination is touched.
///
/// # Errors
///
/// Returns [`BuilderError::MissingArtifact`] for the first required rule with
/// no acceptable artifact. Every missing package is logged first.
pub fn plan_routes<'r>(
    artifacts: &[Artifact],
    rules: &'r [RoutingRule],
    destination_root: &Utf8Path,
) -> Result<RoutePlan<'r>> {
    let mut plan = RoutePlan::default();
    let mut missing = Vec::new();

    for rule in rules {
        let candidates: Vec<&Artifact> = artifacts.iter().filter(|a| rule.accepts(a)).collect();

        let Some(first) = candidates.first() else {
            if rule.required {
                missing.push(rule);
            } else {
                plan.unmatched_optional.push(rule);
            }
            continue;
        };

        if candidates.len() > 1 {
            let names: Vec<&str> = candidates.iter().map(|a| a.file_name()).collect();
            warn!(
                "{} packages match {} ({}); using {}",
                candidates.len(),
                rule.description,
                names.join(", "),
                first.file_name()
            );
        }

        plan.routes.push(Route {
            rule,
            artifact: (*first).clone(),
            candidates: candidates.len(),
        });
    }

    for rule in &missing {
        error!(
            "No package matching {} found for {}; it is required at {}",
            rule.pattern,
            rule.description,
            destination_root.join(rule.destination)
        );
    }

    match missing.first() {
        Some(rule) => Err(BuilderError::MissingArtifact {
            description: rule.description,
            pattern: rule.pattern.needle(),
            destination: destination_root.join(rule.destination),
        }),
        None => Ok(plan),
    }
}
