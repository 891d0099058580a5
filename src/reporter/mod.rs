//! The reporter: renders a (possibly merged) call-graph as text or
//! JSON, in depth-first pre-order.

mod json;
mod text;

use std::io::{self, Write};

use crate::graph::CallGraph;
use crate::registry::HashRegistry;
use crate::settings::Settings;

pub use json::Report as JsonReport;

/// One rendered rank (thread) in a report, built by walking a
/// [`CallGraph`] and resolving labels through the [`HashRegistry`].
pub(crate) struct RankView<'a> {
    pub tid: u64,
    pub graph: &'a CallGraph,
}

/// Writes a text report for `ranks` to `out`, honoring `settings`'
/// rendering knobs (precision, width, units, minimum-value filtering).
pub(crate) fn write_text(
    out: &mut dyn Write,
    ranks: &[RankView<'_>],
    registry: &HashRegistry,
    settings: &Settings,
    min_value: f64,
) -> io::Result<()> {
    text::write(out, ranks, registry, settings, min_value)
}

/// Builds the JSON-serializable mirror of a text report: the same
/// per-rank, depth-first tree, as plain structs instead of rendered lines.
#[cfg(feature = "json")]
pub(crate) fn build_json(ranks: &[RankView<'_>], registry: &HashRegistry) -> JsonReport {
    json::build(ranks, registry)
}
