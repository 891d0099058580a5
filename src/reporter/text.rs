use std::io::{self, Write};

use super::RankView;
use crate::component::Category;
use crate::graph::Node;
use crate::registry::HashRegistry;
use crate::settings::Settings;

fn format_value(raw: f64, category: Category, settings: &Settings, unit: &str) -> String {
    let (scaled, unit) = match category {
        Category::Timing => (raw * settings.timing_units.scale(), settings.timing_units.label()),
        Category::Memory => (raw * settings.memory_units.scale(), settings.memory_units.label()),
        Category::Percent => (raw * 100.0, "%"),
        Category::Other => (raw, unit),
    };

    if settings.scientific {
        format!(
            "{:width$.precision$e} {unit}",
            scaled,
            width = settings.width,
            precision = settings.precision
        )
    } else {
        format!(
            "{:width$.precision$} {unit}",
            scaled,
            width = settings.width,
            precision = settings.precision
        )
    }
}

fn label_for(hash: u64, registry: &HashRegistry) -> String {
    registry.label_of(hash).unwrap_or_else(|| format!("<{hash:#x}>"))
}

fn write_node(
    out: &mut dyn Write,
    node: &Node,
    registry: &HashRegistry,
    settings: &Settings,
    min_value: f64,
) -> io::Result<()> {
    let value = node.data().record();
    if value < min_value {
        return Ok(());
    }
    let indent = "  ".repeat(node.depth().saturating_sub(1));
    let label = label_for(node.hash(), registry);
    let rendered = format_value(node.data().accum(), node.data().category(), settings, node.data().unit());
    writeln!(out, "{indent}|_{label} : {rendered} (laps={})", node.laps())
}

pub(super) fn write(
    out: &mut dyn Write,
    ranks: &[RankView<'_>],
    registry: &HashRegistry,
    settings: &Settings,
    min_value: f64,
) -> io::Result<()> {
    for rank in ranks {
        writeln!(out, "> rank {}:", rank.tid)?;
        let mut write_err = None;
        rank.graph.walk(|_, node| {
            if write_err.is_some() {
                return;
            }
            if let Err(e) = write_node(out, node, registry, settings, min_value) {
                write_err = Some(e);
            }
        });
        if let Some(e) = write_err {
            return Err(e);
        }
    }
    Ok(())
}
