//! The built-in scatter rule table, one module per feature family.
//!
//! Every rule receives the new value and translates it into graph edits on
//! the owning entity: socket writes, router links, mutes and highlights.

use tracing::{error, warn};

use scatter_core::{Entity, Result};
use scatter_graph::{GraphOps, Route};

use crate::{HandlerContext, Rule};

mod beginner;
mod camera;
mod display;
mod distribution;
mod ecosystem;
mod group;
mod instances;
mod mask;
mod pattern;
mod rotation;
mod scale;
mod seeds;
mod surface;
mod visibility;

pub use mask::umask_rules;
pub use seeds::seed_trigger;

/// Color channel sampling modes shared by masks and patterns.
pub(crate) const COLOR_SAMPLE_METHODS: &[&str] = &[
    "id_picker",
    "id_greyscale",
    "id_red",
    "id_green",
    "id_blue",
    "id_black",
    "id_white",
    "id_saturation",
    "id_value",
    "id_hue",
    "id_lightness",
    "id_alpha",
];

pub fn standard_rules() -> Vec<Rule> {
    [
        visibility::rules(),
        surface::rules(),
        distribution::rules(),
        mask::rules(),
        scale::rules(),
        rotation::rules(),
        pattern::rules(),
        ecosystem::rules(),
        instances::rules(),
        camera::rules(),
        display::rules(),
        group::rules(),
        beginner::rules(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Socket integer of an enum item. Unknown items log and map to 0.
pub fn enum_index(property: &str, items: &[&str], value: &str) -> i64 {
    match items.iter().position(|item| *item == value) {
        Some(i) => i as i64,
        None => {
            error!(property, value, "unknown enum item");
            0
        }
    }
}

/// Raw value into one input socket.
pub(crate) fn socket(name: &str, node: &'static str, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .set_input(node, index, change.value.clone())?;
        Ok(())
    })
}

/// Same as [`socket`], for slider values.
pub(crate) fn slider(name: &str, node: &'static str, index: usize) -> Rule {
    socket(name, node, index).slider()
}

/// Percentage slider stored as a 0-1 factor.
pub(crate) fn percent(name: &str, node: &'static str, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .set_input(node, index, change.float()? / 100.0)?;
        Ok(())
    })
    .slider()
}

pub(crate) fn inverted(name: &str, node: &'static str, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .set_input(node, index, !change.bool()?)?;
        Ok(())
    })
}

pub(crate) fn color(name: &str, node: &'static str, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .set_input(node, index, change.rgba()?)?;
        Ok(())
    })
}

pub(crate) fn enum_socket(
    name: &str,
    node: &'static str,
    index: usize,
    items: &'static [&'static str],
) -> Rule {
    Rule::new(name, move |ctx, change| {
        let value = enum_index(change.property.as_str(), items, change.text()?);
        ctx.graph(&change.entity)?.set_input(node, index, value)?;
        Ok(())
    })
}

/// Feature switch: highlight its frame and plug the routers.
pub(crate) fn toggle(
    name: &str,
    label: &'static str,
    feature: &'static str,
    routes: &'static [Route],
) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .toggle_feature(label, feature, routes, change.bool()?)?;
        Ok(())
    })
}

/// Feature switch whose graph consumes the active camera.
pub(crate) fn camera_toggle(
    name: &str,
    label: &'static str,
    feature: &'static str,
    routes: &'static [Route],
) -> Rule {
    Rule::new(name, move |ctx, change| {
        let enabled = change.bool()?;
        ctx.graph(&change.entity)?
            .toggle_feature(label, feature, routes, enabled)?;
        if enabled {
            ctx.refresh_camera();
        }
        Ok(())
    })
}

/// Run `f` on the graph of every member of `group`. A failing member does
/// not stop the others; the last error is returned.
pub(crate) fn for_members<F>(ctx: &HandlerContext<'_>, group: &Entity, mut f: F) -> Result<()>
where
    F: FnMut(&GraphOps<'_>) -> Result<()>,
{
    let mut outcome = Ok(());
    for member in ctx.group_members(group) {
        if let Err(e) = ctx.graph(&member).and_then(|ops| f(&ops)) {
            warn!(group = %group.name, member = %member.name, error = %e, "group member update failed");
            outcome = Err(e);
        }
    }
    outcome
}
