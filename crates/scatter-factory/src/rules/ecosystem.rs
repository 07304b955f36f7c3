use scatter_core::Value;
use scatter_graph::Route;

use super::enum_index;
use crate::Rule;

const SLOTS: usize = 3;

const SLOT_TYPES: &[&str] = &["by_distance", "by_range"];

fn slot(kind: &str, i: u8) -> String {
    format!("s_ecosystem_{}.slot{}", kind, i)
}

fn slot_socket(kind: &'static str, suffix: &str, index: usize) -> Rule {
    Rule::indexed(
        format!("s_ecosystem_{}_XX_{}", kind, suffix),
        SLOTS,
        move |ctx, change, i| {
            ctx.graph(&change.entity)?
                .set_input(&slot(kind, i), index, change.value.clone())?;
            Ok(())
        },
    )
    .slider()
}

fn kind_rules(kind: &'static str, label: &'static str) -> Vec<Rule> {
    let feature = format!("s_ecosystem_{}", kind);
    let mut rules = vec![
        {
            let feature = feature.clone();
            Rule::new(format!("{}_allow", feature), move |ctx, change| {
                ctx.graph(&change.entity)?.toggle_feature(
                    label,
                    &feature,
                    &[Route::Vec, Route::Geo],
                    change.bool()?,
                )?;
                Ok(())
            })
        },
        {
            let node = format!("{}.use_global", feature);
            Rule::new(format!("{}_space", feature), move |ctx, change| {
                ctx.graph(&change.entity)?
                    .set_constant(&node, change.text()? == "global")?;
                Ok(())
            })
        },
        // Pointer to another scatter system, resolved by name.
        Rule::indexed(format!("{}_XX_ptr", feature), SLOTS, move |ctx, change, i| {
            let target = change
                .text()
                .ok()
                .filter(|name| !name.is_empty())
                .and_then(|name| ctx.host().entity(name));
            let ops = ctx.graph(&change.entity)?;
            let node = slot(kind, i);
            let value = match &target {
                Some(t) => Value::Text(t.name.clone()),
                None => Value::None,
            };
            ops.set_input(&node, 2, value)?;
            ops.mute(&node, target.is_none())?;
            Ok(())
        }),
        Rule::indexed(format!("{}_XX_type", feature), SLOTS, move |ctx, change, i| {
            let index = enum_index(change.property.as_str(), SLOT_TYPES, change.text()?);
            ctx.graph(&change.entity)?.set_input(&slot(kind, i), 3, index)?;
            Ok(())
        }),
        slot_socket(kind, "max_value", 4),
        slot_socket(kind, "max_falloff", 5),
    ];
    if kind == "affinity" {
        rules.push(slot_socket(kind, "limit_distance", 6));
    }
    rules
}

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = kind_rules("affinity", "Eco Affinity");
    rules.extend(kind_rules("repulsion", "Eco Repulsion"));
    rules
}
