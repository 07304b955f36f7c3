//! Group features. A group's properties drive the graphs of all its members.

use scatter_core::{Result, Value};
use scatter_graph::Route;

use super::{enum_index, for_members, COLOR_SAMPLE_METHODS};
use crate::{PropertyChange, Rule};

type Convert = fn(&PropertyChange) -> Result<Value>;

fn raw(change: &PropertyChange) -> Result<Value> {
    Ok(change.value.clone())
}

fn negated(change: &PropertyChange) -> Result<Value> {
    Ok(Value::Bool(!change.bool()?))
}

fn percent(change: &PropertyChange) -> Result<Value> {
    Ok(Value::Float(change.float()? / 100.0))
}

fn rgba(change: &PropertyChange) -> Result<Value> {
    change.rgba()
}

fn color_sample(change: &PropertyChange) -> Result<Value> {
    Ok(Value::Int(enum_index(
        change.property.as_str(),
        COLOR_SAMPLE_METHODS,
        change.text()?,
    )))
}

fn member_socket(name: &str, node: &'static str, index: usize, convert: Convert) -> Rule {
    Rule::new(name, move |ctx, change| {
        let value = convert(change)?;
        for_members(ctx, &change.entity, |ops| {
            ops.set_input(node, index, value.clone())?;
            Ok(())
        })
    })
}

fn member_toggle(
    name: &str,
    label: &'static str,
    feature: &'static str,
    routes: &'static [Route],
) -> Rule {
    Rule::new(name, move |ctx, change| {
        let enabled = change.bool()?;
        for_members(ctx, &change.entity, |ops| {
            ops.toggle_feature(label, feature, routes, enabled)?;
            Ok(())
        })
    })
}

/// (feature, label, route, pointer property, pointer socket, revert socket, revert inverted)
const GROUP_MASKS: &[(&str, &str, Route, &str, usize, usize, bool)] = &[
    ("s_gr_mask_vg", "Vg Gr Mask", Route::Float, "ptr", 2, 3, false),
    ("s_gr_mask_vcol", "Vcol Gr Mask", Route::Float, "ptr", 2, 3, false),
    ("s_gr_mask_bitmap", "Img Gr Mask", Route::Geo, "ptr", 3, 4, true),
    ("s_gr_mask_material", "Mat Gr Mask", Route::Float, "ptr", 2, 3, false),
    ("s_gr_mask_curve", "Cur Gr Mask", Route::Geo, "ptr", 1, 2, false),
    ("s_gr_mask_boolvol", "Bool Gr Mask", Route::Geo, "coll_ptr", 1, 2, false),
    ("s_gr_mask_upward", "Up Gr Mask", Route::Geo, "coll_ptr", 1, 2, false),
];

const GROUP_NODES: &[&str] = &[
    "s_gr_mask_vg",
    "s_gr_mask_vcol",
    "s_gr_mask_bitmap",
    "s_gr_mask_material",
    "s_gr_mask_curve",
    "s_gr_mask_boolvol",
    "s_gr_mask_upward",
    "s_gr_scale_boost",
    "s_gr_pattern1",
];

const GROUP_TEXTURE: &str = "s_gr_pattern1.texture";

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = Vec::new();

    for &(feature, label, route, ptr, ptr_index, revert_index, invert) in GROUP_MASKS {
        let routes: &'static [Route] = match route {
            Route::Geo => &[Route::Geo],
            _ => &[Route::Float],
        };
        rules.push(member_toggle(&format!("{}_allow", feature), label, feature, routes));
        rules.push(member_socket(&format!("{}_{}", feature, ptr), feature, ptr_index, raw));
        let revert: Convert = if invert { negated } else { raw };
        rules.push(member_socket(&format!("{}_revert", feature), feature, revert_index, revert));
    }
    rules.extend([
        member_socket("s_gr_mask_vcol_color_sample_method", "s_gr_mask_vcol", 4, color_sample),
        member_socket("s_gr_mask_vcol_id_color_ptr", "s_gr_mask_vcol", 5, rgba),
        member_socket("s_gr_mask_bitmap_uv_ptr", "s_gr_mask_bitmap", 2, raw),
        member_socket("s_gr_mask_bitmap_color_sample_method", "s_gr_mask_bitmap", 5, color_sample),
        member_socket("s_gr_mask_bitmap_id_color_ptr", "s_gr_mask_bitmap", 6, rgba),
    ]);

    // scale boost
    rules.extend([
        member_toggle("s_gr_scale_boost_allow", "Group Scale", "s_gr_scale_boost", &[Route::Vec]),
        member_socket("s_gr_scale_boost_value", "s_gr_scale_boost", 1, raw).slider(),
        member_socket("s_gr_scale_boost_multiplier", "s_gr_scale_boost", 2, raw).slider(),
    ]);

    // pattern
    rules.extend([
        member_toggle(
            "s_gr_pattern1_allow",
            "Pattern1 Gr",
            "s_gr_pattern1",
            &[Route::Vec, Route::Geo],
        ),
        Rule::new("s_gr_pattern1_texture_ptr", |ctx, change| {
            let texture = change.text()?.to_string();
            for_members(ctx, &change.entity, |ops| {
                ops.set_texture(GROUP_TEXTURE, &texture)?;
                Ok(())
            })
        }),
        member_socket("s_gr_pattern1_color_sample_method", "s_gr_pattern1", 2, color_sample),
        member_socket("s_gr_pattern1_id_color_ptr", "s_gr_pattern1", 3, rgba),
        member_socket("s_gr_pattern1_id_color_tolerence", "s_gr_pattern1", 4, raw).slider(),
        member_socket("s_gr_pattern1_dist_infl_allow", "s_gr_pattern1", 5, raw),
        member_socket("s_gr_pattern1_dist_influence", "s_gr_pattern1", 6, percent).slider(),
        member_socket("s_gr_pattern1_dist_revert", "s_gr_pattern1", 7, raw),
        member_socket("s_gr_pattern1_scale_infl_allow", "s_gr_pattern1", 8, raw),
        member_socket("s_gr_pattern1_scale_influence", "s_gr_pattern1", 9, percent).slider(),
        member_socket("s_gr_pattern1_scale_revert", "s_gr_pattern1", 10, raw),
    ]);

    // Undo every group feature on a system that left its group.
    rules.push(Rule::new("s_disable_all_group_features", |ctx, change| {
        let ops = ctx.graph(&change.entity)?;
        for node in GROUP_NODES {
            ops.mute(node, true)?;
        }
        ops.set_texture(GROUP_TEXTURE, "")?;
        Ok(())
    }));
    rules
}
