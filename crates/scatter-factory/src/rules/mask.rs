use scatter_graph::Route;

use super::{color, enum_index, enum_socket, inverted, seed_trigger, socket, COLOR_SAMPLE_METHODS};
use crate::Rule;

const MASK_METHODS: &[&str] = &["none", "mask_vg", "mask_vcol", "mask_bitmap", "mask_noise"];

/// Features carrying their own universal mask.
const UMASK_FEATURES: &[&str] = &[
    "s_scale_random",
    "s_scale_shrink",
    "s_scale_grow",
    "s_scale_mirror",
    "s_rot_random",
    "s_rot_add",
    "s_pattern1",
    "s_pattern2",
    "s_pattern3",
    "s_ecosystem_affinity",
    "s_ecosystem_repulsion",
];

/// Feature masks: (feature, label, route, pointer property, pointer socket, revert socket).
const FEATURE_MASKS: &[(&str, &str, Route, &str, usize, usize)] = &[
    ("s_mask_vg", "Vg Mask", Route::Float, "ptr", 2, 3),
    ("s_mask_vcol", "Vcol Mask", Route::Float, "ptr", 2, 3),
    ("s_mask_bitmap", "Img Mask", Route::Geo, "ptr", 3, 4),
    ("s_mask_material", "Mat Mask", Route::Float, "ptr", 2, 3),
    ("s_mask_curve", "Cur Mask", Route::Geo, "ptr", 1, 2),
    ("s_mask_boolvol", "Bool Mask", Route::Geo, "coll_ptr", 1, 2),
    ("s_mask_upward", "Up Mask", Route::Geo, "coll_ptr", 1, 2),
];

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![Rule::new("s_mask_master_allow", |ctx, change| {
        let enabled = change.bool()?;
        let ops = ctx.graph(&change.entity)?;
        for (feature, ..) in FEATURE_MASKS {
            ops.mute(feature, !enabled)?;
        }
        Ok(())
    })];

    for &(feature, label, route, ptr, ptr_index, revert_index) in FEATURE_MASKS {
        rules.push(Rule::new(format!("{}_allow", feature), move |ctx, change| {
            ctx.graph(&change.entity)?
                .toggle_feature(label, feature, &[route], change.bool()?)?;
            Ok(())
        }));
        rules.push(socket(&format!("{}_{}", feature, ptr), feature, ptr_index));
        // the bitmap node samples the inverse
        if feature == "s_mask_bitmap" {
            rules.push(inverted(&format!("{}_revert", feature), feature, revert_index));
        } else {
            rules.push(socket(&format!("{}_revert", feature), feature, revert_index));
        }
    }

    rules.extend([
        enum_socket("s_mask_vcol_color_sample_method", "s_mask_vcol", 4, COLOR_SAMPLE_METHODS),
        color("s_mask_vcol_id_color_ptr", "s_mask_vcol", 5),
        socket("s_mask_bitmap_uv_ptr", "s_mask_bitmap", 2),
        enum_socket("s_mask_bitmap_color_sample_method", "s_mask_bitmap", 5, COLOR_SAMPLE_METHODS),
        color("s_mask_bitmap_id_color_ptr", "s_mask_bitmap", 6),
    ]);

    for feature in UMASK_FEATURES {
        rules.extend(umask_rules(feature));
    }
    rules
}

fn umask_socket(name: String, node: String, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .set_input(&node, index, change.value.clone())?;
        Ok(())
    })
}

/// The `<feature>_mask_*` family driving the `<feature>.umask` node.
pub fn umask_rules(feature: &str) -> Vec<Rule> {
    let node = format!("{}.umask", feature);
    let prop = |suffix: &str| format!("{}_mask_{}", feature, suffix);
    let method_prop = prop("method");

    vec![
        {
            let node = node.clone();
            Rule::new(prop("allow"), move |ctx, change| {
                let index = if change.bool()? {
                    let method = ctx.read_str(&change.entity, &method_prop);
                    enum_index(&method_prop, MASK_METHODS, &method)
                } else {
                    0
                };
                ctx.graph(&change.entity)?.set_input(&node, 3, index)?;
                Ok(())
            })
        },
        umask_socket(prop("ptr"), node.clone(), 1),
        umask_socket(prop("reverse"), node.clone(), 2),
        {
            let node = node.clone();
            Rule::new(prop("method"), move |ctx, change| {
                let index = enum_index(change.property.as_str(), MASK_METHODS, change.text()?);
                ctx.graph(&change.entity)?.set_input(&node, 3, index)?;
                Ok(())
            })
        },
        {
            let node = node.clone();
            Rule::new(prop("color_sample_method"), move |ctx, change| {
                let index =
                    enum_index(change.property.as_str(), COLOR_SAMPLE_METHODS, change.text()?);
                ctx.graph(&change.entity)?.set_input(&node, 4, index)?;
                Ok(())
            })
        },
        {
            let node = node.clone();
            Rule::new(prop("id_color_ptr"), move |ctx, change| {
                ctx.graph(&change.entity)?
                    .set_input(&node, 5, change.rgba()?)?;
                Ok(())
            })
        },
        umask_socket(prop("noise_scale"), node.clone(), 7).slider(),
        umask_socket(prop("noise_seed"), node.clone(), 8),
        umask_socket(prop("noise_brightness"), node.clone(), 9).slider(),
        umask_socket(prop("noise_contrast"), node.clone(), 10).slider(),
        umask_socket(prop("bitmap_ptr"), node.clone(), 11),
        umask_socket(prop("bitmap_uv_ptr"), node.clone(), 12),
        {
            let node = node.clone();
            Rule::new(prop("noise_space"), move |ctx, change| {
                ctx.graph(&change.entity)?
                    .set_input(&node, 13, change.text()? == "local")?;
                Ok(())
            })
        },
        seed_trigger(prop("noise_is_random_seed"), prop("noise_seed")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_umask_family() {
        let rules = umask_rules("s_scale_random");
        let names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), 14);
        assert!(names.contains(&"s_scale_random_mask_allow"));
        assert!(names.contains(&"s_scale_random_mask_noise_is_random_seed"));
        assert!(rules
            .iter()
            .find(|r| r.name() == "s_scale_random_mask_noise_scale")
            .is_some_and(|r| r.options().delayed));
    }
}
