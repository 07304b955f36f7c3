use scatter_graph::Route;

use super::{camera_toggle, percent, seed_trigger, slider, socket, toggle};
use crate::Rule;

const FEATURES: &[&str] = &[
    "s_scale_default",
    "s_scale_random",
    "s_scale_shrink",
    "s_scale_grow",
    "s_scale_fading",
    "s_scale_mirror",
    "s_scale_min",
    "s_scale_clump",
    "s_scale_faces",
];

const VEC: &[Route] = &[Route::Vec];

fn fading_distance(name: &'static str, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        // per-camera distances are written by the camera cache
        if ctx.read_bool(&change.entity, "s_scale_fading_per_cam_data") {
            return Ok(());
        }
        ctx.graph(&change.entity)?
            .set_input("s_scale_fading", index, change.float()?)?;
        Ok(())
    })
    .slider()
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_scale_master_allow", |ctx, change| {
            let enabled = change.bool()?;
            let ops = ctx.graph(&change.entity)?;
            for feature in FEATURES {
                ops.mute(feature, !enabled)?;
            }
            Ok(())
        }),
        // default
        toggle("s_scale_default_allow", "Default Scale", "s_scale_default", VEC),
        Rule::new("s_scale_default_space", |ctx, change| {
            ctx.graph(&change.entity)?
                .set_input("s_scale_default", 2, change.text()? == "local")?;
            Ok(())
        }),
        slider("s_scale_default_value", "s_scale_default", 3),
        slider("s_scale_default_multiplier", "s_scale_default", 4),
        // random
        toggle("s_scale_random_allow", "Random Scale", "s_scale_random", VEC),
        Rule::new("s_scale_random_method", |ctx, change| {
            ctx.graph(&change.entity)?
                .set_input("s_scale_random", 1, change.text()? == "random_uniform")?;
            Ok(())
        }),
        slider("s_scale_random_factor", "s_scale_random", 2),
        percent("s_scale_random_probability", "s_scale_random", 3),
        socket("s_scale_random_seed", "s_scale_random", 4),
        seed_trigger("s_scale_random_is_random_seed", "s_scale_random_seed"),
        // shrink & grow
        toggle("s_scale_shrink_allow", "Shrink", "s_scale_shrink", VEC),
        slider("s_scale_shrink_factor", "s_scale_shrink", 1),
        toggle("s_scale_grow_allow", "Grow", "s_scale_grow", VEC),
        slider("s_scale_grow_factor", "s_scale_grow", 1),
        // fading
        camera_toggle("s_scale_fading_allow", "Scale Fading", "s_scale_fading", VEC),
        slider("s_scale_fading_factor", "s_scale_fading", 2),
        Rule::new("s_scale_fading_per_cam_data", |ctx, change| {
            if change.bool()? {
                ctx.refresh_camera();
                return Ok(());
            }
            let min = ctx.read_float(&change.entity, "s_scale_fading_distance_min");
            let max = ctx.read_float(&change.entity, "s_scale_fading_distance_max");
            let ops = ctx.graph(&change.entity)?;
            ops.set_input("s_scale_fading", 3, min)?;
            ops.set_input("s_scale_fading", 4, max)?;
            Ok(())
        }),
        fading_distance("s_scale_fading_distance_min", 3),
        fading_distance("s_scale_fading_distance_max", 4),
        Rule::new("s_scale_fading_fallremap_allow", |ctx, change| {
            let enabled = change.bool()?;
            let ops = ctx.graph(&change.entity)?;
            ops.mute("s_scale_fading.fallremap", !enabled)?;
            ops.mute("s_scale_fading.fallremap_revert", !enabled)?;
            Ok(())
        }),
        // mirror
        toggle("s_scale_mirror_allow", "Random Mirror", "s_scale_mirror", &[Route::Geo]),
        socket("s_scale_mirror_is_x", "s_scale_mirror", 1),
        socket("s_scale_mirror_is_y", "s_scale_mirror", 2),
        socket("s_scale_mirror_is_z", "s_scale_mirror", 3),
        socket("s_scale_mirror_seed", "s_scale_mirror", 4),
        seed_trigger("s_scale_mirror_is_random_seed", "s_scale_mirror_seed"),
        // min
        toggle("s_scale_min_allow", "Min Scale", "s_scale_min", &[Route::Vec, Route::Geo]),
        Rule::new("s_scale_min_method", |ctx, change| {
            ctx.graph(&change.entity)?
                .set_input("s_scale_min", 2, change.text()? == "s_scale_min_remove")?;
            Ok(())
        }),
        slider("s_scale_min_value", "s_scale_min", 3),
        // clump & faces
        toggle("s_scale_clump_allow", "Clump Scale", "s_scale_clump", VEC),
        slider("s_scale_clump_value", "s_scale_clump", 2),
        toggle("s_scale_faces_allow", "Face Scale", "s_scale_faces", VEC),
        slider("s_scale_faces_value", "s_scale_faces", 2),
    ]
}
