use scatter_graph::Route;

use super::{camera_toggle, enum_index, seed_trigger, slider, socket, toggle};
use crate::Rule;

const ALIGN_Z_METHODS: &[&str] = &[
    "meth_align_z_normal",
    "meth_align_z_local",
    "meth_align_z_global",
    "meth_align_z_origin",
    "meth_align_z_camera",
    "meth_align_z_random",
    "meth_align_z_object",
];

const ALIGN_Y_METHODS: &[&str] = &[
    "meth_align_y_downslope",
    "meth_align_y_local",
    "meth_align_y_global",
    "meth_align_y_boundary",
    "meth_align_y_camera",
    "meth_align_y_random",
    "meth_align_y_origin",
    "meth_align_y_object",
];

/// Alignment method selector. Camera based methods need the camera pushed in.
fn align_method(name: &'static str, node: &'static str, items: &'static [&'static str]) -> Rule {
    Rule::new(name, move |ctx, change| {
        let method = change.text()?;
        ctx.graph(&change.entity)?
            .set_input(node, 5, enum_index(name, items, method))?;
        if method.contains("camera") {
            ctx.refresh_camera();
        }
        Ok(())
    })
}

pub(super) fn rules() -> Vec<Rule> {
    const VEC: &[Route] = &[Route::Vec];
    vec![
        // align normal
        camera_toggle("s_rot_align_z_allow", "Align Normal", "s_rot_align_z", VEC),
        align_method("s_rot_align_z_method", "s_rot_align_z", ALIGN_Z_METHODS),
        socket("s_rot_align_z_revert", "s_rot_align_z", 6),
        socket("s_rot_align_z_influence_allow", "s_rot_align_z", 7),
        slider("s_rot_align_z_influence_value", "s_rot_align_z", 8),
        // align tangent
        camera_toggle("s_rot_align_y_allow", "Align Tangent", "s_rot_align_y", VEC),
        align_method("s_rot_align_y_method", "s_rot_align_y", ALIGN_Y_METHODS),
        // random
        toggle("s_rot_random_allow", "Random Rotation", "s_rot_random", VEC),
        slider("s_rot_random_tilt_value", "s_rot_random", 1),
        slider("s_rot_random_yaw_value", "s_rot_random", 2),
        socket("s_rot_random_seed", "s_rot_random", 3),
        seed_trigger("s_rot_random_is_random_seed", "s_rot_random_seed"),
        // add
        toggle("s_rot_add_allow", "Rotate", "s_rot_add", VEC),
        slider("s_rot_add_default", "s_rot_add", 1),
        slider("s_rot_add_random", "s_rot_add", 2),
        socket("s_rot_add_seed", "s_rot_add", 3),
        socket("s_rot_add_snap", "s_rot_add", 4),
        seed_trigger("s_rot_add_is_random_seed", "s_rot_add_seed"),
    ]
}
