use scatter_cache::{CAM_INFOS_NODE, CAM_VISIBILITY_NODES};
use scatter_core::{Result, Value};
use scatter_graph::{GraphOps, Route};

use super::camera_toggle;
use crate::Rule;

/// Write one socket on both camera culling nodes.
fn both(ops: &GraphOps<'_>, index: usize, value: &Value) -> Result<()> {
    for node in CAM_VISIBILITY_NODES {
        ops.set_input(node, index, value.clone())?;
    }
    Ok(())
}

fn culling(name: &'static str, index: usize, refresh: bool) -> Rule {
    Rule::new(name, move |ctx, change| {
        both(&ctx.graph(&change.entity)?, index, &change.value)?;
        if refresh && change.value.as_bool() == Some(true) {
            ctx.refresh_camera();
        }
        Ok(())
    })
}

/// Camera intrinsics written by hand when autofill is off.
fn intrinsic(name: &'static str, index: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        ctx.graph(&change.entity)?
            .set_input(CAM_INFOS_NODE, index, change.float()?)?;
        Ok(())
    })
    .slider()
}

fn intrinsic_pair(name: &'static str, x: usize, y: usize) -> Rule {
    Rule::new(name, move |ctx, change| {
        let v = change.vector()?;
        let ops = ctx.graph(&change.entity)?;
        ops.set_input(CAM_INFOS_NODE, x, v[0])?;
        ops.set_input(CAM_INFOS_NODE, y, v[1])?;
        Ok(())
    })
}

const INTRINSICS: [&str; 5] = [
    "s_visibility_camclip_cam_res_xy",
    "s_visibility_camclip_cam_shift_xy",
    "s_visibility_camclip_cam_lens",
    "s_visibility_camclip_cam_sensor_width",
    "s_visibility_camclip_cam_boost_xy",
];

pub(super) fn rules() -> Vec<Rule> {
    vec![
        camera_toggle(
            "s_visibility_cam_allow",
            "Camera Optimization",
            "s_visibility_cam",
            &[Route::Geo],
        ),
        culling("s_visibility_camclip_allow", 5, true),
        Rule::new("s_visibility_camclip_cam_autofill", |ctx, change| {
            if change.bool()? {
                ctx.refresh_camera();
                return Ok(());
            }
            for property in INTRINSICS {
                ctx.refresh_property(&change.entity, property)?;
            }
            // sensor fit back to auto
            ctx.graph(&change.entity)?.set_input(CAM_INFOS_NODE, 8, 0)?;
            Ok(())
        }),
        intrinsic("s_visibility_camclip_cam_lens", 1),
        intrinsic("s_visibility_camclip_cam_sensor_width", 0),
        intrinsic_pair("s_visibility_camclip_cam_res_xy", 4, 5),
        intrinsic_pair("s_visibility_camclip_cam_shift_xy", 2, 3),
        intrinsic_pair("s_visibility_camclip_cam_boost_xy", 6, 7),
        culling("s_visibility_camclip_proximity_allow", 6, false),
        culling("s_visibility_camclip_proximity_distance", 7, false).slider(),
        culling("s_visibility_camdist_allow", 8, true),
        culling("s_visibility_camdist_min", 9, false).slider(),
        culling("s_visibility_camdist_max", 10, false).slider(),
        Rule::new("s_visibility_camdist_fallremap_allow", |ctx, change| {
            ctx.graph(&change.entity)?
                .mute("s_visibility_cam.fallremap", !change.bool()?)?;
            Ok(())
        }),
        Rule::new("s_visibility_camdist_fallremap_revert", |ctx, change| {
            ctx.graph(&change.entity)?
                .mute("s_visibility_cam.fallremap_revert", !change.bool()?)?;
            Ok(())
        }),
        Rule::new("s_visibility_camdist_per_cam_data", |ctx, change| {
            if change.bool()? {
                ctx.refresh_camera();
            } else {
                ctx.refresh_property(&change.entity, "s_visibility_camdist_min")?;
                ctx.refresh_property(&change.entity, "s_visibility_camdist_max")?;
            }
            Ok(())
        }),
    ]
}
