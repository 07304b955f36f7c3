use scatter_cache::MANUAL_ALL;
use scatter_graph::Route;

use super::{seed_trigger, slider, socket};
use crate::Rule;

const PROJECTIONS: [&str; 3] = ["projbezarea", "projbezline", "projempties"];

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_distribution_method", |ctx, change| {
            let method = change.text()?;
            let entity = &change.entity;
            // surface layout depends on the distribution
            ctx.refresh_property(entity, "s_surface_method")?;

            let ops = ctx.graph(entity)?;
            ops.link("s_distribution_method", method)?;
            ops.link("s_distribution_method_N", &format!("{}_N", method))?;
            ops.set_keyword(method, 0)?;

            match method {
                "random" => ctx.refresh_property(entity, "s_distribution_space")?,
                m if PROJECTIONS.contains(&m) => {
                    ops.set_keyword("global", 1)?;
                    ops.set_constant("use_local_surfaces", false)?;
                }
                "random_stable" | MANUAL_ALL => {
                    ops.set_keyword("local", 1)?;
                    ops.set_constant("use_local_surfaces", true)?;
                }
                _ => {}
            }
            ctx.refresh_property(entity, "s_rot_align_z_method")?;
            ctx.refresh_property(entity, "s_rot_align_y_method")?;

            let transfer = matches!(method, MANUAL_ALL | "volume")
                || (PROJECTIONS.contains(&method) && !ctx.host().surfaces(entity.id).is_empty());
            ops.toggle_feature("Attr Transfer?", "use_attr_transfer", &[Route::Geo], transfer)?;
            Ok(())
        }),
        Rule::new("s_distribution_space", |ctx, change| {
            if ctx.read_str(&change.entity, "s_distribution_method") != "random" {
                return Ok(());
            }
            let space = change.text()?;
            let ops = ctx.graph(&change.entity)?;
            ops.set_constant("use_local_surfaces", space == "local")?;
            ops.set_keyword(space, 1)?;
            Ok(())
        }),
        Rule::new("s_distribution_is_count_method", |ctx, change| {
            let count = if change.text()? == "count" {
                ctx.read(&change.entity, "s_distribution_count")
                    .and_then(|v| v.as_int())
                    .unwrap_or(0)
            } else {
                -1
            };
            ctx.graph(&change.entity)?
                .set_input("s_distribution_random", 2, count)?;
            Ok(())
        }),
        Rule::new("s_distribution_count", |ctx, change| {
            if ctx.read_str(&change.entity, "s_distribution_is_count_method") == "count" {
                ctx.graph(&change.entity)?
                    .set_input("s_distribution_random", 2, change.int()?)?;
            }
            Ok(())
        })
        .slider(),
        slider("s_distribution_density", "s_distribution_random", 3),
        socket("s_distribution_seed", "s_distribution_random", 4),
        socket("s_distribution_limit_distance_allow", "s_distribution_random", 5),
        slider("s_distribution_limit_distance", "s_distribution_random", 6),
        seed_trigger("s_distribution_is_random_seed", "s_distribution_seed"),
    ]
}
