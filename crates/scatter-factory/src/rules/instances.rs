use scatter_graph::Route;

use super::{enum_index, seed_trigger};
use crate::Rule;

const INSTANCE_SLOTS: usize = 20;

const SCALE_METHODS: &[&str] = &["fixed_scale", "random_scale"];

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_instances_method", |ctx, change| {
            let points = change.text()? == "ins_points";
            ctx.graph(&change.entity)?
                .toggle_feature("Raw Points", "output_points", &[Route::Geo], points)?;
            Ok(())
        }),
        Rule::new("s_instances_coll_ptr", |ctx, change| {
            ctx.graph(&change.entity)?
                .set_input("s_instances_coll_ptr", 0, change.value.clone())?;
            Ok(())
        }),
        Rule::new("s_instances_pick_method", |ctx, change| {
            let method = change.text()?;
            let ops = ctx.graph(&change.entity)?;
            ops.link("s_instances_pick_method", method)?;
            ops.link("s_instances_pick_method PICK", &format!("{} PICK", method))?;
            ops.mute("s_instances_pick_scale", method != "pick_scale")?;
            Ok(())
        }),
        Rule::new("s_instances_seed", |ctx, change| {
            ctx.graph(&change.entity)?
                .set_constant("s_instances_seed", change.int()?)?;
            Ok(())
        }),
        seed_trigger("s_instances_is_random_seed", "s_instances_seed"),
        Rule::indexed("s_instances_id_XX_rate", INSTANCE_SLOTS, |ctx, change, i| {
            ctx.graph(&change.entity)?.set_input(
                "s_instances_pick_rate",
                i as usize,
                change.float()? / 100.0,
            )?;
            Ok(())
        })
        .slider(),
        Rule::new("s_instances_id_scale_method", |ctx, change| {
            let index = enum_index(change.property.as_str(), SCALE_METHODS, change.text()?);
            ctx.graph(&change.entity)?
                .set_constant("s_instances_id_scale_method", index)?;
            Ok(())
        }),
        // min and max share one node, interleaved per slot
        Rule::indexed("s_instances_id_XX_scale_min", INSTANCE_SLOTS, |ctx, change, i| {
            ctx.graph(&change.entity)?.set_input(
                "s_instances_pick_scale",
                i as usize * 2 - 1,
                change.float()?,
            )?;
            Ok(())
        })
        .slider(),
        Rule::indexed("s_instances_id_XX_scale_max", INSTANCE_SLOTS, |ctx, change, i| {
            ctx.graph(&change.entity)?.set_input(
                "s_instances_pick_scale",
                i as usize * 2,
                change.float()?,
            )?;
            Ok(())
        })
        .slider(),
        Rule::indexed("s_instances_id_XX_color", INSTANCE_SLOTS, |ctx, change, i| {
            ctx.graph(&change.entity)?
                .set_input("s_instances_pick_color", i as usize, change.rgba()?)?;
            Ok(())
        }),
        Rule::new("s_instances_id_color_sample_method", |ctx, change| {
            ctx.graph(&change.entity)?
                .set_constant("s_instances_is_vcol", change.text()? == "vcol")?;
            Ok(())
        }),
    ]
}
