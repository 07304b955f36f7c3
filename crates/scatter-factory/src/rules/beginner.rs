use scatter_core::{Entity, Result};

use crate::{HandlerContext, Rule};

/// Turn a feature on before writing one of its values.
fn ensure_enabled(ctx: &HandlerContext<'_>, entity: &Entity, allow: &str) -> Result<()> {
    if ctx.read_bool(entity, allow) {
        return Ok(());
    }
    ctx.set_property(entity, allow, true)
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_beginner_default_scale", |ctx, change| {
            let entity = &change.entity;
            ensure_enabled(ctx, entity, "s_scale_default_allow")?;
            ctx.set_property(entity, "s_scale_default_multiplier", change.float()?)
        })
        .slider(),
        Rule::new("s_beginner_random_scale", |ctx, change| {
            let entity = &change.entity;
            ensure_enabled(ctx, entity, "s_scale_random_allow")?;
            let factor = 1.0 - change.float()?;
            ctx.set_property(entity, "s_scale_random_factor", [factor; 3])
        })
        .slider(),
        Rule::new("s_beginner_random_rot", |ctx, change| {
            let entity = &change.entity;
            let v = change.float()?;
            ensure_enabled(ctx, entity, "s_rot_random_allow")?;
            ctx.set_property(entity, "s_rot_random_tilt_value", v * 2.50437)?;
            ctx.set_property(entity, "s_rot_random_yaw_value", v * 6.28319)
        })
        .slider(),
    ]
}
