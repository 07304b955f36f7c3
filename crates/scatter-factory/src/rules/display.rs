use crate::Rule;

use super::slider;

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_display_allow", |ctx, change| {
            let enabled = change.bool()?;
            let ops = ctx.graph(&change.entity)?;
            ops.set_constant("s_display_allow", enabled)?;
            ops.highlight("Display", enabled)?;
            ops.highlight("Display Features", enabled)?;
            Ok(())
        }),
        Rule::new("s_display_method", |ctx, change| {
            ctx.graph(&change.entity)?
                .link("s_display_method", change.text()?)?;
            Ok(())
        }),
        Rule::new("s_display_camdist_allow", |ctx, change| {
            let enabled = change.bool()?;
            let ops = ctx.graph(&change.entity)?;
            ops.set_constant("s_display_camdist_allow", enabled)?;
            ops.highlight("Closeby Optimization1", enabled)?;
            ops.highlight("Closeby Optimization2", enabled)?;
            ops.mute("s_display_camdist", !enabled)?;
            if enabled {
                ctx.refresh_camera();
            }
            Ok(())
        }),
        slider("s_display_camdist_distance", "s_display_camdist", 1),
    ]
}
