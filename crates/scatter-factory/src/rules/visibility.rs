use scatter_cache::MANUAL_ALL;

use crate::Rule;

/// Viewport and render visibility, the only rules that also run on linked entities.
pub(super) fn rules() -> Vec<Rule> {
    [("hide_viewport", 1), ("hide_render", 2)]
        .into_iter()
        .map(|(name, index)| {
            Rule::new(name, move |ctx, change| {
                let hidden = change.bool()?;
                ctx.graph(&change.entity)?
                    .set_input("engine_output", index, !hidden)?;
                // Manual points index surfaces that were skipped while hidden.
                if !hidden && ctx.read_str(&change.entity, "s_distribution_method") == MANUAL_ALL {
                    ctx.equivalence().flush(change.entity.id);
                    ctx.equivalence().refresh_manual_surfaces()?;
                }
                Ok(())
            })
        })
        .collect()
}
