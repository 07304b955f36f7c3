use scatter_cache::MANUAL_ALL;

use super::socket;
use crate::Rule;

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_surface_method", |ctx, change| {
            let multi = change.text()? == "collection";
            let ops = ctx.graph(&change.entity)?;
            ops.set_input("s_surface_evaluator", 1, multi)?;
            ops.set_keyword(if multi { "multisurf" } else { "singlesurf" }, 2)?;
            if ctx.read_str(&change.entity, "s_distribution_method") == MANUAL_ALL {
                ctx.equivalence().flush(change.entity.id);
                ctx.equivalence().refresh_manual_surfaces()?;
            }
            Ok(())
        }),
        socket("s_surface_object", "s_surface_evaluator", 0),
        socket("s_surface_collection", "s_surface_evaluator", 2),
    ]
}
