use scatter_graph::Route;

use super::{enum_index, COLOR_SAMPLE_METHODS};
use crate::Rule;

const PATTERNS: u8 = 3;

fn node(i: u8) -> String {
    format!("s_pattern{}", i)
}

/// Raw value into a socket of the pattern node of the expanded index.
fn pattern_socket(template: &str, index: usize) -> Rule {
    Rule::indexed(template, PATTERNS as usize, move |ctx, change, i| {
        ctx.graph(&change.entity)?
            .set_input(&node(i), index, change.value.clone())?;
        Ok(())
    })
}

fn pattern_percent(template: &str, index: usize) -> Rule {
    Rule::indexed(template, PATTERNS as usize, move |ctx, change, i| {
        ctx.graph(&change.entity)?
            .set_input(&node(i), index, change.float()? / 100.0)?;
        Ok(())
    })
    .slider()
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule::new("s_pattern_master_allow", |ctx, change| {
            let enabled = change.bool()?;
            let ops = ctx.graph(&change.entity)?;
            for i in 1..=PATTERNS {
                ops.mute(&node(i), !enabled)?;
            }
            Ok(())
        }),
        Rule::indexed("s_patternX_allow", PATTERNS as usize, |ctx, change, i| {
            ctx.graph(&change.entity)?.toggle_feature(
                &format!("Pattern{}", i),
                &node(i),
                &[Route::Vec, Route::Geo],
                change.bool()?,
            )?;
            Ok(())
        }),
        Rule::indexed("s_patternX_texture_ptr", PATTERNS as usize, |ctx, change, i| {
            ctx.graph(&change.entity)?
                .set_texture(&format!("s_pattern{}.texture", i), change.text()?)?;
            Ok(())
        }),
        Rule::indexed("s_patternX_color_sample_method", PATTERNS as usize, |ctx, change, i| {
            let index = enum_index(change.property.as_str(), COLOR_SAMPLE_METHODS, change.text()?);
            ctx.graph(&change.entity)?.set_input(&node(i), 2, index)?;
            Ok(())
        }),
        Rule::indexed("s_patternX_id_color_ptr", PATTERNS as usize, |ctx, change, i| {
            ctx.graph(&change.entity)?
                .set_input(&node(i), 3, change.rgba()?)?;
            Ok(())
        }),
        pattern_socket("s_patternX_id_color_tolerence", 4).slider(),
        pattern_socket("s_patternX_dist_infl_allow", 5),
        pattern_percent("s_patternX_dist_influence", 6),
        pattern_socket("s_patternX_dist_revert", 7),
        pattern_socket("s_patternX_scale_infl_allow", 8),
        pattern_percent("s_patternX_scale_influence", 9),
        pattern_socket("s_patternX_scale_revert", 10),
    ]
}
