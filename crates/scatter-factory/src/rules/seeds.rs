use rand::Rng;
use tracing::debug;

use crate::Rule;

/// Button property that rerolls `seed` on the source, or on the whole
/// selection when alt is held and batch edits are allowed.
pub fn seed_trigger(name: impl Into<String>, seed: impl Into<String>) -> Rule {
    let seed = seed.into();
    Rule::new(name, move |ctx, change| {
        if !change.bool()? {
            return Ok(());
        }
        // reset the button without dispatching it again
        ctx.host()
            .write_property(change.entity.id, change.property.as_str(), false.into())?;

        let batch = change.keys.alt && ctx.config().factory.alt_allow;
        let targets = if batch {
            ctx.selection(&change.entity)
        } else {
            vec![change.entity.clone()]
        };
        let mut rng = rand::rng();
        for target in &targets {
            let value: i64 = rng.random_range(0..=9999);
            debug!(entity = %target.name, seed = %seed, value, "new random seed");
            ctx.set_property(target, &seed, value)?;
        }
        Ok(())
    })
}
