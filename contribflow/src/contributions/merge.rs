//! Merging of evaluated contributions into one aggregate.

use std::sync::Arc;

use super::{Contributions, MenuMap};

/// Merges contributions in order.
///
/// Commands are concatenated and menu items appended per menu key, so the
/// result depends on input order (registration order) but not on how the
/// inputs are grouped. A single input is returned as-is.
#[must_use]
pub fn merge_contributions(inputs: &[Arc<Contributions>]) -> Arc<Contributions> {
    match inputs {
        [] => Arc::new(Contributions::default()),
        [single] => Arc::clone(single),
        _ => {
            let mut merged = Contributions::default();
            for input in inputs {
                absorb(&mut merged, input);
            }
            Arc::new(merged)
        }
    }
}

fn absorb(merged: &mut Contributions, input: &Contributions) {
    if let Some(commands) = &input.commands {
        merged
            .commands
            .get_or_insert_with(Vec::new)
            .extend(commands.iter().cloned());
    }

    if let Some(menus) = &input.menus {
        let target = merged.menus.get_or_insert_with(MenuMap::new);
        for (menu, items) in menus {
            target
                .entry(menu.clone())
                .or_default()
                .extend(items.iter().cloned());
        }
    }
}
