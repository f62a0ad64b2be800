//! `when`-based filtering of menu items.

use std::borrow::Cow;

use super::ExpressionEvaluator;
use crate::context::{is_truthy, ContextSnapshot};
use crate::contributions::{Contributions, MenuItemContribution, MenuMap};
use crate::errors::ExpressionError;

/// Drops menu items whose `when` expression is falsy.
///
/// Items without `when` are kept. Order is preserved and menu keys are kept
/// even when every item is filtered out. Returns the input unchanged
/// (borrowed) when nothing was dropped.
pub fn filter_contributions<'a>(
    contributions: &'a Contributions,
    context: &ContextSnapshot,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<Cow<'a, Contributions>, ExpressionError> {
    let Some(menus) = &contributions.menus else {
        return Ok(Cow::Borrowed(contributions));
    };

    let mut filtered = MenuMap::new();
    let mut dropped = false;
    for (menu, items) in menus {
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if is_visible(item, context, evaluator)? {
                kept.push(item.clone());
            } else {
                dropped = true;
            }
        }
        filtered.insert(menu.clone(), kept);
    }

    if !dropped {
        return Ok(Cow::Borrowed(contributions));
    }
    Ok(Cow::Owned(Contributions {
        commands: contributions.commands.clone(),
        menus: Some(filtered),
    }))
}

fn is_visible(
    item: &MenuItemContribution,
    context: &ContextSnapshot,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<bool, ExpressionError> {
    match &item.when {
        None => Ok(true),
        Some(when) => evaluator
            .evaluate(when, &context.child())
            .map(|value| is_truthy(&value)),
    }
}
