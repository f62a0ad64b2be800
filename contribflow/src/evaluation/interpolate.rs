//! Template interpolation of command display fields.

use std::borrow::Cow;

use super::TemplateEvaluator;
use crate::context::ContextSnapshot;
use crate::contributions::{ActionItem, CommandContribution, Contributions};
use crate::errors::TemplateError;

/// Templated text fields of a command, including its action item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Title,
    Category,
    Description,
    IconUrl,
    ActionLabel,
    ActionDescription,
    ActionGroup,
    ActionIconUrl,
    ActionIconDescription,
}

impl TextField {
    const ALL: [Self; 9] = [
        Self::Title,
        Self::Category,
        Self::Description,
        Self::IconUrl,
        Self::ActionLabel,
        Self::ActionDescription,
        Self::ActionGroup,
        Self::ActionIconUrl,
        Self::ActionIconDescription,
    ];

    fn get(self, command: &CommandContribution) -> Option<&str> {
        let action = command.action_item.as_ref();
        match self {
            Self::Title => command.title.as_deref(),
            Self::Category => command.category.as_deref(),
            Self::Description => command.description.as_deref(),
            Self::IconUrl => command.icon_url.as_deref(),
            Self::ActionLabel => action.and_then(|a| a.label.as_deref()),
            Self::ActionDescription => action.and_then(|a| a.description.as_deref()),
            Self::ActionGroup => action.and_then(|a| a.group.as_deref()),
            Self::ActionIconUrl => action.and_then(|a| a.icon_url.as_deref()),
            Self::ActionIconDescription => action.and_then(|a| a.icon_description.as_deref()),
        }
    }

    fn set(self, command: &mut CommandContribution, value: String) {
        let slot = match self {
            Self::Title => &mut command.title,
            Self::Category => &mut command.category,
            Self::Description => &mut command.description,
            Self::IconUrl => &mut command.icon_url,
            Self::ActionLabel => &mut action_mut(command).label,
            Self::ActionDescription => &mut action_mut(command).description,
            Self::ActionGroup => &mut action_mut(command).group,
            Self::ActionIconUrl => &mut action_mut(command).icon_url,
            Self::ActionIconDescription => &mut action_mut(command).icon_description,
        };
        *slot = Some(value);
    }
}

fn action_mut(command: &mut CommandContribution) -> &mut ActionItem {
    command.action_item.get_or_insert_with(ActionItem::default)
}

/// Interpolates templated fields against one context.
pub struct Interpolator<'a> {
    evaluator: &'a dyn TemplateEvaluator,
    context: &'a ContextSnapshot,
    shortcut: bool,
}

impl<'a> Interpolator<'a> {
    /// Creates an interpolator that skips text for which
    /// `needs_evaluation` is false.
    #[must_use]
    pub fn new(evaluator: &'a dyn TemplateEvaluator, context: &'a ContextSnapshot) -> Self {
        Self {
            evaluator,
            context,
            shortcut: true,
        }
    }

    /// Enables or disables the `needs_evaluation` shortcut.
    #[must_use]
    pub const fn with_shortcut(mut self, shortcut: bool) -> Self {
        self.shortcut = shortcut;
        self
    }

    /// Interpolates every command. Returns the input (borrowed) when no
    /// field changed.
    pub fn interpolate_contributions<'c>(
        &self,
        contributions: &'c Contributions,
    ) -> Result<Cow<'c, Contributions>, TemplateError> {
        let Some(commands) = &contributions.commands else {
            return Ok(Cow::Borrowed(contributions));
        };

        let mut resolved: Vec<Cow<'c, CommandContribution>> = Vec::with_capacity(commands.len());
        for command in commands {
            resolved.push(self.interpolate_command(command)?);
        }

        if resolved.iter().all(|c| matches!(c, Cow::Borrowed(_))) {
            return Ok(Cow::Borrowed(contributions));
        }
        Ok(Cow::Owned(Contributions {
            commands: Some(resolved.into_iter().map(Cow::into_owned).collect()),
            menus: contributions.menus.clone(),
        }))
    }

    /// Interpolates one command. The original is returned (borrowed) unless
    /// at least one field changed.
    pub fn interpolate_command<'c>(
        &self,
        command: &'c CommandContribution,
    ) -> Result<Cow<'c, CommandContribution>, TemplateError> {
        let mut updated: Option<CommandContribution> = None;

        for field in TextField::ALL {
            let Some(text) = field.get(command) else {
                continue;
            };
            if let Some(value) = self.resolve(text)? {
                field.set(updated.get_or_insert_with(|| command.clone()), value);
            }
        }

        for (index, argument) in command.command_arguments.iter().enumerate() {
            let serde_json::Value::String(text) = argument else {
                continue;
            };
            if let Some(value) = self.resolve(text)? {
                updated.get_or_insert_with(|| command.clone()).command_arguments[index] =
                    serde_json::Value::String(value);
            }
        }

        Ok(updated.map_or(Cow::Borrowed(command), Cow::Owned))
    }

    /// Returns `Some` only when interpolation changed the text.
    fn resolve(&self, text: &str) -> Result<Option<String>, TemplateError> {
        if self.shortcut && !self.evaluator.needs_evaluation(text) {
            return Ok(None);
        }
        let evaluated = self
            .evaluator
            .evaluate_template(text, &self.context.child())?;
        Ok((evaluated != text).then_some(evaluated))
    }
}
