//! Contribution manifest types.
//!
//! These mirror the manifest wire format producers publish: camelCase keys,
//! `iconURL`, and absent facets omitted rather than serialized as empty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known menus that contributions can place items in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributableMenu {
    /// The command palette.
    #[serde(rename = "commandPalette")]
    CommandPalette,
    /// The global navigation bar.
    #[serde(rename = "global/nav")]
    GlobalNav,
    /// The title bar of a file editor.
    #[serde(rename = "editor/title")]
    EditorTitle,
    /// A directory page.
    #[serde(rename = "directory/page")]
    DirectoryPage,
    /// The help menu.
    #[serde(rename = "help")]
    Help,
    /// The toolbar of a panel view.
    #[serde(rename = "panel/toolbar")]
    PanelToolbar,
    /// The search results toolbar.
    #[serde(rename = "search/results/toolbar")]
    SearchResultsToolbar,
    /// The hover tooltip toolbar.
    #[serde(rename = "hover")]
    Hover,
}

impl ContributableMenu {
    /// Returns the menu identifier used as a key in `Contributions::menus`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CommandPalette => "commandPalette",
            Self::GlobalNav => "global/nav",
            Self::EditorTitle => "editor/title",
            Self::DirectoryPage => "directory/page",
            Self::Help => "help",
            Self::PanelToolbar => "panel/toolbar",
            Self::SearchResultsToolbar => "search/results/toolbar",
            Self::Hover => "hover",
        }
    }
}

impl fmt::Display for ContributableMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ContributableMenu> for String {
    fn from(menu: ContributableMenu) -> Self {
        menu.as_str().to_string()
    }
}

/// Presentation of a command as a button or toolbar item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    /// Text label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Tooltip or longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Grouping hint for renderers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Icon URL.
    #[serde(default, rename = "iconURL", skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Accessible description of the icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_description: Option<String>,
}

impl ActionItem {
    /// Creates an empty action item.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the icon URL.
    #[must_use]
    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }

    /// Sets the icon description.
    #[must_use]
    pub fn with_icon_description(mut self, icon_description: impl Into<String>) -> Self {
        self.icon_description = Some(icon_description.into());
        self
    }
}

/// A command a producer contributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContribution {
    /// Identifier referenced by menu items.
    pub id: String,
    /// Command to invoke when the contribution is executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments passed to `command`. String arguments may be templates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_arguments: Vec<serde_json::Value>,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Icon URL.
    #[serde(default, rename = "iconURL", skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Button presentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_item: Option<ActionItem>,
}

impl CommandContribution {
    /// Creates a command contribution with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the command to invoke.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Appends a command argument.
    #[must_use]
    pub fn with_argument(mut self, argument: serde_json::Value) -> Self {
        self.command_arguments.push(argument);
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the icon URL.
    #[must_use]
    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }

    /// Sets the action item.
    #[must_use]
    pub fn with_action_item(mut self, action_item: ActionItem) -> Self {
        self.action_item = Some(action_item);
        self
    }
}

/// Placement of a command in a menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemContribution {
    /// Id of the command to run.
    pub action: String,
    /// Alternative command, run with a modifier key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Grouping hint for renderers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Boolean expression gating visibility. `None` means always shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

impl MenuItemContribution {
    /// Creates a menu item for the given command id.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    /// Sets the alternative command.
    #[must_use]
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Sets the group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the `when` expression.
    #[must_use]
    pub fn with_when(mut self, when: impl Into<String>) -> Self {
        self.when = Some(when.into());
        self
    }
}

/// Menu id to ordered menu items.
pub type MenuMap = BTreeMap<String, Vec<MenuItemContribution>>;

/// Everything one producer (or the merged aggregate) contributes.
///
/// Both facets are optional; `Contributions::default()` is the identity
/// element for merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributions {
    /// Contributed commands, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<CommandContribution>>,
    /// Contributed menu items, keyed by menu id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menus: Option<MenuMap>,
}

impl Contributions {
    /// Creates empty contributions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command.
    #[must_use]
    pub fn with_command(mut self, command: CommandContribution) -> Self {
        self.commands.get_or_insert_with(Vec::new).push(command);
        self
    }

    /// Appends an item to a menu, creating the menu if needed.
    #[must_use]
    pub fn with_menu_item(mut self, menu: impl Into<String>, item: MenuItemContribution) -> Self {
        self.menus
            .get_or_insert_with(MenuMap::new)
            .entry(menu.into())
            .or_default()
            .push(item);
        self
    }

    /// Parses contributions from a JSON manifest fragment.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the commands, or an empty slice when absent.
    #[must_use]
    pub fn commands(&self) -> &[CommandContribution] {
        self.commands.as_deref().unwrap_or_default()
    }

    /// Returns the items of one menu, or an empty slice when absent.
    #[must_use]
    pub fn menu(&self, menu: &str) -> &[MenuItemContribution] {
        self.menus
            .as_ref()
            .and_then(|menus| menus.get(menu))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if the menu key is present, even with no items.
    #[must_use]
    pub fn has_menu(&self, menu: &str) -> bool {
        self.menus.as_ref().is_some_and(|menus| menus.contains_key(menu))
    }

    /// Total number of menu items across all menus.
    #[must_use]
    pub fn menu_item_count(&self) -> usize {
        self.menus
            .as_ref()
            .map_or(0, |menus| menus.values().map(Vec::len).sum())
    }

    /// Returns true if neither facet is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_none() && self.menus.is_none()
    }
}
