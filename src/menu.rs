/// Class set on the page's `<body>` while the menu is hidden.
pub const MENU_HIDDEN_CLASS: &str = "menu-hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Hidden,
    Visible,
}

/// Two-state visibility toggle for the feed list menu.
#[derive(Debug, Default)]
pub struct MenuController {
    state: MenuState,
}

impl MenuController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_hidden(&self) -> bool {
        self.state == MenuState::Hidden
    }

    /// Flip between `Hidden` and `Visible`, returning the new state.
    pub fn toggle(&mut self) -> MenuState {
        self.state = match self.state {
            MenuState::Hidden => MenuState::Visible,
            MenuState::Visible => MenuState::Hidden,
        };
        self.state
    }

    /// Picking a feed from the menu closes it.
    pub fn hide(&mut self) {
        self.state = MenuState::Hidden;
    }

    /// Marker for the root node: present exactly when the menu is hidden.
    pub fn marker(&self) -> Option<&'static str> {
        self.is_hidden().then_some(MENU_HIDDEN_CLASS)
    }
}
