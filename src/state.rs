use crate::background::Background;
use crate::error::StoreError;
use crate::session::store::{Slot, SlotStore};
use crate::theme::ThemeName;
use tracing::warn;

/// Window-wide presentation state. Theme and background persist; whether the
/// sidebar is open lasts for the current run only.
#[derive(Debug)]
pub struct AppState {
    store: SlotStore,
    theme: ThemeName,
    sidebar_open: bool,
    background: Option<Background>,
}

impl AppState {
    pub fn restore(store: SlotStore) -> Self {
        let theme = store.read_json::<ThemeName>(Slot::Theme).unwrap_or_default();
        let background = store
            .read_json::<String>(Slot::Background)
            .and_then(|data_url| match Background::from_data_url(data_url) {
                Ok(background) => Some(background),
                Err(err) => {
                    warn!("ignoring stored background: {err}");
                    None
                }
            });

        Self {
            store,
            theme,
            sidebar_open: false,
            background,
        }
    }

    pub fn theme(&self) -> ThemeName {
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeName) -> Result<(), StoreError> {
        self.theme = theme;
        self.store.write_json(Slot::Theme, &theme)
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, background: Background) -> Result<(), StoreError> {
        let result = self.store.write_json(Slot::Background, background.data_url());
        self.background = Some(background);
        result
    }

    pub fn clear_background(&mut self) -> Result<(), StoreError> {
        self.background = None;
        self.store.remove(Slot::Background)
    }
}
