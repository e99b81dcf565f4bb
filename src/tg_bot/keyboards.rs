use crate::i18n::t;
use crate::types::CallbackAction;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

fn button(lang: &str, key: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(t(lang, key), action.as_str())
}

/// Two-button admin menu shown after a successful login.
pub fn admin_menu_keyboard(lang: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(lang, "btn-blocked", CallbackAction::ViewBlocked),
        button(lang, "btn-messages", CallbackAction::ViewMessages),
    ]])
}

/// Admin menu plus a row leading back to the main menu.
pub fn admin_view_keyboard(lang: &str) -> InlineKeyboardMarkup {
    admin_menu_keyboard(lang).append_row(vec![button(
        lang,
        "btn-main-menu",
        CallbackAction::MainMenu,
    )])
}
