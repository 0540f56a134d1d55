use std::collections::HashMap;
use std::sync::Arc;

use gtk4 as gtk;
use gtk4::gdk;
use libadwaita as adw;
use reqwest::blocking::Client;

use crate::config::SessionContext;
use crate::game::{GameController, ImageId};
use crate::services::images::ImageLibrary;
use crate::services::leaderboard::RecorderSet;
use crate::services::preferences::{FilePreferences, RemotePreferences};

/// Widgets for one board position.
#[derive(Clone)]
pub struct TileWidgets {
    pub button: gtk::Button,
    pub faces: gtk::Stack,
    pub back: gtk::DrawingArea,
    pub picture: gtk::Picture,
}

pub struct AppState {
    pub game: GameController,
    pub session: SessionContext,
    pub client: Client,
    pub images: ImageLibrary,
    pub recorder: Arc<RecorderSet>,
    pub local_prefs: Option<Arc<FilePreferences>>,
    pub remote_prefs: Option<Arc<RemotePreferences>>,
    pub textures: HashMap<ImageId, gdk::Texture>,

    pub window: Option<adw::ApplicationWindow>,
    pub toasts: Option<adw::ToastOverlay>,
    pub title_subtitle: Option<gtk::Label>,
    pub board_container: Option<gtk::Box>,
    pub tiles: Vec<TileWidgets>,
    pub start_button: Option<gtk::Button>,
    pub reset_button: Option<gtk::Button>,
    pub size_dropdown: Option<gtk::DropDown>,
    pub source_dropdown: Option<gtk::DropDown>,
    pub matched_color_button: Option<gtk::ColorDialogButton>,
    pub closed_color_button: Option<gtk::ColorDialogButton>,
    pub moves_label: Option<gtk::Label>,
    pub matches_label: Option<gtk::Label>,
    pub time_label: Option<gtk::Label>,
    pub countdown_bar: Option<gtk::ProgressBar>,
    pub leaderboard_list: Option<gtk::Box>,
    pub dynamic_css_provider: Option<gtk::CssProvider>,
    pub palette_css_provider: Option<gtk::CssProvider>,
}

impl AppState {
    pub fn new(
        game: GameController,
        session: SessionContext,
        client: Client,
        images: ImageLibrary,
        recorder: Arc<RecorderSet>,
    ) -> Self {
        Self {
            game,
            session,
            client,
            images,
            recorder,
            local_prefs: None,
            remote_prefs: None,
            textures: HashMap::new(),
            window: None,
            toasts: None,
            title_subtitle: None,
            board_container: None,
            tiles: Vec::new(),
            start_button: None,
            reset_button: None,
            size_dropdown: None,
            source_dropdown: None,
            matched_color_button: None,
            closed_color_button: None,
            moves_label: None,
            matches_label: None,
            time_label: None,
            countdown_bar: None,
            leaderboard_list: None,
            dynamic_css_provider: None,
            palette_css_provider: None,
        }
    }

    pub fn toast(&self, message: &str) {
        if let Some(overlay) = &self.toasts {
            overlay.add_toast(adw::Toast::new(message));
        }
    }
}
