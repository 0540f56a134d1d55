use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use adw::prelude::*;
use gio::SimpleAction;
use gtk4 as gtk;
use gtk4::gdk;
use gtk4::glib;
use libadwaita as adw;
use reqwest::blocking::Client;
use tracing::{debug, error, info, warn};

use super::board::{self, CONTENT_MARGIN};
use super::dialogs::{show_about_dialog, show_round_complete_dialog};
use super::hud;
use super::records::{self, show_leaderboard_dialog};
use super::state::AppState;
use crate::config::{self, Color, ColorRole, Preferences, SessionContext};
use crate::game::{GameController, GameEvent, ImageId, RoundRequest, RoundSummary, Scheduled, TileId};
use crate::services::http;
use crate::services::images::{ImageLibrary, ImageSourceKind, SourceError};
use crate::services::leaderboard::{LocalLeaderboard, RecorderSet, RemoteLeaderboard, ScoreRecorder};
use crate::services::preferences::{FilePreferences, PreferencesStore, RemotePreferences};

const APP_ID: &str = "io.pairs.Pairs";
const STYLE_CSS: &str = include_str!("../../data/style.css");

/// Drains the controller's queues: wakeups become one-shot timeouts and
/// events are rendered in order.
pub(super) fn pump(state: &Rc<RefCell<AppState>>) {
    let (events, scheduled) = {
        let mut st = state.borrow_mut();
        (st.game.take_events(), st.game.take_scheduled())
    };
    for Scheduled { after, wakeup } in scheduled {
        let state = state.clone();
        glib::timeout_add_local_once(after, move || {
            state.borrow_mut().game.wake(wakeup);
            pump(&state);
        });
    }
    for event in events {
        handle_event(state, event);
    }
}

fn handle_event(state: &Rc<RefCell<AppState>>, event: GameEvent) {
    match event {
        GameEvent::PhaseChanged(phase) => hud::set_phase(&state.borrow(), phase),
        GameEvent::BoardReady { size, tiles } => {
            board::rebuild_board(state, size);
            load_textures(state, tiles.into_iter().map(|(_, image)| image).collect());
        }
        GameEvent::BoardCleared => board::show_empty_board(state),
        GameEvent::TileChanged { tile, status } => board::update_tile(&state.borrow(), tile, status),
        GameEvent::SelectionChanged(selection) => debug!(?selection, "selection changed"),
        GameEvent::FlipCountdownShown => hud::show_countdown(&state.borrow()),
        GameEvent::FlipCountdown {
            remaining,
            duration,
            running,
        } => hud::set_countdown(&state.borrow(), remaining, duration, running),
        GameEvent::SessionTick { elapsed } => hud::set_elapsed(&state.borrow(), elapsed),
        GameEvent::CountersChanged { moves, matches } => {
            hud::set_counters(&state.borrow(), moves, matches)
        }
        GameEvent::PaletteChanged(palette) => {
            let st = state.borrow();
            hud::apply_palette(&st, &palette);
            board::redraw_backs(&st);
        }
        GameEvent::RoundComplete(summary) => on_round_complete(state, &summary),
        GameEvent::RoundFailed { reason } => {
            state
                .borrow()
                .toast(&format!("Could not load images: {reason}"));
        }
    }
}

pub(super) fn handle_tile_click(state: &Rc<RefCell<AppState>>, id: TileId) {
    state.borrow_mut().game.click_tile(id);
    pump(state);
}

fn handle_click_elsewhere(state: &Rc<RefCell<AppState>>) {
    let Ok(mut st) = state.try_borrow_mut() else {
        return;
    };
    st.game.click_elsewhere();
    drop(st);
    pump(state);
}

pub(super) fn start_round(state: &Rc<RefCell<AppState>>) {
    let request = state.borrow_mut().game.begin_round();
    pump(state);
    if let Some(request) = request {
        fetch_round_images(state, request);
    }
}

pub(super) fn reset_round(state: &Rc<RefCell<AppState>>) {
    state.borrow_mut().game.reset();
    pump(state);
}

fn fetch_round_images(state: &Rc<RefCell<AppState>>, request: RoundRequest) {
    let source = state.borrow().images.get(request.source);
    let state = state.clone();
    glib::spawn_future_local(async move {
        let fetched = match source {
            Some(source) => gio::spawn_blocking(move || source.fetch(request.count))
                .await
                .unwrap_or_else(|_| Err(SourceError::Interrupted)),
            None => Err(SourceError::Unregistered(request.source)),
        };
        let outcome = state.borrow_mut().game.finish_loading(request.ticket, fetched);
        if let Err(err) = outcome {
            warn!("round could not start: {err}");
        }
        pump(&state);
    });
}

fn download(client: &Client, url: &str) -> reqwest::Result<Vec<u8>> {
    Ok(client.get(url).send()?.error_for_status()?.bytes()?.to_vec())
}

/// Fetches textures for `images`, dropping cached textures the new board
/// no longer shows.
fn load_textures(state: &Rc<RefCell<AppState>>, images: Vec<ImageId>) {
    let wanted: HashSet<ImageId> = images.into_iter().collect();
    let (client, missing) = {
        let mut st = state.borrow_mut();
        st.textures.retain(|image, _| wanted.contains(image));
        let missing: Vec<ImageId> = wanted
            .into_iter()
            .filter(|image| !st.textures.contains_key(image))
            .collect();
        (st.client.clone(), missing)
    };

    for image in missing {
        let client = client.clone();
        let state = state.clone();
        glib::spawn_future_local(async move {
            let url = image.as_str().to_string();
            let bytes = match gio::spawn_blocking(move || download(&client, &url)).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(err)) => {
                    warn!(%image, "image download failed: {err}");
                    return;
                }
                Err(_) => return,
            };
            match gdk::Texture::from_bytes(&glib::Bytes::from_owned(bytes)) {
                Ok(texture) => {
                    let mut st = state.borrow_mut();
                    st.textures.insert(image.clone(), texture);
                    board::apply_texture(&st, &image);
                }
                Err(err) => warn!(%image, "could not decode image: {err}"),
            }
        });
    }
}

pub(super) fn change_board_size(state: &Rc<RefCell<AppState>>, dimension: u8) {
    let request = {
        let Ok(mut st) = state.try_borrow_mut() else {
            return;
        };
        if st.game.preferences().board_size.dimension() == dimension {
            return;
        }
        match st.game.set_board_size(dimension) {
            Ok(request) => request,
            Err(err) => {
                warn!("board size change rejected: {err}");
                return;
            }
        }
    };
    pump(state);
    persist_preferences(state);
    if let Some(request) = request {
        fetch_round_images(state, request);
    }
}

pub(super) fn change_image_source(state: &Rc<RefCell<AppState>>, kind: ImageSourceKind) {
    let request = {
        let Ok(mut st) = state.try_borrow_mut() else {
            return;
        };
        if st.game.preferences().image_source == kind {
            return;
        }
        st.game.set_image_source(kind)
    };
    pump(state);
    persist_preferences(state);
    if let Some(request) = request {
        fetch_round_images(state, request);
    }
}

pub(super) fn change_color(state: &Rc<RefCell<AppState>>, role: ColorRole, color: Color) {
    {
        let Ok(mut st) = state.try_borrow_mut() else {
            return;
        };
        let prefs = st.game.preferences();
        let current = match role {
            ColorRole::Matched => &prefs.matched_color,
            ColorRole::Closed => &prefs.closed_color,
        };
        if *current == color {
            return;
        }
        st.game.set_color(role, color);
    }
    pump(state);
    persist_preferences(state);
}

fn persist_preferences(state: &Rc<RefCell<AppState>>) {
    let (prefs, local, remote) = {
        let st = state.borrow();
        (
            st.game.preferences().clone(),
            st.local_prefs.clone(),
            st.remote_prefs.clone(),
        )
    };
    drop(gio::spawn_blocking(move || {
        if let Some(store) = local
            && let Err(err) = store.save(&prefs)
        {
            warn!(path = %store.path().display(), "could not save preferences: {err}");
        }
        if let Some(store) = remote
            && let Err(err) = store.save(&prefs)
        {
            warn!("could not save account preferences: {err}");
        }
    }));
}

/// Account preferences override the local file, except that a round
/// already in play keeps its image source.
fn load_remote_preferences(state: &Rc<RefCell<AppState>>) {
    let Some(remote) = state.borrow().remote_prefs.clone() else {
        return;
    };
    let state = state.clone();
    glib::spawn_future_local(async move {
        let remote_prefs = match gio::spawn_blocking(move || remote.load()).await {
            Ok(Ok(prefs)) => prefs,
            Ok(Err(err)) => {
                warn!("account preferences unavailable: {err}");
                return;
            }
            Err(_) => return,
        };
        apply_account_preferences(&state, remote_prefs);
    });
}

fn apply_account_preferences(state: &Rc<RefCell<AppState>>, prefs: Preferences) {
    {
        let mut st = state.borrow_mut();
        if !st.game.is_started() && st.game.preferences().image_source != prefs.image_source {
            st.game.set_image_source(prefs.image_source);
        }
        st.game.set_color(ColorRole::Matched, prefs.matched_color);
        st.game.set_color(ColorRole::Closed, prefs.closed_color);
    }
    pump(state);
    hud::sync_controls(&state.borrow());
    info!("applied account preferences");
}

fn on_round_complete(state: &Rc<RefCell<AppState>>, summary: &RoundSummary) {
    let (window, shared) = {
        let st = state.borrow();
        (st.window.clone(), st.session.can_save_scores())
    };
    let dialog = show_round_complete_dialog(window.as_ref(), summary, shared);
    dialog.connect_response(Some("again"), {
        let state = state.clone();
        move |_, _| {
            reset_round(&state);
            start_round(&state);
        }
    });

    let state = state.clone();
    glib::timeout_add_local_once(records::REFRESH_AFTER_SAVE, move || {
        records::refresh_leaderboard(&state);
    });
}

fn load_css() {
    let Some(display) = gdk::Display::default() else {
        return;
    };
    let provider = gtk::CssProvider::new();
    provider.load_from_string(STYLE_CSS);
    gtk::style_context_add_provider_for_display(
        &display,
        &provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );
}

fn dynamic_provider() -> gtk::CssProvider {
    let provider = gtk::CssProvider::new();
    if let Some(display) = gdk::Display::default() {
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION + 1,
        );
    }
    provider
}

fn build_state(session: &SessionContext, client: &Client) -> AppState {
    let local_prefs = config::preferences_path().map(|path| Arc::new(FilePreferences::new(path)));
    let prefs = match &local_prefs {
        Some(store) => store.load().unwrap_or_else(|err| {
            warn!("using default preferences: {err}");
            Preferences::default()
        }),
        None => Preferences::default(),
    };

    let mut recorders = RecorderSet::new().with(Arc::new(RemoteLeaderboard::new(
        client.clone(),
        session.clone(),
    )));
    match config::leaderboard_path() {
        Some(path) => recorders = recorders.with(Arc::new(LocalLeaderboard::open(path))),
        None => warn!("no data directory, local scores will not be kept"),
    }
    let recorder = Arc::new(recorders);

    let game = GameController::new(prefs, recorder.clone());
    let mut st = AppState::new(
        game,
        session.clone(),
        client.clone(),
        ImageLibrary::online(client.clone()),
        recorder,
    );
    st.local_prefs = local_prefs;
    if session.is_signed_in() {
        st.remote_prefs = Some(Arc::new(RemotePreferences::new(
            client.clone(),
            session.clone(),
        )));
    }
    st
}

fn add_actions(state: &Rc<RefCell<AppState>>, app: &adw::Application) {
    let leaderboard_action = SimpleAction::new("leaderboard", None);
    leaderboard_action.connect_activate({
        let app = app.clone();
        let state = state.clone();
        move |_, _| {
            show_leaderboard_dialog(&state, &app);
        }
    });
    app.add_action(&leaderboard_action);

    let new_game_action = SimpleAction::new("new-game", None);
    new_game_action.connect_activate({
        let state = state.clone();
        move |_, _| {
            reset_round(&state);
            start_round(&state);
        }
    });
    app.add_action(&new_game_action);
    app.set_accels_for_action("app.new-game", &["<Control>n"]);

    let about_action = SimpleAction::new("about", None);
    about_action.connect_activate({
        let app = app.clone();
        move |_, _| {
            show_about_dialog(&app);
        }
    });
    app.add_action(&about_action);

    let quit_action = SimpleAction::new("quit", None);
    quit_action.connect_activate({
        let app = app.clone();
        move |_, _| app.quit()
    });
    app.add_action(&quit_action);
    app.set_accels_for_action("app.quit", &["<Control>q"]);
}

fn build_window(app: &adw::Application, session: &SessionContext, client: &Client) {
    load_css();

    let state = Rc::new(RefCell::new(build_state(session, client)));
    add_actions(&state, app);
    app.connect_shutdown({
        let recorder = state.borrow().recorder.clone();
        move |_| recorder.flush()
    });

    {
        let mut st = state.borrow_mut();
        st.dynamic_css_provider = Some(dynamic_provider());
        st.palette_css_provider = Some(dynamic_provider());
    }

    let title_box = gtk::Box::new(gtk::Orientation::Vertical, 0);
    title_box.set_valign(gtk::Align::Center);
    let title_main = gtk::Label::builder()
        .label("Pairs")
        .css_classes(vec!["title"])
        .build();
    let title_subtitle = gtk::Label::builder()
        .label("")
        .css_classes(vec!["subtitle", "caption"])
        .build();
    title_box.append(&title_main);
    title_box.append(&title_subtitle);
    state.borrow_mut().title_subtitle = Some(title_subtitle);

    let header = adw::HeaderBar::builder().title_widget(&title_box).build();

    let menu_model = gio::Menu::new();
    menu_model.append(Some("New Game"), Some("app.new-game"));
    menu_model.append(Some("Leaderboard"), Some("app.leaderboard"));
    menu_model.append(Some("About Pairs"), Some("app.about"));
    menu_model.append(Some("Quit"), Some("app.quit"));
    let menu_button = gtk::MenuButton::builder()
        .icon_name("open-menu-symbolic")
        .menu_model(&menu_model)
        .build();
    header.pack_end(&menu_button);

    let side = gtk::Box::new(gtk::Orientation::Vertical, 12);
    side.append(&hud::build_controls(&state));
    side.append(&records::build_leaderboard_panel(&state));

    let board_container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    board_container.set_hexpand(true);
    board_container.set_vexpand(true);
    board_container.add_css_class("pairs-board-container");
    state.borrow_mut().board_container = Some(board_container.clone());

    // Tile buttons claim their own presses; only gaps around the board land here.
    let elsewhere = gtk::GestureClick::new();
    elsewhere.connect_pressed({
        let state = state.clone();
        move |_, _, _, _| handle_click_elsewhere(&state)
    });
    board_container.add_controller(elsewhere);

    let root = gtk::Box::new(gtk::Orientation::Horizontal, 12);
    root.set_margin_top(CONTENT_MARGIN);
    root.set_margin_bottom(CONTENT_MARGIN);
    root.set_margin_start(CONTENT_MARGIN);
    root.set_margin_end(CONTENT_MARGIN);
    root.append(&side);
    root.append(&board_container);


    let toasts = adw::ToastOverlay::new();
    toasts.set_child(Some(&root));

    let toolbar = adw::ToolbarView::new();
    toolbar.add_top_bar(&header);
    toolbar.set_content(Some(&toasts));

    let win = adw::ApplicationWindow::builder()
        .application(app)
        .title("Pairs")
        .default_width(1000)
        .default_height(720)
        .content(&toolbar)
        .build();
    win.set_size_request(640, 520);

    {
        let mut st = state.borrow_mut();
        st.window = Some(win.clone());
        st.toasts = Some(toasts);
        let phase = st.game.phase();
        hud::set_phase(&st, phase);
    }

    board::show_empty_board(&state);
    records::refresh_leaderboard(&state);
    load_remote_preferences(&state);
    win.present();
}

pub fn run(session: SessionContext) -> glib::ExitCode {
    let client = match http::client() {
        Ok(client) => client,
        Err(err) => {
            error!("could not create HTTP client: {err}");
            return glib::ExitCode::FAILURE;
        }
    };
    info!(api = %session.api_url, signed_in = session.is_signed_in(), "starting");

    glib::set_prgname(Some(APP_ID));
    let app = adw::Application::builder().application_id(APP_ID).build();
    app.connect_activate(move |app| build_window(app, &session, &client));
    app.run()
}
