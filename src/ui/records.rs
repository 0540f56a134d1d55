use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use adw::prelude::*;
use gtk4 as gtk;
use gtk4::glib;
use libadwaita as adw;
use tracing::warn;

use super::hud::format_mm_ss;
use super::state::AppState;
use crate::services::leaderboard::{LeaderboardEntry, SHOWN_ENTRIES, ScoreRecorder};

/// Delay before re-reading scores after a round, so the remote save can land.
pub(super) const REFRESH_AFTER_SAVE: Duration = Duration::from_millis(1500);

fn table_cell(text: &str, class_name: &str, width_chars: i32) -> gtk::Label {
    let label = gtk::Label::new(Some(text));
    label.add_css_class(class_name);
    label.add_css_class("body");
    label.set_halign(gtk::Align::Fill);
    label.set_hexpand(true);
    label.set_xalign(0.5);
    if width_chars > 0 {
        label.set_width_chars(width_chars);
    }
    label
}

fn build_score_grid(entries: &[LeaderboardEntry]) -> gtk::Grid {
    let grid = gtk::Grid::new();
    grid.set_hexpand(true);
    grid.set_column_spacing(10);
    grid.set_row_spacing(5);
    grid.attach(&table_cell("#", "score-table-head", 3), 0, 0, 1, 1);
    grid.attach(&table_cell("Player", "score-table-head", 10), 1, 0, 1, 1);
    grid.attach(&table_cell("Score", "score-table-head", 7), 2, 0, 1, 1);
    grid.attach(&table_cell("Time", "score-table-head", 6), 3, 0, 1, 1);

    for idx in 0..SHOWN_ENTRIES {
        let row = (idx + 1) as i32;
        let (rank, player, score, time) = match entries.get(idx) {
            Some(entry) => (
                format!("#{}", entry.rank),
                entry.label.clone(),
                format!("{:.2}", entry.score),
                entry
                    .time_secs
                    .map(|secs| format_mm_ss(Duration::from_secs(secs)))
                    .unwrap_or_else(|| "---".to_string()),
            ),
            None => (
                "---".to_string(),
                "---".to_string(),
                "---".to_string(),
                "---".to_string(),
            ),
        };
        grid.attach(&table_cell(&rank, "score-table-row", 3), 0, row, 1, 1);
        grid.attach(&table_cell(&player, "score-table-row", 10), 1, row, 1, 1);
        grid.attach(&table_cell(&score, "score-table-row", 7), 2, row, 1, 1);
        grid.attach(&table_cell(&time, "score-table-row", 6), 3, row, 1, 1);
    }
    grid
}

fn fill_scores(container: &gtk::Box, scores: Result<Vec<LeaderboardEntry>, String>) {
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
    match scores {
        Ok(entries) if entries.is_empty() => {
            let empty = gtk::Label::new(Some("No scores yet"));
            empty.add_css_class("dim-label");
            container.append(&empty);
        }
        Ok(entries) => container.append(&build_score_grid(&entries)),
        Err(reason) => {
            warn!("top scores unavailable: {reason}");
            let failed = gtk::Label::new(Some("Could not load top scores"));
            failed.add_css_class("error");
            container.append(&failed);
        }
    }
}

/// Loads the top scores off the main thread and renders them into `container`.
fn load_scores_into(state: &Rc<RefCell<AppState>>, container: gtk::Box) {
    let loading = gtk::Spinner::builder().spinning(true).build();
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
    container.append(&loading);

    let recorder = state.borrow().recorder.clone();
    glib::spawn_future_local(async move {
        let scores = match gio::spawn_blocking(move || recorder.top_scores()).await {
            Ok(Ok(entries)) => Ok(entries),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("score lookup was interrupted".to_string()),
        };
        fill_scores(&container, scores);
    });
}

pub(super) fn build_leaderboard_panel(state: &Rc<RefCell<AppState>>) -> gtk::Box {
    let panel = gtk::Box::new(gtk::Orientation::Vertical, 8);
    panel.add_css_class("pairs-leaderboard");
    panel.add_css_class("card");

    let title = gtk::Label::new(Some("Top Scores"));
    title.add_css_class("heading");
    title.set_halign(gtk::Align::Center);

    let list = gtk::Box::new(gtk::Orientation::Vertical, 4);
    list.set_margin_start(8);
    list.set_margin_end(8);
    list.set_margin_bottom(8);

    panel.append(&title);
    panel.append(&list);
    state.borrow_mut().leaderboard_list = Some(list);
    panel
}

pub(super) fn refresh_leaderboard(state: &Rc<RefCell<AppState>>) {
    let Some(list) = state.borrow().leaderboard_list.clone() else {
        return;
    };
    load_scores_into(state, list);
}

pub fn show_leaderboard_dialog(state: &Rc<RefCell<AppState>>, app: &adw::Application) -> adw::Dialog {
    let parent_window = app.active_window();
    let dialog = adw::Dialog::new();
    dialog.set_can_close(true);
    dialog.set_content_width(420);

    let title = gtk::Label::new(Some("Leaderboard"));
    title.add_css_class("title-4");

    let header = adw::HeaderBar::new();
    header.set_title_widget(Some(&title));
    header.set_show_end_title_buttons(true);

    let content = gtk::Box::new(gtk::Orientation::Vertical, 8);
    content.set_margin_top(10);
    content.set_margin_bottom(10);
    content.set_margin_start(10);
    content.set_margin_end(10);
    load_scores_into(state, content.clone());

    let toolbar = adw::ToolbarView::new();
    toolbar.add_top_bar(&header);
    toolbar.set_content(Some(&content));

    dialog.set_child(Some(&toolbar));
    dialog.present(parent_window.as_ref());
    dialog
}
