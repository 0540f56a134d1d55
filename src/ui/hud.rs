use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gtk4 as gtk;
use gtk4::gdk;
use gtk4::prelude::*;

use super::app::{change_board_size, change_color, change_image_source, reset_round, start_round};
use super::state::AppState;
use crate::config::{Color, ColorRole, Palette};
use crate::game::{BoardSize, RoundPhase};
use crate::services::images::ImageSourceKind;

pub(super) fn format_mm_ss(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn color_to_rgba(color: &Color) -> gdk::RGBA {
    let (r, g, b) = color.rgb();
    gdk::RGBA::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        1.0,
    )
}

fn rgba_to_color(rgba: &gdk::RGBA) -> Color {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgb(channel(rgba.red()), channel(rgba.green()), channel(rgba.blue()))
}

fn stat_label(css_class: &str) -> gtk::Label {
    let label = gtk::Label::new(None);
    label.add_css_class(css_class);
    label.add_css_class("numeric");
    label.set_xalign(0.0);
    label
}

fn labeled_row(title: &str, widget: &impl IsA<gtk::Widget>) -> gtk::Box {
    let row = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    let label = gtk::Label::new(Some(title));
    label.add_css_class("dim-label");
    label.set_hexpand(true);
    label.set_xalign(0.0);
    row.append(&label);
    row.append(widget);
    row
}

pub(super) fn build_controls(state: &Rc<RefCell<AppState>>) -> gtk::Box {
    let panel = gtk::Box::new(gtk::Orientation::Vertical, 10);
    panel.add_css_class("pairs-controls");
    panel.set_width_request(240);

    let prefs = state.borrow().game.preferences().clone();

    let start_button = gtk::Button::with_label("Start Game");
    start_button.add_css_class("suggested-action");
    start_button.add_css_class("pill");
    start_button.connect_clicked({
        let state = state.clone();
        move |_| start_round(&state)
    });

    let reset_button = gtk::Button::with_label("Reset");
    reset_button.add_css_class("pill");
    reset_button.connect_clicked({
        let state = state.clone();
        move |_| reset_round(&state)
    });

    let size_labels: Vec<&str> = BoardSize::ALL.iter().map(|s| s.label()).collect();
    let size_dropdown = gtk::DropDown::from_strings(&size_labels);
    size_dropdown.set_selected(BoardSize::ALL.iter().position(|s| *s == prefs.board_size).unwrap_or(0) as u32);
    size_dropdown.connect_selected_notify({
        let state = state.clone();
        move |dropdown| {
            if let Some(size) = BoardSize::ALL.get(dropdown.selected() as usize) {
                change_board_size(&state, size.dimension());
            }
        }
    });

    let source_labels: Vec<&str> = ImageSourceKind::ALL.iter().map(|k| k.display_name()).collect();
    let source_dropdown = gtk::DropDown::from_strings(&source_labels);
    source_dropdown.set_selected(
        ImageSourceKind::ALL.iter().position(|k| *k == prefs.image_source).unwrap_or(0) as u32,
    );
    source_dropdown.connect_selected_notify({
        let state = state.clone();
        move |dropdown| {
            if let Some(kind) = ImageSourceKind::ALL.get(dropdown.selected() as usize) {
                change_image_source(&state, *kind);
            }
        }
    });

    let matched_color_button = gtk::ColorDialogButton::new(Some(gtk::ColorDialog::new()));
    matched_color_button.set_rgba(&color_to_rgba(&prefs.matched_color));
    matched_color_button.connect_rgba_notify({
        let state = state.clone();
        move |button| change_color(&state, ColorRole::Matched, rgba_to_color(&button.rgba()))
    });

    let closed_color_button = gtk::ColorDialogButton::new(Some(gtk::ColorDialog::new()));
    closed_color_button.set_rgba(&color_to_rgba(&prefs.closed_color));
    closed_color_button.connect_rgba_notify({
        let state = state.clone();
        move |button| change_color(&state, ColorRole::Closed, rgba_to_color(&button.rgba()))
    });

    let moves_label = stat_label("pairs-moves");
    let matches_label = stat_label("pairs-matches");
    let time_label = stat_label("pairs-time");

    let countdown_bar = gtk::ProgressBar::new();
    countdown_bar.add_css_class("pairs-countdown");
    countdown_bar.set_show_text(true);
    countdown_bar.set_visible(false);

    let buttons = gtk::Box::new(gtk::Orientation::Horizontal, 8);
    buttons.set_homogeneous(true);
    buttons.append(&start_button);
    buttons.append(&reset_button);

    panel.append(&buttons);
    panel.append(&labeled_row("Board", &size_dropdown));
    panel.append(&labeled_row("Images", &source_dropdown));
    panel.append(&labeled_row("Found color", &matched_color_button));
    panel.append(&labeled_row("Card back", &closed_color_button));
    panel.append(&gtk::Separator::new(gtk::Orientation::Horizontal));
    panel.append(&labeled_row("Moves", &moves_label));
    panel.append(&labeled_row("Pairs", &matches_label));
    panel.append(&labeled_row("Time", &time_label));
    panel.append(&countdown_bar);

    {
        let mut st = state.borrow_mut();
        st.start_button = Some(start_button);
        st.reset_button = Some(reset_button);
        st.size_dropdown = Some(size_dropdown);
        st.source_dropdown = Some(source_dropdown);
        st.matched_color_button = Some(matched_color_button);
        st.closed_color_button = Some(closed_color_button);
        st.moves_label = Some(moves_label);
        st.matches_label = Some(matches_label);
        st.time_label = Some(time_label);
        st.countdown_bar = Some(countdown_bar);
        set_counters(&st, 0, 0);
        set_elapsed(&st, Duration::ZERO);
        set_phase(&st, RoundPhase::NotStarted);
        apply_palette(&st, &prefs.palette());
    }

    panel
}

pub(super) fn set_phase(st: &AppState, phase: RoundPhase) {
    if let Some(start) = &st.start_button {
        start.set_sensitive(phase == RoundPhase::NotStarted);
        start.set_label(match phase {
            RoundPhase::Loading => "Loading…",
            RoundPhase::InProgress => "Playing",
            RoundPhase::NotStarted | RoundPhase::Complete => "Start Game",
        });
    }
    if let Some(subtitle) = &st.title_subtitle {
        let prefs = st.game.preferences();
        let status = match phase {
            RoundPhase::NotStarted => "Ready",
            RoundPhase::Loading => "Fetching images",
            RoundPhase::InProgress => "In progress",
            RoundPhase::Complete => "Complete",
        };
        subtitle.set_text(&format!(
            "{} | {} | {}",
            prefs.board_size.label(),
            prefs.image_source.display_name(),
            status
        ));
    }
    if phase != RoundPhase::InProgress
        && let Some(bar) = &st.countdown_bar
    {
        bar.set_visible(false);
    }
}

pub(super) fn set_counters(st: &AppState, moves: u32, matches: u32) {
    if let Some(label) = &st.moves_label {
        label.set_text(&moves.to_string());
    }
    if let Some(label) = &st.matches_label {
        let total = st.game.preferences().board_size.pair_count();
        label.set_text(&format!("{matches} / {total}"));
    }
}

pub(super) fn set_elapsed(st: &AppState, elapsed: Duration) {
    if let Some(label) = &st.time_label {
        label.set_text(&format_mm_ss(elapsed));
    }
}

pub(super) fn show_countdown(st: &AppState) {
    if let Some(bar) = &st.countdown_bar {
        bar.set_visible(true);
    }
}

pub(super) fn set_countdown(st: &AppState, remaining: Duration, duration: Duration, running: bool) {
    let Some(bar) = &st.countdown_bar else {
        return;
    };
    let fraction = if duration.is_zero() {
        0.0
    } else {
        remaining.as_secs_f64() / duration.as_secs_f64()
    };
    bar.set_fraction(fraction.clamp(0.0, 1.0));
    bar.set_text(Some(&format!("{:.1}s", remaining.as_secs_f64())));
    if running {
        bar.add_css_class("running");
    } else {
        bar.remove_css_class("running");
    }
    if !running && st.game.selection().is_empty() {
        bar.set_visible(false);
    }
}

pub(super) fn apply_palette(st: &AppState, palette: &Palette) {
    if let Some(provider) = &st.palette_css_provider {
        provider.load_from_string(&format!(
            ".pairs-tile.matched {{ box-shadow: inset 0 0 0 4px {matched}; }} \
             .pairs-tile {{ background-color: {closed}; }}",
            matched = palette.matched,
            closed = palette.closed,
        ));
    }
}

/// Brings the preference widgets in line with the controller after a
/// change that did not come from them.
pub(super) fn sync_controls(st: &AppState) {
    let prefs = st.game.preferences();
    if let Some(dropdown) = &st.size_dropdown
        && let Some(index) = BoardSize::ALL.iter().position(|s| *s == prefs.board_size)
    {
        dropdown.set_selected(index as u32);
    }
    if let Some(dropdown) = &st.source_dropdown
        && let Some(index) = ImageSourceKind::ALL.iter().position(|k| *k == prefs.image_source)
    {
        dropdown.set_selected(index as u32);
    }
    if let Some(button) = &st.matched_color_button {
        button.set_rgba(&color_to_rgba(&prefs.matched_color));
    }
    if let Some(button) = &st.closed_color_button {
        button.set_rgba(&color_to_rgba(&prefs.closed_color));
    }
}
