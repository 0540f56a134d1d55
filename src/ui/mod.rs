//! GTK front end. Owns the controller on the main thread and turns its
//! scheduled wakeups into glib timeouts.
pub mod app;
mod board;
mod dialogs;
mod hud;
mod records;
mod state;
