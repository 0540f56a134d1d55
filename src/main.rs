//! Desktop entry point.
use gtk4::glib;
use pairs::config::SessionContext;

fn main() -> glib::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let session = SessionContext::from_env();
    pairs::ui::app::run(session)
}
