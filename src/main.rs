use clap::Parser;

mod api;
mod app;
mod draw;
mod geometry;
mod keys;
mod model;
mod render;
mod store;
mod upload;
mod viewport;

/// Bounding-box annotation client for the weld-inspection platform.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the backend, e.g. http://localhost:8000
    #[arg(long, default_value = "http://localhost:8000")]
    server: String,

    /// Dataset to annotate
    #[arg(long)]
    dataset: i64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let title = format!("weld-annotate - dataset {}", args.dataset);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::WeldAnnotateApp::new(
                cc,
                args.server,
                args.dataset,
            )))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to start UI: {err}"))
}
