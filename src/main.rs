use anyhow::Context;
use detect_view::{client::AnalyzeClient, config, telemetry, DetectApp};
use eframe::egui;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let config = config::get_configuration().context("failed to load configuration")?;
    telemetry::init_tracing(&config);

    let image_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &image_path {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    let client = AnalyzeClient::new(&config.server)?;
    tracing::info!(endpoint = %client.endpoint(), "starting detect-view");

    let title = match &image_path {
        Some(path) => format!(
            "detect-view — {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        ),
        None => "detect-view".to_string(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_title(&title),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    let style = config.overlay.style();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            let mut app = DetectApp::new(cc.egui_ctx.clone(), handle, client, style);
            if let Some(path) = image_path {
                app.select(path);
            }
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to run eframe: {}", e))?;

    Ok(())
}
