use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::view::components;
use crate::workflow::screens::ScreenId;
use crate::workflow::service::StyleService;
use crate::workflow::upload::SelectedFile;
use crate::workflow::{AnalysisOutcome, App, HttpStyleService, WorkflowTimings};

#[derive(Debug, Clone, PartialEq)]
pub struct ConsultArgs {
    pub images: Vec<PathBuf>,
    pub server_url: String,
    pub out_dir: PathBuf,
    pub payment_method: String,
    /// Screen id to re-open after the run and save as `app.html`.
    pub focus: Option<String>,
    /// Divider position the comparison pages are dragged to.
    pub divider: Option<f64>,
    /// Wheel steps applied to each comparison after any drag.
    pub wheel: i32,
}

#[derive(Debug, Default)]
pub struct ConsultSummary {
    pub image: PathBuf,
    pub face_type: String,
    pub styles_ready: usize,
    pub styles_failed: usize,
    pub pages: Vec<PathBuf>,
    pub error: Option<String>,
}

async fn write_page<S: StyleService>(
    app: &App<S>,
    dir: &Path,
    name: &str,
    html: String,
) -> Result<PathBuf> {
    let path = dir.join(name);
    tokio::fs::write(&path, html)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    let screens = app.screens();
    info!(
        screen = screens.active().as_str(),
        transitions = screens.transitions(),
        "Wrote {}",
        path.display()
    );
    Ok(path)
}

fn run_dir(out_dir: &Path, run: usize, runs: usize) -> PathBuf {
    if runs > 1 {
        out_dir.join(format!("run-{}", run + 1))
    } else {
        out_dir.to_path_buf()
    }
}

/// Drives the whole workflow against a running proxy and saves each
/// screen the user would have seen as a standalone page.
pub async fn run_consult(args: ConsultArgs) -> Result<Vec<ConsultSummary>> {
    let service = Arc::new(HttpStyleService::new(&args.server_url)?);
    let mut app = App::new(service, WorkflowTimings::from_config());
    info!("Consulting via {}", args.server_url);
    consult_images(&mut app, &args).await
}

/// One consultation per image. The app is reset between images so no
/// state leaks from one run into the next.
pub async fn consult_images<S: StyleService>(
    app: &mut App<S>,
    args: &ConsultArgs,
) -> Result<Vec<ConsultSummary>> {
    if args.images.is_empty() {
        bail!("no images to consult");
    }

    let mut summaries = Vec::with_capacity(args.images.len());
    for (run, image) in args.images.iter().enumerate() {
        if run > 0 {
            app.reset();
        }
        let dir = run_dir(&args.out_dir, run, args.images.len());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let summary = consult_one(app, image, &dir, args).await?;
        if let Some(error) = &summary.error {
            warn!("Consultation for {} failed: {error}", image.display());
        }
        summaries.push(summary);
    }
    Ok(summaries)
}

async fn consult_one<S: StyleService>(
    app: &mut App<S>,
    image: &Path,
    dir: &Path,
    args: &ConsultArgs,
) -> Result<ConsultSummary> {
    let mut summary = ConsultSummary {
        image: image.to_path_buf(),
        ..ConsultSummary::default()
    };

    let file = SelectedFile::read(image).await?;
    app.on_file_selected(Some(file));
    match app.image().and_then(|uploaded| uploaded.preview.dimensions) {
        Some((width, height)) => info!("Analyzing {} ({width}x{height})", image.display()),
        None => info!("Analyzing {}", image.display()),
    }

    match app.start_analysis().await {
        AnalysisOutcome::Completed => {
            info!("Analysis reached {}", app.progress().label());
        }
        AnalysisOutcome::Failed(message) => {
            let html = components::page(&app.render());
            summary.pages.push(write_page(app, dir, "upload.html", html).await?);
            summary.error = Some(app.notice().map(str::to_string).unwrap_or(message));
            return Ok(summary);
        }
        AnalysisOutcome::Skipped => bail!("no image was selected for {}", image.display()),
    }

    let analysis = app
        .analysis()
        .ok_or_else(|| anyhow!("analysis missing after completion"))?;
    summary.face_type = analysis.face_type.clone();
    let style_count = analysis.recommendations.len();
    info!(
        "Face type {} with {} recommendations",
        summary.face_type, style_count
    );
    let html = components::page(&app.render());
    summary.pages.push(write_page(app, dir, "teaser.html", html).await?);

    let fan_out = app
        .unlock(&args.payment_method)
        .await
        .ok_or_else(|| anyhow!("nothing to unlock"))?;
    if fan_out.is_empty() {
        warn!("Analysis returned no styles to generate");
    } else {
        let pending = app.slots().map(|slots| slots.pending_count()).unwrap_or(0);
        info!("Generating {} styles ({pending} pending)", fan_out.len());
    }
    app.collect_styles(fan_out).await;

    if let Some(slots) = app.slots() {
        summary.styles_ready = slots.ready_count();
        summary.styles_failed = slots.failed_count();
    }
    let html = components::page(&app.render());
    summary.pages.push(write_page(app, dir, "report.html", html).await?);

    for index in 0..style_count {
        let Some(mut viewer) = app.open_comparison(index) else {
            continue;
        };
        if let Some(divider) = args.divider {
            viewer.drag_to(divider);
        }
        let position = viewer.scroll(args.wheel);
        info!(index, position, "Comparison prepared for {}", viewer.label());
        let html = components::comparison_page(&viewer);
        let name = format!("compare-{index}.html");
        summary.pages.push(write_page(app, dir, &name, html).await?);
        viewer.close();
    }

    if let Some(focus) = &args.focus {
        if app.show(focus) {
            let html = components::page(&app.render());
            summary.pages.push(write_page(app, dir, "app.html", html).await?);
        } else {
            let valid: Vec<&str> = ScreenId::ALL.iter().map(|screen| screen.as_str()).collect();
            warn!("Unknown screen {focus}; expected one of {}", valid.join(", "));
        }
    }

    Ok(summary)
}
