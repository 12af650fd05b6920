use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::CONFIG;
use crate::models::FaceAnalysis;
use crate::view::{components, Node};
use crate::workflow::fanout::{self, FanOut, SlotUpdate, StyleOutcome, StyleSlots};
use crate::workflow::progress::{ProgressDisplay, ProgressSource, SimulatedProgress};
use crate::workflow::screens::{ScreenController, ScreenId};
use crate::workflow::service::StyleService;
use crate::workflow::session::{SessionContext, SessionId};
use crate::workflow::upload::{prepare_upload, SelectedFile, UploadStageView, UploadedImage};
use crate::workflow::viewer::ViewerSession;

#[derive(Debug, Clone, Copy)]
pub struct WorkflowTimings {
    pub progress_tick: Duration,
    pub result_pacing: Duration,
    pub payment_delay: Duration,
}

impl WorkflowTimings {
    pub fn from_config() -> Self {
        Self {
            progress_tick: CONFIG.progress_tick(),
            result_pacing: CONFIG.result_pacing(),
            payment_delay: CONFIG.payment_delay(),
        }
    }
}

impl Default for WorkflowTimings {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(200),
            result_pacing: Duration::from_millis(500),
            payment_delay: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// No image selected; nothing was sent.
    Skipped,
    Completed,
    Failed(String),
}

/// Trigger state for the simulated payment button.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaywallState {
    pub processing: bool,
    pub method: Option<String>,
}

/// Owns every piece of client state and drives the disclosure workflow.
pub struct App<S: StyleService> {
    service: Arc<S>,
    timings: WorkflowTimings,
    screens: ScreenController,
    sessions: SessionContext,
    progress: ProgressDisplay,
    paywall: PaywallState,
    slots: Option<StyleSlots>,
    notice: Option<String>,
}

impl<S: StyleService> App<S> {
    pub fn new(service: Arc<S>, timings: WorkflowTimings) -> Self {
        Self {
            service,
            timings,
            screens: ScreenController::new(),
            sessions: SessionContext::new(),
            progress: ProgressDisplay::default(),
            paywall: PaywallState::default(),
            slots: None,
            notice: None,
        }
    }

    pub fn screens(&self) -> &ScreenController {
        &self.screens
    }

    pub fn show(&mut self, screen_id: &str) -> bool {
        self.screens.show(screen_id)
    }

    pub fn progress(&self) -> &ProgressDisplay {
        &self.progress
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.sessions.image()
    }

    pub fn analysis(&self) -> Option<&FaceAnalysis> {
        self.sessions.analysis()
    }

    pub fn slots(&self) -> Option<&StyleSlots> {
        self.slots.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn upload_view(&self) -> UploadStageView {
        UploadStageView::from_image(self.sessions.image())
    }

    /// A cancelled picker hands over nothing and changes nothing.
    pub fn on_file_selected(&mut self, file: Option<SelectedFile>) -> Option<SessionId> {
        let file = file?;
        let uploaded = prepare_upload(file);
        let id = self.sessions.begin(uploaded);
        self.slots = None;
        self.paywall = PaywallState::default();
        info!(session = %id, "Image selected");
        Some(id)
    }

    pub fn reset(&mut self) {
        self.sessions.reset();
        self.slots = None;
        self.notice = None;
        self.paywall = PaywallState::default();
        self.progress = ProgressDisplay::default();
        self.screens.show_screen(ScreenId::Upload);
    }

    pub async fn start_analysis(&mut self) -> AnalysisOutcome {
        let progress = SimulatedProgress::new(self.timings.progress_tick);
        self.start_analysis_with(progress).await
    }

    /// Runs one analyze request while `progress` animates the display.
    /// The progress source is dropped before any result is shown.
    pub async fn start_analysis_with<P: ProgressSource>(
        &mut self,
        mut progress: P,
    ) -> AnalysisOutcome {
        let Some(session) = self.sessions.current() else {
            return AnalysisOutcome::Skipped;
        };
        let session_id = session.id;
        let image = session.image.payload.clone();

        self.notice = None;
        self.screens.show_screen(ScreenId::Analyzing);
        self.progress.start();

        let service = Arc::clone(&self.service);
        let request = async move { service.analyze(&image).await };
        tokio::pin!(request);

        let result = loop {
            tokio::select! {
                biased;
                result = &mut request => break result,
                reading = progress.next_reading() => {
                    self.progress.set(reading);
                    debug!(percent = self.progress.percent(), "Analysis progress");
                }
            }
        };
        drop(progress);
        self.progress.stop();

        match result {
            Ok(analysis) => {
                self.progress.finish();
                tokio::time::sleep(self.timings.result_pacing).await;
                self.sessions.set_analysis(session_id, analysis);
                self.slots = None;
                self.screens.show_screen(ScreenId::ResultsBlur);
                info!(session = %session_id, "Teaser results shown");
                AnalysisOutcome::Completed
            }
            Err(err) => {
                let message = format!("분석 중 오류가 발생했습니다: {err}");
                warn!(session = %session_id, "Analysis failed: {err}");
                self.notice = Some(message.clone());
                self.screens.show_screen(ScreenId::Upload);
                AnalysisOutcome::Failed(message)
            }
        }
    }

    /// Disables the trigger and shows the processing state. Returns `false`
    /// when there is nothing to unlock or a payment is already underway.
    pub fn begin_payment(&mut self, method: &str) -> bool {
        if self.paywall.processing || self.sessions.analysis().is_none() {
            return false;
        }
        self.paywall.processing = true;
        self.paywall.method = Some(method.to_string());
        info!(method, "Simulated payment started");
        true
    }

    /// Restores the trigger, reveals full results and starts generation.
    pub fn finish_payment(&mut self) -> Option<FanOut> {
        if !self.paywall.processing {
            return None;
        }
        self.paywall.processing = false;

        let session = self.sessions.current()?;
        let analysis = session.analysis.as_ref()?;
        let session_id = session.id;
        let fan_out = fanout::request_all(
            Arc::clone(&self.service),
            session_id,
            &analysis.recommendations,
            &session.image.payload,
        );
        self.slots = Some(StyleSlots::pending(
            session_id,
            analysis.recommendations.len(),
        ));
        self.screens.show_screen(ScreenId::ResultsFull);
        Some(fan_out)
    }

    /// Simulated payment: always succeeds after the fixed delay.
    pub async fn unlock(&mut self, method: &str) -> Option<FanOut> {
        if !self.begin_payment(method) {
            return None;
        }
        tokio::time::sleep(self.timings.payment_delay).await;
        self.finish_payment()
    }

    pub fn apply_style_outcome(&mut self, outcome: StyleOutcome) -> SlotUpdate {
        match self.slots.as_mut() {
            Some(slots) => slots.apply(outcome),
            None => SlotUpdate::Stale,
        }
    }

    /// Applies outcomes as they arrive until the fan-out is exhausted.
    pub async fn collect_styles(&mut self, mut fan_out: FanOut) {
        while let Some(outcome) = fan_out.next().await {
            let index = outcome.index;
            let update = self.apply_style_outcome(outcome);
            debug!(index, ?update, "Style outcome applied");
        }

        if !self.sessions.is_current(fan_out.session()) {
            debug!(session = %fan_out.session(), "Fan-out finished for a replaced session");
            return;
        }
        if let Some(slots) = self.slots.as_mut() {
            let lost = slots.fail_unreported();
            if lost > 0 {
                warn!(lost, "Style requests ended without reporting");
            }
        }
    }

    /// Opens the before/after viewer for a card whose image is ready.
    pub fn open_comparison(&self, index: usize) -> Option<ViewerSession> {
        let session = self.sessions.current()?;
        let analysis = session.analysis.as_ref()?;
        let recommendation = analysis.recommendations.get(index)?;
        let after = self.slots.as_ref()?.get(index)?.image_data()?;
        Some(ViewerSession::open(
            session.image.preview.data_uri.clone(),
            after,
            recommendation.name.clone(),
        ))
    }

    pub fn render(&self) -> Node {
        components::app_view(components::AppView {
            screens: &self.screens,
            upload: self.upload_view(),
            progress: &self.progress,
            analysis: self.sessions.analysis(),
            original_image: self.sessions.image().map(|image| image.preview.data_uri.as_str()),
            slots: self.slots.as_ref(),
            paywall: &self.paywall,
            notice: self.notice.as_deref(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::fixtures::oval_analysis;
    use crate::models::GenerationStatus;
    use crate::workflow::progress::fixtures::ScriptedProgress;
    use crate::workflow::service::fixtures::FakeStyleService;
    use crate::workflow::upload::fixtures::selected_png;

    fn app(service: FakeStyleService) -> App<FakeStyleService> {
        App::new(Arc::new(service), WorkflowTimings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_without_image_is_a_no_op() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        assert!(!app.upload_view().analyze_enabled);
        assert_eq!(app.start_analysis().await, AnalysisOutcome::Skipped);
        assert_eq!(app.screens().active(), ScreenId::Upload);
        assert_eq!(*app.service.analyze_calls.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_picker_keeps_previous_selection() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        let first = app.on_file_selected(Some(selected_png()));
        assert!(first.is_some());
        assert_eq!(app.on_file_selected(None), None);
        assert_eq!(app.sessions.current_id(), first);
        assert!(app.upload_view().analyze_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_analysis_stops_progress_before_teaser() {
        let mut service = FakeStyleService::succeeding(oval_analysis());
        service.analyze_delay = Duration::from_secs(3);
        let mut app = app(service);
        app.on_file_selected(Some(selected_png()));

        let outcome = app.start_analysis().await;

        assert_eq!(outcome, AnalysisOutcome::Completed);
        assert_eq!(app.screens().active(), ScreenId::ResultsBlur);
        assert!(!app.progress().is_running());
        assert_eq!(app.progress().rounded(), 100);
        assert_eq!(*app.service.analyze_calls.lock(), 1);
        assert_eq!(app.analysis().unwrap().face_type, "계란형");
    }

    #[tokio::test(start_paused = true)]
    async fn progress_readings_are_clamped_for_display() {
        let mut service = FakeStyleService::rejecting("quota exceeded");
        service.analyze_delay = Duration::from_secs(1);
        let mut app = app(service);
        app.on_file_selected(Some(selected_png()));

        let outcome = app
            .start_analysis_with(ScriptedProgress::new(&[-12.0, 250.0]))
            .await;

        assert!(matches!(outcome, AnalysisOutcome::Failed(_)));
        assert_eq!(app.progress().rounded(), 100);
        assert!(!app.progress().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_analysis_returns_to_upload_and_keeps_image() {
        let mut app = app(FakeStyleService::rejecting("이미지가 너무 큽니다"));
        let session = app.on_file_selected(Some(selected_png()));

        let outcome = app.start_analysis().await;

        assert_eq!(
            outcome,
            AnalysisOutcome::Failed("분석 중 오류가 발생했습니다: 이미지가 너무 큽니다".to_string())
        );
        assert_eq!(app.screens().active(), ScreenId::Upload);
        assert_eq!(app.sessions.current_id(), session);
        assert!(app.upload_view().analyze_enabled);
        assert!(app.notice().unwrap().contains("이미지가 너무 큽니다"));
        assert!(!app.progress().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn unlock_requires_an_analysis() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        app.on_file_selected(Some(selected_png()));
        assert!(app.unlock("card").await.is_none());
        assert!(!app.paywall.processing);
    }

    #[tokio::test(start_paused = true)]
    async fn payment_disables_trigger_until_finished() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        app.on_file_selected(Some(selected_png()));
        app.start_analysis().await;

        assert!(app.begin_payment("kakaopay"));
        assert!(!app.begin_payment("kakaopay"));
        assert!(app.paywall.processing);
        assert_eq!(app.screens().active(), ScreenId::ResultsBlur);

        let fan_out = app.finish_payment().unwrap();
        assert!(!app.paywall.processing);
        assert_eq!(fan_out.len(), 5);
        assert_eq!(app.screens().active(), ScreenId::ResultsFull);
        app.collect_styles(fan_out).await;
    }

    #[tokio::test(start_paused = true)]
    async fn unlock_fans_out_and_isolates_failures() {
        let analysis = oval_analysis();
        let mut service = FakeStyleService::succeeding(analysis.clone());
        service.failing_styles = HashSet::from([analysis.recommendations[2].name.clone()]);
        let mut app = app(service);
        app.on_file_selected(Some(selected_png()));
        app.start_analysis().await;

        let fan_out = app.unlock("card").await.unwrap();
        let slots = app.slots().unwrap();
        assert_eq!(slots.pending_count(), 5);

        app.collect_styles(fan_out).await;
        let slots = app.slots().unwrap();
        assert_eq!(slots.ready_count(), 4);
        assert_eq!(slots.get(2).unwrap().status, GenerationStatus::Failed);

        assert!(app.open_comparison(2).is_none());
        let viewer = app.open_comparison(0).unwrap();
        assert_eq!(viewer.label(), analysis.recommendations[0].name);
        assert_eq!(viewer.before_image(), app.image().unwrap().preview.data_uri);
    }

    #[tokio::test(start_paused = true)]
    async fn reupload_mid_fan_out_discards_stale_results() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        app.on_file_selected(Some(selected_png()));
        app.start_analysis().await;
        let fan_out = app.unlock("card").await.unwrap();

        app.on_file_selected(Some(selected_png()));
        assert!(app.slots().is_none());

        let mut fan_out = fan_out;
        while let Some(outcome) = fan_out.next().await {
            assert_eq!(app.apply_style_outcome(outcome), SlotUpdate::Stale);
        }
        assert!(app.analysis().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn full_consultation_renders_each_stage() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        app.on_file_selected(Some(selected_png()));

        assert_eq!(app.start_analysis().await, AnalysisOutcome::Completed);
        let teaser = app.render();
        let active = teaser.find_all_by_class("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].get_attr("id"), Some("screen-results-blur"));
        assert_eq!(teaser.find_by_id("face-type-badge").unwrap().text_content(), "계란형");
        let best = teaser.find_all_by_class("best-match");
        assert_eq!(best.len(), 1);
        assert!(best[0].text_content().contains("98%"));
        assert_eq!(teaser.find_all_by_class("locked-card").len(), 4);

        let fan_out = app.unlock("card").await.unwrap();
        let loading = app.render();
        assert_eq!(
            loading.find_all_by_class("active")[0].get_attr("id"),
            Some("screen-results-full")
        );
        let cards = loading.find_by_id("full-style-cards").unwrap();
        assert_eq!(cards.children.len(), 5);
        let expected = app.analysis().unwrap().recommendations.clone();
        for (index, (card, recommendation)) in cards.children.iter().zip(&expected).enumerate() {
            let card = card.as_element().unwrap();
            assert_eq!(card.get_attr("data-index"), Some(index.to_string().as_str()));
            assert!(card.text_content().contains(&recommendation.name));
            assert!(card
                .text_content()
                .contains(&format!("{}% Match", recommendation.match_score)));
            let loader = loading.find_by_id(&format!("loader-{index}")).unwrap();
            assert_eq!(loader.text_content(), components::LOADING_TEXT);
        }

        app.collect_styles(fan_out).await;
        let report = app.render();
        for index in 0..5 {
            let image = report.find_by_id(&format!("result-img-{index}")).unwrap();
            assert!(image.get_attr("src").unwrap().ends_with(&expected[index].name));
            assert!(report.find_by_id(&format!("loader-{index}")).unwrap().has_class("hidden"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_ignores_unknown_screens() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        app.on_file_selected(Some(selected_png()));
        app.start_analysis().await;

        assert!(!app.show("payment"));
        assert_eq!(app.screens().active(), ScreenId::ResultsBlur);
        assert!(app.show("upload"));
        assert_eq!(app.screens().active(), ScreenId::Upload);
        assert!(app.upload_view().analyze_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_a_blank_upload_screen() {
        let mut app = app(FakeStyleService::succeeding(oval_analysis()));
        app.on_file_selected(Some(selected_png()));
        app.start_analysis().await;
        app.reset();
        assert_eq!(app.screens().active(), ScreenId::Upload);
        assert!(app.sessions.current_id().is_none());
        assert!(!app.upload_view().analyze_enabled);
    }
}
