use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::llm::ImagePayload;
use crate::models::{GeneratedStyleImage, GenerationStatus, StyleImageResponse, StyleRecommendation};
use crate::workflow::service::{ServiceError, StyleService};
use crate::workflow::session::SessionId;

/// Completion report for one recommendation, tagged with its session.
#[derive(Debug)]
pub struct StyleOutcome {
    pub session: SessionId,
    pub index: usize,
    pub style_name: String,
    pub result: Result<StyleImageResponse, ServiceError>,
}

/// Receiving end of one fan-out: outcomes arrive in completion order.
pub struct FanOut {
    session: SessionId,
    receiver: mpsc::UnboundedReceiver<StyleOutcome>,
    requested: usize,
}

impl FanOut {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn len(&self) -> usize {
        self.requested
    }

    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }

    /// Next completion, or `None` once every task has reported or died.
    pub async fn next(&mut self) -> Option<StyleOutcome> {
        self.receiver.recv().await
    }
}

/// Issues one independent generation request per recommendation. Tasks do
/// not wait on each other and are never retried.
pub fn request_all<S: StyleService>(
    service: Arc<S>,
    session: SessionId,
    recommendations: &[StyleRecommendation],
    image: &ImagePayload,
) -> FanOut {
    let (sender, receiver) = mpsc::unbounded_channel();
    let image = Arc::new(image.clone());

    for (index, recommendation) in recommendations.iter().enumerate() {
        let service = Arc::clone(&service);
        let sender = sender.clone();
        let image = Arc::clone(&image);
        let prompt = recommendation.generation_prompt.clone();
        let style_name = recommendation.name.clone();
        tokio::spawn(async move {
            let result = service.generate_style(&image, &prompt, &style_name).await;
            let outcome = StyleOutcome {
                session,
                index,
                style_name,
                result,
            };
            if sender.send(outcome).is_err() {
                warn!(%session, index, "Style outcome dropped; receiver is gone");
            }
        });
    }

    info!(%session, count = recommendations.len(), "Style generation fan-out started");
    FanOut {
        session,
        receiver,
        requested: recommendations.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotUpdate {
    Ready,
    Failed,
    /// The outcome belongs to an earlier session.
    Stale,
    /// The slot already left its loading state.
    AlreadySettled,
    OutOfRange,
}

pub const FAILURE_TEXT: &str = "실패";

/// Per-card image slots for one session, addressed by recommendation index.
#[derive(Debug, Clone)]
pub struct StyleSlots {
    session: SessionId,
    slots: Vec<GeneratedStyleImage>,
}

impl StyleSlots {
    pub fn pending(session: SessionId, count: usize) -> Self {
        Self {
            session,
            slots: (0..count).map(GeneratedStyleImage::pending).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&GeneratedStyleImage> {
        self.slots.get(index)
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_pending()).count()
    }

    pub fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.status, GenerationStatus::Ready { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.status, GenerationStatus::Failed))
            .count()
    }

    /// Patches only the slot the outcome names; siblings are never touched.
    pub fn apply(&mut self, outcome: StyleOutcome) -> SlotUpdate {
        if outcome.session != self.session {
            return SlotUpdate::Stale;
        }
        let Some(slot) = self.slots.get_mut(outcome.index) else {
            return SlotUpdate::OutOfRange;
        };
        if !slot.is_pending() {
            return SlotUpdate::AlreadySettled;
        }

        match outcome.result {
            Ok(response) => {
                slot.status = GenerationStatus::Ready {
                    image_data: response.image,
                };
                slot.status_text = response.text;
                SlotUpdate::Ready
            }
            Err(err) => {
                warn!(
                    style = %outcome.style_name,
                    index = slot.source_recommendation_index,
                    "Style generation failed: {err}"
                );
                slot.status = GenerationStatus::Failed;
                slot.status_text = Some(FAILURE_TEXT.to_string());
                SlotUpdate::Failed
            }
        }
    }

    /// Marks anything still loading as failed, for when the fan-out ended
    /// without reporting every index.
    pub fn fail_unreported(&mut self) -> usize {
        let mut count = 0;
        for slot in self.slots.iter_mut().filter(|slot| slot.is_pending()) {
            warn!(
                index = slot.source_recommendation_index,
                "Style request ended without reporting"
            );
            slot.status = GenerationStatus::Failed;
            slot.status_text = Some(FAILURE_TEXT.to_string());
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::models::fixtures::oval_analysis;
    use crate::workflow::service::fixtures::FakeStyleService;
    use crate::workflow::session::SessionContext;
    use crate::workflow::upload::fixtures::uploaded_png;

    fn outcome(session: SessionId, index: usize, ok: bool) -> StyleOutcome {
        StyleOutcome {
            session,
            index,
            style_name: format!("style-{index}"),
            result: if ok {
                Ok(StyleImageResponse {
                    image: format!("data:image/png;base64,{index}"),
                    text: None,
                })
            } else {
                Err(ServiceError::Transport("boom".to_string()))
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_touch_siblings() {
        let analysis = oval_analysis();
        let failing = analysis.recommendations[2].name.clone();
        let service = Arc::new(FakeStyleService {
            failing_styles: HashSet::from([failing]),
            style_delays: [
                (analysis.recommendations[0].name.clone(), Duration::from_millis(900)),
                (analysis.recommendations[4].name.clone(), Duration::from_millis(10)),
            ]
            .into_iter()
            .collect(),
            ..FakeStyleService::default()
        });

        let mut sessions = SessionContext::new();
        let image = uploaded_png();
        let session = sessions.begin(image.clone());

        let mut fan_out = request_all(
            Arc::clone(&service),
            session,
            &analysis.recommendations,
            &image.payload,
        );
        assert_eq!(fan_out.len(), 5);

        let mut slots = StyleSlots::pending(session, analysis.recommendations.len());
        let mut order = Vec::new();
        while let Some(outcome) = fan_out.next().await {
            order.push(outcome.index);
            slots.apply(outcome);
        }

        assert_eq!(slots.ready_count(), 4);
        assert_eq!(slots.failed_count(), 1);
        assert_eq!(slots.get(2).unwrap().status, GenerationStatus::Failed);
        for index in [0, 1, 3, 4] {
            let image = slots.get(index).unwrap().image_data().unwrap();
            assert!(image.ends_with(&analysis.recommendations[index].name));
        }
        // The slowest request finishes last regardless of issue order.
        assert_eq!(order.last(), Some(&0));
        assert_eq!(service.generate_calls.lock().len(), 5);
    }

    #[test]
    fn stale_outcomes_are_discarded() {
        let mut sessions = SessionContext::new();
        let old = sessions.begin(uploaded_png());
        let current = sessions.begin(uploaded_png());

        let mut slots = StyleSlots::pending(current, 3);
        assert_eq!(slots.apply(outcome(old, 1, true)), SlotUpdate::Stale);
        assert_eq!(slots.pending_count(), 3);
    }

    #[test]
    fn slots_settle_at_most_once() {
        let mut sessions = SessionContext::new();
        let session = sessions.begin(uploaded_png());
        let mut slots = StyleSlots::pending(session, 2);

        assert_eq!(slots.apply(outcome(session, 0, false)), SlotUpdate::Failed);
        assert_eq!(
            slots.apply(outcome(session, 0, true)),
            SlotUpdate::AlreadySettled
        );
        assert_eq!(slots.apply(outcome(session, 7, true)), SlotUpdate::OutOfRange);
        assert_eq!(slots.get(0).unwrap().status_text.as_deref(), Some(FAILURE_TEXT));
    }

    #[test]
    fn unreported_slots_fail_when_fan_out_ends() {
        let mut sessions = SessionContext::new();
        let session = sessions.begin(uploaded_png());
        let mut slots = StyleSlots::pending(session, 3);
        slots.apply(outcome(session, 1, true));
        assert_eq!(slots.fail_unreported(), 2);
        assert_eq!(slots.pending_count(), 0);
        assert_eq!(slots.ready_count(), 1);
    }
}
