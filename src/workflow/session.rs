use std::fmt;

use crate::models::FaceAnalysis;
use crate::workflow::upload::UploadedImage;

/// Epoch tag attached to every in-flight request. A new upload bumps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub image: UploadedImage,
    pub analysis: Option<FaceAnalysis>,
}

/// Owns the single current session and hands out fresh ids.
#[derive(Debug, Default)]
pub struct SessionContext {
    next_id: u64,
    current: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole session; any earlier analysis is dropped with it.
    pub fn begin(&mut self, image: UploadedImage) -> SessionId {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        self.current = Some(Session {
            id,
            image,
            analysis: None,
        });
        id
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current.as_ref().map(|session| session.id)
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.current_id() == Some(id)
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.current.as_ref().map(|session| &session.image)
    }

    pub fn analysis(&self) -> Option<&FaceAnalysis> {
        self.current
            .as_ref()
            .and_then(|session| session.analysis.as_ref())
    }

    /// Stores the analysis only if `id` still names the current session.
    pub fn set_analysis(&mut self, id: SessionId, analysis: FaceAnalysis) -> bool {
        match self.current.as_mut() {
            Some(session) if session.id == id => {
                session.analysis = Some(analysis);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::oval_analysis;
    use crate::workflow::upload::fixtures::uploaded_png;

    #[test]
    fn each_upload_starts_a_new_epoch() {
        let mut context = SessionContext::new();
        let first = context.begin(uploaded_png());
        assert!(context.set_analysis(first, oval_analysis()));

        let second = context.begin(uploaded_png());
        assert_ne!(first, second);
        assert!(context.analysis().is_none());
        assert!(!context.set_analysis(first, oval_analysis()));
        assert!(context.is_current(second));
    }

    #[test]
    fn reset_clears_everything() {
        let mut context = SessionContext::new();
        context.begin(uploaded_png());
        context.reset();
        assert!(context.current().is_none());
        assert!(context.image().is_none());
    }
}
