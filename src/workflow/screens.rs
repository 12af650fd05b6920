use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenId {
    Upload,
    Analyzing,
    ResultsBlur,
    ResultsFull,
}

impl ScreenId {
    pub const ALL: [ScreenId; 4] = [
        ScreenId::Upload,
        ScreenId::Analyzing,
        ScreenId::ResultsBlur,
        ScreenId::ResultsFull,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ScreenId::Upload => "upload",
            ScreenId::Analyzing => "analyzing",
            ScreenId::ResultsBlur => "results-blur",
            ScreenId::ResultsFull => "results-full",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|screen| screen.as_str() == value)
    }

    pub fn dom_id(self) -> String {
        format!("screen-{}", self.as_str())
    }
}

/// Exactly one screen is active. Every render starts at the top of the
/// active screen.
#[derive(Debug, Clone)]
pub struct ScreenController {
    active: ScreenId,
    transitions: u32,
}

impl Default for ScreenController {
    fn default() -> Self {
        Self {
            active: ScreenId::Upload,
            transitions: 0,
        }
    }
}

impl ScreenController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> ScreenId {
        self.active
    }

    pub fn is_active(&self, screen: ScreenId) -> bool {
        self.active == screen
    }

    /// Unknown ids leave the current screen untouched.
    pub fn show(&mut self, screen_id: &str) -> bool {
        match ScreenId::parse(screen_id) {
            Some(screen) => {
                self.show_screen(screen);
                true
            }
            None => {
                debug!(screen_id, "Ignoring request for unknown screen");
                false
            }
        }
    }

    pub fn show_screen(&mut self, screen: ScreenId) {
        self.active = screen;
        self.transitions += 1;
        debug!(screen = screen.as_str(), "Screen activated");
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_id_activates_exactly_that_screen() {
        for screen in ScreenId::ALL {
            let mut controller = ScreenController::new();
            assert!(controller.show(screen.as_str()));
            let active: Vec<_> = ScreenId::ALL
                .into_iter()
                .filter(|candidate| controller.is_active(*candidate))
                .collect();
            assert_eq!(active, vec![screen]);
        }
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut controller = ScreenController::new();
        controller.show("results-blur");

        assert!(!controller.show("payment"));
        assert!(!controller.show(""));
        assert_eq!(controller.active(), ScreenId::ResultsBlur);
        assert_eq!(controller.transitions(), 1);
    }

    #[test]
    fn reshowing_the_active_screen_counts_as_a_transition() {
        let mut controller = ScreenController::new();
        controller.show_screen(ScreenId::Upload);
        controller.show("upload");
        assert!(controller.is_active(ScreenId::Upload));
        assert_eq!(controller.transitions(), 2);
    }

    #[test]
    fn dom_ids_follow_screen_prefix() {
        assert_eq!(ScreenId::ResultsFull.dom_id(), "screen-results-full");
        assert_eq!(ScreenId::parse(" upload "), Some(ScreenId::Upload));
    }
}
