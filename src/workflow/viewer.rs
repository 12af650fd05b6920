/// Divider bounds in percent of width; both images stay partly visible.
pub const DIVIDER_MIN: f64 = 2.0;
pub const DIVIDER_MAX: f64 = 98.0;
pub const DIVIDER_START: f64 = 50.0;
/// Nudge applied per wheel event.
pub const WHEEL_STEP: f64 = 2.0;

pub fn clamp_divider(position: f64) -> f64 {
    if position.is_nan() {
        return DIVIDER_START;
    }
    position.clamp(DIVIDER_MIN, DIVIDER_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerInput {
    /// Pointer or touch contact at `x` pixels into a surface `width` wide.
    Press { x: f64, width: f64 },
    Drag { x: f64, width: f64 },
    Release,
    /// Positive deltas move the divider right.
    Wheel { delta_y: f64 },
}

/// One open before/after comparison. Dropped on close, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSession {
    before_image: String,
    after_image: String,
    label: String,
    position: f64,
    dragging: bool,
}

impl ViewerSession {
    pub fn open(
        before_image: impl Into<String>,
        after_image: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            before_image: before_image.into(),
            after_image: after_image.into(),
            label: label.into(),
            position: DIVIDER_START,
            dragging: false,
        }
    }

    pub fn before_image(&self) -> &str {
        &self.before_image
    }

    pub fn after_image(&self) -> &str {
        &self.after_image
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Moves the divider under the pointer. Readings from a zero-width
    /// surface or a non-finite pointer are ignored.
    fn track(&mut self, x: f64, width: f64) {
        if !x.is_finite() || !(width > 0.0 && width.is_finite()) {
            return;
        }
        self.position = clamp_divider(x / width * 100.0);
    }

    /// Replays a drag from the current divider to `target` percent.
    pub fn drag_to(&mut self, target: f64) -> f64 {
        const SURFACE: f64 = 100.0;
        self.handle(ViewerInput::Press {
            x: self.position,
            width: SURFACE,
        });
        self.handle(ViewerInput::Drag {
            x: target,
            width: SURFACE,
        });
        self.handle(ViewerInput::Release)
    }

    /// Applies `steps` wheel notches; negative steps move left.
    pub fn scroll(&mut self, steps: i32) -> f64 {
        let delta_y = f64::from(steps.signum());
        for _ in 0..steps.unsigned_abs() {
            self.handle(ViewerInput::Wheel { delta_y });
        }
        self.position
    }

    pub fn handle(&mut self, input: ViewerInput) -> f64 {
        match input {
            ViewerInput::Press { x, width } => {
                self.dragging = true;
                self.track(x, width);
            }
            ViewerInput::Drag { x, width } => {
                if self.dragging {
                    self.track(x, width);
                }
            }
            ViewerInput::Release => self.dragging = false,
            ViewerInput::Wheel { delta_y } => {
                if delta_y > 0.0 {
                    self.position = clamp_divider(self.position + WHEEL_STEP);
                } else if delta_y < 0.0 {
                    self.position = clamp_divider(self.position - WHEEL_STEP);
                }
            }
        }
        self.position
    }

    /// Right-hand inset that clips the "after" layer to the divider.
    pub fn clip_path(&self) -> String {
        format!("inset(0 0 0 {:.2}%)", self.position)
    }

    pub fn close(self) {}
}
