use rand::Rng;

pub const BLINK_CHANCE: f64 = 0.01;
pub const BLINK_DECAY: f32 = 0.86;

/// Per-frame inputs to the avatar drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameState {
    /// 0 closed, 1 fully open.
    pub mouth: f32,
    /// 0 eyes open, 1 shut.
    pub blink: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Blink {
    level: f32,
}

impl Blink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Advances one frame: occasionally shut, always decay.
    pub fn step(&mut self, rng: &mut impl Rng) -> f32 {
        if rng.gen_bool(BLINK_CHANCE) {
            self.level = 1.0;
        }
        self.level *= BLINK_DECAY;
        self.level
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }
}

/// Geometry of the holographic head for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarLayout {
    pub center: (f32, f32),
    pub radius: f32,
    pub left_eye: Rect,
    pub right_eye: Rect,
    pub pupil_radius: f32,
    pub mouth: Rect,
}

impl AvatarLayout {
    pub fn compute(width: f32, height: f32, state: &FrameState) -> Self {
        let cx = width * 0.5;
        let cy = height * 0.48;
        let r = width.min(height) * 0.32;

        let eye_y = cy - r * 0.15;
        let eye_dx = r * 0.35;
        let eye_w = r * 0.18;
        let eye_h = r * 0.10;
        let half_h = (eye_h * (1.0 - state.blink.clamp(0.0, 1.0))).max(1.0);

        let mouth_y = cy + r * 0.25;
        let mouth_w = r * 0.55;
        let mouth_h = r * 0.10 + state.mouth.clamp(0.0, 1.0) * r * 0.22;

        Self {
            center: (cx, cy),
            radius: r,
            left_eye: Rect::centered(cx - eye_dx, eye_y, eye_w * 2.0, half_h * 2.0),
            right_eye: Rect::centered(cx + eye_dx, eye_y, eye_w * 2.0, half_h * 2.0),
            pupil_radius: eye_w * 0.35,
            mouth: Rect::centered(cx, mouth_y, mouth_w, mouth_h),
        }
    }
}

/// Drawing surface for the avatar.
pub trait AvatarCanvas {
    fn size(&self) -> (f32, f32);
    fn draw(&mut self, layout: &AvatarLayout, state: &FrameState);
}
