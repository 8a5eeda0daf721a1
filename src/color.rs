//! LED colors.
//!
//! Channels are linear PWM intensities; no gamma correction happens at this
//! layer (the driver chip's global current control scales everything).

use smart_leds::RGB8;

/// One RGB LED color, 8 bits per channel.
pub type LedColor = RGB8;

pub const BLACK: LedColor = LedColor { r: 0, g: 0, b: 0 };
pub const WHITE: LedColor = LedColor {
    r: 0x80,
    g: 0x80,
    b: 0x80,
};
pub const BRIGHT_WHITE: LedColor = LedColor {
    r: 0xFF,
    g: 0xFF,
    b: 0xFF,
};
pub const RED: LedColor = LedColor { r: 0xFF, g: 0, b: 0 };
pub const GREEN: LedColor = LedColor { r: 0, g: 0xFF, b: 0 };
pub const BLUE: LedColor = LedColor { r: 0, g: 0, b: 0xFF };
pub const YELLOW: LedColor = LedColor {
    r: 0xFF,
    g: 0xFF,
    b: 0,
};
pub const CYAN: LedColor = LedColor {
    r: 0,
    g: 0xFF,
    b: 0xFF,
};
pub const MAGENTA: LedColor = LedColor {
    r: 0xFF,
    g: 0,
    b: 0xFF,
};

/// Per-channel increment used by the breathe animations.
pub const BREATHE_STEP: u8 = 0x20;

/// Advance `color` one breathe step and report whether the sweep finished.
///
/// Red advances by [`BREATHE_STEP`]; when it wraps, green advances; when
/// green wraps, blue advances. The sweep ends when the stepped blue value
/// lands at or above its pre-step value. Blue only moves once per full
/// red/green revolution, so the pre-step value is the sample taken when the
/// sweep began.
///
/// Note the end condition is inherited behavior, not a design goal: a
/// starting blue above 0xDF wraps on its first advance and buys the sweep an
/// extra full revolution.
pub fn breathe_step(color: &mut LedColor) -> bool {
    let (red, red_wrapped) = color.r.overflowing_add(BREATHE_STEP);
    color.r = red;
    if !red_wrapped {
        return false;
    }

    let (green, green_wrapped) = color.g.overflowing_add(BREATHE_STEP);
    color.g = green;
    if !green_wrapped {
        return false;
    }

    let before = color.b;
    color.b = color.b.wrapping_add(BREATHE_STEP);
    color.b >= before
}
