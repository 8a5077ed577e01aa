//! Color-space conversions used by the `color` module.

use kiln_ast::Color;

/// (hue degrees, saturation %, lightness %)
pub fn to_hsl(color: &Color) -> (f64, f64, f64) {
    let r = color.red / 255.0;
    let g = color.green / 255.0;
    let b = color.blue / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;
    let delta = max - min;
    if delta == 0.0 {
        return (0.0, 0.0, lightness * 100.0);
    }
    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };
    let hue = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (hue * 60.0, saturation * 100.0, lightness * 100.0)
}

pub fn from_hsl(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Color {
    let h = hue.rem_euclid(360.0) / 360.0;
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);
    if s == 0.0 {
        let v = l * 255.0;
        return Color::rgba(v, v, v, alpha);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |t: f64| {
        let t = t.rem_euclid(1.0);
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        v * 255.0
    };
    Color::rgba(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0), alpha)
}

/// Shift lightness by `amount` percentage points.
pub fn adjust_lightness(color: &Color, amount: f64) -> Color {
    let (h, s, l) = to_hsl(color);
    from_hsl(h, s, (l + amount).clamp(0.0, 100.0), color.alpha)
}

/// Weighted mix; `weight` is the share of `a` in 0..=1.
pub fn mix(a: &Color, b: &Color, weight: f64) -> Color {
    let w = weight * 2.0 - 1.0;
    let alpha_delta = a.alpha - b.alpha;
    let combined = if w * alpha_delta == -1.0 {
        w
    } else {
        (w + alpha_delta) / (1.0 + w * alpha_delta)
    };
    let w1 = (combined + 1.0) / 2.0;
    let w2 = 1.0 - w1;
    Color::rgba(
        a.red * w1 + b.red * w2,
        a.green * w1 + b.green * w2,
        a.blue * w1 + b.blue * w2,
        a.alpha * weight + b.alpha * (1.0 - weight),
    )
}
