//! Easing functions for the snap animation.

/// Easing curve applied to the linear progress of a tween.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    /// Linear interpolation (no easing).
    Linear,
    /// Quintic ease-out, `t ↦ (t-1)^5 + 1`. Decelerates sharply towards
    /// the end and is the default curve for snapping the panel.
    QuinticOut,
    /// Material design standard curve.
    FastOutSlowIn,
    /// Material design deceleration curve.
    LinearOutSlowIn,
}

impl Easing {
    /// Apply the easing function to a linear fraction in `[0, 1]`.
    pub fn transform(&self, fraction: f32) -> f32 {
        match self {
            Easing::Linear => fraction,
            Easing::QuinticOut => {
                let t = fraction - 1.0;
                t * t * t * t * t + 1.0
            }
            Easing::FastOutSlowIn => cubic_bezier(0.4, 0.0, 0.2, 1.0, fraction),
            Easing::LinearOutSlowIn => cubic_bezier(0.0, 0.0, 0.2, 1.0, fraction),
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::QuinticOut
    }
}

/// Cubic bezier curve approximation for easing.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, fraction: f32) -> f32 {
    if fraction <= 0.0 {
        return 0.0;
    }
    if fraction >= 1.0 {
        return 1.0;
    }

    let cx = 3.0 * x1;
    let bx = 3.0 * (x2 - x1) - cx;
    let ax = 1.0 - cx - bx;

    let cy = 3.0 * y1;
    let by = 3.0 * (y2 - y1) - cy;
    let ay = 1.0 - cy - by;

    fn sample_curve(a: f32, b: f32, c: f32, t: f32) -> f32 {
        ((a * t + b) * t + c) * t
    }

    fn sample_derivative(a: f32, b: f32, c: f32, t: f32) -> f32 {
        (3.0 * a * t + 2.0 * b) * t + c
    }

    // Newton-Raphson for the parametric value `t` matching the x fraction,
    // clamped to [0, 1] to keep the solution within bounds.
    let mut t = fraction;
    let mut newton_success = false;
    for _ in 0..8 {
        let x = sample_curve(ax, bx, cx, t) - fraction;
        if x.abs() < 1e-6 {
            newton_success = true;
            break;
        }
        let dx = sample_derivative(ax, bx, cx, t);
        if dx.abs() < 1e-6 {
            break;
        }
        t = (t - x / dx).clamp(0.0, 1.0);
    }

    if !newton_success {
        // Binary subdivision fallback when Newton-Raphson does not converge.
        let mut t0 = 0.0;
        let mut t1 = 1.0;
        t = fraction;
        for _ in 0..16 {
            let x = sample_curve(ax, bx, cx, t);
            let delta = x - fraction;
            if delta.abs() < 1e-6 {
                break;
            }
            if delta > 0.0 {
                t1 = t;
            } else {
                t0 = t;
            }
            t = 0.5 * (t0 + t1);
        }
    }

    sample_curve(ay, by, cy, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        for easing in [
            Easing::Linear,
            Easing::QuinticOut,
            Easing::FastOutSlowIn,
            Easing::LinearOutSlowIn,
        ] {
            assert_eq!(easing.transform(0.0), 0.0, "{easing:?} at 0");
            assert!(
                (easing.transform(1.0) - 1.0).abs() < 1e-5,
                "{easing:?} at 1"
            );
        }
    }

    #[test]
    fn quintic_out_matches_closed_form() {
        let t = 0.5f32;
        let expected = (t - 1.0).powi(5) + 1.0;
        assert!((Easing::QuinticOut.transform(t) - expected).abs() < 1e-6);
    }

    #[test]
    fn curves_are_monotonic() {
        for easing in [Easing::QuinticOut, Easing::FastOutSlowIn, Easing::LinearOutSlowIn] {
            let mut previous = 0.0f32;
            for i in 1..=100 {
                let value = easing.transform(i as f32 / 100.0);
                assert!(
                    value >= previous - 1e-4,
                    "{easing:?} decreased at step {i}: {value} < {previous}"
                );
                previous = value;
            }
        }
    }
}
