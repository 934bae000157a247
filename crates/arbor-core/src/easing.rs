// Copyright 2025 the Arbor Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Easing curves applied to an animator's linear progress.

use std::f32::consts::PI;

/// An easing curve mapping linear progress in `[0, 1]` to an eased fraction.
///
/// Animators compute `alpha(clamp((elapsed - delay) / duration, 0, 1))` and
/// interpolate with the result. Every built-in curve maps 0 to 0 and 1 to 1
/// except [`Reverse`](AlphaFunction::Reverse), which runs backwards, and
/// [`Bounce`](AlphaFunction::Bounce), which returns to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaFunction {
    /// Constant-rate interpolation.
    #[default]
    Linear,
    /// Runs the interpolation backwards (1 down to 0).
    Reverse,
    /// Quadratic acceleration from rest.
    EaseInSquare,
    /// Quadratic deceleration to rest.
    EaseOutSquare,
    /// Cubic acceleration from rest.
    EaseIn,
    /// Cubic deceleration to rest.
    EaseOut,
    /// Cubic acceleration then deceleration.
    EaseInOut,
    /// Half sine wave; smooth start and end.
    Sin,
    /// Full sine arch; rises to 1 at the midpoint and falls back to 0.
    Bounce,
}

impl AlphaFunction {
    /// Applies the curve to a linear progress value.
    ///
    /// `progress` outside `[0, 1]` is clamped before the curve is evaluated.
    pub fn apply(self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Self::Linear => p,
            Self::Reverse => 1.0 - p,
            Self::EaseInSquare => p * p,
            Self::EaseOutSquare => 1.0 - (1.0 - p) * (1.0 - p),
            Self::EaseIn => p * p * p,
            Self::EaseOut => {
                let q = 1.0 - p;
                1.0 - q * q * q
            }
            Self::EaseInOut => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    let q = -2.0 * p + 2.0;
                    1.0 - q * q * q / 2.0
                }
            }
            Self::Sin => (1.0 - (PI * p).cos()) * 0.5,
            Self::Bounce => (PI * p).sin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn endpoints_are_fixed_for_forward_curves() {
        for alpha in [
            AlphaFunction::Linear,
            AlphaFunction::EaseInSquare,
            AlphaFunction::EaseOutSquare,
            AlphaFunction::EaseIn,
            AlphaFunction::EaseOut,
            AlphaFunction::EaseInOut,
            AlphaFunction::Sin,
        ] {
            assert_relative_eq!(alpha.apply(0.0), 0.0, epsilon = 1e-6);
            assert_relative_eq!(alpha.apply(1.0), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn reverse_runs_backwards() {
        assert_relative_eq!(AlphaFunction::Reverse.apply(0.0), 1.0);
        assert_relative_eq!(AlphaFunction::Reverse.apply(1.0), 0.0);
    }

    #[test]
    fn bounce_returns_to_rest() {
        assert_relative_eq!(AlphaFunction::Bounce.apply(0.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(AlphaFunction::Bounce.apply(0.5), 1.0, epsilon = 1e-6);
        assert_relative_eq!(AlphaFunction::Bounce.apply(1.0), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        assert_relative_eq!(AlphaFunction::Linear.apply(-1.0), 0.0);
        assert_relative_eq!(AlphaFunction::Linear.apply(2.0), 1.0);
        assert_relative_eq!(AlphaFunction::EaseInOut.apply(7.5), 1.0);
    }

    #[test]
    fn ease_in_lags_and_ease_out_leads_linear() {
        let p = 0.25;
        assert!(AlphaFunction::EaseIn.apply(p) < AlphaFunction::Linear.apply(p));
        assert!(AlphaFunction::EaseOut.apply(p) > AlphaFunction::Linear.apply(p));
    }
}
