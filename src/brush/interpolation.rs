//! Fixed-spacing interpolation between two pointer samples
//!
//! Stamping at every point produced here gives continuous coverage between
//! two pointer-move samples, however far apart they are.

/// Euclidean distance between two points
pub fn distance(x0: f32, y0: f32, x1: f32, y1: f32) -> f32 {
    let dx = x1 - x0;
    let dy = y1 - y0;
    (dx * dx + dy * dy).sqrt()
}

#[inline]
fn lerp(min: f32, max: f32, t: f32) -> f32 {
    min + (max - min) * t
}

/// Lazy sequence of points spaced `step` apart along a segment.
///
/// Yields `t = 0, s, 2s, ...` while `t <= 1`, with `s = step / distance`.
/// The start point is always the first item. The end point is only produced
/// when the distance is an exact multiple of `step`, so callers that need it
/// check [`PointsBetween::reached_end`] once the sequence is exhausted.
#[derive(Debug, Clone)]
pub struct PointsBetween {
    start: (f32, f32),
    end: (f32, f32),
    /// Parametric step; `None` for degenerate segments
    normalized_step: Option<f32>,
    index: u32,
    last_t: Option<f32>,
    done: bool,
}

impl PointsBetween {
    /// Parameter of the most recently yielded point
    pub fn last_t(&self) -> Option<f32> {
        self.last_t
    }

    /// Whether the most recently yielded point is the segment end
    pub fn reached_end(&self) -> bool {
        match (self.last_t, self.normalized_step) {
            (Some(t), Some(_)) => t >= 1.0,
            // A degenerate segment starts and ends on the same point
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

impl Iterator for PointsBetween {
    type Item = (f32, f32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(step) = self.normalized_step else {
            self.done = true;
            self.last_t = Some(0.0);
            return Some(self.start);
        };

        let t = self.index as f32 * step;
        if t > 1.0 {
            self.done = true;
            return None;
        }

        self.index += 1;
        self.last_t = Some(t);
        Some((
            lerp(self.start.0, self.end.0, t),
            lerp(self.start.1, self.end.1, t),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match self.normalized_step {
            None => (1, Some(1)),
            Some(step) => {
                let total = (1.0 / step).floor() as usize + 1;
                let remaining = total.saturating_sub(self.index as usize);
                (remaining.saturating_sub(1), Some(remaining + 1))
            }
        }
    }
}

/// Points from `(x0, y0)` towards `(x1, y1)` spaced `step` pixels apart.
///
/// A zero-length segment, or a step that is not a positive finite number,
/// yields only the start point.
pub fn points_between(x0: f32, y0: f32, x1: f32, y1: f32, step: f32) -> PointsBetween {
    let dist = distance(x0, y0, x1, y1);
    let normalized_step = if dist > 0.0 && dist.is_finite() && step > 0.0 && step.is_finite() {
        Some(step / dist)
    } else {
        None
    };

    PointsBetween {
        start: (x0, y0),
        end: (x1, y1),
        normalized_step,
        index: 0,
        last_t: None,
        done: false,
    }
}
