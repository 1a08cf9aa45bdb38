/// Convert a point in displayed-canvas space to image pixel space.
///
/// Width and height scale independently. Callers guard against a zero
/// displayed size; [`CoordinateMapper::new`] does that for them.
pub fn to_image_space(
    display_x: f32,
    display_y: f32,
    image_width: f32,
    image_height: f32,
    displayed_width: f32,
    displayed_height: f32,
) -> (f32, f32) {
    (
        image_width / displayed_width * display_x,
        image_height / displayed_height * display_y,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    image_width: f32,
    image_height: f32,
    displayed_width: f32,
    displayed_height: f32,
}

impl CoordinateMapper {
    /// Returns `None` when the displayed size cannot be divided by
    pub fn new(
        image_width: f32,
        image_height: f32,
        displayed_width: f32,
        displayed_height: f32,
    ) -> Option<Self> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !usable(displayed_width) || !usable(displayed_height) {
            return None;
        }
        Some(Self {
            image_width,
            image_height,
            displayed_width,
            displayed_height,
        })
    }

    /// Mapper for a canvas shown at its own pixel size
    pub fn identity(width: f32, height: f32) -> Option<Self> {
        Self::new(width, height, width, height)
    }

    pub fn map(&self, display_x: f32, display_y: f32) -> (f32, f32) {
        to_image_space(
            display_x,
            display_y,
            self.image_width,
            self.image_height,
            self.displayed_width,
            self.displayed_height,
        )
    }

    pub fn scale(&self) -> (f32, f32) {
        (
            self.image_width / self.displayed_width,
            self.image_height / self.displayed_height,
        )
    }
}
