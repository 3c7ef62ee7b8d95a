use shmqueue::Detection;

/// A detection in source-image pixel coordinates, before it is mapped into
/// the queue's frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Maps boxes from the source resolution into the published frame.
///
/// Scaled boxes are clipped so the origin lies inside the frame and the box
/// keeps at least one pixel in each direction without extending past the
/// right or bottom edge.
#[derive(Debug, Clone, Copy)]
pub struct BoxScaler {
    scale_x: f32,
    scale_y: f32,
    frame_width: i32,
    frame_height: i32,
}

impl BoxScaler {
    pub fn new(source_width: u32, source_height: u32, frame_width: u32, frame_height: u32) -> Self {
        Self {
            scale_x: frame_width as f32 / source_width as f32,
            scale_y: frame_height as f32 / source_height as f32,
            frame_width: frame_width as i32,
            frame_height: frame_height as i32,
        }
    }

    pub fn scale(&self, raw: &RawDetection) -> Detection {
        let x = ((raw.x * self.scale_x) as i32).clamp(0, self.frame_width - 1);
        let y = ((raw.y * self.scale_y) as i32).clamp(0, self.frame_height - 1);
        let width = ((raw.width * self.scale_x) as i32).min(self.frame_width - x).max(1);
        let height = ((raw.height * self.scale_y) as i32).min(self.frame_height - y).max(1);

        Detection::new(raw.class_id, raw.confidence, x, y, width, height)
    }

    pub fn scale_all(&self, raw: &[RawDetection]) -> Vec<Detection> {
        raw.iter().map(|r| self.scale(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x: f32, y: f32, width: f32, height: f32) -> RawDetection {
        RawDetection {
            class_id: 2,
            confidence: 0.8,
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_scales_from_720p_into_square_frame() {
        let scaler = BoxScaler::new(1280, 720, 640, 640);
        let det = scaler.scale(&raw(640.0, 360.0, 128.0, 72.0));

        assert_eq!((det.x, det.y, det.width, det.height), (320, 320, 64, 64));
        assert_eq!(det.class_id, 2);
        assert_eq!(det.confidence, 0.8);
    }

    #[test]
    fn test_clips_box_hanging_off_the_edge() {
        let scaler = BoxScaler::new(640, 640, 640, 640);
        let det = scaler.scale(&raw(600.0, 630.0, 100.0, 100.0));

        assert_eq!((det.x, det.y), (600, 630));
        assert_eq!((det.width, det.height), (40, 10));
    }

    #[test]
    fn test_negative_origin_is_pulled_inside() {
        let scaler = BoxScaler::new(640, 640, 640, 640);
        let det = scaler.scale(&raw(-20.0, -5.0, 50.0, 50.0));

        assert_eq!((det.x, det.y), (0, 0));
        assert_eq!((det.width, det.height), (50, 50));
    }

    #[test]
    fn test_degenerate_box_keeps_one_pixel() {
        let scaler = BoxScaler::new(1280, 720, 640, 640);
        let det = scaler.scale(&raw(5000.0, 5000.0, 0.0, 0.0));

        assert_eq!((det.x, det.y), (639, 639));
        assert_eq!((det.width, det.height), (1, 1));
    }
}
