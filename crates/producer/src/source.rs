use crate::scaling::RawDetection;
use shmqueue::{Detection, QueueGeometry};

/// Number of classes the synthetic objects are drawn from (COCO)
const CLASS_COUNT: u32 = 80;

#[derive(Debug, Clone)]
struct MovingObject {
    class_id: u32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    vx: f32,
    vy: f32,
    confidence: f32,
}

/// Deterministic stand-in for a camera plus detector: a set of boxes moving
/// and bouncing inside the source resolution.
pub struct SyntheticSource {
    width: f32,
    height: f32,
    objects: Vec<MovingObject>,
    rng: fastrand::Rng,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, object_count: usize, seed: Option<u64>) -> Self {
        let mut rng = seed.map(fastrand::Rng::with_seed).unwrap_or_default();
        let (w, h) = (width as f32, height as f32);

        let objects = (0..object_count)
            .map(|_| {
                let obj_w = w * (0.05 + 0.2 * rng.f32());
                let obj_h = h * (0.05 + 0.2 * rng.f32());
                MovingObject {
                    class_id: rng.u32(0..CLASS_COUNT),
                    x: rng.f32() * (w - obj_w),
                    y: rng.f32() * (h - obj_h),
                    width: obj_w,
                    height: obj_h,
                    vx: (rng.f32() - 0.5) * w * 0.02,
                    vy: (rng.f32() - 0.5) * h * 0.02,
                    confidence: 0.3 + 0.7 * rng.f32(),
                }
            })
            .collect();

        Self {
            width: w,
            height: h,
            objects,
            rng,
        }
    }

    /// Advance every object by one frame and report where they are.
    ///
    /// Boxes may briefly overshoot an edge before bouncing back, like a real
    /// detector's output near the border.
    pub fn next_detections(&mut self) -> Vec<RawDetection> {
        let (w, h) = (self.width, self.height);
        let rng = &mut self.rng;

        self.objects
            .iter_mut()
            .map(|obj| {
                obj.x += obj.vx;
                obj.y += obj.vy;
                if obj.x < 0.0 {
                    obj.vx = obj.vx.abs();
                } else if obj.x + obj.width > w {
                    obj.vx = -obj.vx.abs();
                }
                if obj.y < 0.0 {
                    obj.vy = obj.vy.abs();
                } else if obj.y + obj.height > h {
                    obj.vy = -obj.vy.abs();
                }
                obj.confidence = (obj.confidence + (rng.f32() - 0.5) * 0.05).clamp(0.05, 1.0);

                RawDetection {
                    class_id: obj.class_id,
                    confidence: obj.confidence,
                    x: obj.x,
                    y: obj.y,
                    width: obj.width,
                    height: obj.height,
                }
            })
            .collect()
    }
}

/// Paint the frame into `payload` (row-major, interleaved channels): a
/// gradient that scrolls with `frame_id`, plus each detection as a filled
/// box in its class colour.
pub fn render_frame(
    payload: &mut [u8],
    geometry: &QueueGeometry,
    frame_id: u32,
    detections: &[Detection],
) {
    let channels = geometry.channels as usize;
    let row_len = geometry.width as usize * channels;

    for (row, line) in payload.chunks_exact_mut(row_len).enumerate() {
        line.fill((row as u32).wrapping_add(frame_id) as u8);
    }

    for det in detections {
        let color = class_color(det.class_id);
        let x0 = det.x.max(0) as usize;
        let y0 = det.y.max(0) as usize;
        let x1 = (det.x + det.width).clamp(0, geometry.width as i32) as usize;
        let y1 = (det.y + det.height).clamp(0, geometry.height as i32) as usize;

        for row in y0..y1 {
            let line = &mut payload[row * row_len..(row + 1) * row_len];
            for pixel in line[x0 * channels..x1 * channels].chunks_exact_mut(channels) {
                for (c, value) in pixel.iter_mut().enumerate() {
                    *value = color[c % 3];
                }
            }
        }
    }
}

fn class_color(class_id: u32) -> [u8; 3] {
    [
        (class_id.wrapping_mul(47) % 256) as u8,
        (class_id.wrapping_mul(97) % 256) as u8,
        (class_id.wrapping_mul(151) % 256) as u8,
    ]
}
