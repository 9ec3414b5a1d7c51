//! Synthetic frames and detection results for offline testing

use crate::types::{CodeRecord, FaceObservation, FrameBuffer, Point, Rect};

/// RGB frame filled with a value derived from `frame_number`.
pub fn synthetic_frame(frame_number: u64, width: u32, height: u32) -> FrameBuffer {
    let len = width as usize * height as usize * 3;
    FrameBuffer::new(width, height, vec![(frame_number % 256) as u8; len])
}

/// One batch of QR codes, payloads tagged with `batch`.
pub fn synthetic_codes(batch: u64, count: usize) -> Vec<CodeRecord> {
    (0..count)
        .map(|i| CodeRecord {
            symbology: "qr".to_string(),
            payload: format!("batch-{batch}-code-{i}"),
            bounds: Rect {
                x: 0.1 * i as f64,
                y: 0.1,
                width: 0.2,
                height: 0.2,
            },
        })
        .collect()
}

pub fn synthetic_face() -> FaceObservation {
    FaceObservation {
        bounds: Rect {
            x: 0.3,
            y: 0.3,
            width: 0.4,
            height: 0.4,
        },
        landmarks: vec![Point::new(0.4, 0.4), Point::new(0.6, 0.4), Point::center()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_correct_size() {
        let frame = synthetic_frame(0, 64, 48);
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.data.len(), 64 * 48 * 3);
    }

    #[test]
    fn test_synthetic_frames_differ() {
        let frame0 = synthetic_frame(0, 32, 24);
        let frame1 = synthetic_frame(1, 32, 24);
        assert_ne!(frame0.data[0], frame1.data[0]);
    }

    #[test]
    fn test_synthetic_codes_are_tagged() {
        let codes = synthetic_codes(7, 2);
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[1].payload, "batch-7-code-1");
    }
}
