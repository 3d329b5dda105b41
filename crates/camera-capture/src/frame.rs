//! Video frame types

use image::RgbImage;

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number, starting at 1
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u64,
    ) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::Format(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Create a black frame
    pub fn blank(width: u32, height: u32, timestamp_ns: u64, sequence: u64) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * 3],
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Capture time in whole seconds since Unix epoch
    pub fn timestamp_secs(&self) -> u64 {
        self.timestamp_ns / 1_000_000_000
    }

    /// Borrow the frame as an `image` buffer for encoding
    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CameraError::Format(format!(
                "buffer of {} bytes does not fit {}x{}",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }

    /// Build a frame from a decoded image
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u64) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        let result = VideoFrame::new(vec![0; 10], 4, 4, 0, 1);
        assert!(matches!(result, Err(CameraError::Format(_))));
    }

    #[test]
    fn test_image_conversion_keeps_metadata() {
        let frame = VideoFrame::blank(8, 6, 3_500_000_000, 7);
        let img = frame.to_rgb_image().unwrap();
        assert_eq!(img.dimensions(), (8, 6));

        let back = VideoFrame::from_rgb_image(img, frame.timestamp_ns, frame.sequence);
        assert_eq!(back.sequence, 7);
        assert_eq!(back.timestamp_secs(), 3);
        assert_eq!(back.data.len(), frame.data.len());
    }
}
