use super::error::VisionError;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use std::io::Cursor;

/// 帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    /// 所属视频源序号
    pub source_index: usize,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        source_index: usize,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            source_index,
            frame_number,
        }
    }

    /// 从 8 位灰度数据构造帧
    pub fn from_gray(
        width: u32,
        height: u32,
        gray: &[u8],
        source_index: usize,
        frame_number: u64,
    ) -> Self {
        let data = gray.iter().flat_map(|&y| [y, y, y, 255]).collect();
        Self::new(width, height, data, source_index, frame_number)
    }

    /// 从 RGB 数据构造帧
    pub fn from_rgb(
        width: u32,
        height: u32,
        rgb: &[u8],
        source_index: usize,
        frame_number: u64,
    ) -> Self {
        let data = rgb
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect();
        Self::new(width, height, data, source_index, frame_number)
    }

    pub fn from_image(image: DynamicImage, source_index: usize, frame_number: u64) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, rgba.into_raw(), source_index, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 检查尺寸与缓冲区是否一致，比较前必须通过
    pub fn validate(&self) -> Result<(), VisionError> {
        if self.width == 0 || self.height == 0 {
            return Err(VisionError::InvalidFrame(format!(
                "zero-sized frame {}x{} (source {}, frame {})",
                self.width, self.height, self.source_index, self.frame_number
            )));
        }
        if self.data.len() != self.pixel_count() * 4 {
            return Err(VisionError::InvalidFrame(format!(
                "buffer length {} does not match {}x{} RGBA (source {}, frame {})",
                self.data.len(),
                self.width,
                self.height,
                self.source_index,
                self.frame_number
            )));
        }
        Ok(())
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }
        rgb
    }

    /// 亮度平面
    pub fn to_grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(4)
            .map(|rgba| {
                let r = rgba[0] as u32;
                let g = rgba[1] as u32;
                let b = rgba[2] as u32;
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            })
            .collect()
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Result<Frame, VisionError> {
        if target_width == 0 || target_height == 0 {
            return Err(VisionError::InvalidFrame(format!(
                "cannot resize to {}x{}",
                target_width, target_height
            )));
        }
        let img = self.to_rgba_image()?;
        let resized = image::imageops::resize(
            &img,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );

        Ok(Frame {
            width: target_width,
            height: target_height,
            data: resized.into_raw(),
            source_index: self.source_index,
            frame_number: self.frame_number,
        })
    }

    /// 编码为 JPEG（上传载荷）
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, VisionError> {
        let img = DynamicImage::ImageRgb8(
            image::RgbImage::from_raw(self.width, self.height, self.to_rgb()).ok_or_else(|| {
                VisionError::InvalidFrame("RGB buffer does not match dimensions".to_string())
            })?,
        );

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
        Ok(buffer.into_inner())
    }

    fn to_rgba_image(&self) -> Result<RgbaImage, VisionError> {
        self.validate()?;
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            VisionError::InvalidFrame("RGBA buffer does not match dimensions".to_string())
        })
    }
}

/// 帧元数据（轻量级，用于日志与报告）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub source_index: usize,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            source_index: frame.source_index,
            frame_number: frame.frame_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let data = vec![255u8; 100 * 100 * 4]; // 100x100 white image
        let frame = Frame::new(100, 100, data, 2, 30);

        assert_eq!(frame.width, 100);
        assert_eq!(frame.height, 100);
        assert_eq!(frame.pixel_count(), 10000);
        assert_eq!(frame.source_index, 2);
        assert_eq!(frame.frame_number, 30);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_frame_resize() {
        let data = vec![255u8; 100 * 100 * 4];
        let frame = Frame::new(100, 100, data, 0, 0);
        let resized = frame.resize_to(32, 24).unwrap();

        assert_eq!(resized.width, 32);
        assert_eq!(resized.height, 24);
        assert_eq!(resized.data.len(), 32 * 24 * 4);
    }

    #[test]
    fn test_resize_rejects_broken_buffer() {
        let frame = Frame::new(10, 10, vec![0u8; 12], 0, 0);
        assert!(matches!(
            frame.resize_to(5, 5),
            Err(VisionError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_gray_roundtrip_keeps_luma() {
        let gray: Vec<u8> = (0..64).map(|v| (v * 4) as u8).collect();
        let frame = Frame::from_gray(8, 8, &gray, 0, 0);
        assert_eq!(frame.to_grayscale(), gray);
    }

    #[test]
    fn test_zero_sized_frame_is_invalid() {
        let frame = Frame::new(0, 10, vec![], 1, 5);
        assert!(matches!(frame.validate(), Err(VisionError::InvalidFrame(_))));
    }

    #[test]
    fn test_encode_jpeg() {
        let frame = Frame::from_rgb(16, 16, &vec![200u8; 16 * 16 * 3], 0, 0);
        let jpeg = frame.encode_jpeg(80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
