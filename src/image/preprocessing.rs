use crate::utils::error::DetectorError;
use crate::Result;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

/// 模型输入边长
pub const INPUT_SIZE: usize = 128;
/// 模型输入通道数 (RGB)
pub const INPUT_CHANNELS: usize = 3;

/// 形状为 (1, 128, 128, 3) 的NHWC张量，取值范围 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor(Array4<f32>);

impl NormalizedTensor {
    /// 全黑图像对应的输入，用于模型探活
    pub fn zeros() -> Self {
        Self(Array4::zeros((1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS)))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }
}

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 缩放至 128x128（不保持宽高比）并归一化到 [0, 1]。
    ///
    /// 灰度、带alpha通道和16位图像会先统一转换为8位RGB。
    pub fn to_tensor(image: &DynamicImage) -> Result<NormalizedTensor> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::ImageProcessing(format!(
                "Cannot resize an empty image ({}x{})",
                width, height
            )));
        }

        let rgb_image = image.to_rgb8();
        // 双三次插值，与PIL的默认缩放方式一致
        let resized = image::imageops::resize(
            &rgb_image,
            INPUT_SIZE as u32,
            INPUT_SIZE as u32,
            FilterType::CatmullRom,
        );

        let mut tensor = Array4::<f32>::zeros((1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..INPUT_CHANNELS {
                tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }

        Ok(NormalizedTensor(tensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn assert_valid(tensor: &NormalizedTensor) {
        assert_eq!(tensor.shape(), &[1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS]);
        assert!(tensor.as_array().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn arbitrary_sizes_produce_fixed_shape() {
        for (w, h) in [(1, 1), (300, 200), (37, 911), (128, 128), (1024, 64)] {
            let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 77]));
            let tensor = ImagePreprocessor::to_tensor(&DynamicImage::ImageRgb8(img)).unwrap();
            assert_valid(&tensor);
        }
    }

    #[test]
    fn black_image_becomes_all_zeros() {
        let img = RgbImage::from_pixel(300, 200, Rgb([0, 0, 0]));
        let tensor = ImagePreprocessor::to_tensor(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_valid(&tensor);
        assert!(tensor.as_array().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn white_image_becomes_all_ones() {
        let img = RgbImage::from_pixel(50, 80, Rgb([255, 255, 255]));
        let tensor = ImagePreprocessor::to_tensor(&DynamicImage::ImageRgb8(img)).unwrap();
        assert!(tensor.as_array().iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn channel_order_is_preserved() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 51]));
        let tensor = ImagePreprocessor::to_tensor(&DynamicImage::ImageRgb8(img)).unwrap();
        let arr = tensor.as_array();
        assert!((arr[[0, 64, 64, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(arr[[0, 64, 64, 1]], 0.0);
        assert!((arr[[0, 64, 64, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn grayscale_is_replicated_to_three_channels() {
        let img = GrayImage::from_pixel(20, 30, Luma([102]));
        let tensor = ImagePreprocessor::to_tensor(&DynamicImage::ImageLuma8(img)).unwrap();
        assert_valid(&tensor);
        let arr = tensor.as_array();
        let expected = 102.0 / 255.0;
        for c in 0..INPUT_CHANNELS {
            assert!((arr[[0, 5, 5, c]] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let img = RgbaImage::from_pixel(40, 40, Rgba([0, 255, 0, 10]));
        let tensor = ImagePreprocessor::to_tensor(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_valid(&tensor);
        let arr = tensor.as_array();
        assert_eq!(arr[[0, 0, 0, 0]], 0.0);
        assert!((arr[[0, 0, 0, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn same_input_gives_identical_tensor() {
        let img = RgbImage::from_fn(300, 200, |x, y| Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 9]));
        let dynamic = DynamicImage::ImageRgb8(img);
        let a = ImagePreprocessor::to_tensor(&dynamic).unwrap();
        let b = ImagePreprocessor::to_tensor(&dynamic).unwrap();
        assert_eq!(a, b);
    }
}
