//! 帧差异度量：频域 MSE 与结构相似度 (SSIM)
//!
//! 两个函数都只接受尺寸一致的 8 位亮度平面，尺寸对齐由调用方负责。

use image::GrayImage;
use rustdct::rustfft::num_complex::Complex;
use rustdct::rustfft::FftPlanner;

use super::error::VisionError;

/// 频域差分 MSE
///
/// 对两帧做二维 DFT 并中心化零频分量，取复数差的模平方均值。
/// 对全局亮度变化非常敏感（零频分量直接反映亮度均值），对变化的空间位置不敏感。
pub fn spectral_mse(reference: &[u8], current: &[u8], width: usize, height: usize) -> f64 {
    let len = width * height;
    if len == 0 {
        return 0.0;
    }

    // DFT 是线性的：F(a) - F(b) = F(a - b)，只需一次变换
    let mut buffer: Vec<Complex<f64>> = reference
        .iter()
        .zip(current.iter())
        .take(len)
        .map(|(&a, &b)| Complex::new(a as f64 - b as f64, 0.0))
        .collect();

    fft_2d(&mut buffer, width, height);
    let centered = fft_shift(&buffer, width, height);

    centered.iter().map(|c| c.norm_sqr()).sum::<f64>() / len as f64
}

/// 行变换 + 列变换
fn fft_2d(buffer: &mut [Complex<f64>], width: usize, height: usize) {
    let mut planner = FftPlanner::<f64>::new();

    let row_fft = planner.plan_fft_forward(width);
    row_fft.process(buffer);

    let mut transposed = transpose(buffer, width, height);
    let col_fft = planner.plan_fft_forward(height);
    col_fft.process(&mut transposed);

    let restored = transpose(&transposed, height, width);
    buffer.copy_from_slice(&restored);
}

fn transpose(data: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for y in 0..height {
        for x in 0..width {
            out[x * height + y] = data[y * width + x];
        }
    }
    out
}

/// 把零频分量移到中心，与 numpy.fft.fftshift 一致
pub fn fft_shift<T: Copy>(data: &[T], width: usize, height: usize) -> Vec<T> {
    let mut out = data.to_vec();
    let (half_w, half_h) = (width / 2, height / 2);
    for y in 0..height {
        let dst_row = ((y + half_h) % height) * width;
        for x in 0..width {
            out[dst_row + (x + half_w) % width] = data[y * width + x];
        }
    }
    out
}

/// 结构相似度 (MSSIM)，完全相同为 1，越小结构差异越大
pub fn structural_similarity(
    reference: &[u8],
    current: &[u8],
    width: usize,
    height: usize,
) -> Result<f64, VisionError> {
    let first = gray_image(reference, width, height)?;
    let second = gray_image(current, width, height)?;

    let result = image_compare::gray_similarity_structure(
        &image_compare::Algorithm::MSSIMSimple,
        &first,
        &second,
    )
    .map_err(|e| VisionError::InvalidFrame(format!("SSIM failed: {}", e)))?;

    Ok(result.score)
}

fn gray_image(plane: &[u8], width: usize, height: usize) -> Result<GrayImage, VisionError> {
    let len = width * height;
    if len == 0 || plane.len() < len {
        return Err(VisionError::InvalidFrame(format!(
            "luma plane of {} bytes does not fit {}x{}",
            plane.len(),
            width,
            height
        )));
    }
    GrayImage::from_raw(width as u32, height as u32, plane[..len].to_vec()).ok_or_else(|| {
        VisionError::InvalidFrame(format!("cannot build {}x{} gray image", width, height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| ((i % width) * 255 / width.max(1)) as u8)
            .collect()
    }

    fn checkerboard(width: usize, height: usize, cell: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                if (x / cell + y / cell) % 2 == 0 {
                    230
                } else {
                    20
                }
            })
            .collect()
    }

    #[test]
    fn test_spectral_mse_identical_is_zero() {
        let img = gradient(64, 48);
        assert!(spectral_mse(&img, &img, 64, 48).abs() < 1e-9);
    }

    #[test]
    fn test_spectral_mse_uniform_shift_hits_dc() {
        // 均匀亮度差 d，只有零频分量非零：|N*d|^2 / N = N * d^2
        let a = vec![50u8; 32 * 32];
        let b = vec![150u8; 32 * 32];
        let mse = spectral_mse(&a, &b, 32, 32);
        let expected = (32.0 * 32.0) * 100.0 * 100.0;
        assert!((mse - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn test_spectral_mse_odd_dimensions() {
        let a = gradient(15, 9);
        let mut b = a.clone();
        b[20] = b[20].wrapping_add(90);
        assert!(spectral_mse(&a, &b, 15, 9) > 0.0);
    }

    #[test]
    fn test_fft_shift_matches_numpy() {
        // numpy.fft.fftshift([[0,1,2],[3,4,5]]) == [[5,3,4],[2,0,1]]
        let data = [0, 1, 2, 3, 4, 5];
        assert_eq!(fft_shift(&data, 3, 2), vec![5, 3, 4, 2, 0, 1]);
    }

    #[test]
    fn test_ssim_identical_is_one() {
        let img = checkerboard(40, 30, 5);
        let score = structural_similarity(&img, &img, 40, 30).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ssim_drops_for_different_structure() {
        let a = checkerboard(40, 40, 4);
        let b = gradient(40, 40);
        let score = structural_similarity(&a, &b, 40, 40).unwrap();
        assert!(score < 0.5, "score = {}", score);
    }

    #[test]
    fn test_ssim_tiny_frame() {
        let a = vec![10u8, 20, 30, 40];
        let score = structural_similarity(&a, &a, 2, 2).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ssim_rejects_short_plane() {
        let a = vec![0u8; 16];
        let short = vec![0u8; 10];
        let result = structural_similarity(&a, &short, 4, 4);
        assert!(matches!(result, Err(VisionError::InvalidFrame(_))));
        assert!(structural_similarity(&[], &[], 0, 0).is_err());
    }

    #[test]
    fn test_ssim_is_symmetric() {
        let a = checkerboard(20, 20, 3);
        let b = gradient(20, 20);
        let ab = structural_similarity(&a, &b, 20, 20).unwrap();
        let ba = structural_similarity(&b, &a, 20, 20).unwrap();
        assert!((ab - ba).abs() < 1e-9);
    }
}
