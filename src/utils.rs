use indicatif::ProgressStyle;
use opencv::core::{self, Mat, Rect, Size, Vec3f, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};

/// ImageNet 训练集的 RGB 均值
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet 训练集的 RGB 标准差
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .expect("invalid progress template")
        .progress_chars("#>-")
}

/// 解码图片为 BGR 三通道矩阵
pub fn imdecode(bytes: &[u8]) -> opencv::Result<Mat> {
    let buf = Vector::<u8>::from_slice(bytes);
    let img = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR)?;
    if img.empty() {
        return Err(opencv::Error::new(core::StsBadArg, "无法解码图片"));
    }
    Ok(img)
}

/// 将短边缩放到 `resize`，然后从中心裁剪出 `crop x crop` 的区域
pub fn resize_and_crop(img: &Mat, resize: i32, crop: i32) -> opencv::Result<Mat> {
    let (w, h) = (img.cols(), img.rows());
    let scale = resize as f64 / w.min(h) as f64;
    let size = Size::new(
        ((w as f64 * scale).round() as i32).max(crop),
        ((h as f64 * scale).round() as i32).max(crop),
    );

    let mut resized = Mat::default();
    imgproc::resize(
        img,
        &mut resized,
        size,
        0.,
        0.,
        imgproc::InterpolationFlags::INTER_LINEAR as i32,
    )?;

    let x = (size.width - crop) / 2;
    let y = (size.height - crop) / 2;
    let roi = Mat::roi(&resized, Rect::new(x, y, crop, crop))?;
    roi.try_clone()
}

/// 将 BGR 图片转换为按 ImageNet 参数归一化的 CHW 排列的 RGB 数据
pub fn to_chw_normalized(img: &Mat) -> opencv::Result<Vec<f32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(img, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    let mut float = Mat::default();
    rgb.convert_to(&mut float, core::CV_32FC3, 1. / 255., 0.)?;

    let pixels = float.data_typed::<Vec3f>()?;
    let plane = pixels.len();
    let mut chw = vec![0f32; plane * 3];
    for (i, px) in pixels.iter().enumerate() {
        for c in 0..3 {
            chw[c * plane + i] = (px[c] - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    Ok(chw)
}
