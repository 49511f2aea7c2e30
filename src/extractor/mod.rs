mod onnx;

use std::path::PathBuf;

pub use onnx::OnnxExtractor;

use crate::error::Result;

/// 待提取特征的图片，data 为未解码的原始文件内容
pub struct ImageData {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

/// 批量特征提取器
///
/// 每次调用传入一批图片，返回同样数量、同样顺序的特征向量。
/// 同一个模型的输出维度必须保持不变。
pub trait FeatureExtractor {
    /// 输出向量的维度，在第一次提取前可能未知
    fn dimension(&self) -> Option<usize>;

    fn embed(&mut self, images: &[ImageData]) -> Result<Vec<Vec<f32>>>;
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for &mut E {
    fn dimension(&self) -> Option<usize> {
        (**self).dimension()
    }

    fn embed(&mut self, images: &[ImageData]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(images)
    }
}

impl<E: FeatureExtractor + ?Sized> FeatureExtractor for Box<E> {
    fn dimension(&self) -> Option<usize> {
        (**self).dimension()
    }

    fn embed(&mut self, images: &[ImageData]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(images)
    }
}
