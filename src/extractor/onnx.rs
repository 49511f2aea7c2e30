use std::path::Path;

use log::{debug, info};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;

use super::{FeatureExtractor, ImageData};
use crate::error::{Error, Result};
use crate::utils;

/// 基于 ONNX Runtime 的卷积网络特征提取器
///
/// 模型输入为 `N x 3 x S x S` 的归一化 RGB 图片，输出的每一行（去掉批次维度后展平）
/// 作为一张图片的特征向量，例如去掉分类层的 ResNet-50 输出 2048 维向量。
pub struct OnnxExtractor {
    session: Session,
    /// 模型输入尺寸
    input_size: i32,
    /// 裁剪前短边缩放到的尺寸
    resize_size: i32,
    dimension: Option<usize>,
}

impl OnnxExtractor {
    pub fn open(model: impl AsRef<Path>, input_size: u32) -> Result<Self> {
        let model = model.as_ref();
        info!("加载 ONNX 模型: {}", model.display());

        let session = Session::builder()
            .map_err(|e| Error::extractor(format!("创建会话失败: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::extractor(format!("设置优化等级失败: {e}")))?
            .commit_from_file(model)
            .map_err(|e| Error::extractor(format!("加载模型失败: {e}")))?;

        let input_size = input_size as i32;
        // torchvision IMAGENET1K_V2 预处理：短边缩放到 232 后裁剪 224
        let resize_size = input_size * 232 / 224;

        Ok(Self { session, input_size, resize_size, dimension: None })
    }

    fn preprocess(&self, image: &ImageData) -> Result<Vec<f32>> {
        let decode = || -> opencv::Result<Vec<f32>> {
            let img = utils::imdecode(&image.data)?;
            let img = utils::resize_and_crop(&img, self.resize_size, self.input_size)?;
            utils::to_chw_normalized(&img)
        };
        decode().map_err(|e| Error::extractor(format!("处理图片 {} 失败: {e}", image.path.display())))
    }
}

impl FeatureExtractor for OnnxExtractor {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn embed(&mut self, images: &[ImageData]) -> Result<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(vec![]);
        }

        let size = self.input_size as usize;
        let mut input = Vec::with_capacity(images.len() * 3 * size * size);
        for image in images {
            input.extend(self.preprocess(image)?);
        }

        let shape = [images.len(), 3, size, size];
        let tensor = Tensor::from_array((shape, input))
            .map_err(|e| Error::extractor(format!("创建输入张量失败: {e}")))?;

        let input_name = self
            .session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| Error::extractor("模型没有输入"))?;

        let rows = {
            let outputs = self
                .session
                .run(ort::inputs![input_name => tensor])
                .map_err(|e| Error::extractor(format!("推理失败: {e}")))?;

            let output = outputs
                .iter()
                .next()
                .map(|(_, v)| v)
                .ok_or_else(|| Error::extractor("模型没有输出"))?;

            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::extractor(format!("读取输出张量失败: {e}")))?;
            debug!("输出张量形状: {:?}", shape);

            if data.is_empty() || data.len() % images.len() != 0 {
                return Err(Error::extractor(format!(
                    "输出长度 {} 无法按批次大小 {} 切分",
                    data.len(),
                    images.len()
                )));
            }
            let dimension = data.len() / images.len();
            data.chunks_exact(dimension).map(|row| row.to_vec()).collect::<Vec<_>>()
        };

        let dimension = rows[0].len();
        if let Some(expected) = self.dimension {
            if expected != dimension {
                return Err(Error::extractor(format!(
                    "输出维度从 {expected} 变为 {dimension}"
                )));
            }
        }
        self.dimension = Some(dimension);

        Ok(rows)
    }
}
