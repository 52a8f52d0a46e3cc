// 该文件是 Zhijian （质检） 项目的一部分。
// src/model.rs - 检测模型接口
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{collections::BTreeMap, path::Path, sync::Arc};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{
  category::Category,
  error::{InspectError, Result},
  frame::Overlay,
};

/// 推理参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
  /// 置信度阈值 (0.0 - 1.0)
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  pub iou: f32,
  /// 单张图像最多保留的检测数
  pub max_detections: usize,
}

impl Default for DetectParams {
  fn default() -> Self {
    Self {
      confidence: 0.25,
      iou: 0.45,
      max_detections: 100,
    }
  }
}

impl DetectParams {
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(InspectError::InvalidParams(format!(
        "置信度阈值必须在 [0, 1] 之间, 实际为 {}",
        self.confidence
      )));
    }
    if !(0.0..=1.0).contains(&self.iou) {
      return Err(InspectError::InvalidParams(format!(
        "IOU 阈值必须在 [0, 1] 之间, 实际为 {}",
        self.iou
      )));
    }
    if self.max_detections == 0 {
      return Err(InspectError::InvalidParams("最大检测数必须大于 0".to_string()));
    }
    Ok(())
  }
}

/// 模型原始输出的单个检测框
#[derive(Debug, Clone, PartialEq)]
pub struct RawBox {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，像素坐标
}

/// 类别编号到名称的映射
pub type LabelTable = BTreeMap<u32, String>;

#[derive(Debug, Clone, Default)]
pub struct RawDetections {
  pub boxes: Vec<RawBox>,
  pub labels: LabelTable,
}

/// 检测能力。
///
/// 同一个检测器会被多个请求并发调用；若底层运行时不支持并发推理，
/// 实现方需要自行串行化（例如 `Mutex` 包裹会话）。
pub trait Detector: Send + Sync {
  fn detect(&self, image: &RgbImage, params: &DetectParams) -> Result<RawDetections>;

  /// 后端自带的可视化结果，返回 `None` 时由本库自行绘制
  fn render(&self, _image: &RgbImage, _raw: &RawDetections) -> Option<Overlay> {
    None
  }
}

#[cfg_attr(test, mockall::automock)]
pub trait DetectorLoader {
  fn load(&self, category: Category, path: &Path) -> Result<Arc<dyn Detector>>;
}

impl<F> DetectorLoader for F
where
  F: Fn(Category, &Path) -> Result<Arc<dyn Detector>>,
{
  fn load(&self, category: Category, path: &Path) -> Result<Arc<dyn Detector>> {
    self(category, path)
  }
}

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxDetector, OnnxLoader};
