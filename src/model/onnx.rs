// 该文件是 Zhijian （质检） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime YOLO 检测后端
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

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, PoisonError},
};

use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Value,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
  category::Category,
  error::{InspectError, Result},
  model::{DetectParams, Detector, DetectorLoader, LabelTable, RawBox, RawDetections},
};

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_INTRA_THREADS: usize = 4;
// 输出布局: [1, 4 + 类别数, 锚点数]，前 4 行为 cx, cy, w, h
const BOX_ROWS: usize = 4;

fn ort_error(context: &str, err: impl std::fmt::Display) -> InspectError {
  InspectError::Inference(format!("{}: {}", context, err))
}

#[derive(Debug, Deserialize)]
struct LabelFile {
  labels: BTreeMap<String, String>,
}

/// 读取 `<模型>.labels.toml`，文件不存在时返回空表
fn read_label_table(model_path: &Path) -> Result<LabelTable> {
  let path = model_path.with_extension("labels.toml");
  if !path.is_file() {
    warn!("未找到标签文件 {}, 使用类别编号作为标签", path.display());
    return Ok(LabelTable::new());
  }

  let text = std::fs::read_to_string(&path).map_err(|e| InspectError::io(&path, e))?;
  let file: LabelFile = toml::from_str(&text)
    .map_err(|e| InspectError::Config(format!("标签文件 {} 解析失败: {}", path.display(), e)))?;

  file
    .labels
    .into_iter()
    .map(|(id, name)| {
      id.trim()
        .parse::<u32>()
        .map(|id| (id, name))
        .map_err(|_| InspectError::Config(format!("无效的类别编号 '{}' ({})", id, path.display())))
    })
    .collect()
}

pub struct OnnxDetector {
  // ort 的会话推理需要可变引用，按模型串行
  session: Mutex<Session>,
  input_name: String,
  input_size: u32,
  labels: LabelTable,
  path: PathBuf,
}

impl std::fmt::Debug for OnnxDetector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OnnxDetector")
      .field("path", &self.path)
      .field("input_name", &self.input_name)
      .field("input_size", &self.input_size)
      .field("labels", &self.labels.len())
      .finish_non_exhaustive()
  }
}

impl OnnxDetector {
  pub fn new(path: &Path, input_size: u32, intra_threads: usize) -> Result<Self> {
    info!("加载 ONNX 模型文件: {}", path.display());

    let session = Session::builder()
      .map_err(|e| ort_error("无法创建会话", e))?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(|e| ort_error("无法设置优化级别", e))?
      .with_intra_threads(intra_threads)
      .map_err(|e| ort_error("无法设置线程数", e))?
      .commit_from_file(path)
      .map_err(|e| ort_error(&format!("无法加载模型 {}", path.display()), e))?;

    let input_name = session
      .inputs
      .first()
      .map(|input| input.name.clone())
      .unwrap_or_else(|| "images".to_string());
    debug!("模型输入: {}, 输出数量: {}", input_name, session.outputs.len());

    let labels = read_label_table(path)?;

    Ok(Self {
      session: Mutex::new(session),
      input_name,
      input_size,
      labels,
      path: path.to_path_buf(),
    })
  }

  /// 缩放到模型输入尺寸并转换为 NCHW、归一化到 [0, 1]
  fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
    let size = self.input_size;
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);

    let size = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
      for c in 0..3 {
        tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
      }
    }
    tensor
  }

  fn infer(&self, input: Array4<f32>) -> Result<(Vec<usize>, Vec<f32>)> {
    let input_value = Value::from_array(input).map_err(|e| ort_error("无法创建输入张量", e))?;

    let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
    let outputs = session
      .run(ort::inputs![self.input_name.as_str() => input_value])
      .map_err(|e| ort_error("推理失败", e))?;

    let output = outputs[0]
      .try_extract_array::<f32>()
      .map_err(|e| ort_error("无法读取输出张量", e))?;
    Ok((output.shape().to_vec(), output.iter().copied().collect()))
  }
}

impl Detector for OnnxDetector {
  fn detect(&self, image: &RgbImage, params: &DetectParams) -> Result<RawDetections> {
    let (width, height) = image.dimensions();
    let (shape, data) = self.infer(self.preprocess(image))?;

    if shape.len() != 3 || shape[0] != 1 || shape[1] <= BOX_ROWS {
      return Err(InspectError::Inference(format!(
        "意外的输出形状: {:?}, 期望 [1, 4 + 类别数, 锚点数]",
        shape
      )));
    }

    let scale = (
      width as f32 / self.input_size as f32,
      height as f32 / self.input_size as f32,
    );
    let candidates = decode_candidates(&data, shape[1], shape[2], params.confidence, scale);
    let mut boxes = nms(candidates, params.iou);
    boxes.truncate(params.max_detections);

    debug!("{}: 检测到 {} 个物体", self.path.display(), boxes.len());
    Ok(RawDetections {
      boxes,
      labels: self.labels.clone(),
    })
  }
}

/// 解析 YOLOv8 风格输出，bbox 缩放回原图像素坐标
fn decode_candidates(
  data: &[f32],
  rows: usize,
  anchors: usize,
  confidence: f32,
  (scale_x, scale_y): (f32, f32),
) -> Vec<RawBox> {
  let at = |row: usize, anchor: usize| data[row * anchors + anchor];
  let mut boxes = Vec::new();

  for anchor in 0..anchors {
    let (class_id, score) = (BOX_ROWS..rows)
      .map(|row| ((row - BOX_ROWS) as u32, at(row, anchor)))
      .fold((0u32, f32::MIN), |best, item| if item.1 > best.1 { item } else { best });

    if score < confidence {
      continue;
    }

    let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
    boxes.push(RawBox {
      class_id,
      score,
      bbox: [
        (cx - w / 2.0) * scale_x,
        (cy - h / 2.0) * scale_y,
        (cx + w / 2.0) * scale_x,
        (cy + h / 2.0) * scale_y,
      ],
    });
  }
  boxes
}

/// 按类别的非极大值抑制，结果按置信度降序
fn nms(mut boxes: Vec<RawBox>, iou_threshold: f32) -> Vec<RawBox> {
  boxes.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<RawBox> = Vec::new();
  for candidate in boxes {
    let suppressed = result
      .iter()
      .any(|kept| kept.class_id == candidate.class_id && iou(kept, &candidate) > iou_threshold);
    if !suppressed {
      result.push(candidate);
    }
  }
  result
}

/// 计算两个边界框的 IoU
fn iou(a: &RawBox, b: &RawBox) -> f32 {
  let x1 = a.bbox[0].max(b.bbox[0]);
  let y1 = a.bbox[1].max(b.bbox[1]);
  let x2 = a.bbox[2].min(b.bbox[2]);
  let y2 = a.bbox[3].min(b.bbox[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area = |r: &RawBox| (r.bbox[2] - r.bbox[0]).max(0.0) * (r.bbox[3] - r.bbox[1]).max(0.0);
  let union = area(a) + area(b) - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

/// 按文件路径加载 [`OnnxDetector`]
#[derive(Debug, Clone)]
pub struct OnnxLoader {
  pub input_size: u32,
  pub intra_threads: usize,
}

impl Default for OnnxLoader {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
      intra_threads: DEFAULT_INTRA_THREADS,
    }
  }
}

impl DetectorLoader for OnnxLoader {
  fn load(&self, category: Category, path: &Path) -> Result<Arc<dyn Detector>> {
    debug!("为类别 {} 创建 ONNX 检测器", category);
    let detector = OnnxDetector::new(path, self.input_size, self.intra_threads)?;
    Ok(Arc::new(detector))
  }
}
