// 该文件是 Zhijian （质检） 项目的一部分。
// src/testing.rs - 单元测试公用的检测器与样本
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
  io::Cursor,
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use image::{ImageFormat, RgbImage};

use crate::{
  category::Category,
  error::Result,
  frame::{BgrFrame, Overlay},
  model::{DetectParams, Detector, LabelTable, RawBox, RawDetections},
  registry::ModelRegistry,
};

/// 每次调用返回固定结果，并记录调用次数
#[derive(Default)]
pub(crate) struct ScriptedDetector {
  pub boxes: Vec<RawBox>,
  pub labels: LabelTable,
  pub calls: AtomicUsize,
  /// 以 BGR 顺序返回纯红色叠加图
  pub bgr_render: bool,
}

impl ScriptedDetector {
  pub fn with_boxes(boxes: Vec<RawBox>, labels: &[(u32, &str)]) -> Self {
    Self {
      boxes,
      labels: labels.iter().map(|(id, name)| (*id, name.to_string())).collect(),
      ..Default::default()
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl Detector for ScriptedDetector {
  fn detect(&self, _image: &RgbImage, _params: &DetectParams) -> Result<RawDetections> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(RawDetections {
      boxes: self.boxes.clone(),
      labels: self.labels.clone(),
    })
  }

  fn render(&self, image: &RgbImage, _raw: &RawDetections) -> Option<Overlay> {
    if !self.bgr_render {
      return None;
    }
    let (width, height) = image.dimensions();
    let pixels = [0u8, 0, 255].repeat((width * height) as usize);
    BgrFrame::from_raw(width, height, pixels).ok().map(Overlay::Bgr)
  }
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
  let image = RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90]));
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, ImageFormat::Png).unwrap();
  buffer.into_inner()
}

/// 在 `dir` 下写入占位模型文件，返回类别到路径的映射
pub(crate) fn touch_models(dir: &Path, categories: &[Category]) -> BTreeMap<Category, PathBuf> {
  categories
    .iter()
    .map(|&c| {
      let path = dir.join(c.model_file_name("onnx"));
      std::fs::write(&path, b"model").unwrap();
      (c, path)
    })
    .collect()
}

/// 所有类别共享同一个检测器的已加载注册表
pub(crate) fn loaded_registry(
  dir: &Path,
  categories: &[Category],
  detector: Arc<ScriptedDetector>,
) -> Arc<ModelRegistry> {
  let registry = Arc::new(ModelRegistry::new());
  let paths = touch_models(dir, categories);
  registry
    .load(&paths, &|_c: Category, _p: &Path| -> Result<Arc<dyn Detector>> {
      Ok(detector.clone() as Arc<dyn Detector>)
    })
    .unwrap();
  registry
}
