// 该文件是 Zhijian （质检） 项目的一部分。
// src/config.rs - 配置
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
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
  category::{Category, ProductionLine},
  error::{InspectError, Result},
  model::DetectParams,
  output::{AnnotatedStore, draw::Draw},
  rotate::{RotationMode, SampleRotator},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
  /// 模型目录，文件名为 `<类别>_best.<model_extension>`
  pub model_dir: PathBuf,
  pub model_extension: String,
  /// 样本根目录，每个类别一个子目录
  pub sample_root: PathBuf,
  /// 个别类别的样本目录覆盖
  pub sample_dirs: BTreeMap<Category, PathBuf>,
  /// 标注图像输出目录
  pub output_dir: PathBuf,
  pub rotation: RotationMode,
  /// 标签字体文件，不设置时只绘制检测框
  pub font: Option<PathBuf>,
  pub params: DetectParams,
}

impl Default for InspectConfig {
  fn default() -> Self {
    Self {
      model_dir: PathBuf::from("models"),
      model_extension: "onnx".to_string(),
      sample_root: PathBuf::from("samples"),
      sample_dirs: BTreeMap::new(),
      output_dir: PathBuf::from("runs"),
      rotation: RotationMode::default(),
      font: None,
      params: DetectParams::default(),
    }
  }
}

impl InspectConfig {
  pub fn from_file(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
    let config = Self::from_toml(&text)?;
    info!("读取配置文件: {}", path.display());
    Ok(config)
  }

  pub fn from_toml(text: &str) -> Result<Self> {
    let config: Self =
      toml::from_str(text).map_err(|e| InspectError::Config(format!("配置解析失败: {}", e)))?;
    config.params.validate()?;
    Ok(config)
  }

  pub fn model_path(&self, category: Category) -> PathBuf {
    self
      .model_dir
      .join(category.model_file_name(&self.model_extension))
  }

  pub fn model_paths(&self, line: ProductionLine) -> BTreeMap<Category, PathBuf> {
    line
      .categories()
      .iter()
      .map(|&c| (c, self.model_path(c)))
      .collect()
  }

  pub fn sample_dir(&self, category: Category) -> PathBuf {
    self
      .sample_dirs
      .get(&category)
      .cloned()
      .unwrap_or_else(|| self.sample_root.join(category.as_str()))
  }

  pub fn rotator(&self) -> SampleRotator {
    let root = self.sample_root.clone();
    let overrides = self.sample_dirs.clone();
    SampleRotator::new(
      move |c: Category| {
        overrides
          .get(&c)
          .cloned()
          .unwrap_or_else(|| root.join(c.as_str()))
      },
      self.rotation,
    )
  }

  pub fn store(&self) -> AnnotatedStore {
    AnnotatedStore::new(&self.output_dir)
  }

  pub fn draw(&self) -> Result<Draw> {
    match &self.font {
      Some(font) => Draw::default().with_font_file(font),
      None => Ok(Draw::default()),
    }
  }
}
