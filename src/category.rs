// 该文件是 Zhijian （质检） 项目的一部分。
// src/category.rs - 检测类别
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::InspectError;

/// 检测类别，每个类别对应一个检测模型与一个样本目录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Door,
  Bumper,
  Headlamp,
  Taillamp,
  Radiator,
  WeldStage1,
  WeldStage2,
}

/// 产线，按产线分组加载模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionLine {
  BodyAssembly,
  Welding,
}

impl Category {
  pub const ALL: [Category; 7] = [
    Category::Door,
    Category::Bumper,
    Category::Headlamp,
    Category::Taillamp,
    Category::Radiator,
    Category::WeldStage1,
    Category::WeldStage2,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Door => "door",
      Category::Bumper => "bumper",
      Category::Headlamp => "headlamp",
      Category::Taillamp => "taillamp",
      Category::Radiator => "radiator",
      Category::WeldStage1 => "weld_stage1",
      Category::WeldStage2 => "weld_stage2",
    }
  }

  pub fn line(&self) -> ProductionLine {
    match self {
      Category::WeldStage1 | Category::WeldStage2 => ProductionLine::Welding,
      _ => ProductionLine::BodyAssembly,
    }
  }

  /// 模型文件名约定: `<类别>_best.<扩展名>`
  pub fn model_file_name(&self, extension: &str) -> String {
    format!("{}_best.{}", self.as_str(), extension)
  }

  fn allowed() -> String {
    Self::ALL
      .iter()
      .map(Category::as_str)
      .collect::<Vec<_>>()
      .join(", ")
  }
}

impl ProductionLine {
  pub fn categories(&self) -> &'static [Category] {
    match self {
      ProductionLine::BodyAssembly => &Category::ALL[..5],
      ProductionLine::Welding => &Category::ALL[5..],
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ProductionLine::BodyAssembly => "body_assembly",
      ProductionLine::Welding => "welding",
    }
  }
}

impl fmt::Display for ProductionLine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = InspectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_lowercase();
    Category::ALL
      .into_iter()
      .find(|c| c.as_str() == name)
      .ok_or_else(|| InspectError::InvalidCategory {
        input: s.to_string(),
        allowed: Category::allowed(),
      })
  }
}

impl FromStr for ProductionLine {
  type Err = InspectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "body" | "body_assembly" => Ok(ProductionLine::BodyAssembly),
      "weld" | "welding" => Ok(ProductionLine::Welding),
      other => Err(InspectError::Config(format!("未知产线: {}", other))),
    }
  }
}
