// 该文件是 Zhijian （质检） 项目的一部分。
// src/normalize.rs - 检测结果规整
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

use serde::{Deserialize, Serialize};

use crate::model::{LabelTable, RawBox};

const CONFIDENCE_DECIMALS: i32 = 4;
const BBOX_DECIMALS: i32 = 2;

/// 规整后的单个检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub class_id: u32,
  pub label: String,
  pub confidence: f64,
  pub bbox: [f64; 4], // [x1, y1, x2, y2]
}

/// 四舍五入到指定小数位（远离零方向）
pub fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

/// 保持原有顺序，不丢弃任何检测框
pub fn normalize(raw: &[RawBox], labels: &LabelTable) -> Vec<Detection> {
  raw
    .iter()
    .map(|item| Detection {
      class_id: item.class_id,
      label: labels
        .get(&item.class_id)
        .cloned()
        .unwrap_or_else(|| item.class_id.to_string()),
      confidence: round_to(item.score as f64, CONFIDENCE_DECIMALS),
      bbox: item.bbox.map(|v| round_to(v as f64, BBOX_DECIMALS)),
    })
    .collect()
}
