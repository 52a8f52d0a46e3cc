// 该文件是 Zhijian （质检） 项目的一部分。
// src/auto.rs - 无上传的自动轮换检测
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

use std::sync::Arc;

use tracing::info;

use crate::{
  category::Category,
  error::{InspectError, Result},
  inspect::{InspectionResult, InspectionService},
  model::DetectParams,
  rotate::SampleRotator,
};

/// 从样本目录依次取图并检测，用于没有客户端上传时模拟实时采集
pub struct AutoInspector {
  rotator: Arc<SampleRotator>,
  service: Arc<InspectionService>,
}

impl AutoInspector {
  pub fn new(rotator: Arc<SampleRotator>, service: Arc<InspectionService>) -> Self {
    Self { rotator, service }
  }

  pub fn rotator(&self) -> &Arc<SampleRotator> {
    &self.rotator
  }

  pub fn service(&self) -> &Arc<InspectionService> {
    &self.service
  }

  pub fn predict_next(
    &self,
    category: Category,
    params: &DetectParams,
  ) -> Result<InspectionResult> {
    // 模型未就绪时不推进游标
    self.service.ensure_ready(category)?;

    let rotation = self.rotator.next(category)?;
    info!(
      "类别 {} 取样本 {}/{}: {}",
      category,
      rotation.index + 1,
      rotation.sequence.count,
      rotation.path.display()
    );

    let bytes = std::fs::read(&rotation.path).map_err(|e| InspectError::io(&rotation.path, e))?;
    let mut result = self.service.predict(category, &bytes, params)?;

    result.source = rotation
      .path
      .file_name()
      .map(|name| name.to_string_lossy().to_string());
    result.sequence = Some(rotation.sequence);
    result.original_path = Some(rotation.path);
    Ok(result)
  }

  pub fn predict_next_named(
    &self,
    category: &str,
    params: &DetectParams,
  ) -> Result<InspectionResult> {
    self.predict_next(category.parse()?, params)
  }
}
