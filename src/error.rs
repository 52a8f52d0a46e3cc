// 该文件是 Zhijian （质检） 项目的一部分。
// src/error.rs - 错误定义
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

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
  #[error("无效的类别 '{input}', 可选值: {allowed}")]
  InvalidCategory { input: String, allowed: String },
  #[error("模型未就绪: {0}")]
  NotReady(String),
  #[error("无效的图像: {0}")]
  InvalidImage(String),
  #[error("找不到文件: {}", .0.display())]
  NotFound(PathBuf),
  #[error("I/O 错误 ({}): {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("无效的推理参数: {0}")]
  InvalidParams(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("配置错误: {0}")]
  Config(String),
}

/// 供边界层映射响应码使用的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  InvalidCategory,
  NotReady,
  InvalidImage,
  NotFound,
  Io,
  InvalidParams,
  Inference,
  Config,
}

impl InspectError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    InspectError::Io {
      path: path.into(),
      source,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      InspectError::InvalidCategory { .. } => ErrorKind::InvalidCategory,
      InspectError::NotReady(_) => ErrorKind::NotReady,
      InspectError::InvalidImage(_) => ErrorKind::InvalidImage,
      InspectError::NotFound(_) => ErrorKind::NotFound,
      InspectError::Io { .. } => ErrorKind::Io,
      InspectError::InvalidParams(_) => ErrorKind::InvalidParams,
      InspectError::Inference(_) => ErrorKind::Inference,
      InspectError::Config(_) => ErrorKind::Config,
    }
  }
}

pub type Result<T, E = InspectError> = std::result::Result<T, E>;
