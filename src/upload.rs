// 该文件是 Zhijian （质检） 项目的一部分。
// src/upload.rs - 上传图像的前置校验
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

use std::path::Path;

use crate::{
  error::{InspectError, Result},
  rotate::{IMAGE_EXTENSIONS, has_image_extension},
};

/// 客户端上传的图像，扩展名与样本轮换使用同一白名单
#[derive(Debug, Clone)]
pub struct UploadedImage {
  filename: String,
  bytes: Vec<u8>,
}

impl UploadedImage {
  pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
    let filename = filename.into();
    if filename.trim().is_empty() {
      return Err(InspectError::InvalidImage("文件名为空".to_string()));
    }
    if !has_image_extension(Path::new(&filename)) {
      return Err(InspectError::InvalidImage(format!(
        "不支持的文件类型: {}, 可选扩展名: {}",
        filename,
        IMAGE_EXTENSIONS.join(", ")
      )));
    }
    Ok(Self { filename, bytes })
  }

  /// 直接读取本地文件
  pub fn from_path(path: &Path) -> Result<Self> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
      std::io::ErrorKind::NotFound => InspectError::NotFound(path.to_path_buf()),
      _ => InspectError::io(path, e),
    })?;
    let filename = path
      .file_name()
      .map(|name| name.to_string_lossy().to_string())
      .unwrap_or_default();
    Self::new(filename, bytes)
  }

  pub fn filename(&self) -> &str {
    &self.filename
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// 去掉扩展名的文件名，用作输出文件前缀
  pub fn stem(&self) -> &str {
    Path::new(&self.filename)
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or("upload")
  }
}
