// 该文件是 Zhijian （质检） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;
use uuid::Uuid;

use crate::error::{InspectError, Result};

/// 标注图像输出目录，目录在首次写入时创建
#[derive(Debug, Clone)]
pub struct AnnotatedStore {
  directory: PathBuf,
  extension: &'static str,
}

impl AnnotatedStore {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      extension: "jpg",
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// 文件名形如 `<前缀>_<时间>_<uuid>.jpg`
  fn unique_path(&self, prefix: &str) -> PathBuf {
    let prefix = sanitize_prefix(prefix);
    let filename = format!(
      "{}_{}_{}.{}",
      prefix,
      Local::now().format("%Y%m%d-%H%M%S"),
      Uuid::new_v4().simple(),
      self.extension
    );
    self.directory.join(filename)
  }

  pub fn save(&self, encoded: &[u8], prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(&self.directory).map_err(|e| InspectError::io(&self.directory, e))?;

    let path = self.unique_path(prefix);
    std::fs::write(&path, encoded).map_err(|e| InspectError::io(&path, e))?;

    info!("保存标注图像到文件: {}", path.display());
    Ok(path)
  }
}

fn sanitize_prefix(prefix: &str) -> String {
  let cleaned: String = prefix
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect();
  if cleaned.is_empty() {
    "inspect".to_string()
  } else {
    cleaned
  }
}
