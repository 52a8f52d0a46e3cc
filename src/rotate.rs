// 该文件是 Zhijian （质检） 项目的一部分。
// src/rotate.rs - 样本图像轮换
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

//! 每个类别一把锁：读取游标与推进游标在同一临界区内完成，
//! 不同类别之间互不阻塞。外层映射锁只在首次访问某类别时短暂持有。

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
  category::Category,
  error::{InspectError, Result},
};

/// 允许的样本图像扩展名（小写）
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

pub fn has_image_extension(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

/// 样本列表的刷新方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
  /// 每次调用重新扫描目录
  #[default]
  Rescan,
  /// 首次扫描后复用文件列表
  Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceInfo {
  pub index_next: usize,
  pub count: usize,
}

/// 一次轮换的结果，序列信息与选中文件在同一临界区内取得
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
  pub path: PathBuf,
  pub index: usize,
  pub sequence: SequenceInfo,
}

#[derive(Debug, Default)]
struct RotationState {
  files: Vec<PathBuf>,
  next_index: usize,
  scanned: bool,
}

/// 类别到样本目录的映射
pub trait SampleLayout: Send + Sync {
  fn sample_dir(&self, category: Category) -> PathBuf;
}

impl<F> SampleLayout for F
where
  F: Fn(Category) -> PathBuf + Send + Sync,
{
  fn sample_dir(&self, category: Category) -> PathBuf {
    self(category)
  }
}

pub struct SampleRotator {
  layout: Box<dyn SampleLayout>,
  mode: RotationMode,
  states: Mutex<HashMap<Category, Arc<Mutex<RotationState>>>>,
}

impl std::fmt::Debug for SampleRotator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SampleRotator")
      .field("mode", &self.mode)
      .finish_non_exhaustive()
  }
}

impl SampleRotator {
  pub fn new(layout: impl SampleLayout + 'static, mode: RotationMode) -> Self {
    Self {
      layout: Box::new(layout),
      mode,
      states: Mutex::new(HashMap::new()),
    }
  }

  /// 样本目录为 `<root>/<类别>/`
  pub fn with_root(root: impl Into<PathBuf>, mode: RotationMode) -> Self {
    let root = root.into();
    Self::new(move |c: Category| root.join(c.as_str()), mode)
  }

  pub fn sample_dir(&self, category: Category) -> PathBuf {
    self.layout.sample_dir(category)
  }

  fn state(&self, category: Category) -> Arc<Mutex<RotationState>> {
    self
      .states
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(category)
      .or_default()
      .clone()
  }

  /// 列出目录下允许扩展名的文件，按路径字典序排序；目录不存在视为空
  pub fn list_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(InspectError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|e| InspectError::io(dir, e))?;
      let path = entry.path();
      if path.is_file() && has_image_extension(&path) {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }

  fn refresh(&self, category: Category, state: &mut RotationState) -> Result<()> {
    if self.mode == RotationMode::Rescan || !state.scanned {
      let dir = self.sample_dir(category);
      state.files = Self::list_samples(&dir)?;
      // 空列表不作为快照，样本出现后重新扫描
      state.scanned = !state.files.is_empty();
      debug!("类别 {} 样本数: {} ({})", category, state.files.len(), dir.display());
    }
    Ok(())
  }

  /// 取出当前游标处的样本并推进游标
  pub fn next(&self, category: Category) -> Result<Rotation> {
    let state = self.state(category);
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

    self.refresh(category, &mut state)?;
    let count = state.files.len();
    if count == 0 {
      let dir = self.sample_dir(category);
      warn!("类别 {} 没有样本图像: {}", category, dir.display());
      return Err(InspectError::NotFound(dir));
    }

    // 列表长度可能在两次调用之间变化，先取模保证索引有效
    let index = state.next_index % count;
    let path = state.files[index].clone();
    state.next_index = (index + 1) % count;

    Ok(Rotation {
      path,
      index,
      sequence: SequenceInfo {
        index_next: state.next_index,
        count,
      },
    })
  }

  /// 当前游标与样本数的只读快照，不推进游标。
  ///
  /// 已扫描过的类别返回上一次 [`SampleRotator::next`] 扫描时的样本数，
  /// Rescan 模式下也不会重新列目录；尚未扫描的类别直接统计目录。
  pub fn sequence_info(&self, category: Category) -> Result<SequenceInfo> {
    let state = self.state(category);
    let state = state.lock().unwrap_or_else(PoisonError::into_inner);

    let count = if state.scanned {
      state.files.len()
    } else {
      Self::list_samples(&self.sample_dir(category))?.len()
    };
    let index_next = if count == 0 {
      0
    } else {
      state.next_index % count
    };

    Ok(SequenceInfo { index_next, count })
  }
}
