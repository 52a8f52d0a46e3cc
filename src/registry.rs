// 该文件是 Zhijian （质检） 项目的一部分。
// src/registry.rs - 模型注册表
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
  path::PathBuf,
  sync::{Arc, Mutex, PoisonError, RwLock},
  time::Instant,
};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
  category::Category,
  error::{InspectError, Result},
  model::{Detector, DetectorLoader},
};

#[derive(Clone)]
pub struct RegistryEntry {
  pub category: Category,
  pub path: PathBuf,
  pub detector: Arc<dyn Detector>,
}

impl std::fmt::Debug for RegistryEntry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RegistryEntry")
      .field("category", &self.category)
      .field("path", &self.path)
      .finish_non_exhaustive()
  }
}

/// 一次成功加载得到的完整映射，加载后不再修改
#[derive(Debug, Default)]
struct Snapshot {
  entries: BTreeMap<Category, RegistryEntry>,
  loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryStatus {
  pub loaded: bool,
  pub error: Option<String>,
  pub categories: Vec<Category>,
}

/// 模型注册表。
///
/// 读取方只克隆当前快照的 `Arc`，加载成功后整体替换快照；
/// 加载失败不改变已发布的快照，只记录错误信息。
#[derive(Default)]
pub struct ModelRegistry {
  current: RwLock<Arc<Snapshot>>,
  last_error: RwLock<Option<String>>,
  load_lock: Mutex<()>,
}

impl ModelRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  fn snapshot(&self) -> Arc<Snapshot> {
    self
      .current
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// 先检查全部模型文件存在，再逐个加载，全部成功后整体替换
  pub fn load(
    &self,
    model_paths: &BTreeMap<Category, PathBuf>,
    loader: &dyn DetectorLoader,
  ) -> Result<()> {
    let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

    let result = Self::build_snapshot(model_paths, loader);
    match result {
      Ok(snapshot) => {
        let categories: Vec<Category> = snapshot.entries.keys().copied().collect();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("模型加载完成: {:?}", categories);
        Ok(())
      }
      Err(e) => {
        error!("模型加载失败, 保留之前的注册表: {}", e);
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
        Err(e)
      }
    }
  }

  fn build_snapshot(
    model_paths: &BTreeMap<Category, PathBuf>,
    loader: &dyn DetectorLoader,
  ) -> Result<Snapshot> {
    if model_paths.is_empty() {
      return Err(InspectError::Config("没有需要加载的模型".to_string()));
    }

    for (category, path) in model_paths {
      if !path.is_file() {
        error!("缺少模型文件: {} -> {}", category, path.display());
        return Err(InspectError::NotFound(path.clone()));
      }
    }

    let mut entries = BTreeMap::new();
    for (&category, path) in model_paths {
      info!("加载模型文件: {} -> {}", category, path.display());
      let now = Instant::now();
      let detector = loader.load(category, path)?;
      debug!("模型 {} 加载耗时: {:.2?}", category, now.elapsed());
      entries.insert(
        category,
        RegistryEntry {
          category,
          path: path.clone(),
          detector,
        },
      );
    }

    Ok(Snapshot {
      entries,
      loaded: true,
    })
  }

  pub fn is_loaded(&self) -> bool {
    self.snapshot().loaded
  }

  /// 查找类别对应的检测器，未加载或类别缺失时返回 `NotReady`
  pub fn get(&self, category: Category) -> Result<RegistryEntry> {
    let snapshot = self.snapshot();
    if !snapshot.loaded {
      return Err(InspectError::NotReady("模型尚未加载".to_string()));
    }
    snapshot
      .entries
      .get(&category)
      .cloned()
      .ok_or_else(|| {
        InspectError::NotReady(format!("类别 {} 没有已加载的模型", category))
      })
  }

  pub fn status(&self) -> RegistryStatus {
    let snapshot = self.snapshot();
    RegistryStatus {
      loaded: snapshot.loaded,
      error: self
        .last_error
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone(),
      categories: snapshot.entries.keys().copied().collect(),
    }
  }
}
