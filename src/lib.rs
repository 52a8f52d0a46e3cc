// 该文件是 Zhijian （质检） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod auto;
pub mod category;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod inspect;
pub mod model;
pub mod normalize;
pub mod output;
pub mod registry;
pub mod rotate;
pub mod task;
pub mod upload;

#[cfg(test)]
mod testing;

pub use crate::{
  auto::AutoInspector,
  category::{Category, ProductionLine},
  error::{ErrorKind, InspectError},
  inspect::{InspectionResult, InspectionService, Verdict},
  model::{DetectParams, Detector, DetectorLoader},
  registry::{ModelRegistry, RegistryStatus},
  rotate::{RotationMode, SampleRotator, SequenceInfo},
};
