// 该文件是 Zhijian （质检） 项目的一部分。
// src/bin/inspect_auto.rs - 样本轮换连续检测
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

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use zhijian::{
  AutoInspector, Category, InspectionService, ModelRegistry, config::InspectConfig,
  model::OnnxLoader, task::ContinuousTask,
};

/// 从样本目录轮换取图连续检测，每张结果输出一行 JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件路径 (TOML)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 零件类别，例如 door、bumper、weld_stage1
  #[arg(long, value_name = "CATEGORY")]
  pub category: Category,
  /// 检测次数，不指定时持续运行直到 Ctrl-C
  #[arg(long, value_name = "COUNT")]
  pub count: Option<usize>,
  /// 两次检测之间的间隔（毫秒）
  #[arg(long, default_value = "0", value_name = "MILLIS")]
  pub interval: u64,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub iou: Option<f32>,
  /// 最大检测数量
  #[arg(long, value_name = "COUNT")]
  pub max_detections: Option<usize>,
  /// 不保存标注图像
  #[arg(long)]
  pub no_save: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = match &args.config {
    Some(path) => InspectConfig::from_file(path)?,
    None => InspectConfig::default(),
  };

  let mut params = config.params;
  params.confidence = args.confidence.unwrap_or(params.confidence);
  params.iou = args.iou.unwrap_or(params.iou);
  params.max_detections = args.max_detections.unwrap_or(params.max_detections);

  info!("类别: {}, 样本目录: {}", args.category, config.sample_dir(args.category).display());

  let registry = Arc::new(ModelRegistry::new());
  if let Err(e) = registry.load(&config.model_paths(args.category.line()), &OnnxLoader::default()) {
    error!("模型加载失败: {}", e);
    return Err(e.into());
  }
  info!("模型状态: {:?}", registry.status());

  let service = InspectionService::new(registry, config.store()).with_draw(config.draw()?);
  let inspector = AutoInspector::new(Arc::new(config.rotator()), Arc::new(service));

  let task = ContinuousTask::default()
    .with_frame_number(args.count)
    .with_interval(Duration::from_millis(args.interval))
    .with_save(!args.no_save)
    .handle_ctrlc()?;

  let summary = task.run_task(&inspector, args.category, &params, |result| {
    match serde_json::to_string(result) {
      Ok(line) => println!("{}", line),
      Err(e) => error!("结果序列化失败: {}", e),
    }
  })?;
  info!("检测 {} 张，不合格 {} 张", summary.inspected, summary.failed);

  Ok(())
}
