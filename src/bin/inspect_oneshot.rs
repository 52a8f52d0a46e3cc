// 该文件是 Zhijian （质检） 项目的一部分。
// src/bin/inspect_oneshot.rs - 单张图像检测
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

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use zhijian::{
  Category, InspectionService, ModelRegistry, config::InspectConfig, model::OnnxLoader,
  upload::UploadedImage,
};

/// 对一张图像做缺陷检测，输出 JSON 结果并保存标注图像
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 配置文件路径 (TOML)
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 零件类别，例如 door、bumper、weld_stage1
  #[arg(long, value_name = "CATEGORY")]
  pub category: Category,
  /// 待检测图像
  #[arg(long, value_name = "IMAGE")]
  pub image: PathBuf,
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

  info!("类别: {} (产线 {})", args.category, args.category.line());
  info!("输入图像: {}", args.image.display());

  let registry = Arc::new(ModelRegistry::new());
  registry.load(&config.model_paths(args.category.line()), &OnnxLoader::default())?;
  info!("模型状态: {:?}", registry.status());

  let service = InspectionService::new(registry, config.store()).with_draw(config.draw()?);
  let upload = UploadedImage::from_path(&args.image)?;

  let now = std::time::Instant::now();
  let mut result = service.predict_upload(args.category, &upload, &params)?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  if !args.no_save {
    let prefix = format!("{}_{}", args.category, upload.stem());
    let path = service.persist(&mut result, &prefix)?;
    info!("标注图像已保存: {}", path.display());
  }

  println!("{}", serde_json::to_string_pretty(&result)?);
  Ok(())
}
