// 该文件是 Zhijian （质检） 项目的一部分。
// src/inspect.rs - 单张图像检测服务
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
  path::{Path, PathBuf},
  sync::Arc,
  time::Instant,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  category::Category,
  codec::ImageCodec,
  error::Result,
  frame::Overlay,
  model::DetectParams,
  normalize::{Detection, normalize},
  output::{AnnotatedStore, draw::Draw},
  registry::{ModelRegistry, RegistryEntry},
  rotate::SequenceInfo,
  upload::UploadedImage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
  Pass,
  Fail,
}

impl Verdict {
  /// 只要存在任何检测结果即判定为 FAIL，与置信度无关
  pub fn from_detections(detections: &[Detection]) -> Self {
    if detections.is_empty() {
      Verdict::Pass
    } else {
      Verdict::Fail
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionResult {
  pub category: Category,
  pub verdict: Verdict,
  pub detections: Vec<Detection>,
  /// 标注图像，是否落盘由调用方决定
  #[serde(skip)]
  pub overlay: Overlay,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub annotated_path: Option<PathBuf>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sequence: Option<SequenceInfo>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub original_path: Option<PathBuf>,
}

pub struct InspectionService {
  registry: Arc<ModelRegistry>,
  codec: ImageCodec,
  draw: Draw,
  store: AnnotatedStore,
}

impl InspectionService {
  pub fn new(registry: Arc<ModelRegistry>, store: AnnotatedStore) -> Self {
    Self {
      registry,
      codec: ImageCodec::default(),
      draw: Draw::default(),
      store,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn registry(&self) -> &Arc<ModelRegistry> {
    &self.registry
  }

  pub fn store(&self) -> &AnnotatedStore {
    &self.store
  }

  pub fn ensure_ready(&self, category: Category) -> Result<RegistryEntry> {
    self.registry.get(category)
  }

  pub fn predict(
    &self,
    category: Category,
    image_bytes: &[u8],
    params: &DetectParams,
  ) -> Result<InspectionResult> {
    let entry = self.ensure_ready(category)?;
    params.validate()?;

    let image = self.codec.decode(image_bytes)?;

    let now = Instant::now();
    let raw = entry.detector.detect(&image, params)?;
    debug!(
      "类别 {} 推理完成，耗时: {:.2?}, 原始检测数: {}",
      category,
      now.elapsed(),
      raw.boxes.len()
    );

    let detections = normalize(&raw.boxes, &raw.labels);
    let verdict = Verdict::from_detections(&detections);

    let overlay = match entry.detector.render(&image, &raw) {
      Some(overlay) => overlay,
      None => Overlay::from(self.draw.draw_detections(&image, &detections)),
    };

    info!(
      "类别 {} 检测结果: {:?} ({} 个缺陷)",
      category,
      verdict,
      detections.len()
    );

    Ok(InspectionResult {
      category,
      verdict,
      detections,
      overlay,
      annotated_path: None,
      source: None,
      sequence: None,
      original_path: None,
    })
  }

  /// 类别以字符串给出时先校验，未知类别不会触及任何状态
  pub fn predict_named(
    &self,
    category: &str,
    image_bytes: &[u8],
    params: &DetectParams,
  ) -> Result<InspectionResult> {
    let category: Category = category.parse()?;
    self.predict(category, image_bytes, params)
  }

  pub fn predict_upload(
    &self,
    category: Category,
    upload: &UploadedImage,
    params: &DetectParams,
  ) -> Result<InspectionResult> {
    debug!("上传图像: {} ({} 字节)", upload.filename(), upload.bytes().len());
    self.predict(category, upload.bytes(), params)
  }

  /// 编码并写入输出目录，返回文件路径
  pub fn save_annotated(&self, overlay: Overlay, prefix: &str) -> Result<PathBuf> {
    let encoded = self.codec.encode_overlay(overlay)?;
    self.store.save(&encoded, prefix)
  }

  /// 保存结果中的标注图像并记录路径
  pub fn persist<'a>(&self, result: &'a mut InspectionResult, prefix: &str) -> Result<&'a Path> {
    let path = self.save_annotated(result.overlay.clone(), prefix)?;
    Ok(result.annotated_path.insert(path).as_path())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection() -> Detection {
    Detection {
      class_id: 0,
      label: "crack".to_string(),
      confidence: 0.01,
      bbox: [0.0, 0.0, 1.0, 1.0],
    }
  }

  #[test]
  fn verdict_depends_only_on_presence() {
    assert_eq!(Verdict::from_detections(&[]), Verdict::Pass);
    assert_eq!(Verdict::from_detections(&[detection()]), Verdict::Fail);
    for count in 1..5 {
      let detections = vec![detection(); count];
      assert_eq!(Verdict::from_detections(&detections), Verdict::Fail);
    }
  }

  #[test]
  fn verdict_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&Verdict::Pass).unwrap(), "\"PASS\"");
    assert_eq!(serde_json::to_string(&Verdict::Fail).unwrap(), "\"FAIL\"");
  }

  mod service {
    use std::sync::Arc;

    use crate::{
      category::Category,
      error::ErrorKind,
      inspect::{InspectionService, Verdict},
      model::{DetectParams, RawBox},
      output::AnnotatedStore,
      registry::ModelRegistry,
      testing::{ScriptedDetector, loaded_registry, png_bytes},
    };

    fn service_with(
      dir: &std::path::Path,
      detector: ScriptedDetector,
    ) -> (InspectionService, Arc<ScriptedDetector>) {
      let detector = Arc::new(detector);
      let registry = loaded_registry(dir, &[Category::Bumper, Category::Door], detector.clone());
      let service = InspectionService::new(registry, AnnotatedStore::new(dir.join("runs")));
      (service, detector)
    }

    #[test]
    fn clean_part_passes() {
      let dir = tempfile::tempdir().unwrap();
      let (service, detector) = service_with(dir.path(), ScriptedDetector::default());

      let result = service
        .predict(Category::Bumper, &png_bytes(32, 24), &DetectParams::default())
        .unwrap();
      assert_eq!(result.verdict, Verdict::Pass);
      assert!(result.detections.is_empty());
      assert_eq!((result.overlay.width(), result.overlay.height()), (32, 24));
      assert_eq!(detector.calls(), 1);
    }

    #[test]
    fn defects_fail_with_rounded_values() {
      let dir = tempfile::tempdir().unwrap();
      let boxes = vec![
        RawBox {
          class_id: 0,
          score: 0.912345,
          bbox: [10.125, 20.0, 30.5, 40.25],
        },
        RawBox {
          class_id: 3,
          score: 0.3,
          bbox: [1.0, 2.0, 3.0, 4.0],
        },
      ];
      let detector = ScriptedDetector::with_boxes(boxes, &[(0, "scratch")]);
      let (service, _) = service_with(dir.path(), detector);

      let result = service
        .predict_named("BUMPER", &png_bytes(64, 64), &DetectParams::default())
        .unwrap();
      assert_eq!(result.verdict, Verdict::Fail);
      assert_eq!(result.detections.len(), 2);
      assert_eq!(result.detections[0].label, "scratch");
      assert_eq!(result.detections[0].confidence, 0.9123);
      assert_eq!(result.detections[0].bbox, [10.13, 20.0, 30.5, 40.25]);
      assert_eq!(result.detections[1].label, "3");

      let json = serde_json::to_value(&result).unwrap();
      assert_eq!(json["verdict"], "FAIL");
      assert_eq!(json["category"], "bumper");
      assert!(json.get("overlay").is_none());
    }

    #[test]
    fn unknown_category_touches_nothing() {
      let dir = tempfile::tempdir().unwrap();
      let (service, detector) = service_with(dir.path(), ScriptedDetector::default());
      let before = service.registry().status();

      let err = service
        .predict_named("hood", &png_bytes(8, 8), &DetectParams::default())
        .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidCategory);
      assert_eq!(service.registry().status(), before);
      assert_eq!(detector.calls(), 0);
    }

    #[test]
    fn not_ready_before_load() {
      let dir = tempfile::tempdir().unwrap();
      let service = InspectionService::new(
        Arc::new(ModelRegistry::new()),
        AnnotatedStore::new(dir.path()),
      );
      let err = service
        .predict(Category::Door, &png_bytes(8, 8), &DetectParams::default())
        .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::NotReady);
    }

    #[test]
    fn undecodable_bytes_skip_inference() {
      let dir = tempfile::tempdir().unwrap();
      let (service, detector) = service_with(dir.path(), ScriptedDetector::default());
      let err = service
        .predict(Category::Door, b"garbage", &DetectParams::default())
        .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidImage);
      assert_eq!(detector.calls(), 0);
    }

    #[test]
    fn invalid_params_are_rejected() {
      let dir = tempfile::tempdir().unwrap();
      let (service, _) = service_with(dir.path(), ScriptedDetector::default());
      let params = DetectParams {
        iou: -0.1,
        ..Default::default()
      };
      let err = service
        .predict(Category::Door, &png_bytes(8, 8), &params)
        .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidParams);
    }

    #[test]
    fn persisted_overlay_is_a_jpeg_in_the_store() {
      let dir = tempfile::tempdir().unwrap();
      let (service, _) = service_with(dir.path(), ScriptedDetector::default());
      let mut result = service
        .predict(Category::Door, &png_bytes(16, 16), &DetectParams::default())
        .unwrap();

      let path = service.persist(&mut result, "door_upload").unwrap().to_path_buf();
      assert!(path.starts_with(dir.path().join("runs")));
      assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
      assert_eq!(result.annotated_path.as_deref(), Some(path.as_path()));

      let bytes = std::fs::read(&path).unwrap();
      assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn backend_bgr_overlay_is_saved_as_rgb() {
      let dir = tempfile::tempdir().unwrap();
      let detector = ScriptedDetector {
        bgr_render: true,
        ..Default::default()
      };
      let (service, _) = service_with(dir.path(), detector);
      let result = service
        .predict(Category::Door, &png_bytes(16, 16), &DetectParams::default())
        .unwrap();

      let path = service.save_annotated(result.overlay, "door").unwrap();
      let saved = image::open(&path).unwrap().to_rgb8();
      let [r, g, b] = saved.get_pixel(8, 8).0;
      assert!(r > 200 && g < 50 && b < 50, "got {:?}", (r, g, b));
    }
  }
}

