// 该文件是 Zhijian （质检） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use tracing::info;

use crate::{
  error::{InspectError, Result},
  normalize::Detection,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const PALETTE_SIZE: usize = 20;
const BOX_THICKNESS: i32 = 2;

/// 在图像上绘制检测框与标签。未配置字体时只绘制检测框。
#[derive(Clone)]
pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    let colors = (0..PALETTE_SIZE)
      .map(|i| hsv_to_rgb((i as f32 / PALETTE_SIZE as f32) * 360.0, 0.8, 0.9))
      .collect();

    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      colors,
    }
  }
}

impl std::fmt::Debug for Draw {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Draw")
      .field("font", &self.font.is_some())
      .field("font_size", &self.font_size)
      .finish_non_exhaustive()
  }
}

impl Draw {
  pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
    let data = std::fs::read(path).map_err(|e| InspectError::io(path, e))?;
    let font = FontArc::try_from_vec(data)
      .map_err(|e| InspectError::Config(format!("无法加载字体 {}: {}", path.display(), e)))?;
    info!("加载标签字体: {}", path.display());
    self.font = Some(font);
    Ok(self)
  }

  pub fn color_of(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  /// 返回绘制了全部检测结果的新图像，无检测时为原图副本
  pub fn draw_detections(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    for detection in detections {
      self.draw_bbox_with_label(&mut canvas, detection);
    }
    canvas
  }

  // bbox 为像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (detection.bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (detection.bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (detection.bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (detection.bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = self.color_of(detection.class_id);

    // 绘制边框（加粗）
    for t in 0..BOX_THICKNESS {
      let width = (x_max - x_min + 1 - 2 * t).max(0) as u32;
      let height = (y_max - y_min + 1 - 2 * t).max(0) as u32;
      if width == 0 || height == 0 {
        break;
      }
      draw_hollow_rect_mut(image, Rect::at(x_min + t, y_min + t).of_size(width, height), color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", detection.label, detection.confidence);
    let text_width = (label.chars().count() as f32 * self.label_char_width) as i32;

    // 标签放在边框上方，超出图像时贴顶
    let label_x = x_min;
    let label_y = (y_min - self.label_text_height).max(0);
    let label_width = text_width.min(w - label_x).max(0) as u32;
    let label_height = self.label_text_height as u32;

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + self.label_text_vertical_padding,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(bbox: [f64; 4]) -> Detection {
    Detection {
      class_id: 1,
      label: "dent".to_string(),
      confidence: 0.9,
      bbox,
    }
  }

  #[test]
  fn no_detections_leaves_image_clean() {
    let image = RgbImage::from_pixel(32, 32, Rgb([7, 7, 7]));
    let drawn = Draw::default().draw_detections(&image, &[]);
    assert_eq!(drawn, image);
  }

  #[test]
  fn draws_box_outline_in_class_color() {
    let draw = Draw::default();
    let image = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let drawn = draw.draw_detections(&image, &[detection([4.0, 4.0, 20.0, 20.0])]);
    assert_eq!(*drawn.get_pixel(4, 10), draw.color_of(1));
    assert_eq!(*drawn.get_pixel(12, 12), Rgb([0, 0, 0]));
  }

  #[test]
  fn degenerate_and_out_of_bounds_boxes_do_not_panic() {
    let image = RgbImage::new(16, 16);
    let draw = Draw::default();
    draw.draw_detections(&image, &[detection([10.0, 10.0, 10.0, 10.0])]);
    draw.draw_detections(&image, &[detection([-50.0, -50.0, 500.0, 500.0])]);
  }
}
