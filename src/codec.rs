// 该文件是 Zhijian （质检） 项目的一部分。
// src/codec.rs - 图像编解码
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

//! 通道顺序约定：解码结果与检测器输入一律为 RGB；存储编码器同样接收 RGB。
//! 检测后端若给出 BGR 可视化结果，只在 [`ImageCodec::encode_overlay`] 中转换一次。

use std::io::Cursor;

use image::{RgbImage, codecs::jpeg::JpegEncoder};
use tracing::debug;

use crate::{
  error::{InspectError, Result},
  frame::Overlay,
};

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
  quality: u8,
}

impl Default for ImageCodec {
  fn default() -> Self {
    Self {
      quality: JPEG_QUALITY,
    }
  }
}

impl ImageCodec {
  pub fn with_quality(mut self, quality: u8) -> Self {
    self.quality = quality.clamp(1, 100);
    self
  }

  /// 解码任意受支持格式的图像字节为 RGB 像素
  pub fn decode(&self, bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
      return Err(InspectError::InvalidImage("图像数据为空".to_string()));
    }

    let format = image::guess_format(bytes)
      .map_err(|e| InspectError::InvalidImage(format!("无法识别图像格式: {}", e)))?;
    let image = image::load_from_memory_with_format(bytes, format)
      .map_err(|e| InspectError::InvalidImage(format!("无法解码图像: {}", e)))?
      .to_rgb8();

    debug!(
      "解码图像: {:?} {}x{}",
      format,
      image.width(),
      image.height()
    );
    Ok(image)
  }

  /// 将标注图像编码为 JPEG 字节
  pub fn encode_overlay(&self, overlay: Overlay) -> Result<Vec<u8>> {
    let frame = overlay.into_rgb();
    let (width, height) = (frame.width(), frame.height());

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, self.quality)
      .encode(frame.as_raw(), width, height, image::ExtendedColorType::Rgb8)
      .map_err(|e| InspectError::InvalidImage(format!("标注图像编码失败: {}", e)))?;

    Ok(buffer.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::ImageFormat;
  use crate::{
    error::ErrorKind,
    frame::{BgrFrame, Overlay},
  };

  fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
  }

  #[test]
  fn decodes_png() {
    let image = RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]));
    let decoded = ImageCodec::default().decode(&png_bytes(&image)).unwrap();
    assert_eq!(decoded.dimensions(), (4, 3));
    assert_eq!(decoded.get_pixel(0, 0).0, [200, 10, 10]);
  }

  #[test]
  fn empty_bytes_are_invalid() {
    let err = ImageCodec::default().decode(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);
  }

  #[test]
  fn truncated_bytes_are_invalid() {
    let image = RgbImage::from_pixel(16, 16, image::Rgb([1, 2, 3]));
    let bytes = png_bytes(&image);
    let err = ImageCodec::default().decode(&bytes[..bytes.len() / 2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);
  }

  #[test]
  fn unknown_format_is_invalid() {
    let err = ImageCodec::default().decode(b"not an image").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);
  }

  #[test]
  fn bgr_overlay_is_stored_as_rgb() {
    // 纯红色以 BGR 表示为 [0, 0, 255]
    let pixels = [0u8, 0, 255].repeat(16 * 16);
    let bgr = BgrFrame::from_raw(16, 16, pixels).unwrap();
    let codec = ImageCodec::default().with_quality(100);
    let bytes = codec.encode_overlay(Overlay::Bgr(bgr)).unwrap();

    let decoded = codec.decode(&bytes).unwrap();
    let [r, g, b] = decoded.get_pixel(8, 8).0;
    assert!(r > 200 && g < 50 && b < 50, "got {:?}", (r, g, b));
  }
}
