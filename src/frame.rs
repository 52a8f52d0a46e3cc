// 该文件是 Zhijian （质检） 项目的一部分。
// src/frame.rs - 带通道顺序的像素帧定义
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

use std::marker::PhantomData;

use image::RgbImage;

use crate::error::{InspectError, Result};

const CHANNELS: usize = 3;

/// 通道顺序标记
pub trait ChannelOrder {
  const NAME: &'static str;
  /// 与 RGB 相比是否交换了第 0 与第 2 通道
  const SWAPPED: bool;
}

#[derive(Debug, Clone, Copy)]
pub struct Rgb;

#[derive(Debug, Clone, Copy)]
pub struct Bgr;

impl ChannelOrder for Rgb {
  const NAME: &'static str = "RGB";
  const SWAPPED: bool = false;
}

impl ChannelOrder for Bgr {
  const NAME: &'static str = "BGR";
  const SWAPPED: bool = true;
}

/// HWC 排列的 8 位三通道像素帧，通道顺序由类型参数标记
#[derive(Debug, Clone)]
pub struct PixelFrame<O: ChannelOrder> {
  width: u32,
  height: u32,
  data: Box<[u8]>,
  _order: PhantomData<O>,
}

pub type RgbFrame = PixelFrame<Rgb>;
pub type BgrFrame = PixelFrame<Bgr>;

impl<O: ChannelOrder> PixelFrame<O> {
  pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
    let expected = CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(InspectError::InvalidImage(format!(
        "{} 数据长度不匹配: 期望长度 {}, 实际长度 {}",
        O::NAME,
        expected,
        data.len()
      )));
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
      _order: PhantomData,
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn as_raw(&self) -> &[u8] {
    &self.data
  }

  /// 转换到另一种通道顺序，顺序相同时不触碰数据
  pub fn into_order<T: ChannelOrder>(self) -> PixelFrame<T> {
    let mut data = self.data;
    if O::SWAPPED != T::SWAPPED {
      for pixel in data.chunks_exact_mut(CHANNELS) {
        pixel.swap(0, 2);
      }
    }

    PixelFrame {
      width: self.width,
      height: self.height,
      data,
      _order: PhantomData,
    }
  }
}

impl From<RgbImage> for RgbFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      data: image.into_raw().into_boxed_slice(),
      _order: PhantomData,
    }
  }
}

/// 标注后的图像。检测后端的可视化可能使用不同的通道顺序，
/// 统一由 [`crate::codec::ImageCodec::encode_overlay`] 转换一次。
#[derive(Debug, Clone)]
pub enum Overlay {
  Rgb(RgbFrame),
  Bgr(BgrFrame),
}

impl Overlay {
  pub fn width(&self) -> u32 {
    match self {
      Overlay::Rgb(frame) => frame.width(),
      Overlay::Bgr(frame) => frame.width(),
    }
  }

  pub fn height(&self) -> u32 {
    match self {
      Overlay::Rgb(frame) => frame.height(),
      Overlay::Bgr(frame) => frame.height(),
    }
  }

  pub fn into_rgb(self) -> RgbFrame {
    match self {
      Overlay::Rgb(frame) => frame,
      Overlay::Bgr(frame) => frame.into_order(),
    }
  }
}

impl From<RgbImage> for Overlay {
  fn from(image: RgbImage) -> Self {
    Overlay::Rgb(image.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_mismatched_buffer_length() {
    assert!(RgbFrame::from_raw(2, 2, vec![0; 11]).is_err());
  }

  #[test]
  fn bgr_to_rgb_swaps_once() {
    let bgr = BgrFrame::from_raw(1, 1, vec![10, 20, 30]).unwrap();
    let rgb = Overlay::Bgr(bgr).into_rgb();
    assert_eq!(rgb.as_raw(), &[30, 20, 10]);
  }

  #[test]
  fn same_order_conversion_keeps_data() {
    let rgb = RgbFrame::from_raw(1, 1, vec![1, 2, 3]).unwrap();
    let rgb: RgbFrame = rgb.into_order::<Rgb>();
    assert_eq!(rgb.as_raw(), &[1, 2, 3]);
  }
}
