// 该文件是 Sehuan（色环）项目的一部分。
// src/draw.rs - 检测结果标注渲染
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

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detection::BandDetectionResult;

const LABEL_FONT_SIZE: f32 = 14.0;
const LABEL_TEXT_MARGIN: i32 = 10;

/// 检测结果标注工具
///
/// 字体从运行时路径加载而不是内嵌资源；没有字体时退化为只画边框。
pub struct Overlay {
  font: Option<FontVec>,
  font_scale: PxScale,
}

impl Overlay {
  /// 创建不渲染文本的标注工具
  pub fn new() -> Self {
    Self {
      font: None,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  /// 创建带字体的标注工具
  pub fn with_font_path(path: impl AsRef<Path>) -> Result<Self> {
    let data = std::fs::read(path.as_ref())
      .with_context(|| format!("无法读取字体文件: {}", path.as_ref().display()))?;
    let font = FontVec::try_from_vec(data).context("无法解析字体文件")?;

    Ok(Self {
      font: Some(font),
      font_scale: PxScale::from(LABEL_FONT_SIZE),
    })
  }

  /// 在图像上绘制一帧检测结果
  ///
  /// 每个色环以其词表显示颜色画双层边框；有字体时在框内上方标注
  /// 标签缩写与置信度。
  pub fn draw_result(&self, image: &mut RgbImage, result: &BandDetectionResult) {
    for band in result.bands() {
      let bbox = band.bounding_box();
      let color = Rgb(band.color().display_color());

      let x = bbox.left.max(0);
      let y = bbox.top.max(0);
      let width = bbox.width().min(image.width().saturating_sub(x as u32));
      let height = bbox.height().min(image.height().saturating_sub(y as u32));
      if width == 0 || height == 0 {
        continue;
      }

      draw_hollow_rect_mut(image, Rect::at(x, y).of_size(width, height), color);
      // 第二层边框增加可见度
      if width > 2 && height > 2 {
        draw_hollow_rect_mut(
          image,
          Rect::at(x + 1, y + 1).of_size(width - 2, height - 2),
          color,
        );
      }

      if let Some(font) = &self.font {
        let label = band.label();
        let text = format!("{}: {:.2}", &label[..2], band.score());
        draw_text_mut(
          image,
          color,
          x + LABEL_TEXT_MARGIN,
          y + LABEL_TEXT_MARGIN,
          self.font_scale,
          font,
          &text,
        );
      }
    }
  }
}

impl Default for Overlay {
  fn default() -> Self {
    Self::new()
  }
}

/// 在图像上叠加半透明白色的推理区域提示框
///
/// `area` 为 `[x, y, w, h]`，超出图像的部分被裁剪。
pub fn draw_inference_box(image: &mut RgbImage, area: [u32; 4]) {
  let [x, y, w, h] = area;
  let x_end = (x + w).min(image.width());
  let y_end = (y + h).min(image.height());

  for py in y..y_end {
    for px in x..x_end {
      let pixel = image.get_pixel_mut(px, py);
      for channel in pixel.0.iter_mut() {
        *channel = ((*channel as u16 + 255) / 2) as u8;
      }
    }
  }
}
