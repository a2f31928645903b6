// 该文件是 Sehuan（色环）项目的一部分。
// src/band.rs - 色环词表与单个色环检测项
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

use std::fmt;

use crate::resistor::ResistorError;

/// 色环颜色
///
/// 检测模型输出标签的封闭词表。词表是模型与解码逻辑之间数据契约的一部分，
/// 未知标签必须在构造时被拒绝，而不是悄悄接受。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BandColor {
  Black,
  Brown,
  Red,
  Orange,
  Yellow,
  Green,
  Blue,
  Violet,
  Grey,
  White,
  Gold,
  Silver,
}

impl BandColor {
  /// 全部 12 种色环颜色
  pub const ALL: [BandColor; 12] = [
    BandColor::Black,
    BandColor::Brown,
    BandColor::Red,
    BandColor::Orange,
    BandColor::Yellow,
    BandColor::Green,
    BandColor::Blue,
    BandColor::Violet,
    BandColor::Grey,
    BandColor::White,
    BandColor::Gold,
    BandColor::Silver,
  ];

  /// 由模型输出标签解析颜色，标签不在词表中时返回 `None`
  pub fn from_label(label: &str) -> Option<Self> {
    let color = match label {
      "black_band" => BandColor::Black,
      "brown_band" => BandColor::Brown,
      "red_band" => BandColor::Red,
      "orange_band" => BandColor::Orange,
      "yellow_band" => BandColor::Yellow,
      "green_band" => BandColor::Green,
      "blue_band" => BandColor::Blue,
      "violet_band" => BandColor::Violet,
      "grey_band" => BandColor::Grey,
      "white_band" => BandColor::White,
      "gold_band" => BandColor::Gold,
      "silver_band" => BandColor::Silver,
      _ => return None,
    };
    Some(color)
  }

  /// 颜色对应的模型标签
  pub fn label(&self) -> &'static str {
    match self {
      BandColor::Black => "black_band",
      BandColor::Brown => "brown_band",
      BandColor::Red => "red_band",
      BandColor::Orange => "orange_band",
      BandColor::Yellow => "yellow_band",
      BandColor::Green => "green_band",
      BandColor::Blue => "blue_band",
      BandColor::Violet => "violet_band",
      BandColor::Grey => "grey_band",
      BandColor::White => "white_band",
      BandColor::Gold => "gold_band",
      BandColor::Silver => "silver_band",
    }
  }

  /// 颜色对应的显示颜色（RGB），用于标注渲染
  pub fn display_color(&self) -> [u8; 3] {
    match self {
      BandColor::Black => [0, 0, 0],
      BandColor::Brown => [102, 51, 0],
      BandColor::Red => [255, 0, 0],
      BandColor::Orange => [255, 128, 0],
      BandColor::Yellow => [255, 255, 0],
      BandColor::Green => [0, 255, 0],
      BandColor::Blue => [0, 0, 255],
      BandColor::Violet => [255, 0, 127],
      BandColor::Grey => [128, 128, 128],
      BandColor::White => [255, 255, 255],
      BandColor::Gold => [255, 255, 153],
      BandColor::Silver => [224, 224, 224],
    }
  }
}

impl fmt::Display for BandColor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// 轴对齐矩形，left ≤ right、top ≤ bottom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

impl Rect {
  pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  /// 矩形中心点，四舍五入到整数坐标
  pub fn center_point(&self) -> (i32, i32) {
    let x = self.left as f64 + (self.right - self.left) as f64 / 2.0;
    let y = self.top as f64 + (self.bottom - self.top) as f64 / 2.0;
    (x.round() as i32, y.round() as i32)
  }

  pub fn width(&self) -> u32 {
    (self.right - self.left).max(0) as u32
  }

  pub fn height(&self) -> u32 {
    (self.bottom - self.top).max(0) as u32
  }
}

/// 单个被识别的色环
///
/// 构造后不可变，由包含它的 `BandDetectionResult` 独占持有。
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedBand {
  id: u32,
  color: BandColor,
  score: f32,
  bounding_box: Rect,
}

impl DetectedBand {
  /// 由模型输出构造色环检测项
  ///
  /// `bounding_box` 为 `[left, top, right, bottom]` 像素坐标。
  /// 标签不在词表中时返回 [`ResistorError::UnknownLabel`]，
  /// 这通常意味着上游模型与词表不匹配。
  pub fn new(
    id: u32,
    label: &str,
    score: f32,
    bounding_box: [i32; 4],
  ) -> Result<Self, ResistorError> {
    let color =
      BandColor::from_label(label).ok_or_else(|| ResistorError::UnknownLabel(label.to_string()))?;

    Ok(Self {
      id,
      color,
      score,
      bounding_box: Rect::new(
        bounding_box[0],
        bounding_box[1],
        bounding_box[2],
        bounding_box[3],
      ),
    })
  }

  pub fn id(&self) -> u32 {
    self.id
  }

  pub fn color(&self) -> BandColor {
    self.color
  }

  pub fn label(&self) -> &'static str {
    self.color.label()
  }

  pub fn score(&self) -> f32 {
    self.score
  }

  pub fn bounding_box(&self) -> Rect {
    self.bounding_box
  }

  /// 边界框中心点
  pub fn center_point(&self) -> (i32, i32) {
    self.bounding_box.center_point()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_roundtrip() {
    for color in BandColor::ALL {
      assert_eq!(BandColor::from_label(color.label()), Some(color));
    }
  }

  #[test]
  fn unknown_label_rejected() {
    assert_eq!(BandColor::from_label("pink_band"), None);

    let err = DetectedBand::new(0, "pink_band", 0.9, [0, 0, 10, 10]).unwrap_err();
    assert!(matches!(err, ResistorError::UnknownLabel(label) if label == "pink_band"));
  }

  #[test]
  fn center_point_rounds() {
    let band = DetectedBand::new(3, "red_band", 0.8, [10, 20, 21, 41]).unwrap();
    // x 中心 15.5 -> 16, y 中心 30.5 -> 31
    assert_eq!(band.center_point(), (16, 31));
    assert_eq!(band.id(), 3);
    assert_eq!(band.label(), "red_band");
  }
}
