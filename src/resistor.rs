// 该文件是 Sehuan（色环）项目的一部分。
// src/resistor.rs - 色环到阻值/误差的解码
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

use thiserror::Error;

use crate::band::{BandColor, DetectedBand};
use crate::detection::BandDetectionResult;

/// 电阻解码相关错误
///
/// 校验类检查（`is_valid` / `is_identical`）只返回布尔值，不会产生错误；
/// 这里的错误只在解码阶段出现，并且必须在面向用户的边界被捕获后以
/// 可读的形式呈现，绝不允许让采集或推理流水线因此中断。
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ResistorError {
  /// 对几何上不可信或数量不对的色环序列尝试解码
  #[error("色环检测结果不稳定，无法解码")]
  UnstableReading,
  /// 有效数字位上出现了没有数字含义的颜色
  #[error("「{}」不是有效的有效数字色环", .0.label())]
  InvalidSignificant(DetectedBand),
  /// 倍率位上出现了没有倍率含义的颜色
  #[error("「{}」不是有效的倍率色环", .0.label())]
  InvalidMultiplier(DetectedBand),
  /// 误差位上出现了没有误差含义的颜色
  #[error("「{}」不是有效的误差色环", .0.label())]
  InvalidTolerance(DetectedBand),
  /// 检测输出中出现了词表之外的标签
  #[error("未知的色环标签「{0}」")]
  UnknownLabel(String),
}

/// 颜色 → 有效数字
fn significant(color: BandColor) -> Option<u64> {
  match color {
    BandColor::Black => Some(0),
    BandColor::Brown => Some(1),
    BandColor::Red => Some(2),
    BandColor::Orange => Some(3),
    BandColor::Yellow => Some(4),
    BandColor::Green => Some(5),
    BandColor::Blue => Some(6),
    BandColor::Violet => Some(7),
    BandColor::Grey => Some(8),
    BandColor::White => Some(9),
    BandColor::Gold | BandColor::Silver => None,
  }
}

/// 颜色 → 倍率
///
/// 金、银对应分数倍率（0.1 / 0.01），因此阻值必须用 `f64` 承载。
fn multiplier(color: BandColor) -> f64 {
  match color {
    BandColor::Black => 1e0,
    BandColor::Brown => 1e1,
    BandColor::Red => 1e2,
    BandColor::Orange => 1e3,
    BandColor::Yellow => 1e4,
    BandColor::Green => 1e5,
    BandColor::Blue => 1e6,
    BandColor::Violet => 1e7,
    BandColor::Grey => 1e8,
    BandColor::White => 1e9,
    BandColor::Gold => 1e-1,
    BandColor::Silver => 1e-2,
  }
}

/// 颜色 → 误差百分比
fn tolerance(color: BandColor) -> Option<f64> {
  match color {
    BandColor::Brown => Some(1.0),
    BandColor::Red => Some(2.0),
    BandColor::Green => Some(0.5),
    BandColor::Blue => Some(0.25),
    BandColor::Violet => Some(0.1),
    BandColor::Grey => Some(0.05),
    BandColor::Gold => Some(5.0),
    BandColor::Silver => Some(10.0),
    BandColor::Black | BandColor::Orange | BandColor::Yellow | BandColor::White => None,
  }
}

/// 一只已读出的电阻
///
/// 从左到右：除最后两环以外都是有效数字位，倒数第二环是倍率位，
/// 最后一环是误差位。
#[derive(Debug)]
pub struct Resistor {
  bands: BandDetectionResult,
}

impl Resistor {
  /// 由稳定的检测结果构造电阻
  ///
  /// 入口再做一次有效性校验（上游通常已经保证），不通过则返回
  /// [`ResistorError::UnstableReading`]。
  pub fn new(bands: BandDetectionResult) -> Result<Self, ResistorError> {
    if !bands.is_valid() {
      return Err(ResistorError::UnstableReading);
    }
    Ok(Self { bands })
  }

  pub fn bands(&self) -> &BandDetectionResult {
    &self.bands
  }

  /// 计算阻值（欧姆）
  ///
  /// 有效数字按十进制拼接（首位最高），再乘以倍率位对应的倍率。
  pub fn resistance(&self) -> Result<f64, ResistorError> {
    let bands = self.bands.bands();

    let mut significants = 0u64;
    for band in &bands[..bands.len() - 2] {
      let digit =
        significant(band.color()).ok_or_else(|| ResistorError::InvalidSignificant(band.clone()))?;
      significants = significants * 10 + digit;
    }

    let multiplier_band = &bands[bands.len() - 2];
    Ok(significants as f64 * multiplier(multiplier_band.color()))
  }

  /// 计算误差（百分比）
  pub fn tolerance(&self) -> Result<f64, ResistorError> {
    let tolerance_band = self
      .bands
      .bands()
      .last()
      .ok_or(ResistorError::UnstableReading)?;
    tolerance(tolerance_band.color())
      .ok_or_else(|| ResistorError::InvalidTolerance(tolerance_band.clone()))
  }
}

/// 以人类可读形式格式化阻值
pub fn format_resistance(ohms: f64) -> String {
  if ohms == ohms.trunc() {
    format!("{} Ω", ohms as i64)
  } else {
    format!("{ohms} Ω")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::tests::make_result;

  #[test]
  fn four_band_decode() {
    // 红紫黑棕: 27 × 10^0 = 27 Ω ±1%
    let resistor = Resistor::new(make_result(&["red_band", "violet_band", "black_band", "brown_band"]))
      .expect("结果应有效");
    assert_eq!(resistor.resistance().unwrap(), 27.0);
    assert_eq!(resistor.tolerance().unwrap(), 1.0);
  }

  #[test]
  fn four_band_decode_with_multiplier() {
    // 红紫棕金: 27 × 10^1 = 270 Ω ±5%
    let resistor = Resistor::new(make_result(&["red_band", "violet_band", "brown_band", "gold_band"]))
      .expect("结果应有效");
    assert_eq!(resistor.resistance().unwrap(), 270.0);
    assert_eq!(resistor.tolerance().unwrap(), 5.0);
  }

  #[test]
  fn five_band_fractional_multiplier() {
    // 黄紫红金棕: 472 × 0.1 = 47.2 Ω ±1%，倍率可以小于 1，阻值不能截断
    let resistor = Resistor::new(make_result(&[
      "yellow_band",
      "violet_band",
      "red_band",
      "gold_band",
      "brown_band",
    ]))
    .expect("结果应有效");
    assert!((resistor.resistance().unwrap() - 47.2).abs() < 1e-9);
    assert_eq!(resistor.tolerance().unwrap(), 1.0);
  }

  #[test]
  fn invalid_significant_names_first_offender() {
    let resistor = Resistor::new(make_result(&["gold_band", "gold_band", "brown_band", "red_band"]))
      .expect("结果应有效");
    match resistor.resistance().unwrap_err() {
      ResistorError::InvalidSignificant(band) => {
        assert_eq!(band.label(), "gold_band");
        // 排序后最左侧的金色环
        assert_eq!(band.center_point().0, 0);
      }
      other => panic!("错误类型不符: {other:?}"),
    }
  }

  #[test]
  fn invalid_tolerance_reported() {
    let resistor = Resistor::new(make_result(&["red_band", "violet_band", "brown_band", "white_band"]))
      .expect("结果应有效");
    assert!(matches!(
      resistor.tolerance().unwrap_err(),
      ResistorError::InvalidTolerance(band) if band.label() == "white_band"
    ));
  }

  #[test]
  fn unstable_input_rejected() {
    let err = Resistor::new(make_result(&["red_band", "violet_band"])).unwrap_err();
    assert_eq!(err, ResistorError::UnstableReading);
  }

  #[test]
  fn resistance_formatting() {
    assert_eq!(format_resistance(270.0), "270 Ω");
    assert_eq!(format_resistance(47.2), "47.2 Ω");
  }
}
