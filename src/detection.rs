// 该文件是 Sehuan（色环）项目的一部分。
// src/detection.rs - 单帧色环检测结果
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

use crate::band::DetectedBand;

/// 相邻色环中心横向间距的样本标准差上限（像素）
const STDEV_THRESHOLD_X: f64 = 15.0;
/// 色环中心纵坐标的样本标准差上限（像素）
const STDEV_THRESHOLD_Y: f64 = 20.0;

/// 一帧推理得到的全部色环
///
/// 构造时即按中心点横坐标升序排序，此后视为不可变快照。横坐标完全相等时
/// 的先后顺序不在契约之内。
#[derive(Clone, Debug, Default)]
pub struct BandDetectionResult {
  detected_bands: Vec<DetectedBand>,
}

impl BandDetectionResult {
  /// 由色环列表构造检测结果
  ///
  /// 空列表或过短的列表不构成错误，它们只是无效结果。
  pub fn new(mut detected_bands: Vec<DetectedBand>) -> Self {
    detected_bands.sort_by_key(|band| band.center_point().0);
    Self { detected_bands }
  }

  /// 从左到右排序后的色环
  pub fn bands(&self) -> &[DetectedBand] {
    &self.detected_bands
  }

  pub fn len(&self) -> usize {
    self.detected_bands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detected_bands.is_empty()
  }

  /// 从左到右的标签序列，用于日志与结果呈现
  pub fn label_sequence(&self) -> String {
    self
      .detected_bands
      .iter()
      .map(|band| band.label())
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// 该结果是否构成一个几何上可信的电阻读数
  ///
  /// 条件：色环数量为 4 或 5，且相邻中心横向间距的样本标准差不超过
  /// 15 像素、中心纵坐标的样本标准差不超过 20 像素。数量门限必须在
  /// 标准差计算之前判定：少于 2 个数据点时样本标准差没有定义。
  pub fn is_valid(&self) -> bool {
    if self.detected_bands.len() < 4 || self.detected_bands.len() > 5 {
      return false;
    }

    let x_coord: Vec<f64> = self
      .detected_bands
      .iter()
      .map(|band| band.center_point().0 as f64)
      .collect();
    let y_coord: Vec<f64> = self
      .detected_bands
      .iter()
      .map(|band| band.center_point().1 as f64)
      .collect();

    let delta_x: Vec<f64> = x_coord.windows(2).map(|w| w[1] - w[0]).collect();

    if sample_stdev(&delta_x) > STDEV_THRESHOLD_X {
      return false;
    }
    if sample_stdev(&y_coord) > STDEV_THRESHOLD_Y {
      return false;
    }
    true
  }

  /// 两个结果是否代表同一只电阻
  ///
  /// 双方都必须有效，色环数量相同，且从左到右的标签序列完全一致。
  /// 置信度与具体像素位置不参与比较——正是这一点让逐帧抖动下的
  /// 连续帧收敛有意义。任何一方无效则直接判为不同。
  pub fn is_identical(&self, other: &BandDetectionResult) -> bool {
    if !self.is_valid() || !other.is_valid() {
      return false;
    }
    if self.detected_bands.len() != other.detected_bands.len() {
      return false;
    }

    self
      .detected_bands
      .iter()
      .zip(&other.detected_bands)
      .all(|(a, b)| a.color() == b.color())
  }
}

/// 样本标准差（N−1 分母），至少需要 2 个数据点
fn sample_stdev(values: &[f64]) -> f64 {
  debug_assert!(values.len() >= 2);
  let mean = values.iter().sum::<f64>() / values.len() as f64;
  let variance =
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (values.len() - 1) as f64;
  variance.sqrt()
}
