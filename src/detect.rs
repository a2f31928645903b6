// 该文件是 Sehuan（色环）项目的一部分。
// src/detect.rs - 检测模型边界
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

use anyhow::Result;
use image::RgbImage;

/// 检测模型的单条原始输出
///
/// 模型本身是外部协作者，本仓库只消费它的输出形状：
/// 标签、置信度与像素边界框。
#[derive(Clone, Debug)]
pub struct RawDetection {
  /// 类别索引
  pub id: u32,
  /// 类别标签
  pub label: String,
  /// 置信度，取值 [0, 1]
  pub score: f32,
  /// 边界框 [left, top, right, bottom]
  pub bounding_box: [i32; 4],
}

/// 检测器配置
#[derive(Clone, Copy, Debug)]
pub struct DetectorOptions {
  /// 单帧最多保留的检测数
  pub max_results: usize,
  /// 置信度下限，低于该值的检测被丢弃
  pub score_threshold: f32,
  /// 推理线程数
  pub num_threads: usize,
}

impl Default for DetectorOptions {
  fn default() -> Self {
    Self {
      max_results: 5,
      score_threshold: 0.3,
      num_threads: 3,
    }
  }
}

/// 按配置过滤原始检测：先按置信度筛除，再截断到最大数量
pub fn apply_options(options: &DetectorOptions, detections: Vec<RawDetection>) -> Vec<RawDetection> {
  let mut detections: Vec<RawDetection> = detections
    .into_iter()
    .filter(|d| d.score >= options.score_threshold)
    .collect();
  detections.truncate(options.max_results);
  detections
}

/// 色环检测器边界 trait
///
/// 真实后端（如 TFLite SSD 模型）在部署侧实现该 trait 后接入。
pub trait BandDetector {
  /// 对一块图像区域执行检测
  fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>>;
}

/// 桩检测器：循环回放预先写好的检测脚本
///
/// 用于流水线联调与测试，脚本耗尽后从头循环；空脚本则永远返回空结果。
pub struct StubDetector {
  options: DetectorOptions,
  script: Vec<Vec<RawDetection>>,
  cursor: usize,
}

impl StubDetector {
  /// 永远不输出任何检测的空桩
  pub fn empty() -> Self {
    Self::from_script(DetectorOptions::default(), Vec::new())
  }

  pub fn from_script(options: DetectorOptions, script: Vec<Vec<RawDetection>>) -> Self {
    Self {
      options,
      script,
      cursor: 0,
    }
  }
}

impl BandDetector for StubDetector {
  fn detect(&mut self, _image: &RgbImage) -> Result<Vec<RawDetection>> {
    if self.script.is_empty() {
      return Ok(Vec::new());
    }

    let detections = self.script[self.cursor % self.script.len()].clone();
    self.cursor += 1;
    Ok(apply_options(&self.options, detections))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(label: &str, score: f32, x: i32) -> RawDetection {
    RawDetection {
      id: 0,
      label: label.to_string(),
      score,
      bounding_box: [x, 0, x + 20, 20],
    }
  }

  #[test]
  fn options_filter_and_truncate() {
    let options = DetectorOptions {
      max_results: 2,
      score_threshold: 0.5,
      num_threads: 1,
    };
    let detections = vec![
      raw("red_band", 0.9, 0),
      raw("brown_band", 0.4, 40),
      raw("black_band", 0.8, 80),
      raw("gold_band", 0.7, 120),
    ];

    let kept = apply_options(&options, detections);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].label, "red_band");
    assert_eq!(kept[1].label, "black_band");
  }

  #[test]
  fn stub_replays_script_cyclically() {
    let mut stub = StubDetector::from_script(
      DetectorOptions::default(),
      vec![vec![raw("red_band", 0.9, 0)], vec![]],
    );
    let image = RgbImage::new(8, 8);

    assert_eq!(stub.detect(&image).unwrap().len(), 1);
    assert_eq!(stub.detect(&image).unwrap().len(), 0);
    assert_eq!(stub.detect(&image).unwrap().len(), 1);
  }

  #[test]
  fn empty_stub_detects_nothing() {
    let mut stub = StubDetector::empty();
    assert!(stub.detect(&RgbImage::new(8, 8)).unwrap().is_empty());
  }
}
