// 该文件是 Sehuan（色环）项目的一部分。
// src/stability.rs - 连续帧读数稳定判定
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

use tracing::debug;

use crate::detection::BandDetectionResult;

/// 默认的稳定周期数：候选读数确立后还需要连续确认的帧数门限
pub const DEFAULT_STABILIZATION_CYCLES: u32 = 3;

/// 连续帧读数稳定判定器
///
/// 每当有新的检测结果产生时推进一次的小状态机，用于抑制单帧误识别：
/// 只有同一读数连续出现、累计确认数超过门限时才对外给出最终读数。
///
/// 规则（按顺序）：
/// 1. 无效结果被整体忽略——既不推进也不清零计数。夹在两个相同有效帧
///    之间的无效帧因此不会打断累计。
/// 2. 尚无候选、或候选与新结果不同：候选置为新结果，计数清零，不产出。
/// 3. 新结果与候选相同：计数加一；计数超过门限时产出候选并将计数清零
///    （候选保留，持续对准同一只电阻会再次产出）。
///
/// 判定器自身不拒绝任何输入，也没有超时：始终无法收敛的画面只会
/// 无限期地不产出。
pub struct StabilityTracker {
  threshold: u32,
  last_stable: Option<BandDetectionResult>,
  stable_count: u32,
}

impl StabilityTracker {
  pub fn new(threshold: u32) -> Self {
    Self {
      threshold,
      last_stable: None,
      stable_count: 0,
    }
  }

  /// 当前候选读数
  pub fn candidate(&self) -> Option<&BandDetectionResult> {
    self.last_stable.as_ref()
  }

  /// 当前连续确认计数
  pub fn stable_count(&self) -> u32 {
    self.stable_count
  }

  /// 喂入一帧检测结果，读数稳定时返回最终读数
  pub fn update(&mut self, result: &BandDetectionResult) -> Option<BandDetectionResult> {
    if !result.is_valid() {
      return None;
    }

    match &self.last_stable {
      Some(candidate) if candidate.is_identical(result) => {
        self.stable_count += 1;
        if self.stable_count > self.threshold {
          self.stable_count = 0;
          debug!("读数已稳定: {}", result.label_sequence());
          return self.last_stable.clone();
        }
        None
      }
      _ => {
        debug!("候选读数更新: {}", result.label_sequence());
        self.last_stable = Some(result.clone());
        self.stable_count = 0;
        None
      }
    }
  }
}

impl Default for StabilityTracker {
  fn default() -> Self {
    Self::new(DEFAULT_STABILIZATION_CYCLES)
  }
}
