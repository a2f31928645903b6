// 该文件是 Sehuan（色环）项目的一部分。
// src/utils.rs - 辅助工具
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

use std::time::Instant;

/// 每累计多少帧重新估计一次帧率
const UPDATE_INTERVAL: u32 = 10;

/// 滑动窗口帧率计
pub struct FpsCounter {
  count: u32,
  fps: f64,
  t_start: Instant,
}

impl FpsCounter {
  pub fn new() -> Self {
    Self {
      count: 0,
      fps: 0.0,
      t_start: Instant::now(),
    }
  }

  /// 记录一帧；窗口走满时返回新的帧率估计
  pub fn update(&mut self) -> Option<f64> {
    self.count += 1;
    if self.count < UPDATE_INTERVAL {
      return None;
    }

    let delta = self.t_start.elapsed().as_secs_f64();
    self.fps = if delta > 0.0 {
      self.count as f64 / delta
    } else {
      0.0
    };
    self.count = 0;
    self.t_start = Instant::now();
    Some(self.fps)
  }

  /// 最近一次的帧率估计
  pub fn fps(&self) -> f64 {
    self.fps
  }
}

impl Default for FpsCounter {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn updates_every_interval() {
    let mut counter = FpsCounter::new();
    for _ in 0..9 {
      assert!(counter.update().is_none());
    }
    let fps = counter.update().expect("第 10 帧应产生估计");
    assert!(fps > 0.0);
    assert_eq!(counter.fps(), fps);

    // 窗口重置后重新累计
    assert!(counter.update().is_none());
  }
}
