// 该文件是 Sehuan（色环）项目的一部分。
// src/input/camera_stream.rs - 最新帧采集线程
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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Result;
use image::RgbImage;
use tracing::{error, info, warn};

use super::InputSource;

/// 暂停状态下的休眠间隔
const SUSPEND_POLL: Duration = Duration::from_millis(50);

/// 采集线程：持续读取输入源，只保留最新一帧
///
/// 输入源在线程内部通过工厂闭包构造，避免对输入源本身提出 `Send` 要求
/// （V4L2 捕获流不便跨线程移动）。暂停信号只挂起采集，不拆除线程，
/// 恢复后继续产出；停止信号则让线程退出。
pub struct CameraStream {
  latest: Arc<Mutex<Option<RgbImage>>>,
  stop: Arc<AtomicBool>,
  suspend: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl CameraStream {
  /// 启动采集线程
  pub fn spawn<F>(factory: F) -> Self
  where
    F: FnOnce() -> Result<Box<dyn InputSource>> + Send + 'static,
  {
    let latest = Arc::new(Mutex::new(None));
    let stop = Arc::new(AtomicBool::new(false));
    let suspend = Arc::new(AtomicBool::new(false));

    let t_latest = Arc::clone(&latest);
    let t_stop = Arc::clone(&stop);
    let t_suspend = Arc::clone(&suspend);
    let handle = std::thread::spawn(move || {
      let mut source = match factory() {
        Ok(source) => source,
        Err(err) => {
          error!("无法打开输入源: {err:#}");
          return;
        }
      };
      info!("采集线程已启动");

      while !t_stop.load(Ordering::Relaxed) {
        if t_suspend.load(Ordering::Relaxed) {
          std::thread::sleep(SUSPEND_POLL);
          continue;
        }

        match source.next() {
          Some(Ok(frame)) => {
            *t_latest.lock().unwrap() = Some(frame.image);
          }
          Some(Err(err)) => {
            warn!("采集到坏帧: {err:#}");
          }
          None => {
            info!("输入源已结束");
            break;
          }
        }
      }

      info!("采集线程已结束");
    });

    Self {
      latest,
      stop,
      suspend,
      handle: Some(handle),
    }
  }

  /// 获取最近采集到的一帧
  ///
  /// 非阻塞；线程尚未产出任何帧时返回 `None`。
  pub fn get_frame(&self) -> Option<RgbImage> {
    self.latest.lock().unwrap().clone()
  }

  /// 挂起采集（例如结果页展示期间）
  pub fn signal_suspend(&self) {
    self.suspend.store(true, Ordering::Relaxed);
  }

  /// 恢复采集
  pub fn signal_resume(&self) {
    self.suspend.store(false, Ordering::Relaxed);
  }

  /// 发送协作式停止信号
  pub fn signal_stop(&self) {
    self.signal_resume();
    self.stop.store(true, Ordering::Relaxed);
  }

  /// 停止并等待采集线程退出
  pub fn join(mut self) {
    self.signal_stop();
    if let Some(handle) = self.handle.take() {
      if handle.join().is_err() {
        error!("采集线程异常退出");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::{Frame, InputSourceType};
  use std::time::Instant;

  /// 产出恒定灰色帧的内存输入源
  struct GreySource {
    index: u64,
  }

  impl Iterator for GreySource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
      self.index += 1;
      Some(Ok(Frame {
        image: RgbImage::from_pixel(4, 4, image::Rgb([128, 128, 128])),
        index: self.index,
        timestamp_ms: 0,
      }))
    }
  }

  impl InputSource for GreySource {
    fn source_type(&self) -> InputSourceType {
      InputSourceType::Image
    }

    fn width(&self) -> u32 {
      4
    }

    fn height(&self) -> u32 {
      4
    }

    fn fps(&self) -> Option<f64> {
      None
    }
  }

  #[test]
  fn keeps_latest_frame() {
    let stream = CameraStream::spawn(|| Ok(Box::new(GreySource { index: 0 }) as Box<dyn InputSource>));

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
      if let Some(frame) = stream.get_frame() {
        assert_eq!(frame.dimensions(), (4, 4));
        break;
      }
      assert!(Instant::now() < deadline, "等待首帧超时");
      std::thread::sleep(Duration::from_millis(5));
    }

    stream.signal_suspend();
    stream.signal_resume();
    stream.join();
  }

  #[test]
  fn factory_failure_leaves_no_frame() {
    let stream = CameraStream::spawn(|| anyhow::bail!("打不开"));
    std::thread::sleep(Duration::from_millis(20));
    assert!(stream.get_frame().is_none());
    stream.join();
  }
}
