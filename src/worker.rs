// 该文件是 Sehuan（色环）项目的一部分。
// src/worker.rs - 推理工作线程与单槽请求通道
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
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use image::RgbImage;
use tracing::{error, info, warn};

use crate::band::DetectedBand;
use crate::detect::BandDetector;
use crate::detection::BandDetectionResult;

/// 工作线程空闲时的轮询间隔
///
/// 只为让停止信号保持响应，不承担任何正确性职责。
const IDLE_POLL: Duration = Duration::from_secs(1);

/// 推理工作线程句柄
///
/// 采集/调度侧与工作线程之间是容量为 1 的单槽请求通道：发送前先查
/// 就绪标志，线程忙时本周期的帧直接丢弃而不是排队。这样既限定了结果
/// 的陈旧程度，也限定了内存占用。两个方向各只有一个写者，除通道自身
/// 外不需要额外的锁。
pub struct InferenceWorker {
  req_tx: SyncSender<RgbImage>,
  resp_rx: Receiver<BandDetectionResult>,
  ready: Arc<AtomicBool>,
  stop: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
  /// 启动工作线程，由其独占给定的检测器
  pub fn spawn(mut detector: Box<dyn BandDetector + Send>) -> Self {
    let (req_tx, req_rx) = mpsc::sync_channel::<RgbImage>(1);
    let (resp_tx, resp_rx) = mpsc::channel::<BandDetectionResult>();

    let ready = Arc::new(AtomicBool::new(true));
    let stop = Arc::new(AtomicBool::new(false));

    let t_ready = Arc::clone(&ready);
    let t_stop = Arc::clone(&stop);
    let handle = std::thread::spawn(move || {
      info!("推理工作线程已启动");

      while !t_stop.load(Ordering::Relaxed) {
        let image = match req_rx.recv_timeout(IDLE_POLL) {
          Ok(image) => image,
          Err(mpsc::RecvTimeoutError::Timeout) => continue,
          Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        t_ready.store(false, Ordering::Release);

        let result = run_detection(detector.as_mut(), &image);
        if resp_tx.send(result).is_err() {
          break;
        }
        t_ready.store(true, Ordering::Release);
      }

      info!("推理工作线程已结束");
    });

    Self {
      req_tx,
      resp_rx,
      ready,
      stop,
      handle: Some(handle),
    }
  }

  /// 工作线程当前是否可以接收新帧
  pub fn is_ready(&self) -> bool {
    self.ready.load(Ordering::Acquire)
  }

  /// 非阻塞提交一帧
  ///
  /// 线程忙时返回 `false`，调用方本周期跳过提交即可，这不是错误。
  pub fn submit(&self, image: RgbImage) -> bool {
    if !self.is_ready() {
      return false;
    }
    match self.req_tx.try_send(image) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
    }
  }

  /// 非阻塞取回一帧检测结果
  ///
  /// 没有新结果时返回 `None`，同样不是错误。
  pub fn try_fetch(&self) -> Option<BandDetectionResult> {
    self.resp_rx.try_recv().ok()
  }

  /// 发送协作式停止信号
  pub fn signal_stop(&self) {
    self.stop.store(true, Ordering::Relaxed);
  }

  /// 停止并等待工作线程退出
  pub fn join(mut self) {
    self.signal_stop();
    if let Some(handle) = self.handle.take() {
      if handle.join().is_err() {
        error!("推理工作线程异常退出");
      }
    }
  }
}

/// 执行一次检测并把原始输出转换为检测结果
///
/// 检测器故障与词表外标签都不会让流水线中断：前者记录错误并返回空结果
/// （空结果无效，上游自然忽略），后者记录警告后丢弃该检测项。
fn run_detection(detector: &mut dyn BandDetector, image: &RgbImage) -> BandDetectionResult {
  let detections = match detector.detect(image) {
    Ok(detections) => detections,
    Err(err) => {
      error!("检测失败: {err:#}");
      return BandDetectionResult::default();
    }
  };

  let mut bands = Vec::with_capacity(detections.len());
  for detection in detections {
    match DetectedBand::new(
      detection.id,
      &detection.label,
      detection.score,
      detection.bounding_box,
    ) {
      Ok(band) => bands.push(band),
      Err(err) => warn!("丢弃词表外的检测项: {err}"),
    }
  }

  BandDetectionResult::new(bands)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::{DetectorOptions, RawDetection, StubDetector};
  use std::time::Instant;

  fn raw(label: &str, x: i32) -> RawDetection {
    RawDetection {
      id: 0,
      label: label.to_string(),
      score: 0.9,
      bounding_box: [x - 10, 40, x + 10, 60],
    }
  }

  fn fetch_blocking(worker: &InferenceWorker) -> BandDetectionResult {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
      if let Some(result) = worker.try_fetch() {
        return result;
      }
      assert!(Instant::now() < deadline, "等待检测结果超时");
      std::thread::sleep(Duration::from_millis(5));
    }
  }

  #[test]
  fn submit_and_fetch_roundtrip() {
    let script = vec![vec![
      raw("brown_band", 120),
      raw("red_band", 0),
      raw("black_band", 80),
      raw("violet_band", 40),
    ]];
    let worker = InferenceWorker::spawn(Box::new(StubDetector::from_script(
      DetectorOptions::default(),
      script,
    )));

    assert!(worker.submit(RgbImage::new(16, 16)));
    let result = fetch_blocking(&worker);
    assert_eq!(result.label_sequence(), "red_band violet_band black_band brown_band");
    assert!(result.is_valid());

    worker.join();
  }

  #[test]
  fn out_of_vocabulary_detections_dropped() {
    let script = vec![vec![raw("red_band", 0), raw("pink_band", 40)]];
    let worker = InferenceWorker::spawn(Box::new(StubDetector::from_script(
      DetectorOptions::default(),
      script,
    )));

    assert!(worker.submit(RgbImage::new(16, 16)));
    let result = fetch_blocking(&worker);
    assert_eq!(result.label_sequence(), "red_band");

    worker.join();
  }

  #[test]
  fn fetch_without_submit_is_empty() {
    let worker = InferenceWorker::spawn(Box::new(StubDetector::empty()));
    assert!(worker.try_fetch().is_none());
    assert!(worker.is_ready());
    worker.join();
  }

  #[test]
  fn stop_signal_terminates_thread() {
    let worker = InferenceWorker::spawn(Box::new(StubDetector::empty()));
    worker.signal_stop();
    // join 内部会再次发信号并等待线程退出
    worker.join();
  }
}
