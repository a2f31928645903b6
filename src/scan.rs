// 该文件是 Sehuan（色环）项目的一部分。
// src/scan.rs - 扫描调度循环
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

use image::{Rgb, RgbImage, imageops};
use tracing::{debug, info};

use crate::detection::BandDetectionResult;
use crate::input::CameraStream;
use crate::resistor::{Resistor, ResistorError, format_resistance};
use crate::stability::{DEFAULT_STABILIZATION_CYCLES, StabilityTracker};
use crate::utils::FpsCounter;
use crate::worker::InferenceWorker;

/// 聚焦模式边缘填充的灰度值
const FOCUS_PAD_GREY: u8 = 128;

/// 扫描循环配置
#[derive(Clone, Copy, Debug)]
pub struct ScanConfig {
  /// 推理区域 `[x, y, w, h]`：从整帧中裁出送检的固定子区域
  pub inference_area: [u32; 4],
  /// 聚焦模式窗口 `(w, h)`：启用时只取推理区域中央的这一小块，
  /// 四周填灰补回原尺寸，用于读取小尺寸电阻
  pub focus_area: Option<(u32, u32)>,
  /// 稳定判定门限
  pub stabilization_cycles: u32,
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      inference_area: [375, 175, 300, 300],
      focus_area: None,
      stabilization_cycles: DEFAULT_STABILIZATION_CYCLES,
    }
  }
}

/// 一次解码完成的读数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
  /// 阻值（欧姆）
  pub resistance: f64,
  /// 误差（百分比）
  pub tolerance: f64,
}

/// 稳定读数产出
pub struct ScanOutcome {
  /// 产生该读数的推理图像
  pub image: RgbImage,
  /// 稳定的检测结果
  pub result: BandDetectionResult,
  /// 解码结论；失败时携带指明出错色环的错误
  pub reading: Result<Reading, ResistorError>,
}

/// 扫描调度循环
///
/// 单线程协作调度：外部以固定节奏调用 [`tick`](Self::tick)，每个节拍内
/// 完成一次非阻塞的取结果、喂稳定器、按需提交新帧，节拍之间没有悬挂点。
/// 工作线程在看的帧可能落后于画面上的帧一个或多个节拍，这是有界的
/// 陈旧性，属于设计内行为。
pub struct ScanLoop {
  camera: CameraStream,
  worker: InferenceWorker,
  tracker: StabilityTracker,
  config: ScanConfig,
  /// 最近一次提交推理的裁剪图，用于与随后返回的结果配对
  last_submitted: Option<RgbImage>,
  fps: FpsCounter,
}

impl ScanLoop {
  pub fn new(camera: CameraStream, worker: InferenceWorker, config: ScanConfig) -> Self {
    let tracker = StabilityTracker::new(config.stabilization_cycles);
    Self {
      camera,
      worker,
      tracker,
      config,
      last_submitted: None,
      fps: FpsCounter::new(),
    }
  }

  /// 执行一个调度节拍
  ///
  /// 读数在本节拍内稳定时返回产出；相机尚未出帧、结果未返回或
  /// 读数尚未稳定都返回 `None`。
  pub fn tick(&mut self) -> Option<ScanOutcome> {
    let frame = self.camera.get_frame()?;

    if let Some(fps) = self.fps.update() {
      debug!("扫描节奏: {fps:.2} fps");
    }

    let crop = self.crop_inference_area(&frame);

    let mut outcome = None;
    if let Some(result) = self.worker.try_fetch() {
      debug!("收到检测结果: [{}]", result.label_sequence());
      if let Some(stable) = self.tracker.update(&result) {
        outcome = Some(self.conclude(stable));
      }
    }

    if self.worker.is_ready() {
      let submit_image = match self.config.focus_area {
        Some(focus) => focus_pad(&crop, focus),
        None => crop.clone(),
      };
      if self.worker.submit(submit_image) {
        self.last_submitted = Some(crop);
      }
    }

    outcome
  }

  /// 把稳定读数解码成产出
  fn conclude(&mut self, stable: BandDetectionResult) -> ScanOutcome {
    let reading = decode(&stable);
    match &reading {
      Ok(reading) => info!(
        "读数稳定: [{}] => {} ±{}%",
        stable.label_sequence(),
        format_resistance(reading.resistance),
        reading.tolerance
      ),
      Err(err) => info!("读数稳定但无法解码: [{}] => {}", stable.label_sequence(), err),
    }

    let image = self
      .last_submitted
      .clone()
      .unwrap_or_else(|| RgbImage::new(0, 0));
    ScanOutcome {
      image,
      result: stable,
      reading,
    }
  }

  /// 从整帧中裁出推理区域（越界部分收缩到帧内）
  fn crop_inference_area(&self, frame: &RgbImage) -> RgbImage {
    let [x, y, w, h] = self.config.inference_area;
    let x = x.min(frame.width().saturating_sub(1));
    let y = y.min(frame.height().saturating_sub(1));
    let w = w.min(frame.width() - x);
    let h = h.min(frame.height() - y);
    imageops::crop_imm(frame, x, y, w, h).to_image()
  }

  /// 挂起采集（结果展示期间）
  pub fn suspend(&self) {
    self.camera.signal_suspend();
  }

  /// 恢复采集
  pub fn resume(&self) {
    self.camera.signal_resume();
  }

  /// 停止并回收采集线程与推理线程
  pub fn shutdown(self) {
    self.camera.signal_stop();
    self.worker.signal_stop();
    self.camera.join();
    self.worker.join();
  }
}

/// 对一个稳定的检测结果做完整解码
pub fn decode(result: &BandDetectionResult) -> Result<Reading, ResistorError> {
  let resistor = Resistor::new(result.clone())?;
  Ok(Reading {
    resistance: resistor.resistance()?,
    tolerance: resistor.tolerance()?,
  })
}

/// 聚焦模式：取推理区域中央的 `(w, h)` 窗口，四周填灰补回原尺寸
fn focus_pad(crop: &RgbImage, focus: (u32, u32)) -> RgbImage {
  let (fw, fh) = focus;
  let fw = fw.min(crop.width());
  let fh = fh.min(crop.height());
  let pad_x = (crop.width() - fw) / 2;
  let pad_y = (crop.height() - fh) / 2;

  let window = imageops::crop_imm(crop, pad_x, pad_y, fw, fh).to_image();
  let mut canvas = RgbImage::from_pixel(
    crop.width(),
    crop.height(),
    Rgb([FOCUS_PAD_GREY, FOCUS_PAD_GREY, FOCUS_PAD_GREY]),
  );
  imageops::replace(&mut canvas, &window, pad_x as i64, pad_y as i64);
  canvas
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::{DetectorOptions, RawDetection, StubDetector};
  use crate::detection::tests::make_result;
  use crate::input::{Frame, InputSource, InputSourceType};
  use std::time::{Duration, Instant};

  struct FlatSource;

  impl Iterator for FlatSource {
    type Item = anyhow::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
      std::thread::sleep(Duration::from_millis(2));
      Some(Ok(Frame {
        image: RgbImage::from_pixel(160, 120, Rgb([200, 180, 150])),
        index: 0,
        timestamp_ms: 0,
      }))
    }
  }

  impl InputSource for FlatSource {
    fn source_type(&self) -> InputSourceType {
      InputSourceType::Image
    }

    fn width(&self) -> u32 {
      160
    }

    fn height(&self) -> u32 {
      120
    }

    fn fps(&self) -> Option<f64> {
      None
    }
  }

  fn raw(label: &str, x: i32) -> RawDetection {
    RawDetection {
      id: 0,
      label: label.to_string(),
      score: 0.9,
      bounding_box: [x - 10, 40, x + 10, 60],
    }
  }

  #[test]
  fn scan_loop_emits_stable_reading() {
    let camera = CameraStream::spawn(|| Ok(Box::new(FlatSource) as Box<dyn InputSource>));
    let script = vec![vec![
      raw("red_band", 10),
      raw("violet_band", 50),
      raw("brown_band", 90),
      raw("gold_band", 130),
    ]];
    let worker = InferenceWorker::spawn(Box::new(StubDetector::from_script(
      DetectorOptions::default(),
      script,
    )));
    let config = ScanConfig {
      inference_area: [0, 0, 160, 120],
      focus_area: None,
      stabilization_cycles: 3,
    };
    let mut scan = ScanLoop::new(camera, worker, config);

    let deadline = Instant::now() + Duration::from_secs(10);
    let outcome = loop {
      if let Some(outcome) = scan.tick() {
        break outcome;
      }
      assert!(Instant::now() < deadline, "等待稳定读数超时");
      std::thread::sleep(Duration::from_millis(5));
    };

    assert_eq!(
      outcome.result.label_sequence(),
      "red_band violet_band brown_band gold_band"
    );
    let reading = outcome.reading.expect("应解码成功");
    assert_eq!(reading.resistance, 270.0);
    assert_eq!(reading.tolerance, 5.0);
    assert_eq!(outcome.image.dimensions(), (160, 120));

    scan.shutdown();
  }

  #[test]
  fn decode_reports_reading() {
    let result = make_result(&["yellow_band", "violet_band", "red_band", "gold_band", "brown_band"]);
    let reading = decode(&result).unwrap();
    assert!((reading.resistance - 47.2).abs() < 1e-9);
    assert_eq!(reading.tolerance, 1.0);
  }

  #[test]
  fn decode_propagates_band_errors() {
    let result = make_result(&["gold_band", "violet_band", "red_band", "brown_band"]);
    assert!(matches!(
      decode(&result).unwrap_err(),
      ResistorError::InvalidSignificant(band) if band.label() == "gold_band"
    ));
  }

  #[test]
  fn focus_pad_keeps_dimensions() {
    let crop = RgbImage::from_pixel(300, 300, Rgb([10, 10, 10]));
    let padded = focus_pad(&crop, (200, 100));

    assert_eq!(padded.dimensions(), (300, 300));
    // 中央窗口保留原像素，窗口外是灰色填充
    assert_eq!(padded.get_pixel(150, 150), &Rgb([10, 10, 10]));
    assert_eq!(padded.get_pixel(150, 50), &Rgb([128, 128, 128]));
    assert_eq!(padded.get_pixel(20, 150), &Rgb([128, 128, 128]));
  }

  #[test]
  fn oversized_focus_window_clamped() {
    let crop = RgbImage::from_pixel(50, 50, Rgb([10, 10, 10]));
    let padded = focus_pad(&crop, (200, 100));
    assert_eq!(padded.dimensions(), (50, 50));
    assert_eq!(padded.get_pixel(25, 25), &Rgb([10, 10, 10]));
  }
}
