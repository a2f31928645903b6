// 该文件是 Sehuan（色环）项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头输入源
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

use std::pin::Pin;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use super::{Frame, InputSource, InputSourceType};

/// mmap 捕获流的缓冲区数量
const CAPTURE_BUFFERS: u32 = 4;

/// V4L2 摄像头输入源
///
/// v4l 的 Stream 借用 Device，二者又要放进同一个结构体里。Device 用
/// Pin<Box> 固定在堆上，Stream 的借用生命周期被延长到 'static，析构时
/// 先取走 Stream 再释放 Device，借用不会悬空。
pub struct V4l2Source {
  device: Pin<Box<Device>>,
  /// 捕获流，始终先于 device 析构
  stream: Option<Stream<'static>>,
  frame_index: u64,
  /// 实际协商得到的视频宽度
  width: u32,
  /// 实际协商得到的视频高度
  height: u32,
  /// 驱动报告的帧率
  fps: Option<f64>,
  start_time: Instant,
}

impl V4l2Source {
  /// 打开摄像头并协商采集格式
  ///
  /// `width`/`height` 是期望分辨率，驱动可能改写为最接近的受支持值，
  /// 以协商结果为准。像素格式固定请求 YUYV。
  pub fn new(device_path: &str, width: u32, height: u32) -> Result<Self> {
    let device = Box::pin(
      Device::with_path(device_path).with_context(|| format!("无法打开设备: {}", device_path))?,
    );

    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    if &format.fourcc.repr != b"YUYV" {
      anyhow::bail!("设备不支持 YUYV 采集格式: {}", format.fourcc);
    }

    let fps = match device.params() {
      Ok(params) if params.interval.numerator > 0 => {
        Some(params.interval.denominator as f64 / params.interval.numerator as f64)
      }
      Ok(_) => None,
      Err(err) => {
        warn!("无法读取采集参数: {err}");
        None
      }
    };

    info!(
      "摄像头格式: {}x{} {} @ {:?} fps",
      format.width, format.height, format.fourcc, fps
    );

    let mut source = Self {
      device,
      stream: None,
      frame_index: 0,
      width: format.width,
      height: format.height,
      fps,
      start_time: Instant::now(),
    };

    let device_ref: &Device = &source.device;
    // SAFETY: device 被 Pin<Box> 固定在堆上，地址在 source 整个生命周期内
    // 不变；stream 与 device 同属 source，Drop 实现保证 stream 先被取走，
    // 因此把借用延长到 'static 不会产生悬空引用。
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, CAPTURE_BUFFERS)
        .context("无法创建捕获流")?
    };

    source.stream = Some(stream);
    Ok(source)
  }
}

/// 把一块 YUYV 缓冲区解码为 RGB 图像
///
/// BT.601 定点近似，每 4 字节还原相邻两个像素。缓冲区长度不足时
/// 返回 `None`。
fn decode_yuyv(yuyv: &[u8], width: u32, height: u32) -> Option<RgbImage> {
  let expected = (width * height * 2) as usize;
  if yuyv.len() < expected {
    return None;
  }

  let mut rgb = Vec::with_capacity((width * height * 3) as usize);
  for chunk in yuyv[..expected].chunks_exact(4) {
    let u = chunk[1] as i32 - 128;
    let v = chunk[3] as i32 - 128;

    for y in [chunk[0] as i32, chunk[2] as i32] {
      let r = y + ((359 * v) >> 8);
      let g = y - ((88 * u + 183 * v) >> 8);
      let b = y + ((454 * u) >> 8);
      rgb.push(r.clamp(0, 255) as u8);
      rgb.push(g.clamp(0, 255) as u8);
      rgb.push(b.clamp(0, 255) as u8);
    }
  }

  RgbImage::from_raw(width, height, rgb)
}

impl Drop for V4l2Source {
  fn drop(&mut self) {
    // stream 借用 device，必须先行析构
    self.stream.take();
  }
}

impl Iterator for V4l2Source {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let stream = self.stream.as_mut()?;

    let (buffer, _meta) = match stream.next() {
      Ok(captured) => captured,
      Err(err) => return Some(Err(anyhow::anyhow!("读取摄像头帧失败: {}", err))),
    };

    let image = match decode_yuyv(buffer, self.width, self.height) {
      Some(image) => image,
      None => return Some(Err(anyhow::anyhow!("摄像头帧数据长度不足"))),
    };

    let frame = Frame {
      image,
      index: self.frame_index,
      timestamp_ms: self.start_time.elapsed().as_millis() as u64,
    };
    self.frame_index += 1;

    Some(Ok(frame))
  }
}

impl InputSource for V4l2Source {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::V4l2
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    self.fps
  }
}
