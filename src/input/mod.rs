// 该文件是 Sehuan（色环）项目的一部分。
// src/input/mod.rs - 输入源模块
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

mod camera_stream;
mod image_source;
#[cfg(feature = "camera_v4l2")]
mod v4l2_source;

use anyhow::{Result, bail};
use image::RgbImage;

pub use camera_stream::CameraStream;
pub use image_source::ImageSource;
#[cfg(feature = "camera_v4l2")]
pub use v4l2_source::V4l2Source;

/// 帧数据
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

/// 输入源类型
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// V4L2 摄像头
  V4l2,
}

/// 输入源 trait
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从路径创建输入源
///
/// `width` 与 `height` 是对摄像头的期望分辨率，图片文件输入忽略它们。
pub fn create_input_source(source: &str, width: u32, height: u32) -> Result<Box<dyn InputSource>> {
  // 检查是否是 V4L2 设备
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    let device_path = source.trim_start_matches("v4l2://");

    #[cfg(feature = "camera_v4l2")]
    return Ok(Box::new(V4l2Source::new(device_path, width, height)?));

    #[cfg(not(feature = "camera_v4l2"))]
    bail!("未启用 camera_v4l2 特性，无法打开摄像头: {}", device_path);
  }

  let _ = (width, height);

  // 检查是否是图片文件
  let lower = source.to_lowercase();
  if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png") {
    return Ok(Box::new(ImageSource::new(source)?));
  }

  bail!("无法识别的输入源: {}", source)
}
