// 该文件是 Sehuan（色环）项目的一部分。
// src/args.rs - 扫描程序参数配置
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

#[cfg(feature = "draw_overlay")]
use std::path::PathBuf;

use clap::Parser;
#[cfg(feature = "scan_record")]
use url::Url;

/// Sehuan 扫描程序参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源（V4L2 设备路径或图片文件）
  /// 支持格式:
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0
  /// - 图片: *.jpg, *.jpeg, *.png
  #[arg(long, default_value = "/dev/video0", value_name = "SOURCE")]
  pub input: String,

  /// 摄像头采集宽度
  #[arg(long, default_value_t = 1280, value_name = "PIXELS")]
  pub width: u32,

  /// 摄像头采集高度
  #[arg(long, default_value_t = 720, value_name = "PIXELS")]
  pub height: u32,

  /// 调度节拍频率（每秒节拍数，与摄像头帧率同步）
  #[arg(long, default_value_t = 30, value_name = "FPS")]
  pub fps: u32,

  /// 推理区域，格式 x,y,w,h
  #[arg(
    long,
    value_delimiter = ',',
    default_value = "375,175,300,300",
    value_name = "X,Y,W,H"
  )]
  pub inference_area: Vec<u32>,

  /// 启用聚焦模式（只取推理区域中央窗口，适合小尺寸电阻）
  #[arg(long)]
  pub focus: bool,

  /// 聚焦模式窗口，格式 w,h
  #[arg(long, value_delimiter = ',', default_value = "200,100", value_name = "W,H")]
  pub focus_area: Vec<u32>,

  /// 稳定判定门限：候选读数确立后还需连续确认的帧数
  #[arg(long, default_value_t = 3, value_name = "CYCLES")]
  pub stabilization_cycles: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.3, value_name = "THRESHOLD")]
  pub score_threshold: f32,

  /// 单帧最多保留的检测数
  #[arg(long, default_value_t = 5, value_name = "COUNT")]
  pub max_results: usize,

  /// 推理线程数
  #[arg(long, default_value_t = 3, value_name = "COUNT")]
  pub num_threads: usize,

  /// 检测器后端（目前内置: stub）
  #[arg(long, default_value = "stub", value_name = "BACKEND")]
  pub detector: String,

  /// 扫描记录仓库地址
  #[cfg(feature = "scan_record")]
  #[arg(
    long,
    default_value = "folder:///var/tmp/sehuan/scan_record",
    value_name = "URL"
  )]
  pub record: Url,

  /// 启动前清空扫描记录
  #[cfg(feature = "scan_record")]
  #[arg(long)]
  pub clear_records: bool,

  /// 标注文本使用的字体文件路径（省略则只画边框）
  #[cfg(feature = "draw_overlay")]
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 最大产出读数次数（0 表示无限制）
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub max_readings: u64,
}
