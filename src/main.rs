// 该文件是 Sehuan（色环）项目的一部分。
// src/main.rs - 扫描主程序
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

mod args;

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{info, warn};

use sehuan::detect::{BandDetector, DetectorOptions, StubDetector};
use sehuan::input::{CameraStream, create_input_source};
use sehuan::scan::{ScanConfig, ScanLoop};
use sehuan::worker::InferenceWorker;

#[cfg(feature = "scan_record")]
use sehuan::FromUrl;
#[cfg(feature = "scan_record")]
use sehuan::record::{RecordStore, ScanRecord};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("推理区域: {:?}", args.inference_area);
  info!("稳定判定门限: {}", args.stabilization_cycles);

  if args.inference_area.len() != 4 {
    bail!("推理区域必须是 x,y,w,h 四个值");
  }
  if args.focus_area.len() != 2 {
    bail!("聚焦窗口必须是 w,h 两个值");
  }

  #[cfg(feature = "scan_record")]
  let store = RecordStore::from_url(&args.record)?;
  #[cfg(feature = "scan_record")]
  if args.clear_records {
    let removed = store.clear()?;
    info!("已清空 {} 条扫描记录", removed);
  }

  #[cfg(all(feature = "scan_record", feature = "draw_overlay"))]
  let overlay = match &args.font {
    Some(path) => sehuan::draw::Overlay::with_font_path(path)?,
    None => sehuan::draw::Overlay::new(),
  };

  // 检测器后端
  let options = DetectorOptions {
    max_results: args.max_results,
    score_threshold: args.score_threshold,
    num_threads: args.num_threads,
  };
  let detector: Box<dyn BandDetector + Send> = match args.detector.as_str() {
    "stub" => {
      warn!("使用空检测桩，不会产生任何读数；真实模型后端通过 BandDetector trait 接入");
      Box::new(StubDetector::from_script(options, Vec::new()))
    }
    other => bail!("未知的检测器后端: {}", other),
  };

  // 采集线程与推理线程
  let input = args.input.clone();
  let (width, height) = (args.width, args.height);
  let camera = CameraStream::spawn(move || create_input_source(&input, width, height));
  let worker = InferenceWorker::spawn(detector);

  let config = ScanConfig {
    inference_area: [
      args.inference_area[0],
      args.inference_area[1],
      args.inference_area[2],
      args.inference_area[3],
    ],
    focus_area: args.focus.then(|| (args.focus_area[0], args.focus_area[1])),
    stabilization_cycles: args.stabilization_cycles,
  };
  let mut scan = ScanLoop::new(camera, worker, config);

  // Ctrl-C 协作式退出
  let (tx, rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
  })
  .expect("Error setting Ctrl-C handler");

  let tick_delay = Duration::from_millis(1000 / args.fps.max(1) as u64);
  let mut readings = 0u64;

  info!("开始扫描...");
  loop {
    if rx.try_recv().is_ok() {
      break;
    }

    if let Some(outcome) = scan.tick() {
      readings += 1;

      #[cfg(feature = "scan_record")]
      {
        let record = ScanRecord::new(outcome.image.clone(), outcome.result.clone());
        match store.save(&record) {
          Ok(stem) => {
            #[cfg(feature = "draw_overlay")]
            save_annotated(&store, &overlay, &stem, &outcome);
            #[cfg(not(feature = "draw_overlay"))]
            let _ = stem;
          }
          Err(err) => warn!("保存扫描记录失败: {err}"),
        }
      }

      if args.max_readings > 0 && readings >= args.max_readings {
        info!("已达到指定读数次数 {}, 退出扫描循环", args.max_readings);
        break;
      }
    }

    std::thread::sleep(tick_delay);
  }

  scan.shutdown();
  info!("共产出 {} 次稳定读数", readings);

  Ok(())
}

/// 在记录旁保存一份画好标注的副本
#[cfg(all(feature = "scan_record", feature = "draw_overlay"))]
fn save_annotated(
  store: &RecordStore,
  overlay: &sehuan::draw::Overlay,
  stem: &str,
  outcome: &sehuan::scan::ScanOutcome,
) {
  let mut annotated = outcome.image.clone();
  overlay.draw_result(&mut annotated, &outcome.result);
  let path = store.directory().join(format!("{stem}_annotated.png"));
  if let Err(err) = annotated.save(&path) {
    warn!("保存标注图失败: {err}");
  }
}
