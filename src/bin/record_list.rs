// 该文件是 Sehuan（色环）项目的一部分。
// src/bin/record_list.rs - 扫描记录浏览工具
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
use clap::Parser;
use tracing::warn;
use url::Url;

use sehuan::FromUrl;
use sehuan::record::RecordStore;
use sehuan::resistor::format_resistance;
use sehuan::scan::decode;

/// Sehuan 扫描记录浏览工具参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 扫描记录仓库地址
  #[arg(
    long,
    default_value = "folder:///var/tmp/sehuan/scan_record",
    value_name = "URL"
  )]
  pub record: Url,

  /// 只显示文件名中包含该日期片段的记录（如 2026-08-29）
  #[arg(long, value_name = "DATE")]
  pub date: Option<String>,

  /// 清空全部记录后退出
  #[arg(long)]
  pub clear: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let store = RecordStore::from_url(&args.record)?;

  if args.clear {
    let removed = store.clear()?;
    println!("已删除 {removed} 条扫描记录");
    return Ok(());
  }

  let stems = store.list()?;
  if stems.is_empty() {
    println!("没有扫描记录");
    return Ok(());
  }

  for stem in stems {
    if let Some(date) = &args.date {
      if !stem.contains(date) {
        continue;
      }
    }

    let record = match store.load(&stem) {
      Ok(record) => record,
      Err(err) => {
        warn!("跳过无法读取的记录 {stem}: {err}");
        continue;
      }
    };

    match decode(&record.result) {
      Ok(reading) => println!(
        "{stem}  [{}]  {} ±{}%",
        record.result.label_sequence(),
        format_resistance(reading.resistance),
        reading.tolerance
      ),
      Err(err) => println!("{stem}  [{}]  无法解码: {err}", record.result.label_sequence()),
    }
  }

  Ok(())
}
