// 该文件是 Sehuan（色环）项目的一部分。
// src/record.rs - 扫描记录的保存与读取
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

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use image::RgbImage;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::band::DetectedBand;
use crate::detection::BandDetectionResult;
use crate::{FromUrl, FromUrlWithScheme};

/// 记录文件名中的时间格式
const STEM_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("元数据错误: {0}")]
  Metadata(#[from] serde_json::Error),
  #[error("记录损坏: {0}")]
  Corrupt(String),
}

/// 一条扫描记录：推理用图像、检测结果与产生时刻
pub struct ScanRecord {
  pub image: RgbImage,
  pub result: BandDetectionResult,
  pub time: DateTime<Local>,
}

impl ScanRecord {
  pub fn new(image: RgbImage, result: BandDetectionResult) -> Self {
    Self::with_time(image, result, Local::now())
  }

  pub fn with_time(image: RgbImage, result: BandDetectionResult, time: DateTime<Local>) -> Self {
    Self {
      image,
      result,
      time,
    }
  }

  /// 记录在目录中的文件名主干
  pub fn stem(&self) -> String {
    self.time.format(STEM_TIME_FORMAT).to_string()
  }
}

/// 目录式记录仓库
///
/// 每条记录落盘为一张 PNG（原始推理图像）加一个 JSON 元数据文件，
/// 二者共用以时间戳命名的主干。读取按原样还原三元组。
#[derive(Debug)]
pub struct RecordStore {
  directory: PathBuf,
}

impl FromUrlWithScheme for RecordStore {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for RecordStore {
  type Error = RecordError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordError::SchemeMismatch);
    }
    Ok(Self::new(url.path()))
  }
}

impl RecordStore {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &PathBuf {
    &self.directory
  }

  /// 保存一条记录，返回其文件名主干
  pub fn save(&self, record: &ScanRecord) -> Result<String, RecordError> {
    fs::create_dir_all(&self.directory)?;

    let stem = record.stem();
    record
      .image
      .save(self.directory.join(format!("{stem}.png")))?;

    let bands: Vec<serde_json::Value> = record
      .result
      .bands()
      .iter()
      .map(|band| {
        let bbox = band.bounding_box();
        json!({
          "id": band.id(),
          "label": band.label(),
          "score": band.score(),
          "bounding_box": [bbox.left, bbox.top, bbox.right, bbox.bottom],
        })
      })
      .collect();
    let metadata = json!({
      "time": record.time.to_rfc3339(),
      "bands": bands,
    });

    fs::write(
      self.directory.join(format!("{stem}.json")),
      serde_json::to_string_pretty(&metadata)?,
    )?;

    info!("扫描记录已保存: {stem}");
    Ok(stem)
  }

  /// 按文件名主干读取一条记录
  pub fn load(&self, stem: &str) -> Result<ScanRecord, RecordError> {
    let image = image::open(self.directory.join(format!("{stem}.png")))?.to_rgb8();

    let raw = fs::read_to_string(self.directory.join(format!("{stem}.json")))?;
    let metadata: serde_json::Value = serde_json::from_str(&raw)?;

    let time = metadata["time"]
      .as_str()
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|t| t.with_timezone(&Local))
      .ok_or_else(|| RecordError::Corrupt(format!("时间字段无法解析: {stem}")))?;

    let bands_value = metadata["bands"]
      .as_array()
      .ok_or_else(|| RecordError::Corrupt(format!("缺少 bands 字段: {stem}")))?;

    let mut bands = Vec::with_capacity(bands_value.len());
    for value in bands_value {
      let band = parse_band(value)
        .ok_or_else(|| RecordError::Corrupt(format!("色环条目无法解析: {stem}")))?;
      bands.push(band);
    }

    Ok(ScanRecord::with_time(
      image,
      BandDetectionResult::new(bands),
      time,
    ))
  }

  /// 列出目录中全部记录的文件名主干，按时间（亦即文件名）升序
  pub fn list(&self) -> Result<Vec<String>, RecordError> {
    if !self.directory.exists() {
      return Ok(Vec::new());
    }

    let mut stems = Vec::new();
    for entry in fs::read_dir(&self.directory)? {
      let path = entry?.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
          stems.push(stem.to_string());
        }
      }
    }
    stems.sort();
    Ok(stems)
  }

  /// 清空全部记录，返回删除的条数
  pub fn clear(&self) -> Result<usize, RecordError> {
    let stems = self.list()?;
    for stem in &stems {
      let _ = fs::remove_file(self.directory.join(format!("{stem}.png")));
      fs::remove_file(self.directory.join(format!("{stem}.json")))?;
    }
    info!("已删除 {} 条扫描记录", stems.len());
    Ok(stems.len())
  }
}

fn parse_band(value: &serde_json::Value) -> Option<DetectedBand> {
  let id = value["id"].as_u64()? as u32;
  let label = value["label"].as_str()?;
  let score = value["score"].as_f64()? as f32;
  let bbox = value["bounding_box"].as_array()?;
  if bbox.len() != 4 {
    return None;
  }
  let coords: Vec<i32> = bbox.iter().filter_map(|v| v.as_i64()).map(|v| v as i32).collect();
  if coords.len() != 4 {
    return None;
  }

  DetectedBand::new(id, label, score, [coords[0], coords[1], coords[2], coords[3]]).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detection::tests::make_result;
  use url::Url;

  #[test]
  fn save_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());

    let result = make_result(&["red_band", "violet_band", "black_band", "brown_band"]);
    let image = RgbImage::from_pixel(32, 16, image::Rgb([10, 20, 30]));
    let record = ScanRecord::new(image.clone(), result.clone());

    let stem = store.save(&record).unwrap();
    let loaded = store.load(&stem).unwrap();

    assert_eq!(loaded.image.dimensions(), (32, 16));
    assert_eq!(loaded.image, image);
    assert!(loaded.result.is_identical(&result));
    assert_eq!(loaded.result.bands()[0].bounding_box(), result.bands()[0].bounding_box());
    assert_eq!(loaded.stem(), record.stem());
  }

  #[test]
  fn list_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    assert!(store.list().unwrap().is_empty());

    let result = make_result(&["red_band", "violet_band", "black_band", "brown_band"]);
    let record = ScanRecord::new(RgbImage::new(8, 8), result);
    let stem = store.save(&record).unwrap();

    assert_eq!(store.list().unwrap(), vec![stem]);
    assert_eq!(store.clear().unwrap(), 1);
    assert!(store.list().unwrap().is_empty());
  }

  #[test]
  fn store_from_url() {
    let store = RecordStore::from_url(&Url::parse("folder:///tmp/scan_record").unwrap()).unwrap();
    assert_eq!(store.directory(), &PathBuf::from("/tmp/scan_record"));

    let err = RecordStore::from_url(&Url::parse("http://example.com/").unwrap()).unwrap_err();
    assert!(matches!(err, RecordError::SchemeMismatch));
  }

  #[test]
  fn corrupt_metadata_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());

    let result = make_result(&["red_band", "violet_band", "black_band", "brown_band"]);
    let stem = store.save(&ScanRecord::new(RgbImage::new(8, 8), result)).unwrap();

    fs::write(
      dir.path().join(format!("{stem}.json")),
      r#"{"time": "yesterday", "bands": []}"#,
    )
    .unwrap();
    assert!(matches!(store.load(&stem), Err(RecordError::Corrupt(_))));
  }
}
