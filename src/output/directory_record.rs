// 该文件是 Pinjie （拼接） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, Record, RecordFormat},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未知的记录格式: {0}")]
  UnknownRecordFormat(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把每帧保存到目录中，文件名与输入帧相同。
///
/// URL 查询参数：
/// - `record=id|name|json`：保存未标注的原图，并在旁边写检测记录；
/// - `always`：没有检测的帧也保存。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  record: Option<Record>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let mut record = None;
    for (k, v) in uri.query_pairs() {
      if k == "record" {
        let format = match v.as_ref() {
          "id" => RecordFormat::Id,
          "name" | "" => RecordFormat::Name,
          "json" => RecordFormat::Json,
          other => return Err(DirectoryRecordOutputError::UnknownRecordFormat(other.to_string())),
        };
        record = Some(Record { format });
        break;
      }
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::default(),
      record,
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
      draw: Draw::default(),
      record: None,
      always: false,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn with_record(mut self, format: RecordFormat) -> Self {
    self.record = Some(Record { format });
    self
  }

  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_path(&self, frame: &ImageFrame) -> Result<PathBuf, DirectoryRecordOutputError> {
    if !self.directory.exists() {
      std::fs::create_dir_all(&self.directory)?;
    }
    Ok(self.directory.join(&frame.name))
  }
}

impl Render<ImageFrame, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("帧 {} 没有检测结果, 不保存", frame.name);
      return Ok(());
    }

    let path = self.frame_path(frame)?;
    match &self.record {
      Some(record) => {
        frame.image.save(&path)?;
        record.record(result, self.draw.labels(), &path)?;
      }
      None => {
        self.draw.draw_detection(frame, result).save(&path)?;
      }
    }
    info!("保存 {} ({} 个检测)", path.display(), result.len());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{DetectItem, Model, RecordModel};
  use image::RgbImage;
  use url::Url;

  fn frame(name: &str) -> ImageFrame {
    ImageFrame::new(name, RgbImage::new(16, 16))
  }

  fn one_box() -> DetectResult {
    vec![DetectItem::new([1.0, 2.0, 9.0, 10.0], 0.75, 4)].into()
  }

  #[test]
  fn query_selects_record_and_always() {
    let url = Url::parse("folder:///tmp/out?record=json&always").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.directory, PathBuf::from("/tmp/out"));
    assert_eq!(
      output.record.as_ref().map(|r| r.format),
      Some(RecordFormat::Json)
    );
    assert!(output.always);

    let bad = Url::parse("folder:///tmp/out?record=xml").unwrap();
    assert!(matches!(
      DirectoryRecordOutput::from_url(&bad),
      Err(DirectoryRecordOutputError::UnknownRecordFormat(_))
    ));
  }

  #[test]
  fn empty_frames_are_skipped_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path());
    output
      .render_result(&frame("empty.png"), &DetectResult::default())
      .unwrap();
    assert!(!dir.path().join("empty.png").exists());

    let output = output.always(true);
    output
      .render_result(&frame("empty.png"), &DetectResult::default())
      .unwrap();
    assert!(dir.path().join("empty.png").exists());
  }

  #[test]
  fn id_records_replay_through_record_model() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path()).with_record(RecordFormat::Id);
    output.render_result(&frame("scene.png"), &one_box()).unwrap();

    assert!(dir.path().join("scene.png").exists());
    let replayed = RecordModel::new(dir.path())
      .infer(&frame("scene.png"))
      .unwrap();
    assert_eq!(replayed, one_box());
  }
}
