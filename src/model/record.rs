// 该文件是 Pinjie （拼接） 项目的一部分。
// src/model/record.rs - 检测记录回放模型
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
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  model::{DetectItem, DetectResult, Model},
};

#[derive(Error, Debug)]
pub enum RecordModelError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("读取记录文件 {path} 失败: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("记录文件 {path} 第 {line} 行格式错误: {reason}")]
  Parse {
    path: PathBuf,
    line: usize,
    reason: String,
  },
}

/// 回放外部检测器事先写好的检测记录。
///
/// 每帧对应目录下的 `<帧名去扩展名>.txt`，每行一个检测：
/// `class_id, score, x1, y1, x2, y2`，坐标为像素坐标。空行和 `#` 开头的行忽略。
/// 记录文件不存在表示该帧没有检测。
pub struct RecordModel {
  directory: PathBuf,
}

impl FromUrlWithScheme for RecordModel {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordModel {
  type Error = RecordModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RecordModelError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    Ok(RecordModel::new(url.path()))
  }
}

impl RecordModel {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
    }
  }

  pub fn record_path(&self, frame: &ImageFrame) -> PathBuf {
    self.directory.join(format!("{}.txt", frame.stem()))
  }
}

impl Model for RecordModel {
  type Input = ImageFrame;
  type Output = DetectResult;
  type Error = RecordModelError;

  fn infer(&self, frame: &ImageFrame) -> Result<DetectResult, RecordModelError> {
    let path = self.record_path(frame);
    let text = match std::fs::read_to_string(&path) {
      Ok(text) => text,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!("没有检测记录: {}", path.display());
        return Ok(DetectResult::default());
      }
      Err(source) => return Err(RecordModelError::Io { path, source }),
    };

    let result = parse_records(&text).map_err(|(line, reason)| RecordModelError::Parse {
      path: path.clone(),
      line,
      reason,
    })?;
    debug!("读取检测记录 {}: {} 个检测", path.display(), result.len());
    Ok(result)
  }
}

fn parse_records(text: &str) -> Result<DetectResult, (usize, String)> {
  text
    .lines()
    .enumerate()
    .map(|(index, line)| (index + 1, line.trim()))
    .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
    .map(|(number, line)| parse_line(line).map_err(|reason| (number, reason)))
    .collect()
}

fn parse_line(line: &str) -> Result<DetectItem, String> {
  let fields: Vec<&str> = line.split(',').map(str::trim).collect();
  if fields.len() != 6 {
    return Err(format!("需要 6 个字段, 实际 {} 个", fields.len()));
  }

  let class_id = fields[0]
    .parse::<u32>()
    .map_err(|e| format!("类别 '{}' 无效: {}", fields[0], e))?;
  let mut values = [0.0f32; 5];
  for (value, field) in values.iter_mut().zip(&fields[1..]) {
    *value = field
      .parse::<f32>()
      .map_err(|e| format!("数值 '{}' 无效: {}", field, e))?;
  }

  let [score, x1, y1, x2, y2] = values;
  Ok(DetectItem::new([x1, y1, x2, y2], score, class_id))
}
