// 该文件是 Pinjie （拼接） 项目的一部分。
// src/output.rs - 输出定义
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

use crate::FromUrl;
#[cfg(feature = "save_image_file")]
use crate::FromUrlWithScheme;
use crate::frame::ImageFrame;
use crate::model::DetectResult;
use thiserror::Error;
use url::Url;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error(transparent)]
  Image(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error(transparent)]
  Folder(#[from] DirectoryRecordOutputError),
  #[error("不支持的输出方式: {0}")]
  UnsupportedScheme(String),
}

/// 按 URL 方案选择的输出
pub enum OutputWrapper {
  /// `image://`，单张标注图
  #[cfg(feature = "save_image_file")]
  Image(SaveImageFileOutput),
  /// `folder://`，每帧一个文件，可附带检测记录
  #[cfg(feature = "directory_record")]
  Folder(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Ok(match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => Self::Image(SaveImageFileOutput::from_url(url)?),
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => Self::Folder(DirectoryRecordOutput::from_url(url)?),
      other => return Err(OutputError::UnsupportedScheme(other.to_string())),
    })
  }
}

impl OutputWrapper {
  /// 替换绘制配置（标签名称、颜色与字体）
  #[cfg(feature = "save_image_file")]
  pub fn with_draw(self, draw: draw::Draw) -> Self {
    match self {
      Self::Image(output) => Self::Image(output.with_draw(draw)),
      #[cfg(feature = "directory_record")]
      Self::Folder(output) => Self::Folder(output.with_draw(draw)),
    }
  }
}

impl Render<ImageFrame, DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &ImageFrame, result: &DetectResult) -> Result<(), Self::Error> {
    match *self {
      #[cfg(feature = "save_image_file")]
      Self::Image(ref output) => output.render_result(frame, result)?,
      #[cfg(feature = "directory_record")]
      Self::Folder(ref output) => output.render_result(frame, result)?,
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_rejected() {
    let rtsp = Url::parse("rtsp://host/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&rtsp),
      Err(OutputError::UnsupportedScheme(scheme)) if scheme == "rtsp"
    ));
  }

  #[cfg(feature = "directory_record")]
  #[test]
  fn dispatch_by_scheme() {
    let image = Url::parse("image:///tmp/out.png").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&image),
      Ok(OutputWrapper::Image(_))
    ));

    let folder = Url::parse("folder:///tmp/out").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&folder),
      Ok(OutputWrapper::Folder(_))
    ));
  }
}
