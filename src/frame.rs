// 该文件是 Pinjie （拼接） 项目的一部分。
// src/frame.rs - 图像帧定义
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

use std::path::Path;

use image::RgbImage;

/// 一帧图像及其文件名。输出时按文件名保存，记录模型按文件名查找检测记录。
#[derive(Debug, Clone)]
pub struct ImageFrame {
  pub name: String,
  pub image: RgbImage,
}

impl ImageFrame {
  pub fn new(name: impl Into<String>, image: RgbImage) -> Self {
    Self {
      name: name.into(),
      image,
    }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 不含扩展名的文件名
  pub fn stem(&self) -> &str {
    Path::new(&self.name)
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or(&self.name)
  }

  /// 切片帧的名字: `<stem>_<x>_<y>.<ext>`
  pub fn tile_name(&self, x: u32, y: u32) -> String {
    match Path::new(&self.name).extension().and_then(|e| e.to_str()) {
      Some(ext) => format!("{}_{}_{}.{}", self.stem(), x, y, ext),
      None => format!("{}_{}_{}", self.stem(), x, y),
    }
  }
}
