// 该文件是 Pinjie （拼接） 项目的一部分。
// src/label.rs - 类别名称与颜色配置
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

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// 默认类别颜色 (RGB)，按类别编号索引
pub const DEFAULT_PALETTE: [[u8; 3]; 16] = [
  [255, 0, 0],
  [0, 255, 0],
  [0, 0, 255],
  [255, 255, 0],
  [255, 0, 255],
  [0, 255, 255],
  [128, 0, 128],
  [255, 128, 0],
  [128, 255, 0],
  [0, 128, 255],
  [128, 0, 255],
  [255, 0, 128],
  [0, 255, 128],
  [128, 128, 0],
  [128, 0, 0],
  [0, 128, 0],
];

/// 调色板之外的类别使用的颜色
pub const DEFAULT_COLOR: [u8; 3] = [0, 255, 0];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LabelsError {
  #[error("类别编号必须是非负整数: '{0}'")]
  InvalidClassId(String),
}

/// 渲染用的类别名称和颜色。
///
/// 作为显式配置传给绘制器，不使用全局表。TOML 形式：
///
/// ```toml
/// [labels]
/// font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
/// default_color = [0, 255, 0]
///
/// [labels.names]
/// 0 = "person"
/// 1 = "bicycle"
///
/// [labels.colors]
/// 1 = [255, 128, 0]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "LabelsFile")]
pub struct Labels {
  names: BTreeMap<u32, String>,
  colors: BTreeMap<u32, [u8; 3]>,
  default_color: [u8; 3],
  font: Option<PathBuf>,
}

impl Default for Labels {
  fn default() -> Self {
    Self {
      names: BTreeMap::new(),
      colors: (0u32..)
        .zip(DEFAULT_PALETTE)
        .collect::<BTreeMap<u32, [u8; 3]>>(),
      default_color: DEFAULT_COLOR,
      font: None,
    }
  }
}

impl Labels {
  pub fn with_name(mut self, class_id: u32, name: impl Into<String>) -> Self {
    self.names.insert(class_id, name.into());
    self
  }

  pub fn with_color(mut self, class_id: u32, color: [u8; 3]) -> Self {
    self.colors.insert(class_id, color);
    self
  }

  pub fn with_font(mut self, font: impl Into<PathBuf>) -> Self {
    self.font = Some(font.into());
    self
  }

  /// 类别名称，没有配置时使用类别编号
  pub fn name(&self, class_id: u32) -> String {
    self
      .names
      .get(&class_id)
      .cloned()
      .unwrap_or_else(|| class_id.to_string())
  }

  pub fn color(&self, class_id: u32) -> [u8; 3] {
    self
      .colors
      .get(&class_id)
      .copied()
      .unwrap_or(self.default_color)
  }

  pub fn font(&self) -> Option<&PathBuf> {
    self.font.as_ref()
  }
}

/// TOML 中的表键只能是字符串，先按字符串读入再转换
#[derive(Deserialize, Default)]
#[serde(default)]
struct LabelsFile {
  names: BTreeMap<String, String>,
  colors: BTreeMap<String, [u8; 3]>,
  default_color: Option<[u8; 3]>,
  font: Option<PathBuf>,
}

fn parse_class_id(key: &str) -> Result<u32, LabelsError> {
  key
    .trim()
    .parse()
    .map_err(|_| LabelsError::InvalidClassId(key.to_string()))
}

impl TryFrom<LabelsFile> for Labels {
  type Error = LabelsError;

  fn try_from(file: LabelsFile) -> Result<Self, Self::Error> {
    let mut labels = Labels::default();
    for (key, name) in file.names {
      labels.names.insert(parse_class_id(&key)?, name);
    }
    for (key, color) in file.colors {
      labels.colors.insert(parse_class_id(&key)?, color);
    }
    if let Some(color) = file.default_color {
      labels.default_color = color;
    }
    labels.font = file.font;
    Ok(labels)
  }
}
