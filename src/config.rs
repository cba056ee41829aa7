// 该文件是 Pinjie （拼接） 项目的一部分。
// src/config.rs - 配置文件
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::{
  label::Labels,
  model::{SliceConfig, SliceError},
  pipeline::{PipelineConfig, PipelineError},
};

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取配置文件 {path} 失败: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("配置文件格式错误: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("流水线配置无效: {0}")]
  Pipeline(#[from] PipelineError),
  #[error("切片配置无效: {0}")]
  Slice(#[from] SliceError),
}

/// 全部可调参数。所有表和字段都可省略，省略时使用默认值。
///
/// ```toml
/// [pipeline]
/// confidence_gate = 0.3
/// epsilon = 50.0
/// min_samples = 1
/// iou_threshold = 0.7
/// degenerate = "keep"
///
/// [slice]
/// slice_width = 480
/// slice_height = 480
/// overlap_width_ratio = 0.5
/// overlap_height_ratio = 0.5
/// full_frame = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
  pub pipeline: PipelineConfig,
  pub slice: SliceConfig,
  pub labels: Labels,
}

impl Config {
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("加载配置文件: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    text.parse()
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.pipeline.validate()?;
    self.slice.validate()?;
    Ok(())
  }
}

impl std::str::FromStr for Config {
  type Err = ConfigError;

  fn from_str(text: &str) -> Result<Self, Self::Err> {
    let config: Config = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
  }
}
