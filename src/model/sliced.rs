// 该文件是 Pinjie （拼接） 项目的一部分。
// src/model/sliced.rs - 切片推理
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

use image::imageops;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::ImageFrame,
  model::{DetectItem, DetectResult, Model},
};

const DEFAULT_SLICE_SIZE: u32 = 480;
const DEFAULT_OVERLAP_RATIO: f32 = 0.5;

#[derive(Error, Debug)]
pub enum SliceError {
  #[error("切片尺寸必须大于 0: {width}x{height}")]
  InvalidSliceSize { width: u32, height: u32 },
  #[error("重叠比例必须在 [0, 1) 之间: {0}")]
  InvalidOverlapRatio(f32),
  #[error("切片 {tile} 推理失败: {source}")]
  Inference {
    tile: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
  /// 关闭时模型直接在整图上推理
  pub enabled: bool,
  pub slice_width: u32,
  pub slice_height: u32,
  pub overlap_width_ratio: f32,
  pub overlap_height_ratio: f32,
  /// 除切片外，再在整图上推理一次
  pub full_frame: bool,
}

impl Default for SliceConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      slice_width: DEFAULT_SLICE_SIZE,
      slice_height: DEFAULT_SLICE_SIZE,
      overlap_width_ratio: DEFAULT_OVERLAP_RATIO,
      overlap_height_ratio: DEFAULT_OVERLAP_RATIO,
      full_frame: true,
    }
  }
}

/// 切片在原图中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRegion {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl SliceConfig {
  pub fn validate(&self) -> Result<(), SliceError> {
    if self.slice_width == 0 || self.slice_height == 0 {
      return Err(SliceError::InvalidSliceSize {
        width: self.slice_width,
        height: self.slice_height,
      });
    }
    for ratio in [self.overlap_width_ratio, self.overlap_height_ratio] {
      if !(0.0..1.0).contains(&ratio) {
        return Err(SliceError::InvalidOverlapRatio(ratio));
      }
    }
    Ok(())
  }

  /// 计算覆盖 `width x height` 图像的切片网格。
  ///
  /// 相邻切片重叠 `trunc(ratio * slice)` 像素。超出图像的切片会被拉回到图像边界内，
  /// 因此比切片小的图像得到一个覆盖整图的切片。调用前需先 [`validate`](Self::validate)。
  pub fn slice_regions(&self, width: u32, height: u32) -> Vec<SliceRegion> {
    let x_overlap = (self.overlap_width_ratio * self.slice_width as f32) as u32;
    let y_overlap = (self.overlap_height_ratio * self.slice_height as f32) as u32;

    let mut regions = Vec::new();
    let mut y_min = 0;
    let mut y_max = 0;
    while y_max < height {
      y_max = y_min + self.slice_height;
      let mut x_min = 0;
      let mut x_max = 0;
      while x_max < width {
        x_max = x_min + self.slice_width;
        let right = x_max.min(width);
        let bottom = y_max.min(height);
        let left = right.saturating_sub(self.slice_width);
        let top = bottom.saturating_sub(self.slice_height);
        regions.push(SliceRegion {
          x: left,
          y: top,
          width: right - left,
          height: bottom - top,
        });
        x_min = x_max - x_overlap;
      }
      y_min = y_max - y_overlap;
    }
    regions
  }
}

/// 切片推理模型。
///
/// 把帧切成互相重叠的切片，对每个切片调用内部模型，再把切片内坐标平移回整图坐标。
/// 输出的是未合并的原始检测，跨切片边界的目标会出现多次，需要交给
/// [`MergePipeline`](crate::pipeline::MergePipeline) 处理。
pub struct SlicedModel<M> {
  inner: M,
  config: SliceConfig,
}

impl<M> SlicedModel<M> {
  pub fn new(inner: M, config: SliceConfig) -> Result<Self, SliceError> {
    config.validate()?;
    Ok(Self { inner, config })
  }
}

impl<M> SlicedModel<M>
where
  M: Model<Input = ImageFrame, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  fn infer_named(&self, frame: &ImageFrame) -> Result<DetectResult, SliceError> {
    self.inner.infer(frame).map_err(|e| SliceError::Inference {
      tile: frame.name.clone(),
      source: Box::new(e),
    })
  }
}

impl<M> Model for SlicedModel<M>
where
  M: Model<Input = ImageFrame, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  type Input = ImageFrame;
  type Output = DetectResult;
  type Error = SliceError;

  fn infer(&self, frame: &ImageFrame) -> Result<DetectResult, SliceError> {
    if !self.config.enabled {
      return self.infer_named(frame);
    }

    let regions = self.config.slice_regions(frame.width(), frame.height());
    info!(
      "切片推理 {}: {}x{} 图像, {} 个切片",
      frame.name,
      frame.width(),
      frame.height(),
      regions.len()
    );

    let mut items: Vec<DetectItem> = Vec::new();
    for region in &regions {
      let tile = ImageFrame::new(
        frame.tile_name(region.x, region.y),
        imageops::crop_imm(&frame.image, region.x, region.y, region.width, region.height)
          .to_image(),
      );
      let result = self.infer_named(&tile)?;
      debug!("切片 {}: {} 个检测", tile.name, result.len());
      items.extend(
        result
          .iter()
          .map(|item| item.translate(region.x as f32, region.y as f32)),
      );
    }

    if self.config.full_frame {
      let result = self.infer_named(frame)?;
      debug!("整图: {} 个检测", result.len());
      items.extend(result.iter().copied());
    }

    Ok(items.into())
  }
}
