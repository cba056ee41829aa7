// 该文件是 Pinjie （拼接） 项目的一部分。
// src/model.rs - 模型与检测结果定义
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

use thiserror::Error;

/// 检测模型。模型内部对本库是黑盒，只关心输入帧与输出结果。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测框，坐标为图像像素坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 聚类合并后的检测框：外接框、平均置信度、首个成员的类别。
pub type MergedBox = DetectItem;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidDetectionError {
  #[error("边界框宽度非正: x1 = {x1}, x2 = {x2}")]
  NonPositiveWidth { x1: f32, x2: f32 },
  #[error("边界框高度非正: y1 = {y1}, y2 = {y2}")]
  NonPositiveHeight { y1: f32, y2: f32 },
  #[error("检测包含非有限数值: bbox = {bbox:?}, score = {score}")]
  NonFinite { bbox: [f32; 4], score: f32 },
}

impl DetectItem {
  pub fn new(bbox: [f32; 4], score: f32, class_id: u32) -> Self {
    Self {
      class_id,
      score,
      bbox,
    }
  }

  pub fn x1(&self) -> f32 {
    self.bbox[0]
  }

  pub fn y1(&self) -> f32 {
    self.bbox[1]
  }

  pub fn x2(&self) -> f32 {
    self.bbox[2]
  }

  pub fn y2(&self) -> f32 {
    self.bbox[3]
  }

  /// 面积。倒置或退化的框面积为 0。
  pub fn area(&self) -> f32 {
    box_area(&self.bbox)
  }

  /// 左上角，聚类所用的特征。
  pub fn top_left(&self) -> [f32; 2] {
    [self.bbox[0], self.bbox[1]]
  }

  /// 检查几何是否合法。
  pub fn validate(&self) -> Result<(), InvalidDetectionError> {
    if self.bbox.iter().any(|v| !v.is_finite()) || !self.score.is_finite() {
      return Err(InvalidDetectionError::NonFinite {
        bbox: self.bbox,
        score: self.score,
      });
    }
    if self.x2() <= self.x1() {
      return Err(InvalidDetectionError::NonPositiveWidth {
        x1: self.x1(),
        x2: self.x2(),
      });
    }
    if self.y2() <= self.y1() {
      return Err(InvalidDetectionError::NonPositiveHeight {
        y1: self.y1(),
        y2: self.y2(),
      });
    }
    Ok(())
  }

  /// 平移检测框，用于把切片内坐标换算到整图坐标。
  pub fn translate(self, dx: f32, dy: f32) -> Self {
    let [x1, y1, x2, y2] = self.bbox;
    Self {
      bbox: [x1 + dx, y1 + dy, x2 + dx, y2 + dy],
      ..self
    }
  }
}

pub(crate) fn box_area(bbox: &[f32; 4]) -> f32 {
  let width = (bbox[2] - bbox[0]).max(0.0);
  let height = (bbox[3] - bbox[1]).max(0.0);
  width * height
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl FromIterator<DetectItem> for DetectResult {
  fn from_iter<I: IntoIterator<Item = DetectItem>>(iter: I) -> Self {
    iter.into_iter().collect::<Vec<_>>().into()
  }
}

mod record;
mod sliced;
pub use self::record::{RecordModel, RecordModelError};
pub use self::sliced::{SliceConfig, SliceError, SliceRegion, SlicedModel};
