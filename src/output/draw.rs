// 该文件是 Pinjie （拼接） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化与记录
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::ImageFrame,
  label::Labels,
  model::{DetectItem, DetectResult},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_OFFSET: i32 = 10;
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("读取字体文件 {path} 失败: {source}")]
  FontIo {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("字体文件无效: {0}")]
  InvalidFont(PathBuf),
}

/// 按类别颜色绘制检测框，配置了字体时在框上方绘制 `名称 置信度` 标签。
#[derive(Clone)]
pub struct Draw {
  labels: Labels,
  font: Option<FontArc>,
  font_size: f32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      labels: Labels::default(),
      font: None,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

impl Draw {
  pub fn new(labels: Labels) -> Result<Self, DrawError> {
    let font = match labels.font() {
      Some(path) => {
        let data = std::fs::read(path).map_err(|source| DrawError::FontIo {
          path: path.clone(),
          source,
        })?;
        let font = FontArc::try_from_vec(data).map_err(|_| DrawError::InvalidFont(path.clone()))?;
        debug!("加载字体: {}", path.display());
        Some(font)
      }
      None => None,
    };

    Ok(Self {
      labels,
      font,
      font_size: LABEL_FONT_SIZE,
    })
  }

  pub fn labels(&self) -> &Labels {
    &self.labels
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (item.x1().floor() as i32).clamp(0, w - 1);
    let y_min = (item.y1().floor() as i32).clamp(0, h - 1);
    let x_max = (item.x2().ceil() as i32).clamp(0, w - 1);
    let y_max = (item.y2().ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.labels.color(item.class_id));

    // 绘制边框（加粗为2像素）
    for thickness in 0..BOX_THICKNESS {
      let width = x_max - x_min + 1 - 2 * thickness;
      let height = y_max - y_min + 1 - 2 * thickness;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect =
        Rect::at(x_min + thickness, y_min + thickness).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    if let Some(font) = &self.font {
      let label = format!("{} {:.2}", self.labels.name(item.class_id), item.score);
      let scale = PxScale::from(self.font_size);
      let (text_width, text_height) = text_size(scale, font, &label);

      let label_x = x_min;
      let label_y = (y_min - LABEL_OFFSET - text_height as i32).max(0);
      let label_width = text_width.min((w - label_x) as u32);
      let label_height = text_height + 2 * LABEL_TEXT_VERTICAL_PADDING as u32;

      if label_width > 0 && label_height > 0 {
        let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
        draw_filled_rect_mut(image, rect, color);
        draw_text_mut(
          image,
          Rgb([255u8, 255u8, 255u8]),
          label_x,
          label_y + LABEL_TEXT_VERTICAL_PADDING,
          scale,
          font,
          &label,
        );
      }
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.iter() {
      self.draw_bbox_with_label(image, item);
    }
  }

  pub fn draw_detection(&self, frame: &ImageFrame, result: &DetectResult) -> RgbImage {
    let mut image = frame.image.clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

/// 检测记录格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
  /// `class_id, score, x1, y1, x2, y2`，可被记录回放模型直接读取
  Id,
  /// `name, score, x1, y1, x2, y2`
  Name,
  /// JSON 数组
  Json,
}

impl RecordFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      RecordFormat::Id | RecordFormat::Name => "txt",
      RecordFormat::Json => "json",
    }
  }
}

pub struct Record {
  pub format: RecordFormat,
}

impl Record {
  pub fn render(&self, result: &DetectResult, labels: &Labels) -> String {
    match self.format {
      RecordFormat::Id | RecordFormat::Name => {
        let records: Vec<String> = result
          .iter()
          .map(|item| {
            let name = if self.format == RecordFormat::Name {
              labels.name(item.class_id)
            } else {
              item.class_id.to_string()
            };
            format!(
              "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
              name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
            )
          })
          .collect();
        records.join("\n")
      }
      RecordFormat::Json => {
        let records: Vec<serde_json::Value> = result
          .iter()
          .map(|item| {
            serde_json::json!({
              "class_id": item.class_id,
              "name": labels.name(item.class_id),
              "score": item.score,
              "bbox": item.bbox,
            })
          })
          .collect();
        serde_json::Value::Array(records).to_string()
      }
    }
  }

  /// 写入与图像同名、扩展名按格式替换的记录文件
  pub fn record(
    &self,
    result: &DetectResult,
    labels: &Labels,
    path: &Path,
  ) -> Result<(), std::io::Error> {
    std::fs::write(
      path.with_extension(self.format.extension()),
      self.render(result, labels),
    )
  }
}
