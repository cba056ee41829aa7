// 该文件是 Pinjie （拼接） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use pinjie::config::Config;

/// Pinjie 切片检测合并工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测来源，例如 record:///path/to/records
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  /// - 单张图片: image:///path/to/image.jpg
  /// - 图片目录: folder:///path/to/images
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  /// - 单张图片: image:///path/to/out.png
  /// - 目录: folder:///path/to/out?record=json&always
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// TOML 配置文件，命令行参数优先
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 置信度门限 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence_gate: Option<f32>,
  /// 聚类距离（像素）
  #[arg(long, value_name = "PIXELS")]
  pub epsilon: Option<f32>,
  #[arg(long, value_name = "COUNT")]
  pub min_samples: Option<usize>,
  /// 重叠抑制阈值
  #[arg(long, value_name = "THRESHOLD")]
  pub iou_threshold: Option<f32>,

  #[arg(long, value_name = "PIXELS")]
  pub slice_width: Option<u32>,
  #[arg(long, value_name = "PIXELS")]
  pub slice_height: Option<u32>,
  /// 切片重叠比例，同时作用于宽和高
  #[arg(long, value_name = "RATIO")]
  pub overlap_ratio: Option<f32>,
  /// 不切片，直接在整图上推理
  #[arg(long)]
  pub no_slice: bool,

  /// 最大处理帧数（仅对目录输入有效）
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub max_frames: Option<usize>,
}

impl Args {
  /// 用命令行参数覆盖配置
  pub fn apply(&self, config: &mut Config) {
    let pipeline = &mut config.pipeline;
    if let Some(gate) = self.confidence_gate {
      pipeline.confidence_gate = gate;
    }
    if let Some(epsilon) = self.epsilon {
      pipeline.epsilon = epsilon;
    }
    if let Some(min_samples) = self.min_samples {
      pipeline.min_samples = min_samples;
    }
    if let Some(iou) = self.iou_threshold {
      pipeline.iou_threshold = iou;
    }

    let slice = &mut config.slice;
    if let Some(width) = self.slice_width {
      slice.slice_width = width;
    }
    if let Some(height) = self.slice_height {
      slice.slice_height = height;
    }
    if let Some(ratio) = self.overlap_ratio {
      slice.overlap_width_ratio = ratio;
      slice.overlap_height_ratio = ratio;
    }
    if self.no_slice {
      slice.enabled = false;
    }
  }
}
