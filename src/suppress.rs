// 该文件是 Pinjie （拼接） 项目的一部分。
// src/suppress.rs - 重叠框抑制
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

use tracing::debug;

use crate::model::{MergedBox, box_area};

/// 计算两个边界框的重叠度。
///
/// **注意：分母是两个框中较小的面积，不是并集面积。**
/// 小框完全落在大框内时结果为 1.0，与两框的面积比无关。
/// 例如 `(0,0,10,10)` 与 `(0,0,5,5)` 得 1.0，而标准 IoU 是 0.25。
/// 抑制阈值 0.7 是按这个定义调出来的，改成标准 IoU 会改变抑制结果。
///
/// 倒置或退化的框面积记为 0；较小面积不为正时返回 0。
///
/// 坐标按 `f32` 计算。十进制下恰好等于阈值的重叠度可能因舍入略高于阈值，
/// 例如 `(0,0,1,1)` 与 `(0.3,0,1.3,1)` 得 `0.70000005`，在阈值 0.7 下会触发抑制，
/// 而用 `f64` 计算时恰好是 0.7，不触发。
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let min_area = box_area(a).min(box_area(b));

  if min_area > 0.0 {
    intersection / min_area
  } else {
    0.0
  }
}

/// 去掉与更高置信度框重叠过多的框。
///
/// 当存在另一个框 `j` 满足 `iou(i, j) > iou_threshold` 且 `score_i < score_j` 时删除框 `i`。
/// 两处比较都是严格的：重叠度恰好等于阈值不抑制，置信度相等时两框都保留。
/// 不区分类别。保留的框维持原有相对顺序。两两比较，复杂度 O(n²)。
pub fn suppress(boxes: &[MergedBox], iou_threshold: f32) -> Vec<MergedBox> {
  let kept: Vec<MergedBox> = boxes
    .iter()
    .enumerate()
    .filter(|&(i, current)| {
      !boxes.iter().enumerate().any(|(j, other)| {
        i != j && iou(&current.bbox, &other.bbox) > iou_threshold && current.score < other.score
      })
    })
    .map(|(_, item)| *item)
    .collect();

  debug!("重叠抑制: {} -> {}", boxes.len(), kept.len());
  kept
}
