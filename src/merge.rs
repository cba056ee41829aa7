// 该文件是 Pinjie （拼接） 项目的一部分。
// src/merge.rs - 切片检测框聚类合并
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

use crate::cluster::Dbscan;
use crate::model::{DetectItem, MergedBox};

/// 把跨切片重复的检测合并为一个框。
///
/// 只用左上角 `(x1, y1)` 做 DBSCAN 聚类，宽高和置信度不参与。这是一个近似：
/// 左上角相近而尺寸相差很大的两个框也会被合成一个框。
///
/// 每个簇（包括单点簇和噪声点）输出一个框：
/// - `x1`、`y1` 取成员最小值，`x2`、`y2` 取成员最大值；
/// - 置信度取成员平均值；
/// - 类别取输入顺序中第一个成员的类别，簇内类别不一致时不做投票。
///
/// 输出顺序见 [`Dbscan::cluster`]，对同一输入稳定。
pub fn merge(detections: &[DetectItem], epsilon: f32, min_samples: usize) -> Vec<MergedBox> {
  if detections.is_empty() {
    return Vec::new();
  }

  let corners: Vec<[f32; 2]> = detections.iter().map(DetectItem::top_left).collect();
  let clusters = Dbscan::new(epsilon, min_samples).cluster(&corners);
  debug!("聚类完成: {} 个检测 -> {} 个簇", detections.len(), clusters.len());

  clusters
    .iter()
    .map(|members| merge_cluster(detections, members))
    .collect()
}

fn merge_cluster(detections: &[DetectItem], members: &[usize]) -> MergedBox {
  let first = detections[members[0]];
  let mut bbox = first.bbox;
  let mut score_sum = 0.0f64;

  for item in members.iter().map(|&i| &detections[i]) {
    bbox[0] = bbox[0].min(item.bbox[0]);
    bbox[1] = bbox[1].min(item.bbox[1]);
    bbox[2] = bbox[2].max(item.bbox[2]);
    bbox[3] = bbox[3].max(item.bbox[3]);
    score_sum += item.score as f64;
  }

  DetectItem {
    class_id: first.class_id,
    score: (score_sum / members.len() as f64) as f32,
    bbox,
  }
}
