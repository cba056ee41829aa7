// 该文件是 Pinjie （拼接） 项目的一部分。
// src/cluster.rs - DBSCAN 密度聚类
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

/// 二维点上的 DBSCAN。
///
/// - 两点欧氏距离 `<= eps` 即为邻居，每个点都是自己的邻居；
/// - 邻域（含自身）点数 `>= min_samples` 的点是核心点；
/// - 簇从核心点出发扩展，可达的非核心点并入该簇但不继续扩展；
/// - 不属于任何簇的点为噪声。
///
/// 邻域查询是朴素的两两比较，适用于每帧几十到几百个检测框的规模。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
  eps: f32,
  min_samples: usize,
}

impl Dbscan {
  /// `min_samples = 0` 按 1 处理。`eps` 为负或非有限数时每个点只有自己一个邻居。
  pub fn new(eps: f32, min_samples: usize) -> Self {
    Self {
      eps,
      min_samples: min_samples.max(1),
    }
  }

  pub fn min_samples(&self) -> usize {
    self.min_samples
  }

  fn neighbors(&self, points: &[[f32; 2]]) -> Vec<Vec<usize>> {
    let eps_sq = self.eps * self.eps;
    let valid_eps = self.eps.is_finite() && self.eps >= 0.0;

    points
      .iter()
      .enumerate()
      .map(|(i, p)| {
        points
          .iter()
          .enumerate()
          .filter(|&(j, q)| {
            if i == j {
              return true;
            }
            if !valid_eps {
              return false;
            }
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            dx * dx + dy * dy <= eps_sq
          })
          .map(|(j, _)| j)
          .collect()
      })
      .collect()
  }

  /// 每个点的簇标签，`None` 表示噪声。标签按种子核心点的下标顺序从 0 开始分配。
  pub fn fit(&self, points: &[[f32; 2]]) -> Vec<Option<usize>> {
    let neighbors = self.neighbors(points);
    let is_core: Vec<bool> = neighbors
      .iter()
      .map(|n| n.len() >= self.min_samples)
      .collect();

    let mut labels = vec![None; points.len()];
    let mut next_label = 0;
    let mut stack = Vec::new();

    for seed in 0..points.len() {
      if labels[seed].is_some() || !is_core[seed] {
        continue;
      }

      labels[seed] = Some(next_label);
      stack.push(seed);
      while let Some(p) = stack.pop() {
        for &q in &neighbors[p] {
          if labels[q].is_none() {
            labels[q] = Some(next_label);
            if is_core[q] {
              stack.push(q);
            }
          }
        }
      }
      next_label += 1;
    }

    labels
  }

  /// 按簇分组的点下标。
  ///
  /// 先按标签顺序输出各簇（簇内下标升序），再把每个噪声点作为单独一组按下标顺序输出。
  /// 噪声点不会被丢弃，也不会被合并成一组。
  pub fn cluster(&self, points: &[[f32; 2]]) -> Vec<Vec<usize>> {
    let labels = self.fit(points);
    let num_clusters = labels.iter().flatten().max().map_or(0, |max| max + 1);

    let mut groups = vec![Vec::new(); num_clusters];
    let mut noise = Vec::new();
    for (index, label) in labels.into_iter().enumerate() {
      match label {
        Some(label) => groups[label].push(index),
        None => noise.push(vec![index]),
      }
    }
    groups.extend(noise);
    groups
  }
}
