// 该文件是 Pinjie （拼接） 项目的一部分。
// src/pipeline.rs - 置信度过滤、聚类合并、重叠抑制流水线
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

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  merge::merge,
  model::{DetectItem, DetectResult, MergedBox, Model},
  suppress::suppress,
};

pub const DEFAULT_CONFIDENCE_GATE: f32 = 0.3;
pub const DEFAULT_EPSILON: f32 = 50.0;
pub const DEFAULT_MIN_SAMPLES: usize = 1;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// 几何不合法的检测如何处理。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
  /// 原样参与聚类，重叠度计算时按面积 0 处理
  #[default]
  Keep,
  /// 在置信度过滤之前丢弃
  Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// 置信度不高于该值的检测在聚类前丢弃
  pub confidence_gate: f32,
  /// 聚类距离（像素）
  pub epsilon: f32,
  pub min_samples: usize,
  /// 重叠抑制阈值，按交集比较小面积计算
  pub iou_threshold: f32,
  pub degenerate: DegeneratePolicy,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      confidence_gate: DEFAULT_CONFIDENCE_GATE,
      epsilon: DEFAULT_EPSILON,
      min_samples: DEFAULT_MIN_SAMPLES,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      degenerate: DegeneratePolicy::Keep,
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
  #[error("置信度门限必须在 [0, 1] 之间: {0}")]
  InvalidConfidenceGate(f32),
  #[error("聚类距离必须是非负有限数: {0}")]
  InvalidEpsilon(f32),
  #[error("最小样本数必须至少为 1")]
  InvalidMinSamples,
  #[error("重叠抑制阈值必须是非负有限数: {0}")]
  InvalidIouThreshold(f32),
}

impl PipelineConfig {
  pub fn validate(&self) -> Result<(), PipelineError> {
    if !(0.0..=1.0).contains(&self.confidence_gate) {
      return Err(PipelineError::InvalidConfidenceGate(self.confidence_gate));
    }
    if !self.epsilon.is_finite() || self.epsilon < 0.0 {
      return Err(PipelineError::InvalidEpsilon(self.epsilon));
    }
    if self.min_samples == 0 {
      return Err(PipelineError::InvalidMinSamples);
    }
    if !self.iou_threshold.is_finite() || self.iou_threshold < 0.0 {
      return Err(PipelineError::InvalidIouThreshold(self.iou_threshold));
    }
    Ok(())
  }
}

/// 合并流水线：几何检查 -> 置信度过滤 -> 聚类合并 -> 重叠抑制。
///
/// 纯函数，不做 I/O，对同一输入和参数输出完全一致。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MergePipeline {
  config: PipelineConfig,
}

impl MergePipeline {
  pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn run(&self, detections: &[DetectItem]) -> Vec<MergedBox> {
    let gated: Vec<DetectItem> = detections
      .iter()
      .filter(|item| self.accepts_geometry(item))
      .filter(|item| item.score > self.config.confidence_gate)
      .copied()
      .collect();
    debug!(
      "置信度过滤 (> {}): {} -> {}",
      self.config.confidence_gate,
      detections.len(),
      gated.len()
    );

    let merged = merge(&gated, self.config.epsilon, self.config.min_samples);
    suppress(&merged, self.config.iou_threshold)
  }

  fn accepts_geometry(&self, item: &DetectItem) -> bool {
    match self.config.degenerate {
      DegeneratePolicy::Keep => true,
      DegeneratePolicy::Discard => match item.validate() {
        Ok(()) => true,
        Err(e) => {
          debug!("丢弃不合法的检测: {}", e);
          false
        }
      },
    }
  }
}

/// 在任意输出原始检测的模型之后接上合并流水线。
pub struct MergedModel<M> {
  inner: M,
  pipeline: MergePipeline,
}

impl<M> MergedModel<M> {
  pub fn new(inner: M, pipeline: MergePipeline) -> Self {
    Self { inner, pipeline }
  }
}

impl<M: Model<Output = DetectResult>> Model for MergedModel<M> {
  type Input = M::Input;
  type Output = DetectResult;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let raw = self.inner.infer(input)?;
    let result: DetectResult = self.pipeline.run(&raw.items).into();
    debug!("合并流水线: {} 个原始检测 -> {} 个结果", raw.len(), result.len());
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_abs_diff_eq;

  fn det(bbox: [f32; 4], score: f32) -> DetectItem {
    DetectItem::new(bbox, score, 0)
  }

  #[test]
  fn default_config_matches_reference_values() {
    let config = PipelineConfig::default();
    assert_eq!(config.confidence_gate, 0.3);
    assert_eq!(config.epsilon, 50.0);
    assert_eq!(config.min_samples, 1);
    assert_eq!(config.iou_threshold, 0.7);
    assert_eq!(config.degenerate, DegeneratePolicy::Keep);
    assert_eq!(config.validate(), Ok(()));
  }

  #[test]
  fn invalid_configs_are_rejected() {
    let bad_gate = PipelineConfig {
      confidence_gate: 1.5,
      ..Default::default()
    };
    assert_eq!(
      MergePipeline::new(bad_gate),
      Err(PipelineError::InvalidConfidenceGate(1.5))
    );

    let bad_eps = PipelineConfig {
      epsilon: -1.0,
      ..Default::default()
    };
    assert_eq!(
      MergePipeline::new(bad_eps),
      Err(PipelineError::InvalidEpsilon(-1.0))
    );

    let bad_samples = PipelineConfig {
      min_samples: 0,
      ..Default::default()
    };
    assert_eq!(
      MergePipeline::new(bad_samples),
      Err(PipelineError::InvalidMinSamples)
    );

    let bad_iou = PipelineConfig {
      iou_threshold: f32::INFINITY,
      ..Default::default()
    };
    assert!(matches!(
      MergePipeline::new(bad_iou),
      Err(PipelineError::InvalidIouThreshold(_))
    ));
  }

  #[test]
  fn gate_is_applied_before_clustering() {
    // 0.3 的检测正好在门限上，不能拉低簇的平均置信度，也不能扩大外接框
    let a = det([100.0, 100.0, 200.0, 200.0], 0.9);
    let b = det([110.0, 105.0, 210.0, 190.0], 0.7);
    let low = det([90.0, 95.0, 400.0, 400.0], 0.3);
    let merged = MergePipeline::default().run(&[a, low, b]);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].bbox, [100.0, 100.0, 210.0, 200.0]);
    assert_abs_diff_eq!(merged[0].score, 0.8, epsilon = 1e-6);
  }

  #[test]
  fn everything_below_gate_yields_nothing() {
    let items = [det([0.0, 0.0, 1.0, 1.0], 0.1), det([5.0, 5.0, 9.0, 9.0], 0.3)];
    assert!(MergePipeline::default().run(&items).is_empty());
  }

  #[test]
  fn degenerate_policy_controls_invalid_boxes() {
    let regular = det([0.0, 0.0, 10.0, 10.0], 0.6);
    let inverted = det([5.0, 5.0, 0.0, 40.0], 0.9);

    let kept = MergePipeline::default().run(&[regular, inverted]);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].bbox, [0.0, 0.0, 10.0, 40.0]);

    let discard = MergePipeline::new(PipelineConfig {
      degenerate: DegeneratePolicy::Discard,
      ..Default::default()
    })
    .unwrap();
    assert_eq!(discard.run(&[regular, inverted]), vec![regular]);
  }

  #[test]
  fn merged_boxes_are_then_suppressed() {
    // 两个簇：一个大框簇，一个落在大框内的低分小框
    let big_left = det([0.0, 0.0, 300.0, 300.0], 0.9);
    let big_right = det([20.0, 10.0, 320.0, 310.0], 0.8);
    let inner = det([150.0, 150.0, 180.0, 180.0], 0.5);
    let result = MergePipeline::default().run(&[inner, big_left, big_right]);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].bbox, [0.0, 0.0, 320.0, 310.0]);
  }

  struct FixedModel(Vec<DetectItem>);

  impl Model for FixedModel {
    type Input = ();
    type Output = DetectResult;
    type Error = std::convert::Infallible;

    fn infer(&self, _input: &()) -> Result<DetectResult, Self::Error> {
      Ok(self.0.clone().into())
    }
  }

  #[test]
  fn merged_model_runs_pipeline_on_inner_output() {
    let model = MergedModel::new(
      FixedModel(vec![
        det([0.0, 0.0, 10.0, 10.0], 0.9),
        det([2.0, 2.0, 12.0, 12.0], 0.5),
        det([300.0, 300.0, 310.0, 310.0], 0.2),
      ]),
      MergePipeline::default(),
    );
    let result = model.infer(&()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.items[0].bbox, [0.0, 0.0, 12.0, 12.0]);
  }
}
