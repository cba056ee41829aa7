// 该文件是 Pinjie （拼接） 项目的一部分。
// tests/pipeline.rs - 切片、合并与抑制的端到端测试
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

use std::path::Path;

use approx::assert_relative_eq;
use image::RgbImage;

use pinjie::{
  config::Config,
  frame::ImageFrame,
  merge::merge,
  model::{DetectItem, DetectResult, Model, RecordModel, SliceConfig, SlicedModel},
  pipeline::{MergePipeline, MergedModel, PipelineConfig},
  suppress::{iou, suppress},
};

fn write(dir: &Path, name: &str, text: &str) {
  std::fs::write(dir.join(name), text).unwrap();
}

/// 200x100 的图像切成三个 100x100 切片：(0,0) (50,0) (100,0)
fn tiled_model(dir: &Path) -> MergedModel<SlicedModel<RecordModel>> {
  let slice = SliceConfig {
    slice_width: 100,
    slice_height: 100,
    full_frame: false,
    ..SliceConfig::default()
  };
  MergedModel::new(
    SlicedModel::new(RecordModel::new(dir), slice).unwrap(),
    MergePipeline::default(),
  )
}

#[test]
fn tiles_merge_into_full_frame_boxes() {
  let dir = tempfile::tempdir().unwrap();
  // 同一目标落在两个重叠的切片里
  write(dir.path(), "scene_0_0.txt", "3, 0.8, 60, 20, 90, 50\n");
  write(dir.path(), "scene_50_0.txt", "3, 0.6, 10, 20, 40, 50\n");
  // 低置信度检测在聚类前被过滤
  write(
    dir.path(),
    "scene_100_0.txt",
    "7, 0.2, 5, 5, 15, 15\n7, 0.9, 40, 40, 90, 90\n",
  );

  let frame = ImageFrame::new("scene.png", RgbImage::new(200, 100));
  let result = tiled_model(dir.path()).infer(&frame).unwrap();

  assert_eq!(result.len(), 2);
  let first = result.items[0];
  assert_eq!(first.bbox, [60.0, 20.0, 90.0, 50.0]);
  assert_eq!(first.class_id, 3);
  assert_relative_eq!(first.score, 0.7, epsilon = 1e-6);

  let second = result.items[1];
  assert_eq!(second.bbox, [140.0, 40.0, 190.0, 90.0]);
  assert_eq!(second.class_id, 7);
  assert_relative_eq!(second.score, 0.9);
}

#[test]
fn frame_without_records_yields_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let frame = ImageFrame::new("empty.png", RgbImage::new(200, 100));
  let result = tiled_model(dir.path()).infer(&frame).unwrap();
  assert!(result.is_empty());
}

#[test]
fn malformed_record_names_the_tile() {
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "scene_50_0.txt", "3, not-a-score, 0, 0, 1, 1\n");

  let frame = ImageFrame::new("scene.png", RgbImage::new(200, 100));
  let err = tiled_model(dir.path()).infer(&frame).unwrap_err();
  assert!(err.to_string().contains("scene_50_0.png"));
}

#[test]
fn empty_input_everywhere() {
  assert!(merge(&[], 50.0, 1).is_empty());
  assert!(suppress(&[], 0.7).is_empty());
  assert!(MergePipeline::default().run(&[]).is_empty());
}

#[test]
fn singleton_passes_through_unchanged() {
  let item = DetectItem::new([12.5, 7.0, 40.0, 33.0], 0.65, 2);
  assert_eq!(MergePipeline::default().run(&[item]), vec![item]);
}

#[test]
fn corners_cluster_regardless_of_size() {
  let small = DetectItem::new([100.0, 100.0, 110.0, 110.0], 0.8, 0);
  let huge = DetectItem::new([120.0, 130.0, 600.0, 500.0], 0.4, 0);
  let merged = merge(&[small, huge], 50.0, 1);
  assert_eq!(merged.len(), 1);
  assert_eq!(merged[0].bbox, [100.0, 100.0, 600.0, 500.0]);
  assert_relative_eq!(merged[0].score, 0.6, epsilon = 1e-6);
}

#[test]
fn overlap_is_measured_against_smaller_box() {
  assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[0.0, 0.0, 5.0, 5.0]), 1.0);
}

#[test]
fn suppression_rules() {
  let high = DetectItem::new([0.0, 0.0, 10.0, 10.0], 0.9, 0);
  let low = DetectItem::new([0.0, 0.0, 10.0, 10.0], 0.6, 0);
  assert_eq!(suppress(&[low, high], 0.7), vec![high]);

  let tie = DetectItem::new([0.0, 0.0, 10.0, 10.0], 0.5, 0);
  assert_eq!(suppress(&[tie, tie], 0.7), vec![tie, tie]);

  // 交集 70，较小面积 100
  let a = DetectItem::new([0.0, 0.0, 10.0, 10.0], 0.9, 0);
  let b = DetectItem::new([3.0, 0.0, 13.0, 10.0], 0.1, 0);
  assert_eq!(suppress(&[a, b], 0.7), vec![a, b]);
}

#[test]
fn repeated_runs_are_identical() {
  let detections: Vec<DetectItem> = (0..40)
    .map(|i| {
      let x = ((i * 37) % 300) as f32;
      let y = ((i * 53) % 200) as f32;
      DetectItem::new([x, y, x + 30.0, y + 25.0], 0.31 + (i % 7) as f32 * 0.09, i % 3)
    })
    .collect();

  let pipeline = MergePipeline::new(PipelineConfig {
    epsilon: 40.0,
    ..PipelineConfig::default()
  })
  .unwrap();
  let first = pipeline.run(&detections);
  let second = pipeline.run(&detections);
  assert_eq!(first, second);
  assert!(!first.is_empty());
}

#[test]
fn config_file_drives_the_pipeline() {
  let config: Config = r#"
    [pipeline]
    confidence_gate = 0.5
    epsilon = 5.0
  "#
  .parse()
  .unwrap();
  let pipeline = MergePipeline::new(config.pipeline).unwrap();

  let detections = [
    DetectItem::new([0.0, 0.0, 10.0, 10.0], 0.45, 0),
    DetectItem::new([20.0, 0.0, 30.0, 10.0], 0.55, 0),
    DetectItem::new([40.0, 0.0, 50.0, 10.0], 0.95, 1),
  ];
  let result: DetectResult = pipeline.run(&detections).into();
  assert_eq!(result.len(), 2);
  assert_eq!(result.items[0].bbox[0], 20.0);
  assert_eq!(result.items[1].class_id, 1);
}
