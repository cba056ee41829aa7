// 该文件是 Pinjie （拼接） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pinjie::{
  FromUrl,
  config::Config,
  input::InputWrapper,
  model::{RecordModel, SlicedModel},
  output::OutputWrapper,
  pipeline::{MergePipeline, MergedModel},
  task::{ContinuousTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  let mut config = match &args.config {
    Some(path) => Config::from_path(path)?,
    None => Config::default(),
  };
  args.apply(&mut config);
  config.validate()?;

  info!("检测来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("流水线参数: {:?}", config.pipeline);
  info!("切片参数: {:?}", config.slice);

  let input = InputWrapper::from_url(&args.input)?;
  let model = MergedModel::new(
    SlicedModel::new(RecordModel::from_url(&args.model)?, config.slice)?,
    MergePipeline::new(config.pipeline)?,
  );
  let output = OutputWrapper::from_url(&args.output)?;
  #[cfg(feature = "save_image_file")]
  let output = output.with_draw(pinjie::output::draw::Draw::new(config.labels)?);

  if input.is_single() {
    OneShotTask.run_task(input, model, output)?;
  } else {
    ContinuousTask::default()
      .with_frame_number(args.max_frames)
      .run_task(input, model, output)?;
  }

  Ok(())
}
