// 该文件是 Pinjie （拼接） 项目的一部分。
// src/task.rs - 推理任务
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

use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 推理并渲染一帧，返回 (推理耗时, 总耗时)
fn process_frame<F, D, M, O>(
  frame: &F,
  model: &M,
  output: &O,
) -> anyhow::Result<(Duration, Duration)>
where
  M: Model<Input = F, Output = D>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<F, D>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  let start = Instant::now();
  let result = model.infer(frame)?;
  let inferred = start.elapsed();
  output.render_result(frame, &result)?;
  Ok((inferred, start.elapsed()))
}

/// 只处理第一帧
pub struct OneShotTask;

impl<F, D, I, M, O> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<F, D>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("输入为空, 没有可处理的帧"))?;
    let (inferred, total) = process_frame(&frame, &model, &output)?;
    info!("单帧处理完成, 推理 {:.2?}, 合计 {:.2?}", inferred, total);
    Ok(())
  }
}

/// 停止信号来源
#[derive(Debug, Default)]
enum Interrupt {
  /// 运行时安装 Ctrl-C 处理器
  #[default]
  CtrlC,
  Channel(Receiver<()>),
}

impl Interrupt {
  fn into_receiver(self) -> Result<Receiver<()>, ctrlc::Error> {
    match self {
      Interrupt::Channel(rx) => Ok(rx),
      Interrupt::CtrlC => {
        let (tx, rx) = std::sync::mpsc::channel();
        ctrlc::set_handler(move || {
          warn!("收到 Ctrl-C, 当前帧处理完后停止");
          let _ = tx.send(());
        })?;
        Ok(rx)
      }
    }
  }
}

/// 依次处理所有帧，可限制帧数；收到停止信号后处理完当前帧即退出
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: Interrupt,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 使用自定义的停止信号，不安装 Ctrl-C 处理器
  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Interrupt::Channel(interrupt);
    self
  }
}

impl<F, D, I, M, O> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<F, D>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    let stop = self.interrupt.into_receiver()?;
    let limit = self.frame_number.unwrap_or(usize::MAX);

    let mut processed = 0;
    let mut busy = Duration::ZERO;
    for frame in input.take(limit) {
      processed += 1;
      let (inferred, total) = process_frame(&frame, &model, &output)?;
      busy += total;
      info!("第 {} 帧: 推理 {:.2?}, 合计 {:.2?}", processed, inferred, total);

      if stop.try_recv().is_ok() {
        warn!("已停止, 剩余帧不再处理");
        break;
      }
    }

    if processed == limit {
      info!("达到帧数上限 {}", limit);
    }
    info!("共处理 {} 帧, 耗时 {:.2?}", processed, busy);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  struct Doubler;

  impl Model for Doubler {
    type Input = u32;
    type Output = u32;
    type Error = std::io::Error;

    fn infer(&self, input: &u32) -> Result<u32, Self::Error> {
      if *input == 99 {
        return Err(std::io::Error::other("bad frame"));
      }
      Ok(input * 2)
    }
  }

  #[derive(Default)]
  struct Collect(RefCell<Vec<(u32, u32)>>);

  impl Render<u32, u32> for &Collect {
    type Error = std::io::Error;

    fn render_result(&self, frame: &u32, result: &u32) -> Result<(), Self::Error> {
      self.0.borrow_mut().push((*frame, *result));
      Ok(())
    }
  }

  fn quiet() -> ContinuousTask {
    let (_tx, rx) = std::sync::mpsc::channel();
    ContinuousTask::default().with_interrupt(rx)
  }

  #[test]
  fn one_shot_processes_first_frame_only() {
    let sink = Collect::default();
    OneShotTask.run_task(vec![1, 2, 3].into_iter(), Doubler, &sink).unwrap();
    assert_eq!(*sink.0.borrow(), vec![(1, 2)]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let sink = Collect::default();
    assert!(OneShotTask.run_task(Vec::new().into_iter(), Doubler, &sink).is_err());
  }

  #[test]
  fn continuous_processes_all_frames() {
    let sink = Collect::default();
    quiet().run_task(vec![1, 2, 3].into_iter(), Doubler, &sink).unwrap();
    assert_eq!(*sink.0.borrow(), vec![(1, 2), (2, 4), (3, 6)]);
  }

  #[test]
  fn continuous_respects_frame_limit() {
    let sink = Collect::default();
    quiet()
      .with_frame_number(Some(2))
      .run_task(vec![1, 2, 3].into_iter(), Doubler, &sink)
      .unwrap();
    assert_eq!(sink.0.borrow().len(), 2);
  }

  #[test]
  fn continuous_stops_on_interrupt() {
    let (tx, rx) = std::sync::mpsc::channel();
    tx.send(()).unwrap();
    let sink = Collect::default();
    ContinuousTask::default()
      .with_interrupt(rx)
      .run_task(vec![1, 2, 3].into_iter(), Doubler, &sink)
      .unwrap();
    assert_eq!(*sink.0.borrow(), vec![(1, 2)]);
  }

  #[test]
  fn continuous_propagates_model_errors() {
    let sink = Collect::default();
    let err = quiet()
      .run_task(vec![1, 99, 3].into_iter(), Doubler, &sink)
      .unwrap_err();
    assert!(err.to_string().contains("bad frame"));
    assert_eq!(sink.0.borrow().len(), 1);
  }
}
