// 该文件是 Zhijian （质检） 项目的一部分。
// src/task.rs - 连续自动检测任务
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

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
  auto::AutoInspector,
  category::Category,
  error::Result,
  inspect::{InspectionResult, Verdict},
  model::DetectParams,
};

/// 任务统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub inspected: usize,
  pub failed: usize,
}

/// 连续轮换样本检测，直到达到指定次数或收到停止信号
#[derive(Debug, Clone)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interval: Duration,
  save: bool,
  stop: Arc<AtomicBool>,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      interval: Duration::ZERO,
      save: true,
      stop: Arc::new(AtomicBool::new(false)),
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  pub fn with_save(mut self, save: bool) -> Self {
    self.save = save;
    self
  }

  /// 停止标志，置位后任务在当前样本处理完后退出
  pub fn stop_handle(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }

  /// 注册 Ctrl-C 处理，第一次中断请求退出，30 秒后仍未退出则强制结束进程
  pub fn handle_ctrlc(self) -> anyhow::Result<Self> {
    let stop = self.stop.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      stop.store(true, Ordering::SeqCst);
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(self)
  }

  pub fn run_task<F>(
    &self,
    inspector: &AutoInspector,
    category: Category,
    params: &DetectParams,
    mut on_result: F,
  ) -> Result<TaskSummary>
  where
    F: FnMut(&InspectionResult),
  {
    info!("开始任务: 类别 {}", category);
    let mut summary = TaskSummary::default();

    while !self.stop.load(Ordering::SeqCst) {
      if self.frame_number.is_some_and(|n| summary.inspected >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.inspected);
        break;
      }

      let now = Instant::now();
      let mut result = inspector.predict_next(category, params)?;
      if self.save {
        let prefix = format!("{}_auto", category);
        inspector.service().persist(&mut result, &prefix)?;
      }
      info!(
        "({}) {:?} 检测完成，耗时: {:.2?}",
        summary.inspected + 1,
        result.source,
        now.elapsed()
      );

      summary.inspected += 1;
      if result.verdict == Verdict::Fail {
        summary.failed += 1;
      }
      on_result(&result);

      if !self.interval.is_zero() {
        thread::sleep(self.interval);
      }
    }

    info!(
      "任务完成，共检测 {} 张，其中 {} 张不合格",
      summary.inspected, summary.failed
    );
    Ok(summary)
  }
}
