use crate::router::CommandRouter;
use slotbot_core::command::port::CommandSource;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// # Summary
/// 指令拉取循环：持续从来源拉取入站消息，每条消息交给独立任务处理。
///
/// # Invariants
/// - 单条消息的处理失败不会影响循环本身。
/// - 来源出错时等待 `retry_delay` 后重试，等待可被关闭信号打断。
/// - `run` 返回前所有已派发的处理任务均已结束。
pub struct CommandLoop {
    source: Arc<dyn CommandSource>,
    router: Arc<CommandRouter>,
    retry_delay: Duration,
    tracker: TaskTracker,
}

impl CommandLoop {
    pub fn new(
        source: Arc<dyn CommandSource>,
        router: Arc<CommandRouter>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            source,
            router,
            retry_delay,
            tracker: TaskTracker::new(),
        }
    }

    /// # Summary
    /// 运行拉取循环直到收到关闭信号。
    ///
    /// # Logic
    /// 1. 在关闭信号与 `next_batch` 之间择先；关闭优先。
    /// 2. 每条入站消息 spawn 一个处理任务。
    /// 3. 拉取失败记录告警并退避。
    /// 4. 退出时关闭 tracker 并等待在途任务结束。
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Command handler started");

        loop {
            let batch = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                batch = self.source.next_batch() => batch,
            };

            match batch {
                Ok(messages) => {
                    if !messages.is_empty() {
                        debug!("Received {} inbound messages", messages.len());
                    }
                    for message in messages {
                        let router = self.router.clone();
                        self.tracker.spawn(async move {
                            router.handle(message.chat, &message.text).await;
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to fetch updates: {}, retrying in {:?}",
                        e, self.retry_delay
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        self.tracker.close();
        self.tracker.wait().await;
        info!("done with command handler");
    }
}
