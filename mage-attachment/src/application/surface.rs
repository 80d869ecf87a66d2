//! 展示面
//!
//! 可复用的展示面（列表单元格、图片视图）每次最多挂一个在途加载。
//! 新请求隐式取消旧请求，过期代的完成结果被丢弃，事件经通道送回
//! 宿主 UI 侧统一落地。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::model::{
    Attachment, ContentKind, LoadRequest, MediaTier, ResolvedSource, TargetSize,
    infer_content_kind,
};
use crate::domain::repository::ProgressSink;
use crate::domain::service::AttachmentMediaService;

use super::display::{DisplayAdapter, RenderPlan};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// 展示面事件，终态事件每次展示恰好一条
pub enum SurfaceEvent {
    /// 远端加载开始时的占位计划
    Loading(RenderPlan),
    /// 下载进度，0.0..=1.0
    Progress(f64),
    /// 终态渲染计划
    Rendered(RenderPlan),
}

/// 单次展示的选项
#[derive(Debug, Clone, Default)]
pub struct DisplayOptions {
    /// 请求的缓存层级，None 表示按展示边界取默认尺寸
    pub tier: Option<MediaTier>,
    /// 展示面的像素边界
    pub bounds: Option<TargetSize>,
    /// 仅缓存模式
    pub cache_only: bool,
}

pub struct DisplaySurface {
    service: Arc<AttachmentMediaService>,
    adapter: Arc<DisplayAdapter>,
    events: mpsc::Sender<SurfaceEvent>,
    generation: Arc<AtomicU64>,
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl DisplaySurface {
    pub fn new(
        service: Arc<AttachmentMediaService>,
        adapter: Arc<DisplayAdapter>,
    ) -> (Self, mpsc::Receiver<SurfaceEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                service,
                adapter,
                events,
                generation: Arc::new(AtomicU64::new(0)),
                active: Arc::new(Mutex::new(None)),
            },
            receiver,
        )
    }

    /// 展示一个附件，隐式取消本面上的前一次加载
    pub async fn display(&self, attachment: Attachment, options: DisplayOptions) {
        let issued_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        self.replace_active(Some(token.clone())).await;

        let kind = infer_content_kind(
            attachment.content_type.as_deref(),
            attachment.file_name.as_deref(),
        );

        // 音频与普通文件不取媒体，立即渲染静态图形
        match kind {
            ContentKind::Audio => {
                let plan = self.adapter.render_audio(&attachment);
                self.emit(issued_generation, SurfaceEvent::Rendered(plan))
                    .await;
                return;
            }
            ContentKind::Other => {
                let plan = self.adapter.render_file(&attachment);
                self.emit(issued_generation, SurfaceEvent::Rendered(plan))
                    .await;
                return;
            }
            _ => {}
        }

        let request = LoadRequest {
            attachment,
            tier: options.tier,
            surface_bounds: options.bounds,
            cache_only: options.cache_only,
        };

        let service = self.service.clone();
        let adapter = self.adapter.clone();
        let events = self.events.clone();
        let generation = self.generation.clone();

        tokio::spawn(async move {
            let load = async {
                // 远端来源先给占位图即时反馈，本地读取直接出图
                if matches!(
                    service.resolve_source(&request).await,
                    ResolvedSource::Remote(_)
                ) && generation.load(Ordering::SeqCst) == issued_generation
                {
                    let plan = adapter.loading_plan(&request.attachment);
                    let _ = events.send(SurfaceEvent::Loading(plan)).await;
                }

                let progress_events = events.clone();
                let progress_generation = generation.clone();
                let progress: ProgressSink = Box::new(move |ratio| {
                    // 过期代的进度不再上报，通道满时静默丢弃
                    if progress_generation.load(Ordering::SeqCst) == issued_generation {
                        let _ = progress_events.try_send(SurfaceEvent::Progress(ratio));
                    }
                });

                let outcome = match kind {
                    ContentKind::Video => service.load_poster(&request).await,
                    _ => service.load_media(&request, Some(progress)).await,
                };
                adapter.plan_for(&request.attachment, outcome)
            };

            tokio::select! {
                _ = token.cancelled() => {
                    debug!(generation = issued_generation, "display load cancelled");
                }
                plan = load => {
                    // 过期代的完成结果直接丢弃，不得触碰展示面
                    if generation.load(Ordering::SeqCst) == issued_generation {
                        let _ = events.send(SurfaceEvent::Rendered(plan)).await;
                    } else {
                        debug!(generation = issued_generation, "stale completion discarded");
                    }
                }
            }
        });
    }

    /// 展示面被回收时调用，取消在途加载并压制其回调
    pub async fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.replace_active(None).await;
    }

    async fn replace_active(&self, next: Option<CancellationToken>) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.cancel();
        }
        *active = next;
    }

    async fn emit(&self, issued_generation: u64, event: SurfaceEvent) {
        if self.generation.load(Ordering::SeqCst) == issued_generation {
            let _ = self.events.send(event).await;
        }
    }
}
