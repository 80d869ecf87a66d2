//! MAGE 附件媒体解析与显示管线
//!
//! 负责为单条附件记录选择展示来源（修复后的本地文件、分层缓存、带鉴权的远端
//! URL），并以可取消的异步加载交付结果。

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::display::{DisplayAdapter, GlyphKind, RenderContent, RenderPlan};
pub use application::surface::{DisplayOptions, DisplaySurface, SurfaceEvent};
pub use config::AttachmentConfig;
pub use domain::model::{
    Attachment, ContentKind, LoadError, LoadOutcome, LoadRequest, LoadedMedia, MediaOrigin,
    MediaTier, TargetSize,
};
pub use service::wire::{ApplicationContext, initialize};
