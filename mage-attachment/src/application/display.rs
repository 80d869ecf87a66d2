//! 展示适配
//!
//! 按内容大类把加载结果映射为渲染计划：图像走位图，视频走海报帧
//! 叠加播放标志，音频与普通文件只给静态图形。每个分支都更新
//! 无障碍文案，展示面永远处于可描述的状态。

use crate::config::AttachmentConfig;
use crate::domain::model::{
    Attachment, ContentKind, LoadError, LoadOutcome, LoadedMedia, infer_content_kind,
};

/// 静态占位图形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphKind {
    /// 加载中的占位
    Placeholder,
    /// 无可用来源（例如尚未上传）
    NoSource,
    /// 加载失败
    Broken,
    /// 音频附件
    Speaker,
    /// 普通文件
    File,
}

impl GlyphKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlyphKind::Placeholder => "placeholder",
            GlyphKind::NoSource => "no_source",
            GlyphKind::Broken => "broken",
            GlyphKind::Speaker => "speaker",
            GlyphKind::File => "file",
        }
    }
}

/// 渲染内容
pub enum RenderContent {
    /// 位图展示
    Bitmap(LoadedMedia),
    /// 视频海报帧，叠加播放标志
    Poster {
        media: LoadedMedia,
        show_play_glyph: bool,
    },
    /// 静态图形，可附文件名标签
    Glyph {
        kind: GlyphKind,
        label: Option<String>,
        edge: u32,
    },
}

/// 交给展示面执行的渲染计划
pub struct RenderPlan {
    pub content: RenderContent,
    pub accessibility_text: String,
    /// 仅缓存未命中时的下载体积提示，供“立即下载”弹窗使用
    pub download_size_bytes: Option<u64>,
}

pub struct DisplayAdapter {
    label_max_chars: usize,
    placeholder_edge: u32,
}

impl DisplayAdapter {
    pub fn new(config: &AttachmentConfig) -> Self {
        Self {
            label_max_chars: config.label_max_chars,
            placeholder_edge: config.default_placeholder_edge,
        }
    }

    /// 远端加载开始时的即时占位计划
    pub fn loading_plan(&self, attachment: &Attachment) -> RenderPlan {
        RenderPlan {
            content: self.glyph(GlyphKind::Placeholder, None),
            accessibility_text: format!("attachment {} loading", attachment.display_name()),
            download_size_bytes: None,
        }
    }

    /// 按内容大类把加载终态映射为渲染计划
    pub fn plan_for(&self, attachment: &Attachment, outcome: LoadOutcome) -> RenderPlan {
        let kind = infer_content_kind(
            attachment.content_type.as_deref(),
            attachment.file_name.as_deref(),
        );
        match kind {
            ContentKind::Image => self.render_media(attachment, outcome),
            ContentKind::Video => self.render_poster(attachment, outcome),
            ContentKind::Audio => self.render_audio(attachment),
            ContentKind::Other => self.render_file(attachment),
        }
    }

    pub fn render_media(&self, attachment: &Attachment, outcome: LoadOutcome) -> RenderPlan {
        match outcome {
            LoadOutcome::Loaded(media) => RenderPlan {
                content: RenderContent::Bitmap(media),
                accessibility_text: format!("attachment {} loaded", attachment.display_name()),
                download_size_bytes: None,
            },
            LoadOutcome::NoSource => self.no_source_plan(attachment),
            LoadOutcome::Failed(error) => self.failure_plan(attachment, &error),
        }
    }

    pub fn render_poster(&self, attachment: &Attachment, outcome: LoadOutcome) -> RenderPlan {
        match outcome {
            LoadOutcome::Loaded(media) => RenderPlan {
                content: RenderContent::Poster {
                    media,
                    show_play_glyph: true,
                },
                accessibility_text: format!("attachment {} loaded", attachment.display_name()),
                download_size_bytes: None,
            },
            LoadOutcome::NoSource => self.no_source_plan(attachment),
            LoadOutcome::Failed(error) => self.failure_plan(attachment, &error),
        }
    }

    /// 音频不取媒体，直接给扬声器图形
    pub fn render_audio(&self, attachment: &Attachment) -> RenderPlan {
        RenderPlan {
            content: self.glyph(GlyphKind::Speaker, None),
            accessibility_text: format!("audio attachment {}", attachment.display_name()),
            download_size_bytes: None,
        }
    }

    /// 其余类型给文件图形加文件名标签
    pub fn render_file(&self, attachment: &Attachment) -> RenderPlan {
        let label = attachment
            .file_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| self.truncate_label(name));
        RenderPlan {
            content: self.glyph(GlyphKind::File, label),
            accessibility_text: format!("file attachment {}", attachment.display_name()),
            download_size_bytes: None,
        }
    }

    fn no_source_plan(&self, attachment: &Attachment) -> RenderPlan {
        RenderPlan {
            content: self.glyph(GlyphKind::NoSource, None),
            accessibility_text: format!("attachment {} awaiting upload", attachment.display_name()),
            download_size_bytes: None,
        }
    }

    fn failure_plan(&self, attachment: &Attachment, error: &LoadError) -> RenderPlan {
        // 仅缓存未命中时带上体积提示，宿主可弹“立即下载”
        let download_size_bytes = match error {
            LoadError::CacheOnlyMiss { .. } => attachment.size_bytes,
            _ => None,
        };
        RenderPlan {
            content: self.glyph(GlyphKind::Broken, None),
            accessibility_text: format!(
                "attachment {} failed to load: {}",
                attachment.display_name(),
                error
            ),
            download_size_bytes,
        }
    }

    fn glyph(&self, kind: GlyphKind, label: Option<String>) -> RenderContent {
        RenderContent::Glyph {
            kind,
            label,
            edge: self.placeholder_edge,
        }
    }

    /// 按字符数截断标签，超出部分以省略号结尾
    fn truncate_label(&self, name: &str) -> String {
        if name.chars().count() <= self.label_max_chars {
            return name.to_string();
        }
        let mut truncated: String = name
            .chars()
            .take(self.label_max_chars.saturating_sub(1))
            .collect();
        truncated.push('…');
        truncated
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, RgbaImage};

    use super::*;
    use crate::config::{DEFAULT_LABEL_MAX_CHARS, DEFAULT_PLACEHOLDER_EDGE};
    use crate::domain::model::{MediaOrigin, MediaTier};

    fn adapter() -> DisplayAdapter {
        DisplayAdapter::new(&AttachmentConfig::default())
    }

    fn loaded_media() -> LoadedMedia {
        LoadedMedia {
            image: DynamicImage::ImageRgba8(RgbaImage::new(8, 8)),
            origin: MediaOrigin::Network,
            tier: MediaTier::Thumbnail,
            byte_len: 64,
        }
    }

    #[test]
    fn test_loaded_image_renders_bitmap() {
        let attachment = Attachment::new_local("photo.png", "image/png");
        let plan = adapter().plan_for(&attachment, LoadOutcome::Loaded(loaded_media()));
        assert!(matches!(plan.content, RenderContent::Bitmap(_)));
        assert_eq!(plan.accessibility_text, "attachment photo.png loaded");
    }

    #[test]
    fn test_video_without_source_renders_generic_no_source() {
        let attachment = Attachment::new_local("clip.mp4", "video/mp4");
        let plan = adapter().plan_for(&attachment, LoadOutcome::NoSource);
        match plan.content {
            RenderContent::Glyph { kind, .. } => assert_eq!(kind, GlyphKind::NoSource),
            _ => panic!("expected glyph content"),
        }
        assert_eq!(plan.accessibility_text, "attachment clip.mp4 awaiting upload");
    }

    #[test]
    fn test_cache_only_miss_carries_download_size() {
        let mut attachment = Attachment::new_local("photo.png", "image/png");
        attachment.size_bytes = Some(2_500_000);

        let plan = adapter().plan_for(
            &attachment,
            LoadOutcome::Failed(LoadError::CacheOnlyMiss {
                key: "remote-1_thumbnail".to_string(),
            }),
        );
        assert_eq!(plan.download_size_bytes, Some(2_500_000));

        // 其余失败类型不带下载提示
        let plan = adapter().plan_for(
            &attachment,
            LoadOutcome::Failed(LoadError::Transport("connection reset".to_string())),
        );
        assert_eq!(plan.download_size_bytes, None);
    }

    #[test]
    fn test_poster_overlays_play_glyph() {
        let attachment = Attachment::new_local("clip.mp4", "video/mp4");
        let plan = adapter().plan_for(&attachment, LoadOutcome::Loaded(loaded_media()));
        match plan.content {
            RenderContent::Poster {
                show_play_glyph, ..
            } => assert!(show_play_glyph),
            _ => panic!("expected poster content"),
        }
    }

    #[test]
    fn test_audio_renders_speaker_glyph() {
        let attachment = Attachment::new_local("note.m4a", "audio/mp4");
        let plan = adapter().plan_for(&attachment, LoadOutcome::NoSource);
        match plan.content {
            RenderContent::Glyph { kind, .. } => assert_eq!(kind, GlyphKind::Speaker),
            _ => panic!("expected glyph content"),
        }
    }

    #[test]
    fn test_file_label_truncated_with_ellipsis() {
        let long_name = "a-very-long-field-survey-document-name-2024-report.pdf";
        let attachment = Attachment::new_local(long_name, "application/pdf");
        let plan = adapter().plan_for(&attachment, LoadOutcome::NoSource);
        match plan.content {
            RenderContent::Glyph { kind, label, .. } => {
                assert_eq!(kind, GlyphKind::File);
                let label = label.expect("label present");
                assert!(label.ends_with('…'));
                assert_eq!(label.chars().count(), DEFAULT_LABEL_MAX_CHARS);
            }
            _ => panic!("expected glyph content"),
        }
        // 无障碍文案保留完整文件名
        assert!(plan.accessibility_text.contains(long_name));
    }

    #[test]
    fn test_failure_text_includes_reason() {
        let attachment = Attachment::new_local("photo.png", "image/png");
        let plan = adapter().plan_for(
            &attachment,
            LoadOutcome::Failed(LoadError::Transport("connection reset".to_string())),
        );
        match plan.content {
            RenderContent::Glyph { kind, .. } => assert_eq!(kind, GlyphKind::Broken),
            _ => panic!("expected glyph content"),
        }
        assert!(plan.accessibility_text.contains("failed to load"));
        assert!(plan.accessibility_text.contains("connection reset"));
    }

    #[test]
    fn test_loading_plan_uses_placeholder_edge() {
        let attachment = Attachment::new_local("photo.png", "image/png");
        let plan = adapter().loading_plan(&attachment);
        match plan.content {
            RenderContent::Glyph { kind, edge, .. } => {
                assert_eq!(kind, GlyphKind::Placeholder);
                assert_eq!(edge, DEFAULT_PLACEHOLDER_EDGE);
            }
            _ => panic!("expected glyph content"),
        }
        assert_eq!(plan.accessibility_text, "attachment photo.png loading");
    }
}
