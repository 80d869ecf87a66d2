//! 媒体处理器 - 负责图像字节的解码、降采样与编码
//!
//! 使用 image crate 处理图像，降采样保持宽高比且只缩小不放大。

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};

use crate::domain::model::TargetSize;

/// 媒体处理器
pub struct MediaProcessor;

impl MediaProcessor {
    pub fn new() -> Self {
        Self
    }

    /// 解码媒体字节
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).context("decode image bytes")
    }

    /// 按目标边界降采样，源图未超出边界时原样返回
    pub fn downsample(&self, image: DynamicImage, target: Option<TargetSize>) -> DynamicImage {
        let Some(target) = target else {
            return image;
        };
        if image.width() <= target.width && image.height() <= target.height {
            return image;
        }
        image.thumbnail(target.width, target.height)
    }

    /// 降采样结果回存缓存时使用的编码格式，尽量保持源格式
    pub fn storage_format(&self, source: &[u8]) -> ImageFormat {
        match image::guess_format(source) {
            Ok(
                format @ (ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Gif
                | ImageFormat::Bmp
                | ImageFormat::Tiff),
            ) => format,
            _ => ImageFormat::Png,
        }
    }

    /// 编码为指定格式的字节
    pub fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, format)
            .with_context(|| format!("encode {:?} bytes", format))?;
        Ok(cursor.into_inner())
    }
}
