//! HTTP 远端媒体源
//!
//! 按配置的远端源 profile 构建客户端，出站请求经令牌装饰，
//! 响应按流式分块接收并上报下载进度。

use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::Client;
use tracing::debug;
use url::Url;

use mage_mobile_core::RemoteSourceConfig;

use crate::domain::repository::{AccessTokenProviderRef, ProgressSink, RemoteMediaSource};

pub struct HttpMediaSource {
    client: Client,
    base_url: Option<Url>,
    token_header: String,
    token_provider: Option<AccessTokenProviderRef>,
}

impl HttpMediaSource {
    pub fn new(
        config: &RemoteSourceConfig,
        token_provider: Option<AccessTokenProviderRef>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build().context("build http client")?;

        let base_url = if config.base_url.is_empty() {
            None
        } else {
            Some(Url::parse(&config.base_url).with_context(|| {
                format!("invalid remote source base url: {}", config.base_url)
            })?)
        };

        Ok(Self {
            client,
            base_url,
            token_header: config
                .token_header
                .clone()
                .unwrap_or_else(|| "Authorization".to_string()),
            token_provider,
        })
    }

    /// 绝对 URL 原样使用，相对标识拼接到配置的基础 URL 上
    fn resolve_url(&self, raw: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(raw) {
            return Ok(url);
        }
        let Some(base) = &self.base_url else {
            bail!("relative media url '{raw}' without a configured base url");
        };
        base.join(raw)
            .with_context(|| format!("join media url '{raw}'"))
    }
}

#[async_trait::async_trait]
impl RemoteMediaSource for HttpMediaSource {
    async fn fetch(&self, url: &str, progress: Option<ProgressSink>) -> Result<Bytes> {
        let url = self.resolve_url(url)?;

        let mut request = self.client.get(url.clone());
        if let Some(provider) = &self.token_provider {
            if let Some(token) = provider.access_token() {
                // Authorization 头走 Bearer 方案，自定义头透传原始令牌
                let value = if self.token_header.eq_ignore_ascii_case("authorization") {
                    format!("Bearer {token}")
                } else {
                    token
                };
                request = request.header(self.token_header.as_str(), value);
            }
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request media from {url}"))?
            .error_for_status()
            .with_context(|| format!("media request rejected by {url}"))?;

        let total = response.content_length().filter(|len| *len > 0);
        let mut stream = response.bytes_stream();
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("read media response chunk")?;
            buffer.extend_from_slice(&chunk);
            if let (Some(report), Some(total)) = (&progress, total) {
                report(buffer.len() as f64 / total as f64);
            }
        }

        debug!(url = %url, bytes = buffer.len(), "remote media fetched");
        Ok(buffer.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with_base(base_url: &str) -> HttpMediaSource {
        let config = RemoteSourceConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        HttpMediaSource::new(&config, None).expect("build source")
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let source = source_with_base("https://mage.example.com/api/");
        let url = source
            .resolve_url("https://elsewhere.example.com/media/1")
            .expect("resolve");
        assert_eq!(url.as_str(), "https://elsewhere.example.com/media/1");
    }

    #[test]
    fn test_relative_identifier_joins_base() {
        let source = source_with_base("https://mage.example.com/api/");
        let url = source
            .resolve_url("observations/42/attachments/7")
            .expect("resolve");
        assert_eq!(
            url.as_str(),
            "https://mage.example.com/api/observations/42/attachments/7"
        );
    }

    #[test]
    fn test_relative_identifier_without_base_fails() {
        let config = RemoteSourceConfig::default();
        let source = HttpMediaSource::new(&config, None).expect("build source");
        assert!(source.resolve_url("observations/42").is_err());
    }
}
