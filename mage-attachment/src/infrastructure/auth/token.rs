use std::sync::RwLock;

use crate::domain::repository::AccessTokenProvider;

/// 由宿主会话层写入的静态令牌提供者
#[derive(Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// 会话刷新后更新令牌
    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

impl AccessTokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_set_and_clear() {
        let provider = StaticTokenProvider::new(None);
        assert_eq!(provider.access_token(), None);

        provider.set_token("session-token");
        assert_eq!(provider.access_token(), Some("session-token".to_string()));

        provider.clear();
        assert_eq!(provider.access_token(), None);
    }
}
