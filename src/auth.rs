use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datetime;

/// GoogleのOAuthトークンエンドポイント。
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// 期限切れ間際のトークンを避けるための余裕時間(秒)。
const EXPIRY_MARGIN_SECS: i64 = 60;

/// 認証処理のエラー。
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no valid token found: {0}")]
    TokenNotFound(String),
    #[error("failed to refresh access token: {0}")]
    Refresh(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// credentials.jsonに保存されたOAuthクライアント情報。
#[derive(Debug, Deserialize)]
struct ClientSecrets {
    installed: InstalledApp,
}

#[derive(Debug, Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
}

/// token.jsonに保存されたトークン。
#[derive(Debug, Deserialize, Serialize)]
struct StoredToken {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

/// トークンエンドポイントのレスポンス。
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// token.jsonとcredentials.jsonを管理し、アクセストークンを提供する。
///
/// # Examples
///
/// ```
/// let store = TokenStore::new(&config_dir);
/// let access_token = store.access_token().await.unwrap();
/// ```
pub struct TokenStore {
    token_path: PathBuf,
    credentials_path: PathBuf,
    token_url: String,
    client: Client,
}

/// 既定の設定ディレクトリを返す。
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("caltally"))
}

impl TokenStore {
    /// 指定された設定ディレクトリに対する新しい`TokenStore`を返す。
    pub fn new(config_dir: &Path) -> Self {
        Self {
            token_path: config_dir.join("token.json"),
            credentials_path: config_dir.join("credentials.json"),
            token_url: TOKEN_URL.to_string(),
            client: Client::new(),
        }
    }

    /// 有効なアクセストークンを返す。
    ///
    /// 保存されたトークンが有効期限内であればそのまま返し、期限切れの場合は
    /// リフレッシュトークンで更新した上でtoken.jsonを書き換える。
    /// token.jsonが存在しない場合は初回認可が済んでいないためエラーを返す。
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if !self.token_path.exists() {
            return Err(AuthError::TokenNotFound(format!(
                "{} does not exist. Complete the authorization flow and place the token file there.",
                self.token_path.display()
            )));
        }

        let token: StoredToken = serde_json::from_str(&fs::read_to_string(&self.token_path)?)?;
        if token.expires_at > datetime::now().timestamp() + EXPIRY_MARGIN_SECS {
            return Ok(token.access_token);
        }

        info!("Access token expired, refreshing...");
        let secrets: ClientSecrets =
            serde_json::from_str(&fs::read_to_string(&self.credentials_path)?)?;
        let refreshed = self
            .refresh(&secrets.installed, &token.refresh_token)
            .await?;
        fs::write(&self.token_path, serde_json::to_string_pretty(&refreshed)?)?;

        Ok(refreshed.access_token)
    }

    /// リフレッシュトークンでアクセストークンを更新する。
    async fn refresh(
        &self,
        app: &InstalledApp,
        refresh_token: &str,
    ) -> Result<StoredToken, AuthError> {
        let params = [
            ("client_id", app.client_id.as_str()),
            ("client_secret", app.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.client.post(&self.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Refresh(format!("HTTP {} - {}", status, body)));
        }

        let token_response: TokenResponse = response.json().await?;
        let expires_at =
            datetime::now().timestamp() + token_response.expires_in.unwrap_or(3600);

        Ok(StoredToken {
            access_token: token_response.access_token,
            refresh_token: refresh_token.to_string(),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use reqwest::Client;

    use super::{AuthError, TokenStore};
    use crate::datetime::mock_datetime;

    /// テストで現在時刻として利用するUNIX時間(2024-01-01T00:00:00+00:00)。
    const MOCK_NOW: i64 = 1704067200;

    /// 現在時刻を`MOCK_NOW`に固定する。
    fn set_mock_now() {
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00")
                .unwrap()
                .to_utc(),
        );
    }

    /// テスト用にトークンエンドポイントを差し替えた`TokenStore`を作成する。
    fn token_store(config_dir: &std::path::Path, token_url: &str) -> TokenStore {
        TokenStore {
            token_path: config_dir.join("token.json"),
            credentials_path: config_dir.join("credentials.json"),
            token_url: token_url.to_string(),
            client: Client::new(),
        }
    }

    /// 有効期限内のトークンがそのまま返ることを確認する。
    #[tokio::test]
    async fn test_access_token_valid() {
        set_mock_now();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("token.json"),
            format!(
                r#"{{"access_token":"stored-token","refresh_token":"refresh","expires_at":{}}}"#,
                MOCK_NOW + 3600
            ),
        )
        .unwrap();
        let store = token_store(dir.path(), "http://localhost/unused");

        let access_token = store.access_token().await.unwrap();

        assert_eq!(access_token, "stored-token");
        mock_datetime::clear_mock_time();
    }

    /// token.jsonが存在しない場合にエラーになることを確認する。
    #[tokio::test]
    async fn test_access_token_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = token_store(dir.path(), "http://localhost/unused");

        let result = store.access_token().await;

        assert!(matches!(result, Err(AuthError::TokenNotFound(_))));
    }

    /// 期限切れ間際のトークンが更新されてtoken.jsonが書き換わることを確認する。
    ///
    /// 有効期限が現在時刻より後でも、余裕時間の範囲内であれば更新される。
    #[tokio::test]
    async fn test_access_token_refreshes_expired_token() {
        set_mock_now();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"new-token","expires_in":3600,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("token.json"),
            format!(
                r#"{{"access_token":"old-token","refresh_token":"refresh","expires_at":{}}}"#,
                MOCK_NOW + 30
            ),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("credentials.json"),
            r#"{"installed":{"client_id":"id","client_secret":"secret"}}"#,
        )
        .unwrap();
        let store = token_store(dir.path(), &format!("{}/token", server.url()));

        let access_token = store.access_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(access_token, "new-token");
        let saved = std::fs::read_to_string(dir.path().join("token.json")).unwrap();
        assert!(saved.contains("new-token"));
        assert!(saved.contains("refresh"));
        assert!(saved.contains(&(MOCK_NOW + 3600).to_string()));
        mock_datetime::clear_mock_time();
    }

    /// トークンエンドポイントがエラーを返した場合にエラーになることを確認する。
    #[tokio::test]
    async fn test_access_token_refresh_failure() {
        set_mock_now();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("token.json"),
            format!(
                r#"{{"access_token":"old-token","refresh_token":"refresh","expires_at":{}}}"#,
                MOCK_NOW - 3600
            ),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("credentials.json"),
            r#"{"installed":{"client_id":"id","client_secret":"secret"}}"#,
        )
        .unwrap();
        let store = token_store(dir.path(), &format!("{}/token", server.url()));

        let result = store.access_token().await;

        assert!(matches!(result, Err(AuthError::Refresh(_))));
        mock_datetime::clear_mock_time();
    }
}
