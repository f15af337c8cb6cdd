/// OCR 引擎客户端
///
/// 把文档原始字节发送给 OCR 服务，取回识别出的文本
use crate::error::ServiceError;
use serde::Deserialize;
use tracing::debug;

/// OCR 服务响应
#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: String,
}

/// OCR 引擎客户端
pub struct OcrClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OcrClient {
    /// 创建新的 OCR 客户端
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 识别文档文本
    ///
    /// # 参数
    /// - `content`: 文档原始字节
    /// - `file_name`: 文件名（OCR 服务据此判断格式）
    /// - `mime_type`: 文档类型
    ///
    /// # 返回
    /// 返回识别出的文本，可能为空
    pub async fn extract_text(
        &self,
        content: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, ServiceError> {
        debug!("调用 OCR: {} ({} 字节)", file_name, content.len());

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .query(&[("filename", file_name)])
            .body(content)
            .send()
            .await
            .map_err(|e| ServiceError::from_request(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::from_status(&self.endpoint, status.as_u16()));
        }

        let body: OcrResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        debug!("OCR 完成: {} ({} 字符)", file_name, body.text.chars().count());
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_default_text() {
        let body: OcrResponse = serde_json::from_str("{}").unwrap();
        assert!(body.text.is_empty());
        let body: OcrResponse = serde_json::from_str(r#"{"text":"LOT 42"}"#).unwrap();
        assert_eq!(body.text, "LOT 42");
    }
}
