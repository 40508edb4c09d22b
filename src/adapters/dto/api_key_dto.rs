use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}
