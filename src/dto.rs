#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct TranscribeResponse {
    pub raw_text: String,
    pub corrected_text: String,
    pub is_corrected: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
