use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};

use crate::dto::TranscribeResponse;

/// Posts an audio file to a running sensescribe server and prints the result.
pub async fn run_client(audio_file: &Path, server_url: &str, correct: bool) -> Result<()> {
    if !audio_file.exists() {
        return Err(anyhow!("Audio file not found: {}", audio_file.display()));
    }

    let audio_data =
        fs::read(audio_file).map_err(|e| anyhow!("Failed to read audio file: {}", e))?;
    let filename = audio_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    println!(
        "📁 Audio source: {} ({} bytes)",
        audio_file.display(),
        audio_data.len()
    );

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(audio_data).file_name(filename),
    );

    let url = format!("{server_url}/transcribe/?correct={correct}");
    println!("🚀 Sending transcription request to: {url}");

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| anyhow!("Failed to read response: {}", e))?;

    if !status.is_success() {
        return Err(anyhow!(
            "Server returned error {}: {}",
            status,
            response_text
        ));
    }

    let result: TranscribeResponse = serde_json::from_str(&response_text)
        .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    println!("\n✅ Transcription completed!");
    println!("📝 Raw text:\n{}", result.raw_text);
    if result.is_corrected {
        println!("\n✨ Corrected text:\n{}", result.corrected_text);
    }

    Ok(())
}
