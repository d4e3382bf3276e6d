use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_multipart::{Field, Multipart};
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, post, web};
use futures_util::TryStreamExt;
use log::{debug, error, info, warn};

use crate::audio;
use crate::config::{self, AppConfig};
use crate::correction::CorrectionClient;
use crate::dto::TranscribeResponse;
use crate::error::ApiError;
use crate::transcription::TranscriptionClient;

pub struct AppState {
    pub transcriber: TranscriptionClient,
    pub corrector: CorrectionClient,
}

/// Locations of the prebuilt frontend bundle.
pub struct StaticSite {
    pub index: PathBuf,
    pub assets: PathBuf,
}

impl StaticSite {
    pub fn new(root: PathBuf) -> Self {
        Self {
            index: root.join("index.html"),
            assets: root.join("assets"),
        }
    }
}

#[derive(serde::Deserialize)]
struct TranscribeQuery {
    #[serde(default)]
    correct: bool,
}

struct Upload {
    bytes: Vec<u8>,
    filename: String,
    content_type: Option<String>,
}

#[get("/api/v1/health")]
async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Transcription service is running"
    }))
}

#[post("/transcribe/")]
async fn transcribe_upload(
    state: web::Data<AppState>,
    query: web::Query<TranscribeQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    debug!("Transcription request received");

    let mut upload: Option<Upload> = None;
    let mut correct = query.correct;

    // Process multipart fields
    while let Some(field) = payload.try_next().await.unwrap_or(None) {
        match field.name() {
            Some("file") => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field.content_type().map(|mime| mime.to_string());
                match read_field_data(field).await {
                    Ok(bytes) => {
                        debug!("Upload '{}' received: {} bytes", filename, bytes.len());
                        upload = Some(Upload {
                            bytes,
                            filename,
                            content_type,
                        });
                    }
                    Err(e) => {
                        error!("Failed to read uploaded file: {e}");
                        return Err(ApiError::Internal(format!("failed to read upload: {e}")));
                    }
                }
            }
            Some("correct") => {
                if let Ok(field_data) = read_field_data(field).await {
                    if let Ok(text) = String::from_utf8(field_data) {
                        correct = parse_flag(&text);
                        debug!("Correction flag set to: {correct}");
                    }
                }
            }
            _ => continue,
        }
    }

    let upload = match upload {
        Some(upload) => upload,
        None => {
            warn!("No file provided in transcription request");
            return Err(ApiError::MissingFile);
        }
    };

    info!(
        "Processing upload '{}': {} bytes, correct={}",
        upload.filename,
        upload.bytes.len(),
        correct
    );

    let normalized = audio::normalize(
        upload.bytes,
        &upload.filename,
        upload.content_type.as_deref(),
    )?;

    let raw_text = state
        .transcriber
        .transcribe(
            normalized.bytes,
            &normalized.filename,
            &normalized.content_type,
        )
        .await?;

    let (corrected_text, is_corrected) = if correct && !raw_text.is_empty() {
        info!("Correction enabled, calling LLM");
        let correction = state.corrector.correct(&raw_text).await;
        (correction.text, correction.applied)
    } else {
        debug!("Correction skipped");
        (raw_text.clone(), false)
    };

    Ok(HttpResponse::Ok().json(TranscribeResponse {
        raw_text,
        corrected_text,
        is_corrected,
    }))
}

async fn read_field_data(mut field: Field) -> Result<Vec<u8>, actix_web::Error> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        data.extend_from_slice(&chunk);
    }
    debug!("Read field data: {} bytes", data.len());
    Ok(data)
}

fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Serves the frontend entry point; also the catch-all for client-side routes.
async fn serve_index(site: web::Data<StaticSite>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(&site.index).await?)
}

pub async fn run_server(
    config: AppConfig,
    host: String,
    port: u16,
    static_dir: PathBuf,
) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        transcriber: TranscriptionClient::new(
            config.transcription_api_key.clone(),
            config::TRANSCRIPTION_API_URL.to_string(),
            config::TRANSCRIPTION_MODEL.to_string(),
        ),
        corrector: CorrectionClient::new(
            config.llm_api_key,
            config::CHAT_API_URL.to_string(),
            config::CORRECTION_MODEL.to_string(),
        ),
    });
    let site = web::Data::new(StaticSite::new(static_dir));

    info!("Starting HTTP server on {host}:{port}");

    HttpServer::new(move || {
        let assets_dir = site.assets.clone();
        App::new()
            .app_data(state.clone())
            .app_data(site.clone())
            .app_data(
                actix_multipart::form::MultipartFormConfig::default()
                    .total_limit(100 * 1024 * 1024), // 100MB
            )
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health_check)
            .service(transcribe_upload)
            .service(Files::new("/assets", assets_dir))
            .route("/", web::get().to(serve_index))
            .default_service(web::get().to(serve_index))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::OnceLock;

    use actix_web::http::StatusCode;
    use actix_web::test;

    use super::*;
    use crate::dto::ErrorBody;

    const BOUNDARY: &str = "----sensescribe-test-boundary";

    fn test_state() -> web::Data<AppState> {
        // Port 9 is unroutable, so any request that reaches an outbound client
        // fails fast with a connection error.
        web::Data::new(AppState {
            transcriber: TranscriptionClient::new(
                "test-key".to_string(),
                "http://127.0.0.1:9/v1/audio/transcriptions".to_string(),
                "test-model".to_string(),
            ),
            corrector: CorrectionClient::new(
                "test-key".to_string(),
                "http://127.0.0.1:9/v1/chat/completions".to_string(),
                "test-model".to_string(),
            ),
        })
    }

    fn static_site_dir() -> PathBuf {
        static DIR: OnceLock<PathBuf> = OnceLock::new();
        DIR.get_or_init(|| {
            let dir = std::env::temp_dir().join(format!("sensescribe-static-{}", std::process::id()));
            std::fs::create_dir_all(dir.join("assets")).unwrap();
            std::fs::write(dir.join("index.html"), "<html>entry point</html>").unwrap();
            std::fs::write(dir.join("assets").join("app.css"), "body { margin: 0; }").unwrap();
            dir
        })
        .clone()
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => {
                    body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"))
                }
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    #[actix_web::test]
    async fn missing_file_returns_400() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(transcribe_upload),
        )
        .await;

        let body = multipart_body(&[("correct", None, "true")]);
        let req = test::TestRequest::post()
            .uri("/transcribe/")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(error.detail, "No file uploaded");
    }

    #[actix_web::test]
    async fn undecodable_upload_returns_400_with_decoder_detail() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(transcribe_upload),
        )
        .await;

        let body = multipart_body(&[("file", Some("blob.xyz"), "definitely not audio data")]);
        let req = test::TestRequest::post()
            .uri("/transcribe/")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorBody = test::read_body_json(resp).await;
        assert!(error.detail.starts_with("Failed to convert audio file"));
    }

    #[actix_web::test]
    async fn unreachable_transcription_service_returns_500() {
        let app = test::init_service(
            App::new()
                .app_data(test_state())
                .service(transcribe_upload),
        )
        .await;

        // Accepted extension, so the bytes pass through without decoding and
        // the pipeline fails at the outbound transcription call.
        let body = multipart_body(&[("file", Some("clip.wav"), "RIFFxxxxWAVE")]);
        let req = test::TestRequest::post()
            .uri("/transcribe/")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorBody = test::read_body_json(resp).await;
        assert!(error.detail.starts_with("Error calling transcription API"));
    }

    #[actix_web::test]
    async fn unknown_paths_fall_back_to_the_entry_point() {
        let site = web::Data::new(StaticSite::new(static_site_dir()));
        let app = test::init_service(
            App::new()
                .app_data(site)
                .route("/", web::get().to(serve_index))
                .default_service(web::get().to(serve_index)),
        )
        .await;

        let index = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/").to_request(),
        )
        .await;
        let fallback = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/history/42").to_request(),
        )
        .await;

        assert_eq!(index, fallback);
        assert_eq!(index, "<html>entry point</html>".as_bytes());
    }

    #[actix_web::test]
    async fn assets_are_served_from_the_static_dir() {
        let site = web::Data::new(StaticSite::new(static_site_dir()));
        let assets_dir = site.assets.clone();
        let app = test::init_service(
            App::new()
                .app_data(site)
                .service(Files::new("/assets", assets_dir))
                .default_service(web::get().to(serve_index)),
        )
        .await;

        let body = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/assets/app.css").to_request(),
        )
        .await;
        assert_eq!(body, "body { margin: 0; }".as_bytes());
    }

    #[actix_web::test]
    async fn health_check_reports_ok() {
        let app = test::init_service(App::new().service(health_check)).await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/v1/health").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
    }

    #[::core::prelude::v1::test]
    fn correct_flag_parsing() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("maybe"));
    }
}
