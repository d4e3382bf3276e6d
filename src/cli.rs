use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sensescribe",
    about = "Sensescribe - Audio Transcription & Correction Backend",
    long_about = "A backend service that transcribes uploaded audio through the SiliconFlow \
                  SenseVoice API and optionally cleans the transcript up with an LLM, while \
                  serving the prebuilt web frontend.",
    after_help = "EXAMPLES:\n    # Start the backend (requires SILICON_FLOW_API_KEY and LLM_API_KEY)\n    sensescribe serve\n\n    # Serve on all interfaces with a custom frontend bundle\n    sensescribe serve --host 0.0.0.0 --port 9000 --static-dir dist\n\n    # Transcribe a file against a running server\n    sensescribe file my_recording.m4a\n\n    # Transcribe and let the LLM clean the transcript up\n    sensescribe file my_recording.m4a --correct"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "serve")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,

        /// Directory holding the prebuilt frontend bundle
        #[arg(long, default_value = "static")]
        static_dir: PathBuf,
    },
    #[command(name = "file")]
    TranscribeFile {
        audio_file: PathBuf,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        /// Ask the server to run LLM correction on the transcript
        #[arg(long)]
        correct: bool,
    },
}
