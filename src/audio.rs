use std::io::Cursor;
use std::path::Path;

use log::{debug, info, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Container formats the transcription API accepts as-is. Anything else is
/// transcoded to wav before upload.
pub const ACCEPTED_FORMATS: &[&str] = &["wav", "mp3", "pcm", "opus", "webm"];

pub const WAV_CONTENT_TYPE: &str = "audio/wav";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// An upload guaranteed to be in one of the accepted container formats,
/// either unchanged or re-encoded as wav.
#[derive(Debug)]
pub struct NormalizedAudio {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("unrecognized audio container: {0}")]
    Probe(String),
    #[error("no audio track found")]
    NoTrack,
    #[error("audio decoding failed: {0}")]
    Decode(String),
    #[error("wav encoding failed: {0}")]
    Encode(String),
}

/// Returns the upload unchanged when its extension is already accepted,
/// otherwise decodes it and re-encodes the same samples into a wav container.
pub fn normalize(
    bytes: Vec<u8>,
    filename: &str,
    declared_type: Option<&str>,
) -> Result<NormalizedAudio, NormalizeError> {
    let extension = extension_of(filename);

    if let Some(ext) = extension.as_deref() {
        if ACCEPTED_FORMATS.contains(&ext) {
            debug!("Format '{ext}' accepted, passing upload through unchanged");
            return Ok(NormalizedAudio {
                bytes,
                filename: filename.to_string(),
                content_type: declared_type.unwrap_or(FALLBACK_CONTENT_TYPE).to_string(),
            });
        }
    }

    info!(
        "Unsupported format '{}', converting to wav",
        extension.as_deref().unwrap_or("<none>")
    );

    let decoded = decode(&bytes, extension.as_deref())?;
    let wav_bytes = encode_wav(&decoded)?;

    debug!(
        "Conversion to wav successful: {} frames, {}Hz, {} channels",
        decoded.samples.len() / decoded.channels as usize,
        decoded.sample_rate,
        decoded.channels
    );

    Ok(NormalizedAudio {
        bytes: wav_bytes,
        filename: wav_filename(filename),
        content_type: WAV_CONTENT_TYPE.to_string(),
    })
}

struct DecodedAudio {
    /// Interleaved samples, channel layout preserved from the source.
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

fn decode(bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio, NormalizeError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| NormalizeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format.default_track().ok_or(NormalizeError::NoTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| NormalizeError::Decode(format!("codec: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut signal: Option<(u32, u16)> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(NormalizeError::Decode(format!("packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                warn!("Skipping corrupt audio frame: {e}");
                continue;
            }
            Err(e) => return Err(NormalizeError::Decode(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        signal.get_or_insert((spec.rate, spec.channels.count() as u16));

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    let (sample_rate, channels) = signal
        .filter(|_| !samples.is_empty())
        .ok_or_else(|| NormalizeError::Decode("no audio samples decoded".to_string()))?;

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

fn encode_wav(audio: &DecodedAudio) -> Result<Vec<u8>, NormalizeError> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;

    for &sample in &audio.samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    }

    writer
        .finalize()
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;

    Ok(cursor.into_inner())
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Replaces the final extension with `.wav`; a name without one gains it.
fn wav_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.wav"),
        _ => format!("{filename}.wav"),
    }
}
