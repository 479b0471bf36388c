// src/core/decoder.rs
//
// Turning audio sources into mono 16-bit clips at the pipeline sample rate.
// Uses Symphonia for container decoding, rubato for rate conversion and hound
// for writing WAV files.

use log::{debug, info, warn};
use rubato::{FftFixedInOut, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{KwsError, Result};

const RESAMPLE_CHUNK: usize = 1024;

/// Mono signed 16-bit audio tagged with its sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Scale a 16-bit sample to [-1.0, 1.0)
pub fn sample_to_f64(sample: i16) -> f64 {
    sample as f64 / 32768.0
}

pub fn f64_to_sample(value: f64) -> i16 {
    (value * 32768.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Decode any container Symphonia understands into a mono clip at
/// `target_rate`. Multi-channel audio is averaged down to mono; other rates
/// are resampled.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<AudioClip> {
    let file = File::open(path).map_err(|e| {
        KwsError::invalid_input(format!("cannot open {}: {e}", path.display()))
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| {
            KwsError::invalid_input(format!("unsupported or corrupt audio {}: {e}", path.display()))
        })?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| KwsError::invalid_input(format!("no audio track in {}", path.display())))?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        KwsError::invalid_input(format!("{} does not specify a sample rate", path.display()))
    })?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| KwsError::invalid_input(format!("no decoder for {}: {e}", path.display())))?;

    let mut interleaved: Vec<i16> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;
    let mut channels: Option<usize> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => {
                return Err(KwsError::invalid_input(format!(
                    "failed reading {}: {e}",
                    path.display()
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("skipping undecodable packet in {}: {e}", path.display());
                continue;
            }
            Err(e) => {
                return Err(KwsError::invalid_input(format!(
                    "failed decoding {}: {e}",
                    path.display()
                )))
            }
        };

        if channels.is_none() {
            let count = decoded.spec().channels.count();
            if count == 0 {
                return Err(KwsError::invalid_input(format!(
                    "{} decodes to 0 audio channels",
                    path.display()
                )));
            }
            channels = Some(count);
        }

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    if interleaved.is_empty() {
        return Err(KwsError::invalid_input(format!(
            "no audio samples decoded from {}",
            path.display()
        )));
    }

    let mono = downmix_to_mono(&interleaved, channels.unwrap_or(1));
    let samples = if sample_rate != target_rate {
        debug!(
            "resampling {} from {} Hz to {} Hz",
            path.display(),
            sample_rate,
            target_rate
        );
        resample(&mono, sample_rate, target_rate)?
    } else {
        mono
    };

    Ok(AudioClip::new(samples, target_rate))
}

/// Average interleaved channels into one
pub fn downmix_to_mono(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Convert mono samples between rates, keeping `ceil(len * to / from)` output
/// samples aligned with the input (the resampler delay is trimmed).
pub fn resample(samples: &[i16], from: u32, to: u32) -> Result<Vec<i16>> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let input: Vec<f64> = samples.iter().map(|&s| sample_to_f64(s)).collect();
    let mut resampler = FftFixedInOut::<f64>::new(from as usize, to as usize, RESAMPLE_CHUNK, 1)
        .map_err(|e| KwsError::invalid_input(format!("cannot resample {from} Hz to {to} Hz: {e}")))?;

    let delay = resampler.output_delay();
    let expected = (input.len() as u64 * to as u64).div_ceil(from as u64) as usize;
    let mut output: Vec<f64> = Vec::with_capacity(expected + delay);

    let resample_err = |e: rubato::ResampleError| KwsError::invalid_input(format!("resampling failed: {e}"));

    let mut pos = 0;
    while pos < input.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(input.len());
        let chunk = &input[pos..end];
        let out = if chunk.len() == needed {
            resampler.process(&[chunk], None).map_err(resample_err)?
        } else {
            resampler.process_partial(Some(&[chunk][..]), None).map_err(resample_err)?
        };
        output.extend_from_slice(&out[0]);
        pos = end;
    }

    // Flush the filter tail until the delayed signal is fully out
    while output.len() < delay + expected {
        let out = resampler
            .process_partial(None::<&[Vec<f64>]>, None)
            .map_err(resample_err)?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    Ok(output
        .into_iter()
        .skip(delay)
        .take(expected)
        .map(f64_to_sample)
        .collect())
}

/// Reinterpret signed 16-bit little-endian PCM bytes as a mono clip
pub fn clip_from_pcm_bytes(bytes: &[u8], sample_rate: u32) -> Result<AudioClip> {
    if bytes.len() % 2 != 0 {
        return Err(KwsError::invalid_input(format!(
            "raw PCM stream has an odd byte count ({})",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    Ok(AudioClip::new(samples, sample_rate))
}

pub fn read_raw_file(path: &Path, sample_rate: u32) -> Result<AudioClip> {
    let bytes = std::fs::read(path)?;
    clip_from_pcm_bytes(&bytes, sample_rate)
}

/// Write a clip as a mono 16-bit PCM WAV file
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in &clip.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Convert every `*.raw` file in `raw_dir` into a WAV of the same stem in
/// `wav_dir`. Returns the written paths in sorted order.
pub fn convert_raw_dir(raw_dir: &Path, wav_dir: &Path, sample_rate: u32) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(wav_dir)?;

    let mut raw_files: Vec<PathBuf> = std::fs::read_dir(raw_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "raw"))
        .collect();
    raw_files.sort();

    let mut written = Vec::with_capacity(raw_files.len());
    for raw_path in raw_files {
        let clip = match read_raw_file(&raw_path, sample_rate) {
            Ok(clip) => clip,
            Err(e) => {
                warn!("Skip (unreadable raw file) {}: {e}", raw_path.display());
                continue;
            }
        };

        let stem = raw_path.file_stem().unwrap_or_default().to_string_lossy();
        let wav_path = wav_dir.join(format!("{stem}.wav"));
        write_wav(&wav_path, &clip)?;
        info!("Converted: {} -> {}", raw_path.display(), wav_path.display());
        written.push(wav_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_to_mono() {
        let interleaved = [100, -100, 300, 100, -32768, -32768];
        assert_eq!(downmix_to_mono(&interleaved, 2), vec![0, 200, -32768]);
        assert_eq!(downmix_to_mono(&interleaved, 1), interleaved.to_vec());
    }

    #[test]
    fn test_pcm_bytes_little_endian() {
        let clip = clip_from_pcm_bytes(&[0x01, 0x00, 0xff, 0xff, 0x00, 0x80], 16_000).unwrap();
        assert_eq!(clip.samples, vec![1, -1, i16::MIN]);
        assert_eq!(clip.sample_rate, 16_000);
    }

    #[test]
    fn test_pcm_odd_length_rejected() {
        let err = clip_from_pcm_bytes(&[0x01, 0x00, 0x02], 16_000).unwrap_err();
        assert!(matches!(err, KwsError::InvalidInput(_)));
    }

    #[test]
    fn test_sample_scaling() {
        assert_eq!(sample_to_f64(i16::MIN), -1.0);
        assert_eq!(f64_to_sample(sample_to_f64(1234)), 1234);
        assert_eq!(f64_to_sample(2.0), i16::MAX);
    }

    #[test]
    fn test_resample_length() {
        let input = vec![1000i16; 44_100];
        let out = resample(&input, 44_100, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
        // Settled DC level survives the conversion
        let mid = out[8_000] as i32;
        assert!((mid - 1000).abs() < 50, "mid sample {mid}");
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input: Vec<i16> = (0..100).collect();
        assert_eq!(resample(&input, 16_000, 16_000).unwrap(), input);
    }

    #[test]
    fn test_wav_roundtrip_through_symphonia() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let clip = AudioClip::new((0..800).map(|i| (i * 37 % 2000 - 1000) as i16).collect(), 16_000);

        write_wav(&path, &clip).unwrap();
        let decoded = decode_file(&path, 16_000).unwrap();
        assert_eq!(decoded, clip);
    }

    #[test]
    fn test_stereo_file_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..400i16 {
            writer.write_sample(i * 10).unwrap();
            writer.write_sample(-i * 6).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode_file(&path, 16_000).unwrap();
        assert_eq!(decoded.samples.len(), 400);
        let expected: Vec<i16> = (0..400i16).map(|i| i * 2).collect();
        assert_eq!(decoded.samples, expected);
    }

    #[test]
    fn test_decode_garbage_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"definitely not a wav file").unwrap();

        let err = decode_file(&path, 16_000).unwrap_err();
        assert!(matches!(err, KwsError::InvalidInput(_)));
    }

    #[test]
    fn test_convert_raw_dir() {
        let dir = tempfile::tempdir().unwrap();
        let raw_dir = dir.path().join("raw");
        let wav_dir = dir.path().join("wav");
        std::fs::create_dir_all(&raw_dir).unwrap();

        let bytes: Vec<u8> = [5i16, -5, 300].iter().flat_map(|s| s.to_le_bytes()).collect();
        std::fs::write(raw_dir.join("yes_001.raw"), &bytes).unwrap();
        std::fs::write(raw_dir.join("notes.txt"), b"ignored").unwrap();

        let written = convert_raw_dir(&raw_dir, &wav_dir, 16_000).unwrap();
        assert_eq!(written, vec![wav_dir.join("yes_001.wav")]);

        let decoded = decode_file(&written[0], 16_000).unwrap();
        assert_eq!(decoded.samples, vec![5, -5, 300]);
    }
}
