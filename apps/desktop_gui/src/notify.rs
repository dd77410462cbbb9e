//! Message-arrival chime played through the default audio output.

use std::thread;
use std::time::Duration;

const TONE_A_HZ: f32 = 660.0;
const TONE_B_HZ: f32 = 880.0;
const TONE_SECONDS: f32 = 0.13;
const CHIME_GAIN: f32 = 0.2;

/// Total chime length in samples at the given output rate.
pub fn chime_length(sample_rate: u32) -> usize {
    (sample_rate as f32 * TONE_SECONDS) as usize * 2
}

/// Chime amplitude `index` samples into playback: two short rising tones,
/// each with a linear decay so the cutoff does not click.
pub fn chime_sample(index: usize, sample_rate: u32) -> f32 {
    let tone_len = (sample_rate as f32 * TONE_SECONDS) as usize;
    if tone_len == 0 || index >= tone_len * 2 {
        return 0.0;
    }
    let (freq, offset) = if index < tone_len {
        (TONE_A_HZ, index)
    } else {
        (TONE_B_HZ, index - tone_len)
    };
    let t = offset as f32 / sample_rate as f32;
    let envelope = 1.0 - offset as f32 / tone_len as f32;
    (t * freq * 2.0 * std::f32::consts::PI).sin() * envelope * CHIME_GAIN
}

/// Plays the chime on the caller's thread and blocks until it drains.
/// Meant to run on a worker thread; a missing output device is an `Err`
/// the caller can surface, never a panic.
pub fn play_chime_blocking() -> Result<(), String> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no default audio output device".to_string())?;
    let config = device
        .default_output_config()
        .map_err(|err| format!("failed to query output config: {err}"))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let total_samples = chime_length(sample_rate);

    let mut cursor = 0usize;
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_output_stream(
                &config.config(),
                move |data: &mut [f32], _| {
                    for frame in data.chunks_mut(channels) {
                        let value = chime_sample(cursor, sample_rate);
                        cursor += 1;
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                |_| {},
                None,
            )
            .map_err(|err| err.to_string())?,
        cpal::SampleFormat::I16 => device
            .build_output_stream(
                &config.config(),
                move |data: &mut [i16], _| {
                    for frame in data.chunks_mut(channels) {
                        let value = (chime_sample(cursor, sample_rate) * i16::MAX as f32) as i16;
                        cursor += 1;
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                |_| {},
                None,
            )
            .map_err(|err| err.to_string())?,
        cpal::SampleFormat::U16 => device
            .build_output_stream(
                &config.config(),
                move |data: &mut [u16], _| {
                    for frame in data.chunks_mut(channels) {
                        let value = chime_sample(cursor, sample_rate);
                        cursor += 1;
                        let scaled = ((value + 1.0) * 0.5 * f32::from(u16::MAX)) as u16;
                        for sample in frame.iter_mut() {
                            *sample = scaled;
                        }
                    }
                },
                |_| {},
                None,
            )
            .map_err(|err| err.to_string())?,
        other => return Err(format!("unsupported output sample format: {other:?}")),
    };

    stream.play().map_err(|err| err.to_string())?;
    // Keep the stream alive until the tail tone has drained.
    let playback = Duration::from_secs_f32(total_samples as f32 / sample_rate as f32)
        + Duration::from_millis(80);
    thread::sleep(playback);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_stays_within_gain_bound() {
        let sample_rate = 48_000;
        for index in 0..chime_length(sample_rate) {
            assert!(chime_sample(index, sample_rate).abs() <= CHIME_GAIN + f32::EPSILON);
        }
    }

    #[test]
    fn chime_is_audible_in_both_tones() {
        let sample_rate = 48_000;
        let tone_len = chime_length(sample_rate) / 2;
        let first_peak = (0..tone_len)
            .map(|i| chime_sample(i, sample_rate).abs())
            .fold(0.0f32, f32::max);
        let second_peak = (tone_len..tone_len * 2)
            .map(|i| chime_sample(i, sample_rate).abs())
            .fold(0.0f32, f32::max);
        assert!(first_peak > 0.05);
        assert!(second_peak > 0.05);
    }

    #[test]
    fn chime_ends_in_silence() {
        let sample_rate = 44_100;
        let total = chime_length(sample_rate);
        assert_eq!(chime_sample(total, sample_rate), 0.0);
        assert_eq!(chime_sample(total + 1000, sample_rate), 0.0);
    }

    #[test]
    fn chime_length_scales_with_sample_rate() {
        assert_eq!(chime_length(48_000), 2 * chime_length(24_000));
        assert_eq!(chime_length(0), 0);
    }
}
