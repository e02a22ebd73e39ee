//! Stream selection by requested format and quality

use crate::extractor::models::{Format, MediaFormat, Quality};
use std::cmp::Ordering;

/// Pick the stream matching `media` and `quality`, or `None` when nothing fits.
///
/// `mp4` only considers progressive streams (audio and video muxed upstream),
/// preferring the mp4 container. `mp3` considers audio-only streams.
pub fn select_format(formats: &[Format], media: MediaFormat, quality: Quality) -> Option<&Format> {
    match media {
        MediaFormat::Mp4 => {
            let progressive: Vec<&Format> = formats.iter().filter(|f| f.is_progressive()).collect();
            let mp4: Vec<&Format> = progressive
                .iter()
                .copied()
                .filter(|f| f.ext.eq_ignore_ascii_case("mp4"))
                .collect();
            let pool = if mp4.is_empty() { progressive } else { mp4 };
            pick(pool, quality, compare_video)
        }
        MediaFormat::Mp3 => {
            let audio: Vec<&Format> = formats.iter().filter(|f| f.is_audio_only()).collect();
            pick(audio, quality, compare_audio)
        }
    }
}

fn pick<'a, F>(pool: Vec<&'a Format>, quality: Quality, cmp: F) -> Option<&'a Format>
where
    F: Fn(&&'a Format, &&'a Format) -> Ordering,
{
    match quality {
        Quality::Highest => pool.into_iter().max_by(cmp),
        Quality::Lowest => pool.into_iter().min_by(cmp),
    }
}

fn compare_video(a: &&Format, b: &&Format) -> Ordering {
    a.height
        .unwrap_or(0)
        .cmp(&b.height.unwrap_or(0))
        .then_with(|| cmp_f32(a.tbr, b.tbr))
}

fn compare_audio(a: &&Format, b: &&Format) -> Ordering {
    cmp_f32(a.abr.or(a.tbr), b.abr.or(b.tbr))
}

fn cmp_f32(a: Option<f32>, b: Option<f32>) -> Ordering {
    a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0))
}
