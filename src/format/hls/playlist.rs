use super::segment::{MediaChunk, SlidingWindow};
use chrono::SecondsFormat;
use std::fmt::Write;

/// Renders the LL-HLS media playlist for the current window snapshot.
///
/// Pure function of the window and the configured part target: rendering
/// twice without intervening ingestion yields byte-identical output.
///
/// Sealed partials appear as `EXT-X-PART` lines, the open partial as an
/// `EXT-X-PRELOAD-HINT`; only sealed segments get an `EXTINF` and a
/// whole-segment fetch reference.
pub fn render_playlist(window: &SlidingWindow, part_target: f64) -> String {
    let target_duration = window
        .iter()
        .filter_map(|(_, s)| s.duration())
        .fold(0.0f64, f64::max)
        .ceil()
        .max(1.0) as u64;

    let mut out = String::new();
    out.push_str("#EXTM3U\n");
    out.push_str("#EXT-X-VERSION:6\n");
    let _ = writeln!(out, "#EXT-X-TARGETDURATION:{}", target_duration);
    let _ = writeln!(out, "#EXT-X-PART-INF:PART-TARGET={:.3}", part_target);
    let _ = writeln!(
        out,
        "#EXT-X-SERVER-CONTROL:CAN-BLOCK-RELOAD=YES,PART-HOLD-BACK={:.3}",
        part_target * 3.0
    );
    let _ = writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", window.begin_msn());

    for (msn, segment) in window.iter() {
        let _ = writeln!(
            out,
            "#EXT-X-PROGRAM-DATE-TIME:{}",
            segment
                .created_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        for (index, partial) in segment.partials().iter().enumerate() {
            let independent = if partial.independent() {
                ",INDEPENDENT=YES"
            } else {
                ""
            };
            match partial.duration() {
                Some(duration) => {
                    let _ = writeln!(
                        out,
                        "#EXT-X-PART:DURATION={:.3},URI=\"part?msn={}&part={}\"{}",
                        duration, msn, index, independent
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "#EXT-X-PRELOAD-HINT:TYPE=PART,URI=\"part?msn={}&part={}\"{}",
                        msn, index, independent
                    );
                }
            }
        }

        if segment.is_sealed() {
            let _ = writeln!(out, "#EXTINF:{:.3}", segment.extinf_duration());
            let _ = writeln!(out, "segment?msn={}", msn);
        }
    }

    out
}
