//! CMX3600 EDL export.

use cutdown_models::{edl_timecode, EditList};

/// Maximum transcript characters carried into an event comment.
const COMMENT_TEXT_CHARS: usize = 60;

/// Build the EDL document.
///
/// One event per kept take, each followed by the standard clip-name
/// comment and a take/score comment line.
pub fn build_edl(edit: &EditList, source_name: &str, has_video: bool, fps: u32) -> String {
    let track = if has_video { "AA/V" } else { "AA" };

    let mut out = String::new();
    out.push_str("TITLE: Silence Cutter Edit\n");
    out.push_str("FCM: NON-DROP FRAME\n\n");

    for (event, entry) in edit.timeline.iter().enumerate() {
        let src_in = edl_timecode(entry.source_start, fps);
        let src_out = edl_timecode(entry.source_end, fps);
        let rec_in = edl_timecode(entry.timeline_start, fps);
        let rec_out = edl_timecode(entry.timeline_end, fps);

        out.push_str(&format!(
            "{:03}  AX       {:<4}  C        {} {} {} {}\n",
            event + 1,
            track,
            src_in,
            src_out,
            rec_in,
            rec_out
        ));
        out.push_str(&format!("* FROM CLIP NAME: {}\n", source_name));

        let take = edit.best_takes.get(event);
        out.push_str(&format!(
            "* COMMENT: Take {} | Score: {} | {}\n\n",
            entry.segment_index,
            take.and_then(|t| t.ai_scores.as_ref())
                .map(|s| format!("{:.1}", s.overall))
                .unwrap_or_else(|| "N/A".to_string()),
            take.map(|t| truncate_chars(t.text(), COMMENT_TEXT_CHARS))
                .unwrap_or_default()
        ));
    }

    out
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
