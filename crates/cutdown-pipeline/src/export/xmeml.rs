//! FCP7 XMEML v5 export.

use cutdown_models::{to_frames, EditList};

/// Escape text for XML element content.
fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// One take converted to sequence frame numbers.
struct FrameSpan {
    segment_index: usize,
    src_in: i64,
    src_out: i64,
    start: i64,
    end: i64,
}

/// Convert the edit timeline into frame spans plus the total sequence
/// length. The sequence length is the running end of the last span, not a
/// re-rounding of the summed seconds.
fn frame_spans(edit: &EditList, fps: u32) -> (Vec<FrameSpan>, i64) {
    let mut spans = Vec::with_capacity(edit.timeline.len());
    let mut running = 0_i64;
    for entry in &edit.timeline {
        let src_in = to_frames(entry.source_start, fps);
        let src_out = to_frames(entry.source_end, fps);
        let span = src_out - src_in;
        spans.push(FrameSpan {
            segment_index: entry.segment_index,
            src_in,
            src_out,
            start: running,
            end: running + span,
        });
        running += span;
    }
    (spans, running)
}

/// Build the XMEML document.
///
/// A video track is present iff the source extension is video-like; the
/// audio track always is. Every clipitem's `<duration>` carries the total
/// sequence frame count, a quirk kept for compatibility with older NLE
/// importers. The source is declared once as `file-1` on the first
/// clipitem and referenced by id everywhere else.
pub fn build_xmeml(edit: &EditList, source_name: &str, has_video: bool, fps: u32) -> String {
    let (spans, total_frames) = frame_spans(edit, fps);
    let name = xml_escape(source_name);

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE xmeml>\n");
    out.push_str("<xmeml version=\"5\">\n");
    out.push_str("  <sequence id=\"sequence-1\">\n");
    out.push_str(&format!("    <name>{} cut</name>\n", name));
    out.push_str(&format!("    <duration>{}</duration>\n", total_frames));
    out.push_str(&format!(
        "    <rate>\n      <timebase>{}</timebase>\n      <ntsc>FALSE</ntsc>\n    </rate>\n",
        fps
    ));
    out.push_str("    <media>\n");

    let mut clipitem_id = 0;
    let mut file_declared = false;

    if has_video {
        out.push_str("      <video>\n");
        out.push_str("        <format>\n          <samplecharacteristics>\n");
        out.push_str("            <width>1920</width>\n            <height>1080</height>\n");
        out.push_str("          </samplecharacteristics>\n        </format>\n");
        out.push_str("        <track>\n");
        for span in &spans {
            clipitem_id += 1;
            out.push_str(&clipitem(
                span,
                clipitem_id,
                total_frames,
                fps,
                &name,
                has_video,
                &mut file_declared,
            ));
        }
        out.push_str("        </track>\n");
        out.push_str("      </video>\n");
    }

    out.push_str("      <audio>\n");
    out.push_str("        <track>\n");
    for span in &spans {
        clipitem_id += 1;
        out.push_str(&clipitem(
            span,
            clipitem_id,
            total_frames,
            fps,
            &name,
            has_video,
            &mut file_declared,
        ));
    }
    out.push_str("        </track>\n");
    out.push_str("      </audio>\n");

    out.push_str("    </media>\n");
    out.push_str("  </sequence>\n");
    out.push_str("</xmeml>\n");
    out
}

fn clipitem(
    span: &FrameSpan,
    clipitem_id: usize,
    total_frames: i64,
    fps: u32,
    source_name: &str,
    has_video: bool,
    file_declared: &mut bool,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "          <clipitem id=\"clipitem-{}\">\n",
        clipitem_id
    ));
    out.push_str(&format!(
        "            <name>Take {}</name>\n",
        span.segment_index
    ));
    out.push_str("            <enabled>TRUE</enabled>\n");
    out.push_str(&format!(
        "            <duration>{}</duration>\n",
        total_frames
    ));
    out.push_str(&format!(
        "            <rate>\n              <timebase>{}</timebase>\n              <ntsc>FALSE</ntsc>\n            </rate>\n",
        fps
    ));
    out.push_str(&format!("            <in>{}</in>", span.src_in));
    out.push_str(&format!("<out>{}</out>", span.src_out));
    out.push_str(&format!("<start>{}</start>", span.start));
    out.push_str(&format!("<end>{}</end>\n", span.end));

    if *file_declared {
        out.push_str("            <file id=\"file-1\"/>\n");
    } else {
        *file_declared = true;
        out.push_str("            <file id=\"file-1\">\n");
        out.push_str(&format!("              <name>{}</name>\n", source_name));
        out.push_str(&format!(
            "              <pathurl>file://{}</pathurl>\n",
            source_name
        ));
        out.push_str(&format!(
            "              <rate>\n                <timebase>{}</timebase>\n                <ntsc>FALSE</ntsc>\n              </rate>\n",
            fps
        ));
        out.push_str("              <media>\n");
        if has_video {
            out.push_str("                <video>\n                  <samplecharacteristics>\n");
            out.push_str("                    <width>1920</width>\n                    <height>1080</height>\n");
            out.push_str("                  </samplecharacteristics>\n                </video>\n");
        }
        out.push_str("                <audio>\n                  <samplecharacteristics>\n");
        out.push_str("                    <samplerate>48000</samplerate>\n                    <depth>16</depth>\n");
        out.push_str("                  </samplecharacteristics>\n                </audio>\n");
        out.push_str("              </media>\n");
        out.push_str("            </file>\n");
    }

    out.push_str("          </clipitem>\n");
    out
}
