//! Edit-decision exporters.
//!
//! Three formats over the same edit list: FCP7 XMEML v5, CMX3600 EDL, and
//! a structured JSON report. Frame math is shared through
//! `cutdown_models::timecode` so the two timecoded formats can never
//! disagree.

pub mod edl;
pub mod report;
pub mod xmeml;

pub use edl::build_edl;
pub use report::{build_report, CutReport};
pub use xmeml::build_xmeml;
