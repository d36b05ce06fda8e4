//! YouTube caption-track transcripts.
//!
//! The watch page embeds a `"captionTracks"` list in its player config. Each
//! track has a `baseUrl` serving timed-text XML; the transcript is the text of
//! every `<text>` cue, one cue per line.

use scraper::{Html, Selector};
use serde::Deserialize;

use crate::fetch::html::{fragment_text, truncate};

const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

/// Watch page URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// One caption track advertised by the watch page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Caption tracks listed in a watch page, in page order.
pub fn caption_tracks(watch_html: &str) -> Vec<CaptionTrack> {
    let Some(start) = watch_html.find(CAPTION_TRACKS_KEY) else {
        return Vec::new();
    };
    let rest = &watch_html[start + CAPTION_TRACKS_KEY.len()..];

    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .and_then(|r| r.ok())
        .unwrap_or_default()
}

/// Pick a track: the first preferred language with a manual track, then with
/// a generated one, then whatever the page lists first.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    let matches = |t: &CaptionTrack, lang: &str| {
        t.language_code == lang || t.language_code.starts_with(&format!("{}-", lang))
    };

    languages
        .iter()
        .find_map(|lang| {
            tracks
                .iter()
                .find(|t| matches(t, lang) && !t.is_generated())
                .or_else(|| tracks.iter().find(|t| matches(t, lang)))
        })
        .or_else(|| tracks.first())
}

/// Plain text of a timed-text document, one cue per line, cut to `limit` chars.
///
/// Cue text is escaped twice by the server, so it is decoded twice.
pub fn format_transcript(xml: &str, limit: usize) -> String {
    let Ok(cue) = Selector::parse("text") else {
        return String::new();
    };

    let lines: Vec<String> = Html::parse_fragment(xml)
        .select(&cue)
        .map(|el| {
            let once: String = el.text().collect();
            fragment_text(&once).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    truncate(&lines.join("\n"), limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?lang={}", lang),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    fn langs() -> Vec<String> {
        vec!["ko".to_string(), "en".to_string()]
    }

    #[test]
    fn test_caption_tracks_from_player_config() {
        let html = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","name":{"runs":[{"text":"English"}]},"languageCode":"en","kind":"asr"}],"audioTracks":[]}}};</script>"#;
        let tracks = caption_tracks(html);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");
        assert_eq!(tracks[0].base_url, "https://www.youtube.com/api/timedtext?v=abc&lang=en");
        assert!(tracks[0].is_generated());
    }

    #[test]
    fn test_no_captions() {
        assert!(caption_tracks("<html>no player</html>").is_empty());
    }

    #[test]
    fn test_select_prefers_language_order_then_manual() {
        let tracks = vec![track("en", None), track("ko", Some("asr")), track("ko", None)];
        let chosen = select_track(&tracks, &langs()).unwrap();
        assert_eq!(chosen.language_code, "ko");
        assert!(!chosen.is_generated());
    }

    #[test]
    fn test_select_regional_and_fallback() {
        let regional = vec![track("de", None), track("en-US", None)];
        assert_eq!(select_track(&regional, &langs()).unwrap().language_code, "en-US");

        let other = vec![track("fr", None)];
        assert_eq!(select_track(&other, &langs()).unwrap().language_code, "fr");
        assert!(select_track(&[], &langs()).is_none());
    }

    #[test]
    fn test_format_transcript() {
        let xml = r##"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.0" dur="1.2">Hello &amp;amp; welcome</text>
            <text start="1.2" dur="2.0">it&amp;#39;s <font color="#fff">great</font></text>
            <text start="3.2" dur="1.0"></text>
        </transcript>"##;

        assert_eq!(format_transcript(xml, 1000), "Hello & welcome\nit's great");
        assert_eq!(format_transcript(xml, 5), "Hello");
    }
}
