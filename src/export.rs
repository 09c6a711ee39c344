//! Host event export shaping (§6). Pure data transforms — no file I/O.

use serde::Serialize;

use crate::types::{AudioBuffer, DetectedEvent, DetectedEventType};

#[derive(Serialize)]
struct ExportMetadata {
    #[serde(rename = "sampleRate")]
    sample_rate: u32,
    channels: usize,
    #[serde(rename = "frameCount")]
    frame_count: usize,
}

#[derive(Serialize)]
struct ExportEvent {
    index: usize,
    frame: usize,
    #[serde(rename = "timeSeconds")]
    time_seconds: f64,
    #[serde(rename = "type")]
    kind: &'static str,
    strength: f32,
}

#[derive(Serialize)]
struct ExportDocument {
    metadata: ExportMetadata,
    events: Vec<ExportEvent>,
}

fn type_name(kind: DetectedEventType) -> &'static str {
    match kind {
        DetectedEventType::Decrackle => "decrackle",
        DetectedEventType::Click => "click",
        DetectedEventType::Pop => "pop",
    }
}

fn to_export_events(events: &[DetectedEvent], sample_rate: u32) -> Vec<ExportEvent> {
    events
        .iter()
        .enumerate()
        .map(|(index, event)| ExportEvent {
            index,
            frame: event.frame,
            time_seconds: event.frame as f64 / sample_rate as f64,
            kind: type_name(event.kind),
            strength: event.strength,
        })
        .collect()
}

/// Serialize the detected events and buffer shape to the host JSON shape.
pub fn to_json(buffer: &AudioBuffer, events: &[DetectedEvent]) -> serde_json::Result<String> {
    let document = ExportDocument {
        metadata: ExportMetadata {
            sample_rate: buffer.sample_rate(),
            channels: buffer.channels(),
            frame_count: buffer.frame_count(),
        },
        events: to_export_events(events, buffer.sample_rate()),
    };
    serde_json::to_string_pretty(&document)
}

fn format_timecode(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as i64;
    let ms = total_ms % 1000;
    let total_seconds = total_ms / 1000;
    let s = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let m = total_minutes % 60;
    let h = total_minutes / 60;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Render the detected events and buffer shape as a CSV string.
pub fn to_csv(buffer: &AudioBuffer, events: &[DetectedEvent]) -> String {
    let sample_rate = buffer.sample_rate();
    let mut out = String::from("Index,Timecode,Seconds,Frame,Type,Strength,SampleRate,Channels\n");

    for (index, event) in events.iter().enumerate() {
        let seconds = event.frame as f64 / sample_rate as f64;
        out.push_str(&format!(
            "{},{},{:.6},{},{},{:.6},{},{}\n",
            index,
            format_timecode(seconds),
            seconds,
            event.frame,
            type_name(event.kind),
            event.strength,
            sample_rate,
            buffer.channels(),
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_event_count() {
        let buf = AudioBuffer::new(vec![0.0; 44_100], 1, 44_100).unwrap();
        let events = vec![DetectedEvent {
            frame: 22_050,
            kind: DetectedEventType::Click,
            strength: 0.5,
        }];
        let json = to_json(&buf, &events).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["events"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["metadata"]["sampleRate"], 44_100);
    }

    #[test]
    fn csv_has_header_and_one_row_per_event() {
        let buf = AudioBuffer::new(vec![0.0; 100], 1, 44_100).unwrap();
        let events = vec![
            DetectedEvent { frame: 0, kind: DetectedEventType::Pop, strength: 0.2 },
            DetectedEvent { frame: 50, kind: DetectedEventType::Decrackle, strength: 0.1 },
        ];
        let csv = to_csv(&buf, &events);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Index,Timecode,Seconds,Frame,Type,Strength"));
    }

    #[test]
    fn empty_events_produce_header_only() {
        let buf = AudioBuffer::new(vec![0.0; 10], 1, 44_100).unwrap();
        let csv = to_csv(&buf, &[]);
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn timecode_formats_hours_minutes_seconds_millis() {
        assert_eq!(format_timecode(3661.5), "01:01:01.500");
    }
}
