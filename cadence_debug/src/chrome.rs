// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each root gets its own track (`tid` = root id + 1; track 0 is the loop
//! itself), and every render also emits a `frames` counter so credit drain is
//! visible as a graph.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use cadence_core::root::RootId;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted from seconds to microseconds. Events that carry
/// no timestamp of their own (invalidations, transitions) are placed at the
/// most recent timestamp seen.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::TickBegin(e) => {
                last_ts = seconds_to_us(e.timestamp);
                events.push(json!({
                    "ph": "i",
                    "name": "Tick",
                    "cat": "Loop",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "tick_index": e.tick_index,
                    }
                }));
            }
            RecordedEvent::Effects(e) => {
                last_ts = seconds_to_us(e.timestamp);
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}Effects", e.phase),
                    "cat": "Effects",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "invoked": e.invoked,
                    }
                }));
            }
            RecordedEvent::RootRender(e) => {
                last_ts = seconds_to_us(e.timestamp);
                let tid = track(e.root);
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.source),
                    "cat": "Render",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "frameloop": format!("{:?}", e.frameloop),
                        "delta_ms": e.delta * 1000.0,
                        "subscribers": e.subscribers,
                        "drew": e.drew,
                        "credit": e.credit,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "frames",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": tid,
                    "args": {
                        format!("root {tid}"): e.frames_remaining,
                    }
                }));
            }
            RecordedEvent::Invalidate(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Invalidate",
                    "cat": "Loop",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": track(e.root),
                    "s": "t",
                    "args": {
                        "frames": e.frames,
                        "woke": e.woke,
                    }
                }));
            }
            RecordedEvent::Transition(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.to),
                    "cat": "Loop",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "tick_index": e.tick_index,
                        "from": format!("{:?}", e.from),
                        "cause": format!("{:?}", e.cause),
                    }
                }));
            }
            RecordedEvent::Advance(e) => {
                last_ts = seconds_to_us(e.timestamp);
                events.push(json!({
                    "ph": "i",
                    "name": "Advance",
                    "cat": "Loop",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "roots": e.roots,
                        "global_effects": e.global_effects,
                    }
                }));
            }
            RecordedEvent::TickSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "TickSummary",
                    "cat": "Summary",
                    "ts": seconds_to_us(s.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "tick_index": s.tick_index,
                        "roots_seen": s.roots_seen,
                        "roots_rendered": s.roots_rendered,
                        "draws": s.draws,
                        "subscribers": s.subscribers,
                        "repeat": s.repeat,
                        "dormant": s.dormant,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn seconds_to_us(seconds: f64) -> f64 {
    seconds * 1_000_000.0
}

fn track(root: Option<RootId>) -> u64 {
    root.map_or(0, |id| u64::from(id.0) + 1)
}
