//! Track command - replay a path animation headlessly.
//!
//! Frames are delivered by a [`ManualFrameScheduler`] at a fixed frame rate
//! against an in-memory map, so the printed trajectory is exactly what a
//! host rendering at that rate would show.

use std::path::PathBuf;
use std::sync::Arc;

use mapmotion::animation::{ManualFrameScheduler, TrackAnimator, TrackHandle, TrackOptions};
use mapmotion::config::ConfigFile;
use mapmotion::coord::Coord;
use mapmotion::map::MemoryMap;
use mapmotion::MotionError;
use tracing::info;

use super::common::read_path;
use crate::error::CliError;

/// Upper bound on replayed frames, guarding against absurd rates.
const MAX_FRAMES: usize = 1_000_000;

/// Arguments for the track command.
pub struct TrackArgs {
    pub path: PathBuf,
    pub duration_ms: Option<u64>,
    pub fps: u32,
    pub laps: u64,
    pub trail: bool,
    pub rotate: bool,
    pub json: bool,
}

/// One replayed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub frame: usize,
    pub time_ms: f64,
    pub lap: u64,
    pub progress: f64,
    pub segment: usize,
    pub position: Coord,
    /// Heading of the current segment in degrees, counter-clockwise from +x.
    pub heading_deg: f64,
}

/// Run the track command.
pub fn run(args: TrackArgs, config: &ConfigFile) -> Result<(), CliError> {
    let coords = read_path(&args.path)?;
    let options = track_options(&args, config);
    info!(
        points = coords.len(),
        duration_ms = options.duration_ms,
        fps = args.fps,
        laps = args.laps,
        "Replaying track"
    );

    let records = replay(&coords, options, args.fps, args.laps)?;
    if args.json {
        let value: Vec<serde_json::Value> = records.iter().map(record_json).collect();
        println!("{}", serde_json::Value::Array(value));
    } else {
        println!(
            "{:>6}  {:>10}  {:>4}  {:>8}  {:>4}  {:>14}  {:>14}  {:>8}",
            "frame", "t_ms", "lap", "progress", "seg", "x", "y", "heading"
        );
        for r in &records {
            println!(
                "{:>6}  {:>10.1}  {:>4}  {:>8.4}  {:>4}  {:>14.4}  {:>14.4}  {:>8.2}",
                r.frame,
                r.time_ms,
                r.lap,
                r.progress,
                r.segment,
                r.position.x,
                r.position.y,
                r.heading_deg
            );
        }
    }
    Ok(())
}

/// Config values overridden by command-line flags.
fn track_options(args: &TrackArgs, config: &ConfigFile) -> TrackOptions {
    let mut options = config.track_options();
    if let Some(duration_ms) = args.duration_ms {
        options.duration_ms = duration_ms;
    }
    options.show_trailing_path |= args.trail;
    options.auto_rotate_marker |= args.rotate;
    options.looping = args.laps > 1;
    options
}

/// Replays an animation frame by frame until it finishes or `laps` laps
/// have completed.
pub fn replay(
    coords: &[Coord],
    options: TrackOptions,
    fps: u32,
    laps: u64,
) -> Result<Vec<FrameRecord>, CliError> {
    if fps == 0 {
        return Err(MotionError::invalid("frame rate must be positive").into());
    }
    let frame_ms = 1000.0 / f64::from(fps);
    let map = Arc::new(MemoryMap::default());
    let scheduler = Arc::new(ManualFrameScheduler::new());
    let handle = TrackAnimator::new(scheduler.clone())
        .with_map(map)
        .with_options(options)
        .start(coords)?;

    let mut records = Vec::new();
    if scheduler.pending() == 0 {
        // Static marker: a single frame describes the whole run.
        records.push(record(0, 0.0, &handle, coords));
        return Ok(records);
    }

    let mut frame = 0;
    while scheduler.pending() > 0 && frame < MAX_FRAMES {
        let time_ms = frame as f64 * frame_ms;
        let lap = handle.laps();
        scheduler.run_frame(time_ms);
        records.push(FrameRecord {
            lap,
            ..record(frame, time_ms, &handle, coords)
        });
        frame += 1;
        if handle.laps() >= laps {
            break;
        }
    }
    handle.stop();
    Ok(records)
}

fn record(frame: usize, time_ms: f64, handle: &TrackHandle, coords: &[Coord]) -> FrameRecord {
    let segment = handle.segment_index();
    let position = handle.current_position().unwrap_or(coords[0]);
    let heading_deg = match (coords.get(segment), coords.get(segment + 1)) {
        (Some(from), Some(to)) => from.heading_to(*to).to_degrees(),
        _ => 0.0,
    };
    FrameRecord {
        frame,
        time_ms,
        lap: handle.laps(),
        progress: handle.progress(),
        segment,
        position,
        heading_deg,
    }
}

fn record_json(r: &FrameRecord) -> serde_json::Value {
    serde_json::json!({
        "frame": r.frame,
        "t_ms": r.time_ms,
        "lap": r.lap,
        "progress": r.progress,
        "segment": r.segment,
        "position": r.position,
        "heading_deg": r.heading_deg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_path() -> Vec<Coord> {
        vec![
            Coord::new(0.0, 0.0),
            Coord::new(10.0, 0.0),
            Coord::new(10.0, 10.0),
        ]
    }

    fn options(duration_ms: u64) -> TrackOptions {
        TrackOptions {
            duration_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_replay_four_fps() {
        let records = replay(&l_path(), options(1000), 4, 1).unwrap();

        // 0, 250, 500, 750 and 1000 ms.
        assert_eq!(records.len(), 5);
        assert_eq!(records[1].position, Coord::new(5.0, 0.0));
        assert_eq!(records[1].heading_deg, 0.0);
        assert_eq!(records[3].position, Coord::new(10.0, 5.0));
        assert!((records[3].heading_deg - 90.0).abs() < 1e-9);
        assert_eq!(records[4].position, Coord::new(10.0, 10.0));
        assert_eq!(records[4].progress, 1.0);
    }

    #[test]
    fn test_replay_laps() {
        let records = replay(&l_path(), options(100), 10, 3).unwrap();

        // Each lap renders frames at 0 and 100 ms after its start.
        let last = records.last().unwrap();
        assert_eq!(last.lap, 2);
        assert_eq!(last.position, Coord::new(10.0, 10.0));
        assert!(records.iter().any(|r| r.lap == 1));
    }

    #[test]
    fn test_replay_single_point() {
        let records = replay(&[Coord::new(3.0, 4.0)], options(1000), 60, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, Coord::new(3.0, 4.0));
        assert_eq!(records[0].progress, 1.0);
    }

    #[test]
    fn test_replay_rejects_zero_fps() {
        assert!(replay(&l_path(), options(1000), 0, 1).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = TrackArgs {
            path: PathBuf::from("route.json"),
            duration_ms: Some(500),
            fps: 30,
            laps: 2,
            trail: true,
            rotate: true,
            json: false,
        };
        let mut config = ConfigFile::default();
        config.animation.show_trailing_path = false;

        let options = track_options(&args, &config);
        assert_eq!(options.duration_ms, 500);
        assert!(options.show_trailing_path);
        assert!(options.auto_rotate_marker);
        assert!(options.looping);
    }
}
