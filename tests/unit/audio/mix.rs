use super::*;
use std::sync::Arc;

fn manifest(segments: Vec<AudioSegment>, total: u64) -> AudioManifest {
    AudioManifest {
        sample_rate: 100,
        channels: 2,
        total_samples: total,
        segments,
    }
}

fn seg(start: u64, end: u64, rate: f64, pcm: Vec<f32>) -> AudioSegment {
    AudioSegment {
        timeline_start_sample: start,
        timeline_end_sample: end,
        source_start_sec: 0.0,
        playback_rate: rate,
        volume: 1.0,
        source_sample_rate: 100,
        source_channels: 2,
        source_interleaved_f32: Arc::new(pcm),
    }
}

#[test]
fn frame_to_sample_uses_rational_fps() {
    let fps = Fps {
        num: 30_000,
        den: 1001,
    };
    assert_eq!(frame_to_sample(0, fps, 48_000), 0);
    assert_eq!(frame_to_sample(30_000, fps, 48_000), 48_048_000);
    assert_eq!(frame_to_sample(90, Fps { num: 30, den: 1 }, 48_000), 144_000);
}

#[test]
fn segments_land_at_their_timeline_offset() {
    let m = manifest(vec![seg(5, 10, 1.0, vec![0.5; 20])], 20);
    let out = mix_manifest(&m);
    assert_eq!(out.len(), 40);
    assert_eq!(out[8], 0.0);
    assert_eq!(out[10], 0.5);
    assert_eq!(out[19], 0.5);
    assert_eq!(out[20], 0.0);
}

#[test]
fn double_rate_reads_source_twice_as_fast() {
    // left channel ramps 0,1,2,...
    let pcm: Vec<f32> = (0..20).flat_map(|i| [i as f32 / 100.0, 0.0]).collect();
    let m = manifest(vec![seg(0, 5, 2.0, pcm)], 5);
    let out = mix_manifest(&m);
    assert!((out[2] - 0.02).abs() < 1e-6);
    assert!((out[8] - 0.08).abs() < 1e-6);
}

#[test]
fn overlapping_segments_sum_and_clamp() {
    let m = manifest(
        vec![seg(0, 4, 1.0, vec![0.7; 8]), seg(0, 4, 1.0, vec![0.7; 8])],
        4,
    );
    assert!(mix_manifest(&m).iter().all(|&s| s == 1.0));
}

#[test]
fn f32le_file_round_trips() {
    let path = std::env::temp_dir().join(format!("framecut_mix_{}.f32le", std::process::id()));
    write_mix_to_f32le_file(&[0.25, -0.5], &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), -0.5);
    let _ = std::fs::remove_file(path);
}
