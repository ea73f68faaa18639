use std::path::Path;
use std::sync::{Arc, Mutex};

use super::*;
use crate::assets::decoder::VideoFrameSource;
use crate::assets::media::{AudioPcm, MediaAsset};
use crate::effects::filter::FilterSpec;
use crate::foundation::core::{Affine, PixelSize};
use crate::orientation::OrientationInfo;
use crate::plan::{EditIntent, build_plan};
use crate::time::RationalTime;

struct SolidSource {
    size: PixelSize,
    color: [u8; 4],
    remaining: u64,
}

impl VideoFrameSource for SolidSource {
    fn next_frame(&mut self) -> FramecutResult<Option<Vec<u8>>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(self.color.repeat(self.size.rgba_len() / 4)))
    }
}

struct SolidDecoder {
    color: [u8; 4],
    limit: Option<u64>,
}

impl MediaDecoder for SolidDecoder {
    fn open_video(&self, req: &VideoDecodeRequest) -> FramecutResult<Box<dyn VideoFrameSource>> {
        Ok(Box::new(SolidSource {
            size: req.natural_size,
            color: self.color,
            remaining: self.limit.unwrap_or(req.frame_count),
        }))
    }

    fn decode_audio(
        &self,
        _path: &Path,
        _window: Option<(f64, f64)>,
        _sample_rate: u32,
    ) -> FramecutResult<AudioPcm> {
        Err(FramecutError::media("no audio in this test"))
    }
}

#[derive(Clone, Default)]
struct Recorded {
    frames: Arc<Mutex<Vec<(FrameIndex, FrameRGBA)>>>,
    events: Arc<Mutex<Vec<&'static str>>>,
}

struct RecordingSink {
    rec: Recorded,
    out_path: PathBuf,
    fail_begin: bool,
}

impl FrameSink for RecordingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> FramecutResult<()> {
        if self.fail_begin {
            return Err(FramecutError::unknown("encoder refused the config"));
        }
        std::fs::write(&self.out_path, b"partial").unwrap();
        self.rec.events.lock().unwrap().push("begin");
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FramecutResult<()> {
        self.rec.frames.lock().unwrap().push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> FramecutResult<()> {
        self.rec.events.lock().unwrap().push("end");
        Ok(())
    }

    fn abort(&mut self) {
        self.rec.events.lock().unwrap().push("abort");
    }
}

fn factory(rec: &Recorded, fail_begin: bool) -> impl SinkFactory + use<> {
    let rec = rec.clone();
    move |opts: &SinkOpts| -> FramecutResult<Box<dyn FrameSink>> {
        Ok(Box::new(RecordingSink {
            rec: rec.clone(),
            out_path: opts.out_path.clone(),
            fail_begin,
        }))
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("framecut_pipeline_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn plan_in(dir: &Path, filter: Option<&str>) -> CompositionPlan {
    let path = dir.join("source.mp4");
    std::fs::write(&path, b"stub").unwrap();
    let asset = Arc::new(MediaAsset {
        path,
        duration: RationalTime::from_secs(2),
        video_natural_size: PixelSize::new(8, 6),
        preferred_transform: Affine::IDENTITY,
        has_audio: false,
        nominal_fps: None,
    });
    let orientation = OrientationInfo::resolve(asset.preferred_transform, asset.video_natural_size);
    let intent = EditIntent {
        filter: filter.map(FilterSpec::named),
        ..EditIntent::default()
    };
    build_plan(asset, orientation, &intent).unwrap()
}

fn opts() -> ExportOpts {
    ExportOpts {
        fps: Fps::new(10, 1).unwrap(),
        chunk_size: 4,
        threads: Some(2),
        ..ExportOpts::default()
    }
}

#[test]
fn renders_every_frame_through_the_processor() {
    let dir = scratch_dir("all_frames");
    let out = dir.join("out.mp4");
    let job = prepare(&plan_in(&dir, Some("X-Ray")), out.clone(), opts()).unwrap();
    assert_eq!(job.frame_count, 20);

    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [200, 10, 10, 255],
        limit: None,
    };
    let stats = run(&job, &decoder, &factory(&rec, false), &AtomicBool::new(false)).unwrap();
    assert_eq!(stats.frames_total, 20);
    assert_eq!(stats.frames_padded, 0);

    let frames = rec.frames.lock().unwrap();
    assert_eq!(frames.len(), 20);
    for (i, (idx, frame)) in frames.iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.size(), PixelSize::new(8, 6));
        // x-ray inverts
        assert_eq!(frame.pixel(3, 3)[3], 255);
        assert!(frame.pixel(3, 3)[0] < 128);
    }
    assert_eq!(*rec.events.lock().unwrap(), vec!["begin", "end"]);
    assert!(out.exists());
    assert!(!partial_path(&out).exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn short_decoder_is_padded_with_its_last_frame() {
    let dir = scratch_dir("short");
    let job = prepare(&plan_in(&dir, None), dir.join("out.mp4"), opts()).unwrap();
    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [1, 2, 3, 255],
        limit: Some(5),
    };
    let stats = run(&job, &decoder, &factory(&rec, false), &AtomicBool::new(false)).unwrap();
    assert_eq!(stats.frames_decoded, 5);
    assert_eq!(stats.frames_padded, 15);
    let frames = rec.frames.lock().unwrap();
    assert_eq!(frames.len(), 20);
    assert_eq!(frames[19].1.pixel(0, 0), [1, 2, 3, 255]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn empty_decoder_fails_and_cleans_up() {
    let dir = scratch_dir("empty");
    let out = dir.join("out.mp4");
    let job = prepare(&plan_in(&dir, None), out.clone(), opts()).unwrap();
    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [0, 0, 0, 255],
        limit: Some(0),
    };
    let err = run(&job, &decoder, &factory(&rec, false), &AtomicBool::new(false)).unwrap_err();
    assert!(matches!(err, FramecutError::Media(_)));
    assert!(rec.events.lock().unwrap().contains(&"abort"));
    assert!(!out.exists());
    assert!(!partial_path(&out).exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cancelled_before_the_first_chunk_reports_cancelled() {
    let dir = scratch_dir("cancel");
    let out = dir.join("out.mp4");
    let job = prepare(&plan_in(&dir, None), out.clone(), opts()).unwrap();
    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [0, 0, 0, 255],
        limit: None,
    };
    let err = run(&job, &decoder, &factory(&rec, false), &AtomicBool::new(true)).unwrap_err();
    assert!(matches!(err, FramecutError::Cancelled));
    assert!(rec.frames.lock().unwrap().is_empty());
    assert!(!out.exists());
    assert!(!partial_path(&out).exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sink_begin_failure_is_session_create() {
    let dir = scratch_dir("begin");
    let job = prepare(&plan_in(&dir, None), dir.join("out.mp4"), opts()).unwrap();
    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [0, 0, 0, 255],
        limit: None,
    };
    let err = run(&job, &decoder, &factory(&rec, true), &AtomicBool::new(false)).unwrap_err();
    assert!(matches!(err, FramecutError::ExportSessionCreateFailed(_)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn existing_output_gets_a_suffixed_sibling() {
    let dir = scratch_dir("exists");
    let out = dir.join("out.mp4");
    std::fs::write(&out, b"keep me").unwrap();
    let job = prepare(&plan_in(&dir, None), out.clone(), opts()).unwrap();
    assert_eq!(job.output, dir.join("out_2.mp4"));

    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [0, 0, 0, 255],
        limit: None,
    };
    run(&job, &decoder, &factory(&rec, false), &AtomicBool::new(false)).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"keep me");
    assert_eq!(std::fs::read(dir.join("out_2.mp4")).unwrap(), b"partial");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn overwrite_replaces_the_existing_output() {
    let dir = scratch_dir("overwrite");
    let out = dir.join("out.mp4");
    std::fs::write(&out, b"old").unwrap();
    let replace = ExportOpts {
        overwrite: true,
        ..opts()
    };
    let job = prepare(&plan_in(&dir, None), out.clone(), replace).unwrap();
    assert_eq!(job.output, out);

    let rec = Recorded::default();
    let decoder = SolidDecoder {
        color: [0, 0, 0, 255],
        limit: None,
    };
    run(&job, &decoder, &factory(&rec, false), &AtomicBool::new(false)).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"partial");
    assert!(!dir.join("out_2.mp4").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_threads_are_rejected() {
    let dir = scratch_dir("threads");
    let bad = ExportOpts {
        threads: Some(0),
        ..opts()
    };
    assert!(matches!(
        prepare(&plan_in(&dir, None), dir.join("out.mp4"), bad).err(),
        Some(FramecutError::Validation(_))
    ));
    assert!(build_thread_pool(Some(0)).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn partial_path_sits_next_to_the_output() {
    assert_eq!(
        partial_path(Path::new("/videos/EditedVideo_1.mp4")),
        PathBuf::from("/videos/EditedVideo_1.partial.mp4")
    );
    assert_eq!(normalized_chunk_size(0), 1);
}

#[test]
fn env_overrides_leave_defaults_when_unset() {
    if std::env::var_os(CHUNK_ENV).is_some() || std::env::var_os(THREADS_ENV).is_some() {
        return;
    }
    let o = ExportOpts::default().with_env_overrides();
    assert_eq!(o.chunk_size, 16);
    assert_eq!(o.threads, None);
}

#[test]
fn source_rate_replaces_the_default_fps() {
    let dir = scratch_dir("source_fps");
    let plan = plan_in(&dir, None);
    let mut asset = (*plan.asset).clone();
    assert_eq!(
        ExportOpts::default().with_source_fps(&asset).fps,
        Fps::default()
    );

    asset.nominal_fps = Some(Fps::new(24, 1).unwrap());
    let o = ExportOpts::default().with_source_fps(&asset);
    assert_eq!(o.fps, Fps::new(24, 1).unwrap());
    let job = prepare(&plan, dir.join("out.mp4"), o).unwrap();
    assert_eq!(job.frame_count, 48);
    let _ = std::fs::remove_dir_all(&dir);
}
