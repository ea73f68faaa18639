use super::*;
use crate::foundation::core::PixelSize;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::default(),
        audio: None,
    }
}

#[test]
fn in_memory_sink_records_frames_in_order() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg()).unwrap();
    let f = FrameRGBA::solid(PixelSize::new(2, 2), [1, 2, 3, 255]);
    sink.push_frame(FrameIndex(0), &f).unwrap();
    sink.push_frame(FrameIndex(1), &f).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &f).is_err());
    sink.end().unwrap();
    assert!(sink.is_finished());
    assert_eq!(sink.frames().len(), 2);
    assert_eq!(sink.config().unwrap().width, 2);
}

#[test]
fn closures_act_as_sink_factories() {
    let factory = |opts: &SinkOpts| -> FramecutResult<Box<dyn FrameSink>> {
        assert!(!opts.overwrite);
        Ok(Box::new(InMemorySink::new()))
    };
    let mut sink = factory.create(&SinkOpts::new("out.mp4")).unwrap();
    sink.begin(cfg()).unwrap();
    sink.abort();
}
