//! Detection loop
//!
//! Pulls frames strictly in order: capture, landmarks, extraction,
//! smoothing, state update. No queueing; a slow landmark provider simply
//! slows the loop down.

use alerting::{AlertDispatcher, DROWSY_EVENT};
use camera_capture::{FrameSource, VideoFrame};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::alarm::{AlarmOrchestrator, AudioSink};
use crate::landmarks::LandmarkSet;
use crate::state::AlarmTransition;
use crate::{DmsError, DrowsinessEngine};

/// External face-landmark estimator
pub trait LandmarkProvider {
    /// Landmarks of the single tracked face, or `None` when no face is found
    fn landmarks(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, DmsError>;
}

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub frames: u64,
    pub face_misses: u64,
    pub activations: u64,
    pub deactivations: u64,
    pub yawns: u64,
}

/// Drives the engine from a frame source and acts on its decisions
pub struct Monitor<S, L, A>
where
    S: FrameSource,
    L: LandmarkProvider,
    A: AudioSink,
{
    source: S,
    provider: L,
    engine: DrowsinessEngine,
    alarm: AlarmOrchestrator<A>,
    dispatcher: Option<AlertDispatcher>,
}

impl<S, L, A> Monitor<S, L, A>
where
    S: FrameSource,
    L: LandmarkProvider,
    A: AudioSink,
{
    pub fn new(
        source: S,
        provider: L,
        engine: DrowsinessEngine,
        alarm: AlarmOrchestrator<A>,
    ) -> Self {
        Self {
            source,
            provider,
            engine,
            alarm,
            dispatcher: None,
        }
    }

    /// Send a remote alert on every alarm activation
    pub fn with_dispatcher(mut self, dispatcher: AlertDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Hand back the dispatcher so pending deliveries can be drained
    pub fn take_dispatcher(&mut self) -> Option<AlertDispatcher> {
        self.dispatcher.take()
    }

    /// Run until `stop` is set or the stream ends. The source is released
    /// and the alarm silenced on every exit path.
    pub fn run(&mut self, stop: &AtomicBool) -> MonitorSummary {
        info!("Drowsiness monitor started");
        let mut summary = MonitorSummary::default();

        while !stop.load(Ordering::Relaxed) {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("End of stream");
                    break;
                }
                Err(e) => {
                    warn!("Frame capture failed, stopping: {}", e);
                    break;
                }
            };
            summary.frames += 1;

            let landmarks = match self.provider.landmarks(&frame) {
                Ok(landmarks) => landmarks,
                Err(e) => {
                    warn!("Landmark provider failed on frame {}: {}", frame.sequence, e);
                    None
                }
            };

            let analysis = self.engine.process(
                frame.timestamp(),
                landmarks.as_ref(),
                frame.width,
                frame.height,
            );

            if !analysis.face_detected {
                summary.face_misses += 1;
                debug!("No face in frame {}", frame.sequence);
            }
            if analysis.yawn_detected {
                summary.yawns += 1;
            }

            match analysis.transition {
                Some(AlarmTransition::Activate) => {
                    if self.alarm.activate() {
                        summary.activations += 1;
                    }
                    if let Some(dispatcher) = self.dispatcher.as_mut() {
                        dispatcher.dispatch(DROWSY_EVENT, Some(&frame));
                    }
                }
                Some(AlarmTransition::Deactivate) => {
                    if self.alarm.deactivate() {
                        summary.deactivations += 1;
                    }
                }
                None => {}
            }
        }

        self.shutdown();
        info!(
            "Drowsiness monitor stopped: {} frames, {} alarms",
            summary.frames, summary.activations
        );
        summary
    }

    fn shutdown(&mut self) {
        self.source.release();
        self.alarm.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::tests::FakeAudio;
    use crate::landmarks::synthetic_face;
    use crate::speech::SpeechWorker;
    use crate::DmsConfig;
    use alerting::{AlertPayload, AlertTransport, DispatchConfig, SendFuture};
    use camera_capture::CameraError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<AlertPayload>>,
    }

    impl AlertTransport for RecordingTransport {
        fn send(&self, payload: AlertPayload) -> SendFuture {
            self.sent.lock().unwrap().push(payload);
            Box::pin(async { Ok(()) })
        }
    }

    struct ScriptedSource {
        frames: VecDeque<Result<VideoFrame, CameraError>>,
        released: Arc<AtomicUsize>,
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            self.frames.pop_front().transpose()
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedLandmarks(HashMap<u32, LandmarkSet>);

    impl LandmarkProvider for ScriptedLandmarks {
        fn landmarks(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, DmsError> {
            Ok(self.0.get(&frame.sequence).cloned())
        }
    }

    /// 30fps frames, `ears[i]` is the EAR of frame i (`None` = no face)
    fn script(
        ears: &[Option<f32>],
    ) -> (VecDeque<Result<VideoFrame, CameraError>>, ScriptedLandmarks) {
        let mut frames = VecDeque::new();
        let mut landmarks = HashMap::new();
        for (i, ear) in ears.iter().enumerate() {
            let ts = i as u64 * 1_000_000_000 / 30;
            frames.push_back(Ok(VideoFrame::new(Vec::new(), 1000, 1000, ts, i as u32)));
            if let Some(ear) = ear {
                landmarks.insert(i as u32, synthetic_face(*ear));
            }
        }
        (frames, ScriptedLandmarks(landmarks))
    }

    fn monitor(
        frames: VecDeque<Result<VideoFrame, CameraError>>,
        landmarks: ScriptedLandmarks,
        audio: FakeAudio,
    ) -> (Monitor<ScriptedSource, ScriptedLandmarks, FakeAudio>, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            frames,
            released: released.clone(),
        };
        let engine = DrowsinessEngine::new(&DmsConfig::default()).unwrap();
        let alarm = AlarmOrchestrator::new(audio, SpeechWorker::disabled().unwrap(), "Wake up!");
        (Monitor::new(source, landmarks, engine, alarm), released)
    }

    #[test]
    fn test_one_activation_one_deactivation() {
        let mut ears = vec![Some(0.18); 75];
        ears.extend(vec![Some(0.30); 30]);
        let (frames, landmarks) = script(&ears);
        let audio = FakeAudio::default();
        let (mut monitor, released) = monitor(frames, landmarks, audio.clone());

        let summary = monitor.run(&AtomicBool::new(false));

        assert_eq!(summary.frames, 105);
        assert_eq!(summary.activations, 1);
        assert_eq!(summary.deactivations, 1);
        assert_eq!(audio.starts.load(Ordering::SeqCst), 1);
        assert_eq!(audio.stops.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alarm_stopped_when_stream_ends() {
        let (frames, landmarks) = script(&vec![Some(0.18); 75]);
        let audio = FakeAudio::default();
        let (mut monitor, released) = monitor(frames, landmarks, audio.clone());

        let summary = monitor.run(&AtomicBool::new(false));

        assert_eq!(summary.activations, 1);
        assert!(!audio.playing.load(Ordering::SeqCst));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capture_error_ends_loop() {
        let (mut frames, landmarks) = script(&[Some(0.3), Some(0.3), Some(0.3)]);
        frames.insert(1, Err(CameraError::Stream("unplugged".into())));
        let (mut monitor, released) = monitor(frames, landmarks, FakeAudio::default());

        let summary = monitor.run(&AtomicBool::new(false));

        assert_eq!(summary.frames, 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_faces_counted() {
        let (frames, landmarks) = script(&[Some(0.3), None, None, Some(0.3)]);
        let (mut monitor, _) = monitor(frames, landmarks, FakeAudio::default());

        let summary = monitor.run(&AtomicBool::new(false));
        assert_eq!(summary.face_misses, 2);
    }

    #[test]
    fn test_stop_flag_checked_before_first_frame() {
        let (frames, landmarks) = script(&[Some(0.3); 10]);
        let (mut monitor, released) = monitor(frames, landmarks, FakeAudio::default());

        let summary = monitor.run(&AtomicBool::new(true));
        assert_eq!(summary.frames, 0);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_activation_sends_one_remote_alert() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = AlertDispatcher::new(
            transport.clone(),
            "Lyon, FR",
            &DispatchConfig::default(),
            runtime.handle().clone(),
        );

        let mut ears = vec![Some(0.18); 75];
        ears.extend(vec![Some(0.30); 30]);
        let (frames, landmarks) = script(&ears);
        let (monitor, _) = monitor(frames, landmarks, FakeAudio::default());
        let mut monitor = monitor.with_dispatcher(dispatcher);

        let summary = monitor.run(&AtomicBool::new(false));
        assert_eq!(summary.activations, 1);
        assert_eq!(summary.deactivations, 1);

        let mut dispatcher = monitor.take_dispatcher().unwrap();
        let report = runtime.block_on(dispatcher.drain(Duration::from_secs(1)));
        assert_eq!(report.delivered, 1);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event, DROWSY_EVENT);
        assert_eq!(sent[0].location, "Lyon, FR");
        assert!(sent[0].image.is_none());
    }
}
