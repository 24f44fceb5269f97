//! Alarm lifecycle: one voice prompt plus looping audio per activation

use std::process::{Child, Command, Stdio};
use tracing::{debug, error, info, warn};

use crate::speech::SpeechWorker;
use crate::state::AlarmTransition;
use crate::DmsError;

/// Looping alarm playback
pub trait AudioSink: Send {
    /// Whether the alarm sound is currently playing
    fn is_playing(&mut self) -> bool;

    /// Start playing the alarm in a loop. Must not block.
    fn play_loop(&mut self) -> Result<(), DmsError>;

    /// Stop playback. No-op if nothing is playing.
    fn stop(&mut self);
}

/// Plays the alarm through an external player process that loops on its own
#[derive(Debug)]
pub struct CommandAudio {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl CommandAudio {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: None,
        }
    }
}

impl AudioSink for CommandAudio {
    fn is_playing(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("Alarm player exited with {}", status);
                self.child = None;
                false
            }
            Some(Err(e)) => {
                warn!("Failed to poll alarm player: {}", e);
                false
            }
            None => false,
        }
    }

    fn play_loop(&mut self) -> Result<(), DmsError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DmsError::Audio(format!("{}: {}", self.program, e)))?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!("Alarm player already gone: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl Drop for CommandAudio {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns the alarm on/off state and the outputs it drives
pub struct AlarmOrchestrator<A: AudioSink> {
    audio: A,
    speech: SpeechWorker,
    message: String,
    active: bool,
}

impl<A: AudioSink> AlarmOrchestrator<A> {
    pub fn new(audio: A, speech: SpeechWorker, message: impl Into<String>) -> Self {
        Self {
            audio,
            speech,
            message: message.into(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raise the alarm. Returns false if it was already active.
    pub fn activate(&mut self) -> bool {
        if self.active {
            return false;
        }

        if let Err(e) = self.speech.say(self.message.clone()) {
            warn!("Voice prompt skipped: {}", e);
        }

        if !self.audio.is_playing() {
            if let Err(e) = self.audio.play_loop() {
                error!("Alarm audio failed to start: {}", e);
            }
        }

        self.active = true;
        info!("Alarm activated");
        true
    }

    /// Silence the alarm. Returns false if it was not active.
    pub fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.audio.stop();
        self.active = false;
        info!("Alarm deactivated");
        true
    }

    /// Apply a state machine edge
    pub fn apply(&mut self, transition: AlarmTransition) -> bool {
        match transition {
            AlarmTransition::Activate => self.activate(),
            AlarmTransition::Deactivate => self.deactivate(),
        }
    }

    /// Make sure nothing is left sounding on exit
    pub fn shutdown(&mut self) {
        if !self.deactivate() && self.audio.is_playing() {
            self.audio.stop();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::speech::tests::RecordingSpeech;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Audio sink that counts starts and stops
    #[derive(Clone, Default)]
    pub(crate) struct FakeAudio {
        pub starts: Arc<AtomicUsize>,
        pub stops: Arc<AtomicUsize>,
        pub playing: Arc<AtomicBool>,
        pub fail: bool,
    }

    impl AudioSink for FakeAudio {
        fn is_playing(&mut self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        fn play_loop(&mut self) -> Result<(), DmsError> {
            if self.fail {
                return Err(DmsError::Audio("no device".into()));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_activate_is_idempotent() {
        let audio = FakeAudio::default();
        let (engine, spoken) = RecordingSpeech::new();
        let speech = SpeechWorker::spawn(Some(Box::new(engine))).unwrap();
        let mut alarm = AlarmOrchestrator::new(audio.clone(), speech, "Wake up!");

        assert!(alarm.activate());
        assert!(!alarm.activate());
        assert!(alarm.is_active());
        drop(alarm);

        assert_eq!(audio.starts.load(Ordering::SeqCst), 1);
        assert_eq!(*spoken.lock().unwrap(), vec!["Wake up!"]);
    }

    #[test]
    fn test_deactivate_stops_once() {
        let audio = FakeAudio::default();
        let speech = SpeechWorker::disabled().unwrap();
        let mut alarm = AlarmOrchestrator::new(audio.clone(), speech, "x");

        assert!(!alarm.deactivate());
        alarm.activate();
        assert!(alarm.deactivate());
        assert!(!alarm.deactivate());

        assert_eq!(audio.stops.load(Ordering::SeqCst), 1);
        assert!(!alarm.is_active());
    }

    #[test]
    fn test_audio_works_without_speech() {
        let audio = FakeAudio::default();
        let (mut engine, spoken) = RecordingSpeech::new();
        engine.fail = true;
        let speech = SpeechWorker::spawn(Some(Box::new(engine))).unwrap();
        let mut alarm = AlarmOrchestrator::new(audio.clone(), speech, "Wake up!");

        alarm.activate();
        assert!(audio.playing.load(Ordering::SeqCst));
        drop(alarm);
        assert!(spoken.lock().unwrap().is_empty());
    }

    #[test]
    fn test_audio_failure_keeps_pairing() {
        let audio = FakeAudio {
            fail: true,
            ..Default::default()
        };
        let speech = SpeechWorker::disabled().unwrap();
        let mut alarm = AlarmOrchestrator::new(audio.clone(), speech, "x");

        assert!(alarm.activate());
        assert!(alarm.is_active());
        assert!(alarm.deactivate());
    }

    #[test]
    fn test_does_not_restart_playing_audio() {
        let audio = FakeAudio::default();
        audio.playing.store(true, Ordering::SeqCst);
        let speech = SpeechWorker::disabled().unwrap();
        let mut alarm = AlarmOrchestrator::new(audio.clone(), speech, "x");

        alarm.activate();
        assert_eq!(audio.starts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shutdown_stops_stray_audio() {
        let audio = FakeAudio::default();
        audio.playing.store(true, Ordering::SeqCst);
        let speech = SpeechWorker::disabled().unwrap();
        let mut alarm = AlarmOrchestrator::new(audio.clone(), speech, "x");

        alarm.shutdown();
        assert_eq!(audio.stops.load(Ordering::SeqCst), 1);
        assert!(!audio.playing.load(Ordering::SeqCst));
    }
}
