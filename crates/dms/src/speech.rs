//! Speech synthesis on a dedicated worker thread
//!
//! Utterances are queued over a channel to a single worker so a slow
//! speech engine never stalls the detection loop. The engine sits behind
//! a mutex; utterances run one after another, never interleaved.

use std::process::{Command, Stdio};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

use crate::DmsError;

/// A text-to-speech backend
pub trait SpeechEngine: Send {
    /// Speak `text`, blocking until the utterance finishes
    fn speak(&mut self, text: &str) -> Result<(), DmsError>;
}

/// Speaks through an external command such as `espeak -s 160 "text"`
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    rate: u32,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, rate: u32) -> Self {
        Self {
            program: program.into(),
            rate,
        }
    }
}

impl SpeechEngine for CommandSpeech {
    fn speak(&mut self, text: &str) -> Result<(), DmsError> {
        let status = Command::new(&self.program)
            .arg("-s")
            .arg(self.rate.to_string())
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| DmsError::Speech(format!("{}: {}", self.program, e)))?;

        if !status.success() {
            return Err(DmsError::Speech(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}

enum Message {
    Say(String),
    Terminate,
}

type SharedEngine = Arc<Mutex<Option<Box<dyn SpeechEngine>>>>;

/// Single-worker executor for utterances
pub struct SpeechWorker {
    sender: Option<mpsc::Sender<Message>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SpeechWorker {
    /// Start the worker. With `None` the worker runs but drops every utterance.
    pub fn spawn(engine: Option<Box<dyn SpeechEngine>>) -> Result<Self, DmsError> {
        if engine.is_none() {
            warn!("Speech engine unavailable, voice prompts disabled");
        }
        let engine: SharedEngine = Arc::new(Mutex::new(engine));
        let (sender, receiver) = mpsc::channel::<Message>();

        let thread = thread::Builder::new()
            .name("speech".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        Message::Say(text) => Self::utter(&engine, &text),
                        Message::Terminate => break,
                    }
                }
                debug!("Speech worker stopped");
            })
            .map_err(|e| DmsError::Speech(format!("failed to start worker: {}", e)))?;

        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }

    /// Worker that never speaks
    pub fn disabled() -> Result<Self, DmsError> {
        Self::spawn(None)
    }

    fn utter(engine: &SharedEngine, text: &str) {
        let mut guard = engine.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(engine) = guard.as_mut() else {
            debug!("Dropping utterance, no speech engine");
            return;
        };
        match engine.speak(text) {
            Ok(()) => info!("Spoke: {}", text),
            Err(e) => warn!("Speech failed: {}", e),
        }
    }

    /// Queue an utterance without waiting for it
    pub fn say(&self, text: impl Into<String>) -> Result<(), DmsError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| DmsError::Speech("worker stopped".into()))?;
        sender
            .send(Message::Say(text.into()))
            .map_err(|_| DmsError::Speech("worker stopped".into()))
    }
}

impl Drop for SpeechWorker {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Message::Terminate);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
