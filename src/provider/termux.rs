use serde::Deserialize;
use std::io::{self, ErrorKind};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;

use super::restart::RestartBackoff;
use super::{LocationError, LocationEvent, LocationProvider, Subscription, WatchOptions};
use crate::types::{current_timestamp, Reading};

const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(2);

/// Continuous fixes from Termux:API.
///
/// Runs `termux-location -p gps -r updates`, which prints one pretty-printed
/// JSON object per fix for as long as the process lives. When the process
/// exits (permission denied, location timeout, API restart) the exit is
/// reported as a location error and the command is started again.
pub struct TermuxProvider {
    program: String,
    restart_cooldown: Duration,
}

impl TermuxProvider {
    pub fn new() -> Self {
        Self::with_program("termux-location")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            restart_cooldown: DEFAULT_RESTART_COOLDOWN,
        }
    }

    pub fn with_restart_cooldown(mut self, cooldown: Duration) -> Self {
        self.restart_cooldown = cooldown;
        self
    }
}

impl Default for TermuxProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct TermuxFix {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    #[serde(default)]
    speed: Option<f64>,
}

fn parse_fix(object: &str) -> LocationEvent {
    match serde_json::from_str::<TermuxFix>(object) {
        Ok(fix) => LocationEvent::Fix(Reading {
            timestamp: current_timestamp(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed: fix.speed,
            accuracy: fix.accuracy,
        }),
        Err(e) => LocationEvent::Error(LocationError::Update(format!(
            "unexpected termux-location output ({}): {}",
            e,
            object.trim()
        ))),
    }
}

/// Splits a stream of concatenated JSON objects into complete objects.
#[derive(Default, Debug)]
pub struct JsonObjectSplitter {
    buffer: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonObjectSplitter {
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut complete = Vec::new();

        for c in chunk.chars() {
            if self.depth == 0 && c != '{' {
                // Noise between objects
                continue;
            }
            self.buffer.push(c);

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match c {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        complete.push(std::mem::take(&mut self.buffer));
                    }
                }
                _ => {}
            }
        }

        complete
    }
}

/// Starts one `termux-location` run and hands back its stdout.
fn spawn_watch(program: &str, source: &str) -> io::Result<(Child, ChildStdout)> {
    let mut child = Command::new(program)
        .args(["-p", source, "-r", "updates"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "no stdout"))?;
    Ok((child, stdout))
}

/// Forwards every object printed by one run. Returns the number of fixes,
/// or `None` once the receiver is gone.
async fn forward_events(stdout: ChildStdout, tx: &Sender<LocationEvent>) -> Option<u64> {
    let mut lines = BufReader::new(stdout).lines();
    let mut splitter = JsonObjectSplitter::default();
    let mut fixes = 0u64;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                for object in splitter.push(&line) {
                    let event = parse_fix(&object);
                    if matches!(event, LocationEvent::Fix(_)) {
                        fixes += 1;
                    }
                    tx.send(event).await.ok()?;
                }
            }
            Ok(None) => return Some(fixes),
            Err(e) => {
                tx.send(LocationEvent::Error(LocationError::Update(e.to_string())))
                    .await
                    .ok()?;
                return Some(fixes);
            }
        }
    }
}

impl LocationProvider for TermuxProvider {
    fn name(&self) -> &'static str {
        "termux"
    }

    fn subscribe(
        &self,
        options: WatchOptions,
        tx: Sender<LocationEvent>,
    ) -> Result<Subscription, LocationError> {
        let source = if options.high_accuracy { "gps" } else { "network" };

        // Only the first spawn decides availability; later runs are restarts.
        let mut first = Some(spawn_watch(&self.program, source).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LocationError::Unavailable(format!(
                "{} not found (install the Termux:API package)",
                self.program
            )),
            _ => LocationError::Unavailable(format!("failed to start {}: {}", self.program, e)),
        })?);

        let program = self.program.clone();
        let mut backoff = RestartBackoff::new(self.name(), self.restart_cooldown);
        let task = tokio::spawn(async move {
            loop {
                let run = match first.take() {
                    Some(run) => Ok(run),
                    None => spawn_watch(&program, source),
                };
                let reason = match run {
                    Ok((child, stdout)) => {
                        // Held so the process is killed when the task is aborted.
                        let _child = child;
                        let Some(fixes) = forward_events(stdout, &tx).await else {
                            return;
                        };
                        if fixes > 0 {
                            backoff.record_success();
                        }
                        format!("{} exited after {} fixes", program, fixes)
                    }
                    Err(e) => format!("failed to restart {}: {}", program, e),
                };

                let wait = backoff.record_failed_attempt();
                let error = LocationError::Update(format!(
                    "{}, restarting in {:.1}s",
                    reason,
                    wait.as_secs_f64()
                ));
                if tx.send(LocationEvent::Error(error)).await.is_err() {
                    return;
                }
                sleep(wait).await;
            }
        });

        Ok(Subscription::new(self.name(), task))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const FIX: &str = r#"{
  "latitude": 37.7749,
  "longitude": -122.4194,
  "altitude": 12.0,
  "accuracy": 8.5,
  "vertical_accuracy": 3.0,
  "bearing": 90.0,
  "speed": 13.2,
  "elapsedMs": 41,
  "provider": "gps"
}"#;

    #[test]
    fn test_splitter_handles_multiline_objects() {
        let mut splitter = JsonObjectSplitter::default();
        let mut objects = Vec::new();
        for line in FIX.lines().chain(FIX.lines()) {
            objects.extend(splitter.push(line));
        }
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn test_splitter_ignores_braces_in_strings() {
        let mut splitter = JsonObjectSplitter::default();
        let objects = splitter.push(r#"{"provider": "gp}s\"{"} junk {"a": 1}"#);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[1], r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_fix() {
        match parse_fix(FIX) {
            LocationEvent::Fix(reading) => {
                assert_eq!(reading.speed, Some(13.2));
                assert_eq!(reading.accuracy, 8.5);
                assert_eq!(reading.latitude, 37.7749);
            }
            other => panic!("expected fix, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fix_without_speed() {
        let json = r#"{"latitude": 1.0, "longitude": 2.0, "accuracy": 120.0}"#;
        match parse_fix(json) {
            LocationEvent::Fix(reading) => assert_eq!(reading.speed, None),
            other => panic!("expected fix, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_api_error_is_update_error() {
        let json = r#"{"API_ERROR": "Location permission not granted"}"#;
        assert!(matches!(
            parse_fix(json),
            LocationEvent::Error(LocationError::Update(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let provider = TermuxProvider::with_program("definitely-not-a-termux-binary");
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let err = provider.subscribe(WatchOptions::default(), tx).unwrap_err();
        assert!(matches!(err, LocationError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exited_watcher_is_restarted() {
        let dir = tempfile::tempdir().unwrap();
        let program = testing::fix_then_api_error(dir.path());
        let provider = TermuxProvider::with_program(program.to_string_lossy())
            .with_restart_cooldown(Duration::from_millis(10));

        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let sub = provider.subscribe(WatchOptions::default(), tx).unwrap();

        let mut events = Vec::new();
        while events.len() < 4 {
            let next = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
            events.push(next.unwrap().unwrap());
        }

        assert!(matches!(events[0], LocationEvent::Fix(_)));
        // API_ERROR object
        assert!(matches!(events[1], LocationEvent::Error(LocationError::Update(_))));
        match &events[2] {
            LocationEvent::Error(LocationError::Update(msg)) => assert!(msg.contains("exited after 1 fixes")),
            other => panic!("expected exit error, got {:?}", other),
        }
        // Second run after the restart
        assert!(matches!(events[3], LocationEvent::Fix(_)));
        assert!(sub.is_active());

        sub.stop();
    }
}
