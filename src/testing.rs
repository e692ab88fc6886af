//! In-memory radio, HTTP and position fakes for unit tests

use crate::positioning::PositionSource;
use crate::transport::{HttpClient, HttpResponse, WifiRadio};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracker_shared::{NetworkCredential, PositionSample};

#[derive(Default)]
struct RadioState {
    reachable: HashSet<String>,
    attempts: Vec<(String, Duration)>,
    connected: bool,
}

/// Radio that joins only the networks it was told are in range
#[derive(Clone, Default)]
pub struct FakeRadio {
    state: Arc<Mutex<RadioState>>,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, ssids: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.reachable = ssids.iter().map(|s| s.to_string()).collect();
    }

    /// SSIDs passed to `join`, in call order
    pub fn attempts(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.attempts.iter().map(|(ssid, _)| ssid.clone()).collect()
    }

    pub fn deadlines(&self) -> Vec<Duration> {
        let state = self.state.lock().unwrap();
        state.attempts.iter().map(|(_, deadline)| *deadline).collect()
    }

    pub fn clear_attempts(&self) {
        self.state.lock().unwrap().attempts.clear();
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().unwrap().connected = connected;
    }
}

#[async_trait]
impl WifiRadio for FakeRadio {
    async fn join(&self, credential: &NetworkCredential, deadline: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push((credential.ssid.clone(), deadline));
        if state.reachable.contains(&credential.ssid) {
            state.connected = true;
            Ok(())
        } else {
            state.connected = false;
            Err(anyhow!("{} out of range", credential.ssid))
        }
    }

    async fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// One GET seen by [`FakeHttp`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
}

#[derive(Default)]
struct HttpState {
    /// `None` means a transport failure
    responses: HashMap<String, Option<(u16, Bytes)>>,
    requests: Vec<RecordedRequest>,
}

/// HTTP client answering from canned per-URL responses; 404 otherwise
#[derive(Clone, Default)]
pub struct FakeHttp {
    state: Arc<Mutex<HttpState>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state
            .responses
            .insert(url.to_string(), Some((status, Bytes::copy_from_slice(body))));
    }

    pub fn fail(&self, url: &str) {
        self.state.lock().unwrap().responses.insert(url.to_string(), None);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.url == url).collect()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &str, query: &[(&'static str, String)]) -> Result<HttpResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(RecordedRequest {
            url: url.to_string(),
            query: query.to_vec(),
        });

        match state.responses.get(url) {
            Some(Some((status, body))) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Some(None) => Err(anyhow!("connection refused")),
            None => Ok(HttpResponse {
                status: 404,
                body: Bytes::new(),
            }),
        }
    }
}

/// Position source replaying a scripted sequence of fixes.
///
/// Each `drain` advances to the next scripted fix; the last one sticks.
#[derive(Default)]
pub struct FakePositionSource {
    script: VecDeque<Option<PositionSample>>,
    current: Option<PositionSample>,
    pub drains: usize,
}

impl FakePositionSource {
    pub fn new(script: Vec<Option<PositionSample>>) -> Self {
        Self {
            script: script.into(),
            ..Default::default()
        }
    }

    /// Source that always reports `sample`
    pub fn fixed(sample: PositionSample) -> Self {
        Self::new(vec![Some(sample)])
    }
}

#[async_trait]
impl PositionSource for FakePositionSource {
    async fn drain(&mut self) -> Result<usize> {
        self.drains += 1;
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        Ok(1)
    }

    fn latest(&self) -> Option<PositionSample> {
        self.current
    }
}

pub fn sample(valid: bool, age_ms: u64) -> PositionSample {
    PositionSample {
        latitude: 48.1173,
        longitude: 11.5166666,
        speed_kmh: 41.4848,
        altitude_m: 545.4,
        age_ms,
        valid,
    }
}
