use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use anyhow::{anyhow, Context, Result};
use libloading::Library;
use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::Serialize;
use crate::config::HeadsetConfig;
use crate::drivers::{BlinkError, SampleChunk, SampleSource};
const PRESET_DEFAULT: c_int = 0;
/// Ring buffer size handed to `start_stream`; about three minutes of Muse data.
const STREAM_RINGBUF_PACKETS: c_int = 45_000;
const POLL_INTERVAL: Duration = Duration::from_millis(5);
#[cfg(target_os = "windows")]
const LIBRARY_NAME: &str = "BoardController.dll";
#[cfg(target_os = "macos")]
const LIBRARY_NAME: &str = "libBoardController.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIBRARY_NAME: &str = "libBoardController.so";
/// `master_board` for a physical headset that is not streaming through another board.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(transparent)]
struct MasterBoard(i32);
impl Default for MasterBoard {
    fn default() -> Self {
        MasterBoard(-100)
    }
}
/// The JSON blob every BrainFlow session call takes. BrainFlow expects all
/// keys to be present, so unused network and file fields stay empty.
#[derive(Debug, Default, Serialize)]
struct BrainFlowInputParams {
    serial_port: String,
    mac_address: String,
    ip_address: String,
    ip_address_aux: String,
    ip_address_anc: String,
    ip_port: i32,
    ip_port_aux: i32,
    ip_port_anc: i32,
    ip_protocol: i32,
    other_info: String,
    timeout: i32,
    serial_number: String,
    file: String,
    file_aux: String,
    file_anc: String,
    master_board: MasterBoard,
}
impl BrainFlowInputParams {
    fn from_config(config: &HeadsetConfig) -> Self {
        Self {
            serial_port: config.serial_port.clone(),
            mac_address: config.mac_address.clone(),
            serial_number: config.serial_number.clone(),
            timeout: config.connect_timeout_secs,
            ..Self::default()
        }
    }
    fn to_c_string(&self) -> Result<CString> {
        let json = serde_json::to_string(self)?;
        CString::new(json).context("BrainFlow input params contain a NUL byte")
    }
}
type SessionFn = unsafe extern "C" fn(c_int, *const c_char) -> c_int;
type BoardQueryFn = unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int;
/// Function pointers resolved from `BoardController`; `_lib` keeps them valid.
struct BrainFlowApi {
    _lib: Library,
    prepare_session: SessionFn,
    start_stream: unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char) -> c_int,
    stop_stream: SessionFn,
    release_session: SessionFn,
    get_board_data_count: unsafe extern "C" fn(c_int, *mut c_int, c_int, *const c_char) -> c_int,
    get_board_data: unsafe extern "C" fn(c_int, c_int, *mut c_double, c_int, *const c_char) -> c_int,
    get_sampling_rate: BoardQueryFn,
    get_num_rows: BoardQueryFn,
    get_eeg_channels: unsafe extern "C" fn(c_int, c_int, *mut c_int, *mut c_int) -> c_int,
    get_timestamp_channel: BoardQueryFn,
}
/// Maps a BrainFlow exit code to an error naming the failed call.
fn exit_code(code: c_int, call: &str) -> Result<()> {
    match code {
        0 => Ok(()),
        code => Err(anyhow!("BrainFlow {call} returned exit code {code}")),
    }
}
/// # Safety
/// `T` must be the exact function pointer type exported under `name`.
unsafe fn symbol<T: Copy>(lib: &Library, name: &str) -> Result<T> {
    let bytes = format!("{name}\0");
    let sym = lib
        .get::<T>(bytes.as_bytes())
        .with_context(|| format!("BrainFlow symbol {name} missing"))?;
    Ok(*sym)
}
impl BrainFlowApi {
    fn load(library_dir: &str) -> Result<Self> {
        let path = if library_dir.is_empty() {
            Path::new(LIBRARY_NAME).to_path_buf()
        } else {
            Path::new(library_dir).join(LIBRARY_NAME)
        };
        let lib = unsafe { Library::new(&path) }
            .with_context(|| format!("{} could not be loaded", path.display()))?;
        // Pointer types below mirror board_controller.h.
        unsafe {
            Ok(Self {
                prepare_session: symbol(&lib, "prepare_session")?,
                start_stream: symbol(&lib, "start_stream")?,
                stop_stream: symbol(&lib, "stop_stream")?,
                release_session: symbol(&lib, "release_session")?,
                get_board_data_count: symbol(&lib, "get_board_data_count")?,
                get_board_data: symbol(&lib, "get_board_data")?,
                get_sampling_rate: symbol(&lib, "get_sampling_rate")?,
                get_num_rows: symbol(&lib, "get_num_rows")?,
                get_eeg_channels: symbol(&lib, "get_eeg_channels")?,
                get_timestamp_channel: symbol(&lib, "get_timestamp_channel")?,
                _lib: lib,
            })
        }
    }
    /// The library is loaded once per process; later calls ignore `library_dir`.
    fn instance(library_dir: &str) -> Result<&'static BrainFlowApi> {
        static API: OnceCell<BrainFlowApi> = OnceCell::new();
        API.get_or_try_init(|| Self::load(library_dir))
    }
    /// prepare / stop / release all share the `(board_id, params)` shape.
    fn session_call(&self, f: SessionFn, call: &str, board_id: c_int, input: &CString) -> Result<()> {
        exit_code(unsafe { f(board_id, input.as_ptr()) }, call)
    }
    fn start_stream(&self, board_id: c_int, input: &CString) -> Result<()> {
        let code = unsafe {
            (self.start_stream)(STREAM_RINGBUF_PACKETS, std::ptr::null(), board_id, input.as_ptr())
        };
        exit_code(code, "start_stream")
    }
    /// Board description lookups; negative answers are clamped to zero.
    fn board_query(&self, f: BoardQueryFn, call: &str, board_id: c_int) -> Result<usize> {
        let mut out: c_int = 0;
        exit_code(unsafe { f(board_id, PRESET_DEFAULT, &mut out) }, call)?;
        Ok(out.max(0) as usize)
    }
    fn eeg_channels(&self, board_id: c_int, num_rows: usize) -> Result<Vec<usize>> {
        let mut len: c_int = 0;
        let mut rows = vec![0 as c_int; num_rows.max(32)];
        let code = unsafe {
            (self.get_eeg_channels)(board_id, PRESET_DEFAULT, rows.as_mut_ptr(), &mut len)
        };
        exit_code(code, "get_eeg_channels")?;
        rows.truncate(len.max(0) as usize);
        Ok(rows.into_iter().map(|r| r.max(0) as usize).collect())
    }
    fn data_count(&self, board_id: c_int, input: &CString) -> Result<usize> {
        let mut count: c_int = 0;
        let code = unsafe {
            (self.get_board_data_count)(PRESET_DEFAULT, &mut count, board_id, input.as_ptr())
        };
        exit_code(code, "get_board_data_count")?;
        Ok(count.max(0) as usize)
    }
    /// Drains `count` samples from BrainFlow's ring buffer as a row-major
    /// `num_rows x count` matrix.
    fn take_data(
        &self,
        board_id: c_int,
        input: &CString,
        num_rows: usize,
        count: usize,
    ) -> Result<Vec<f64>> {
        let mut data = vec![0.0f64; num_rows * count];
        let code = unsafe {
            (self.get_board_data)(
                count as c_int,
                PRESET_DEFAULT,
                data.as_mut_ptr(),
                board_id,
                input.as_ptr(),
            )
        };
        exit_code(code, "get_board_data")?;
        Ok(data)
    }
}
/// BrainFlow-backed Muse session. EEG rows come out in board order
/// (TP9, AF7, AF8, TP10 on a Muse 2).
pub struct MuseSession {
    board_id: c_int,
    api: &'static BrainFlowApi,
    input_json: CString,
    eeg_channels: Vec<usize>,
    timestamp_row: usize,
    num_rows: usize,
    sample_rate_hz: f64,
    is_streaming: bool,
    released: bool,
}
impl MuseSession {
    /// Prepares the board, starts streaming and reports the nominal sampling rate.
    pub fn connect(config: &HeadsetConfig) -> Result<(Self, f64), BlinkError> {
        Self::open(config).map_err(|err| BlinkError::Connection(format!("{err:#}")))
    }
    fn open(config: &HeadsetConfig) -> Result<(Self, f64)> {
        let api = BrainFlowApi::instance(&config.library_dir)?;
        let input_json = BrainFlowInputParams::from_config(config).to_c_string()?;
        let board_id = config.board_id as c_int;
        api.session_call(api.prepare_session, "prepare_session", board_id, &input_json)
            .with_context(|| format!("no headset found for board {board_id}"))?;
        let mut session = Self {
            board_id,
            api,
            input_json,
            eeg_channels: Vec::new(),
            timestamp_row: 0,
            num_rows: 0,
            sample_rate_hz: 0.0,
            is_streaming: false,
            released: false,
        };
        // Prepared: Drop now owns the release on every early return below.
        session.num_rows = api.board_query(api.get_num_rows, "get_num_rows", board_id)?;
        session.sample_rate_hz =
            api.board_query(api.get_sampling_rate, "get_sampling_rate", board_id)? as f64;
        session.timestamp_row =
            api.board_query(api.get_timestamp_channel, "get_timestamp_channel", board_id)?;
        session.eeg_channels = api.eeg_channels(board_id, session.num_rows)?;
        if session.eeg_channels.is_empty() || session.sample_rate_hz <= 0.0 {
            return Err(anyhow!("board {board_id} reports no EEG stream"));
        }
        api.start_stream(board_id, &session.input_json)?;
        session.is_streaming = true;
        info!(
            "connected to board {board_id}: {} EEG channels at {} Hz",
            session.eeg_channels.len(),
            session.sample_rate_hz
        );
        let rate = session.sample_rate_hz;
        Ok((session, rate))
    }
    fn read_chunk(&self, count: usize) -> Result<SampleChunk> {
        let data = self
            .api
            .take_data(self.board_id, &self.input_json, self.num_rows, count)?;
        let row = |r: usize, i: usize| data.get(r * count + i).copied().unwrap_or(0.0);
        let readings = (0..count)
            .map(|i| self.eeg_channels.iter().map(|&ch| row(ch, i)).collect())
            .collect();
        let timestamps = (0..count).map(|i| row(self.timestamp_row, i)).collect();
        Ok(SampleChunk::new(readings, timestamps))
    }
}
impl SampleSource for MuseSession {
    fn sampling_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<Option<SampleChunk>, BlinkError> {
        if self.released {
            return Ok(None);
        }
        let started = Instant::now();
        loop {
            let available = self
                .api
                .data_count(self.board_id, &self.input_json)
                .map_err(|err| BlinkError::Connection(format!("{err:#}")))?;
            if available > 0 {
                let chunk = self
                    .read_chunk(available.min(max_samples.max(1)))
                    .map_err(|err| BlinkError::Connection(format!("{err:#}")))?;
                return Ok(Some(chunk));
            }
            if started.elapsed() >= timeout {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL.min(timeout));
        }
    }
    fn release(&mut self) -> Result<(), BlinkError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let mut result = Ok(());
        if self.is_streaming {
            self.is_streaming = false;
            result = self.api.session_call(
                self.api.stop_stream,
                "stop_stream",
                self.board_id,
                &self.input_json,
            );
        }
        let released = self.api.session_call(
            self.api.release_session,
            "release_session",
            self.board_id,
            &self.input_json,
        );
        result
            .and(released)
            .map_err(|err| BlinkError::Connection(format!("{err:#}")))?;
        info!("headset session released");
        Ok(())
    }
}
impl Drop for MuseSession {
    fn drop(&mut self) {
        if let Err(err) = SampleSource::release(self) {
            warn!("failed to release headset session: {err}");
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn input_params_carry_headset_settings() {
        let config = HeadsetConfig {
            mac_address: "00:55:DA:B0:00:01".into(),
            connect_timeout_secs: 9,
            ..HeadsetConfig::default()
        };
        let json = serde_json::to_value(BrainFlowInputParams::from_config(&config)).unwrap();
        assert_eq!(json["mac_address"], "00:55:DA:B0:00:01");
        assert_eq!(json["timeout"], 9);
        assert_eq!(json["master_board"], -100);
        assert_eq!(json["ip_port"], 0);
        assert_eq!(json["file_anc"], "");
    }
    #[test]
    fn input_params_encode_as_c_string() {
        let encoded = BrainFlowInputParams::from_config(&HeadsetConfig::default())
            .to_c_string()
            .unwrap();
        let text = encoded.to_str().unwrap();
        assert!(text.starts_with('{') && text.contains("\"serial_port\""));
        let nul = HeadsetConfig {
            serial_port: "COM\03".into(),
            ..HeadsetConfig::default()
        };
        assert!(BrainFlowInputParams::from_config(&nul).to_c_string().is_err());
    }
    #[test]
    fn missing_library_is_a_connection_error() {
        let config = HeadsetConfig {
            library_dir: "/nonexistent/brainflow".into(),
            ..HeadsetConfig::default()
        };
        match MuseSession::connect(&config) {
            Err(err) => assert_eq!(err.kind(), crate::drivers::ErrorKind::Connection),
            Ok(_) => panic!("connected without a headset"),
        }
    }
}
