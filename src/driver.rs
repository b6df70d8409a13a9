//! Lifecycle sequencing, request routing and the socket data plane.
//!
//! The driver never blocks. Received bytes are pushed through
//! [`Driver::ingest`], and [`Driver::spin`] must be called periodically to
//! run deadlines, retries, power sequencing and usage accounting. Outcomes
//! are reported to the [`EventHandler`].

use atat::helpers::LossyStr;
use atat::AtatUrc;
use embassy_time::Instant;
use embedded_hal::digital::OutputPin;
use embedded_io::Write;
use heapless::{String, Vec};
use serde::de::DeserializeOwned;

use crate::command::control::types::{Echo, TerminationErrorMode};
use crate::command::control::{SetEcho, SetReportMobileTerminationError};
use crate::command::general::responses::{
    CardIdentification, FirmwareRevision, FirmwareVersion, Imsi,
};
use crate::command::general::{GetCCID, GetFirmwareVersion, GetIMSI};
use crate::command::ip_transport_layer::types::{
    ClosureType, ConnectionMode, RecvDataMode, RingMode,
};
use crate::command::ip_transport_layer::urc::{SocketRing, RING_DATA_LEN};
use crate::command::ip_transport_layer::{
    SetSocketConfigExt, SocketDial, SocketSendExt, SocketShutdown,
};
use crate::command::mobile_control::responses::{NetworkClock, SignalQuality, UtcTime};
use crate::command::mobile_control::types::Functionality;
use crate::command::mobile_control::{GetClock, GetSignalQuality, SetModuleFunctionality};
use crate::command::network_service::types::{
    EdrxMode, OperatorFormat, OperatorSelectionMode, PsmMode,
};
use crate::command::network_service::urc::EdrxInfo;
use crate::command::network_service::{
    SetEdrx, SetOperatorSelection, SetPowerSavingMode, SetPtwEdrx,
};
use crate::command::psn::types::{EPSNetworkRegistrationUrcConfig, GPRSAttachedState};
use crate::command::psn::{
    SetEPSNetworkRegistrationStatus, SetGPRSAttached, SetPDPContextDefinition,
};
use crate::command::system_features::responses::{CwRxRssi, RxTxStats, RxTxStatsResponse};
use crate::command::system_features::types::{CwTxState, RxTxStatsAction, Uart1Mode};
use crate::command::system_features::urc::UpgradeEvent;
use crate::command::system_features::{
    antenna_tuning_command, FactoryRestore, FactorySave, GetCwRx, GetRxTxStats, SetCwTx,
    SetModeActivation, SetRxTxStats, SetSimInterface, SetUart0Config, SetUart1Config,
};
use crate::command::{Urc, AT};
use crate::config::{HwConfig, ModemConfig, OpenMode, SimSlot};
use crate::digest::{FinalError, Frame, Ingress};
use crate::error::Error;
use crate::hex;
use crate::info::{DriverInfo, SimInfo};
use crate::module_timing::{boot_time, reset_time, usage_report_period};
use crate::notification::Notification;
use crate::power::{
    self, Activity, AntennaTuning, ConfigAction, RfTestConfig, StatsRequest, Usage, UsageCounters,
};
use crate::registration::{NetworkStatusInfo, Status};
use crate::request::{Request, RequestEngine, RequestKind, Resolved, ResponseStatus};
use crate::response::{InitStatus, Response, ResponseData};
use crate::socket::{
    Socket, SocketConfig, SocketId, SocketResult, SocketSet, SocketState, MAX_SEND_LEN,
    MAX_SOCKETS,
};
use crate::state::DriverState;
use crate::traits::{Clock, EventHandler};

/// Largest inbound payload carried by a single ring line.
const RX_DATA_LEN: usize = RING_DATA_LEN / 2;

/// PDP context used for the socket traffic
const PDP_CID: u8 = 1;

/// Internal steps of the `init`, `modem_open`, `modem_close` and
/// suspend/resume sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Step {
    Attention { high_speed: bool },
    EchoOff,
    ErrorReporting,
    FirmwareVersion,
    InitAirplane,
    CardId,
    Imsi,
    InitMinimum,
    OpenMinimum,
    NetworkMode,
    SimSelect,
    RegistrationUrc,
    Edrx,
    Ptw,
    Psm,
    PdpContext,
    Operator,
    SocketConfig(u8),
    Functionality,
    OpenCardId,
    Close,
    Suspend,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserOp {
    Raw,
    Rssi,
    RxTxStats,
    RfRssi,
    SimCardId,
    SimImsi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketOp {
    Open,
    Close,
    Send,
}

/// Who is waiting for the pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Step(Step),
    User { user_arg: u32, op: UserOp },
    Socket { id: SocketId, op: SocketOp },
    UtcTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// Modem powered or reset released, check the link once booted
    Boot,
    ReleaseReset,
}

fn cfun(fun: Functionality, origin: Origin) -> Result<Request<Origin>, Error> {
    Request::from_cmd(&SetModuleFunctionality { fun }, RequestKind::Set, origin)
}

fn succeeded(status: ResponseStatus) -> bool {
    matches!(status, ResponseStatus::Success | ResponseStatus::Partial)
}

/// Decodes the first answer line that parses as `T`.
fn decode<T: DeserializeOwned>(raw: &str) -> Option<T> {
    raw.lines()
        .find_map(|line| atat::serde_at::from_slice(line.trim().as_bytes()).ok())
}

/// Driver for a GM02S modem on a serial transport.
pub struct Driver<W, C, H, HW>
where
    W: Write,
    C: Clock,
    H: EventHandler,
    HW: HwConfig,
{
    tx: W,
    clock: C,
    handler: H,
    hw: HW,
    state: DriverState,
    ingress: Ingress,
    engine: RequestEngine<Origin>,
    sockets: SocketSet,
    wait: Option<(Instant, Wait)>,
    config: Option<ModemConfig>,
    open_mode: OpenMode,
    network: NetworkStatusInfo,
    edrx: Option<EdrxInfo>,
    sim: SimInfo,
    firmware: Option<FirmwareVersion>,
    usage: UsageCounters,
    modem_on: bool,
    high_speed: bool,
    ps_status_log: bool,
    init_partial: bool,
    last_error: Option<FinalError>,
    rx_data: Vec<u8, RX_DATA_LEN>,
}

impl<W, C, H, HW> Driver<W, C, H, HW>
where
    W: Write,
    C: Clock,
    H: EventHandler,
    HW: HwConfig,
{
    /// Creates a driver in [`DriverState::Off`]. No pin is touched until
    /// [`Driver::pre_init`] or [`Driver::init`].
    pub fn new(tx: W, clock: C, handler: H, hw: HW) -> Self {
        Self {
            tx,
            clock,
            handler,
            hw,
            state: DriverState::Off,
            ingress: Ingress::new(),
            engine: RequestEngine::default(),
            sockets: SocketSet::new(),
            wait: None,
            config: None,
            open_mode: OpenMode::Off,
            network: NetworkStatusInfo::default(),
            edrx: None,
            sim: SimInfo::default(),
            firmware: None,
            usage: UsageCounters::default(),
            modem_on: false,
            high_speed: false,
            ps_status_log: false,
            init_partial: false,
            last_error: None,
            rx_data: Vec::new(),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Mode the modem was opened with, [`OpenMode::Off`] when not open.
    pub fn get_open_mode(&self) -> OpenMode {
        self.open_mode
    }

    /// A request is pending or a lifecycle sequence is running.
    pub fn is_busy(&self) -> bool {
        self.engine.is_busy() || self.state.in_transition()
    }

    pub fn socket(&self, id: SocketId) -> &Socket {
        self.sockets.get(id)
    }

    pub fn sockets(&self) -> &SocketSet {
        &self.sockets
    }

    pub fn network_status(&self) -> &NetworkStatusInfo {
        &self.network
    }

    pub fn get_info(&self) -> DriverInfo {
        DriverInfo {
            state: self.state,
            modem_on: self.modem_on,
            high_speed_uart: self.high_speed,
            open_mode: self.open_mode,
            psm_enabled: self.config.as_ref().map_or(false, |c| c.psm.enabled),
            network: self.network,
            edrx: self.edrx,
            sim: self.sim.clone(),
            usage: self.usage.usage(),
            firmware: self.firmware,
            busy: self.is_busy(),
            last_error: self.last_error,
        }
    }

    /// Logs modem power state changes at info level instead of trace.
    pub fn enable_ps_status_log(&mut self, enable: bool) {
        self.ps_status_log = enable;
    }

    pub fn usage(&self) -> Usage {
        self.usage.usage()
    }

    pub fn consumption_uah(&self) -> u64 {
        self.usage.consumption_uah()
    }

    pub fn clear_consumption(&mut self) {
        self.usage.clear();
    }

    /// Installs the board glue and forces the driver back to
    /// [`DriverState::Off`], with the modem unpowered.
    pub fn pre_init(&mut self, hw: HW) -> Result<(), Error> {
        self.hw = hw;
        self.abort_all();
        self.ingress.clear();
        self.state = DriverState::Off;
        self.open_mode = OpenMode::Off;
        self.set_power_pin(false)
    }

    /// Boots the modem once to read its identity, then powers it off.
    ///
    /// Completion is reported through [`EventHandler::on_init`].
    pub fn init(&mut self) -> Result<(), Error> {
        if self.state != DriverState::Off {
            return Err(Error::InvalidState);
        }
        self.set_power_pin(true)?;
        self.init_partial = false;
        self.state = DriverState::Probing;
        self.wait = Some((self.clock.now() + boot_time(), Wait::Boot));
        info!("Initializing modem");
        Ok(())
    }

    /// Drives the power load switch. Only while the modem is not in use.
    pub fn set_power(&mut self, on: bool) -> Result<(), Error> {
        match self.state {
            DriverState::Off | DriverState::Shutdown => self.set_power_pin(on),
            _ => Err(Error::InvalidState),
        }
    }

    /// Powers the modem and brings it up in `mode`.
    ///
    /// Completion is reported by [`Notification::OpenDone`].
    pub fn modem_open(&mut self, mode: OpenMode, config: ModemConfig) -> Result<(), Error> {
        match self.state {
            DriverState::Shutdown => {}
            DriverState::Upgrading => return Err(Error::Busy),
            _ => return Err(Error::InvalidState),
        }
        if mode == OpenMode::Off {
            return Err(Error::InvalidParameter);
        }

        self.set_power_pin(true)?;
        self.sim.slot = config.sim_slot;
        self.config = Some(config);
        self.open_mode = mode;
        self.network = NetworkStatusInfo::default();
        self.edrx = None;
        self.state = DriverState::Opening;
        self.wait = Some((self.clock.now() + boot_time(), Wait::Boot));
        info!("Opening modem, {} mode", mode.as_str());
        Ok(())
    }

    /// Cancels all pending work and shuts the modem down.
    ///
    /// Completion is reported by [`Notification::CloseDone`].
    pub fn modem_close(&mut self) -> Result<(), Error> {
        match self.state {
            DriverState::Off | DriverState::Shutdown | DriverState::Closing => return Ok(()),
            DriverState::Upgrading => return Err(Error::Busy),
            _ => {}
        }

        if matches!(
            self.state,
            DriverState::Probing | DriverState::Initializing
        ) {
            self.abort_all();
            self.power_off();
            self.state = DriverState::Off;
            self.open_mode = OpenMode::Off;
            info!("Initialization aborted");
            self.handler.on_init(InitStatus::Failure);
            return Ok(());
        }

        self.abort_all();
        info!("Closing modem");
        self.state = DriverState::Closing;
        self.start(Step::Close);
        Ok(())
    }

    /// Suspends the radio (`true`) or wakes it up (`false`). Normal mode only.
    pub fn modem_suspend(&mut self, suspend: bool) -> Result<(), Error> {
        if self.open_mode != OpenMode::Normal {
            return Err(Error::InvalidState);
        }
        let step = match (suspend, self.state) {
            (true, DriverState::Active) => Step::Suspend,
            (false, DriverState::Sleeping) => Step::Resume,
            _ => return Err(Error::InvalidState),
        };
        if self.engine.is_busy() || self.sockets.in_transition() {
            return Err(Error::Busy);
        }

        self.step_request(step).and_then(|req| self.submit(req))?;
        if step == Step::Resume {
            self.state = DriverState::WaitWakeup;
        }
        Ok(())
    }

    /// Hard resets the modem and opens it again, with `config` or the
    /// configuration of the previous open.
    pub fn reset_and_restart(&mut self, config: Option<ModemConfig>) -> Result<(), Error> {
        match self.state {
            DriverState::Off => return Err(Error::InvalidState),
            DriverState::Upgrading => return Err(Error::Busy),
            _ => {}
        }
        if config.is_none() && self.config.is_none() {
            return Err(Error::InvalidParameter);
        }

        let initializing = matches!(
            self.state,
            DriverState::Probing | DriverState::Initializing
        );
        self.abort_all();
        if initializing {
            self.handler.on_init(InitStatus::Failure);
        }
        if let Some(config) = config {
            self.sim.slot = config.sim_slot;
            self.config = Some(config);
        }
        if self.open_mode == OpenMode::Off {
            self.open_mode = OpenMode::Normal;
        }
        self.state = DriverState::Opening;
        self.set_power_pin(true)?;

        warn!("Hard resetting modem");
        let now = self.clock.now();
        match self.hw.reset_pin() {
            Some(pin) => {
                pin.set_low().map_err(|_| Error::IoPin)?;
                self.wait = Some((now + reset_time(), Wait::ReleaseReset));
            }
            None => {
                warn!("No reset pin configured");
                self.wait = Some((now + boot_time(), Wait::Boot));
            }
        }
        Ok(())
    }

    /// Feeds bytes received from the modem.
    pub fn ingest(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let taken = self.ingress.write(bytes);
            bytes = &bytes[taken..];
            self.drain();
            if self.ingress.is_full() {
                warn!("Receive buffer full, dropped {} bytes", self.ingress.len());
                self.ingress.clear();
            }
        }
    }

    /// Runs deadlines, power sequencing and usage accounting.
    pub fn spin(&mut self) {
        let now = self.clock.now();

        if let Some(resolved) = self.engine.poll(&mut self.tx, now) {
            self.on_resolved(resolved);
            self.drain();
        }

        if let Some((at, wait)) = self.wait {
            if now >= at {
                self.wait = None;
                match wait {
                    Wait::Boot => self.start_attention(true),
                    Wait::ReleaseReset => {
                        if let Some(pin) = self.hw.reset_pin() {
                            if pin.set_high().is_err() {
                                error!("Failed to release modem reset");
                            }
                        }
                        self.wait = Some((now + boot_time(), Wait::Boot));
                    }
                }
            }
        }

        let activity = self.activity();
        if self.usage.tick(now, usage_report_period(), activity) {
            trace!("Usage accounted as {:?}", activity);
        }
    }

    /// Sends a typed command from [`crate::command`], with the timeout and
    /// attempts of its definition. The outcome is delivered to
    /// [`EventHandler::on_response`] with `user_arg`.
    pub fn send_request<Cmd: atat::AtatCmd>(
        &mut self,
        cmd: &Cmd,
        kind: RequestKind,
        user_arg: u32,
    ) -> Result<(), Error> {
        self.user_cmd(cmd, kind, user_arg, UserOp::Raw)
    }

    /// Sends free-form command text. The outcome is delivered to
    /// [`EventHandler::on_response`] with `user_arg`.
    pub fn send_user_at_cmd(
        &mut self,
        text: &str,
        kind: RequestKind,
        user_arg: u32,
    ) -> Result<(), Error> {
        self.check_requests()?;
        let req = Request::from_text(text, kind, Origin::User { user_arg, op: UserOp::Raw })?;
        self.submit(req)
    }

    /// Signal strength, answered with [`ResponseData::Rssi`].
    pub fn get_rssi(&mut self, user_arg: u32) -> Result<(), Error> {
        self.user_cmd(&GetSignalQuality, RequestKind::GetSingle, user_arg, UserOp::Rssi)
    }

    /// Reads (answered with [`ResponseData::RxTxStats`]) or configures the
    /// radio activity statistics.
    pub fn rxtx_stats(&mut self, request: StatsRequest, user_arg: u32) -> Result<(), Error> {
        match request {
            StatsRequest::Get => self.user_cmd(
                &GetRxTxStats,
                RequestKind::GetSingle,
                user_arg,
                UserOp::RxTxStats,
            ),
            StatsRequest::Configure { enable, reset } => {
                let action = match (enable, reset) {
                    (false, false) => RxTxStatsAction::Disable,
                    (true, false) => RxTxStatsAction::Enable,
                    (false, true) => RxTxStatsAction::Reset,
                    (true, true) => RxTxStatsAction::EnableAndReset,
                };
                self.user_cmd(
                    &SetRxTxStats { action },
                    RequestKind::Set,
                    user_arg,
                    UserOp::Raw,
                )
            }
        }
    }

    pub fn sim_enable(&mut self, slot: SimSlot, enable: bool, user_arg: u32) -> Result<(), Error> {
        self.user_cmd(
            &SetSimInterface::new(slot.index(), enable),
            RequestKind::Set,
            user_arg,
            UserOp::Raw,
        )
    }

    /// Selects the speed of the AT UART, `high_speed` for the 921600 baud
    /// profile. Applies after the next reboot.
    pub fn hwcfg_uart0(&mut self, high_speed: bool, user_arg: u32) -> Result<(), Error> {
        self.user_cmd(
            &SetUart0Config::new(high_speed),
            RequestKind::Set,
            user_arg,
            UserOp::Raw,
        )
    }

    /// Routes the second UART to an AT channel or to the debug console.
    pub fn hwcfg_uart1(&mut self, at_mode: bool, user_arg: u32) -> Result<(), Error> {
        let mode = if at_mode { Uart1Mode::At } else { Uart1Mode::Dcp };
        self.user_cmd(
            &SetUart1Config::new(mode),
            RequestKind::Set,
            user_arg,
            UserOp::Raw,
        )
    }

    /// Reads ICCID then IMSI, answered once with [`ResponseData::SimId`].
    pub fn get_sim_info(&mut self, user_arg: u32) -> Result<(), Error> {
        self.user_cmd(&GetCCID, RequestKind::GetSingle, user_arg, UserOp::SimCardId)
    }

    /// Starts or stops a continuous wave transmission.
    pub fn tx_rf_test(&mut self, cfg: RfTestConfig, user_arg: u32) -> Result<(), Error> {
        self.check_manufacturing()?;
        let state = if cfg.tx_enable {
            CwTxState::Start
        } else {
            CwTxState::Stop
        };
        self.user_cmd(
            &SetCwTx {
                state,
                earfcn: cfg.earfcn,
                level: cfg.tx_level,
            },
            RequestKind::Set,
            user_arg,
            UserOp::Raw,
        )
    }

    /// Measures the RSSI on `cfg.earfcn`, answered with
    /// [`ResponseData::RfRssi`].
    pub fn rx_rf_test(&mut self, cfg: RfTestConfig, user_arg: u32) -> Result<(), Error> {
        self.check_manufacturing()?;
        self.user_cmd(
            &GetCwRx { earfcn: cfg.earfcn },
            RequestKind::GetSingle,
            user_arg,
            UserOp::RfRssi,
        )
    }

    pub fn antenna_tuning(&mut self, cfg: &AntennaTuning, user_arg: u32) -> Result<(), Error> {
        self.check_requests()?;
        let cmd = antenna_tuning_command(cfg)?;
        let req = Request::from_text(
            &cmd,
            RequestKind::Set,
            Origin::User { user_arg, op: UserOp::Raw },
        )?;
        self.submit(req)
    }

    pub fn config_save_restore(&mut self, action: ConfigAction, user_arg: u32) -> Result<(), Error> {
        match action {
            ConfigAction::Save => {
                self.user_cmd(&FactorySave, RequestKind::Set, user_arg, UserOp::Raw)
            }
            ConfigAction::Restore => {
                self.user_cmd(&FactoryRestore, RequestKind::Set, user_arg, UserOp::Raw)
            }
        }
    }

    /// Attaches to or detaches from the packet domain.
    pub fn modem_attach(&mut self, attach: bool, user_arg: u32) -> Result<(), Error> {
        let state = if attach {
            GPRSAttachedState::Attached
        } else {
            GPRSAttachedState::Detached
        };
        self.user_cmd(&SetGPRSAttached { state }, RequestKind::Set, user_arg, UserOp::Raw)
    }

    /// Reads the network time, delivered as [`Notification::UtcTime`].
    pub fn get_utc_time(&mut self) -> Result<(), Error> {
        self.check_requests()?;
        let req = Request::from_cmd(&GetClock, RequestKind::GetSingle, Origin::UtcTime)?;
        self.submit(req)
    }

    /// Dials a connection. The outcome is delivered as
    /// [`Notification::SocketOpen`].
    pub fn socket_open(&mut self, config: SocketConfig) -> Result<(), Error> {
        if self.state != DriverState::Active || !self.network.registered() {
            return Err(Error::InvalidState);
        }
        if self.sockets.state(config.id) != SocketState::Closed || self.engine.is_busy() {
            return Err(Error::Busy);
        }

        let dial = SocketDial {
            sid: config.id.get(),
            protocol: config.protocol.into(),
            remote_port: config.remote_port,
            remote_addr: config.remote.as_str(),
            closure_type: ClosureType::Immediate,
            local_port: config.local_port,
            mode: ConnectionMode::Command,
        };
        let origin = Origin::Socket {
            id: config.id,
            op: SocketOp::Open,
        };
        self.submit(Request::from_cmd(&dial, RequestKind::Set, origin)?)?;
        self.sockets.begin_open(&config)
    }

    /// Closes a connection, reported by [`Notification::SocketClose`]. Closing
    /// a closed socket does nothing.
    pub fn socket_close(&mut self, id: SocketId) -> Result<(), Error> {
        match self.sockets.state(id) {
            SocketState::Closed => return Ok(()),
            SocketState::Opening | SocketState::Closing => return Err(Error::Busy),
            SocketState::Open => {}
        }
        if self.engine.is_busy() {
            return Err(Error::Busy);
        }

        let origin = Origin::Socket {
            id,
            op: SocketOp::Close,
        };
        let req = Request::from_cmd(&SocketShutdown { sid: id.get() }, RequestKind::Set, origin)?;
        self.submit(req)?;
        self.sockets.transition(id, SocketState::Closing)
    }

    /// Sends `data` on an open connection. Completion is reported by
    /// [`Notification::SocketTxDone`].
    pub fn socket_send(&mut self, id: SocketId, data: &[u8]) -> Result<(), Error> {
        if self.state != DriverState::Active {
            return Err(Error::InvalidState);
        }
        if data.is_empty() || data.len() > MAX_SEND_LEN {
            return Err(Error::InvalidParameter);
        }
        if self.sockets.state(id) != SocketState::Open {
            return Err(Error::InvalidState);
        }
        if self.engine.is_busy() {
            return Err(Error::Busy);
        }

        let cmd = SocketSendExt {
            sid: id.get(),
            len: data.len() as u16,
        };
        let origin = Origin::Socket {
            id,
            op: SocketOp::Send,
        };
        let req = Request::from_cmd(&cmd, RequestKind::Set, origin)?.with_payload(data)?;
        self.submit(req)?;
        self.usage.count_sequence();
        Ok(())
    }

    fn check_requests(&self) -> Result<(), Error> {
        if !self.state.accepts_requests() {
            Err(Error::InvalidState)
        } else if self.engine.is_busy() {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    fn check_manufacturing(&self) -> Result<(), Error> {
        if self.open_mode != OpenMode::Manufacturing || self.state != DriverState::Active {
            return Err(Error::InvalidState);
        }
        Ok(())
    }

    fn user_cmd<Cmd: atat::AtatCmd>(
        &mut self,
        cmd: &Cmd,
        kind: RequestKind,
        user_arg: u32,
        op: UserOp,
    ) -> Result<(), Error> {
        self.check_requests()?;
        let req = Request::from_cmd(cmd, kind, Origin::User { user_arg, op })?;
        self.submit(req)
    }

    fn submit(&mut self, req: Request<Origin>) -> Result<(), Error> {
        let now = self.clock.now();
        self.engine.submit(&mut self.tx, now, req)
    }

    fn set_power_pin(&mut self, on: bool) -> Result<(), Error> {
        match self.hw.power_pin() {
            Some(pin) => {
                let res = if on { pin.set_high() } else { pin.set_low() };
                res.map_err(|_| Error::IoPin)?;
            }
            None => debug!("No power pin configured"),
        }
        self.modem_on = on;
        Ok(())
    }

    fn power_off(&mut self) {
        if let Err(e) = self.set_power_pin(false) {
            error!("Failed to power off modem: {:?}", e);
        }
    }

    fn user_arg(&self) -> u32 {
        self.config.as_ref().map_or(0, |c| c.user_arg)
    }

    fn emit(&mut self, notification: &Notification<'_>) {
        let user_arg = self.user_arg();
        self.handler.on_notification(notification, user_arg);
    }

    fn activity(&self) -> Activity {
        if !self.modem_on {
            return Activity::Off;
        }
        if matches!(self.engine.origin(), Some(Origin::Socket { .. })) {
            return Activity::Network;
        }
        match self.state {
            DriverState::Sleeping => Activity::DeepSleep,
            DriverState::Off | DriverState::Shutdown => Activity::Off,
            _ => Activity::Active,
        }
    }

    /// Cancels the pending request and forces every socket closed.
    fn abort_all(&mut self) {
        self.wait = None;
        if let Some(resolved) = self.engine.cancel() {
            self.on_resolved(resolved);
        }
        for id in self.sockets.reset_all() {
            self.emit(&Notification::SocketClose {
                id,
                result: SocketResult::Unknown,
            });
        }
    }

    /// Hands every complete frame of the ingress buffer over.
    fn drain(&mut self) {
        while let Some(frame) = self.ingress.next_frame(self.engine.expectation()) {
            self.handle_frame(frame);
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Urc(urc) => self.handle_urc(urc),
            Frame::Answer(line) => match core::str::from_utf8(&line) {
                Ok(line) => {
                    let now = self.clock.now();
                    self.engine.on_answer(line, now);
                }
                Err(_) => warn!("Dropped a non UTF-8 answer: {:?}", LossyStr(&line)),
            },
            Frame::Prompt => {
                if let Some(resolved) = self.engine.on_prompt(&mut self.tx) {
                    self.on_resolved(resolved);
                }
            }
            Frame::Response { result, truncated } => {
                let mut truncated = truncated;
                let result = match result {
                    Ok(data) => {
                        match core::str::from_utf8(&data) {
                            Ok(text) => {
                                for line in text.lines().map(str::trim) {
                                    if !line.is_empty() {
                                        self.route_line(line);
                                    }
                                }
                            }
                            Err(_) => {
                                warn!("Dropped non UTF-8 text: {:?}", LossyStr(&data));
                                truncated = true;
                            }
                        }
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                if let Some(resolved) = self.engine.on_final(result, truncated) {
                    self.on_resolved(resolved);
                }
            }
        }
    }

    /// Routes a line of information text that came with a final result code.
    fn route_line(&mut self, line: &str) {
        let (pending, answer) = match self.engine.expectation() {
            Some(expect) => {
                let claimed = expect
                    .prefix
                    .map_or(false, |prefix| line.as_bytes().starts_with(prefix));
                let answer =
                    expect.kind != RequestKind::Set && (!line.starts_with('+') || claimed);
                (true, answer)
            }
            None => (false, false),
        };

        if !answer {
            if let Some(urc) = <Urc as AtatUrc>::parse(line.as_bytes()) {
                self.handle_urc(urc);
                return;
            }
        }
        if pending {
            let now = self.clock.now();
            self.engine.on_answer(line, now);
        } else {
            trace!("Unhandled line: {}", line);
        }
    }

    fn handle_urc(&mut self, urc: Urc) {
        let open = self.state.is_open();

        match urc {
            Urc::EPSNetworkRegistration(reg) => {
                let info = NetworkStatusInfo::from(&reg);
                debug!("Network status: {}", info.status.as_str());
                self.network = info;
                if open {
                    self.emit(&Notification::NetworkStatus(info));
                }
            }
            Urc::SimStatus(pin) => {
                let status = pin.code;
                debug!("SIM status: {}", status.as_str());
                self.sim.status = Some(status);
                if open {
                    self.emit(&Notification::SimStatus(status));
                }
            }
            Urc::EdrxParameters(params) => {
                let edrx = EdrxInfo::from(&params);
                self.edrx = Some(edrx);
                if open {
                    self.emit(&Notification::EdrxChange(edrx));
                }
            }
            Urc::PowerSavingStatus(pss) => {
                let status = pss.status;
                if self.ps_status_log {
                    info!("Modem power state: {:?}", status);
                } else {
                    trace!("Modem power state: {:?}", status);
                }
                if open {
                    self.emit(&Notification::ModemStatus(status));
                }
            }
            Urc::SocketRing(ring) => self.socket_ring(&ring, open),
            Urc::SocketClosed(closed) => {
                let Ok(id) = SocketId::new(closed.sid) else {
                    warn!("Close of unknown socket {}", closed.sid);
                    return;
                };
                if self.sockets.state(id) != SocketState::Open {
                    return;
                }
                info!("[{}] Closed by remote", closed.sid);
                if self.sockets.transition(id, SocketState::Closing).is_ok()
                    && self.sockets.transition(id, SocketState::Closed).is_ok()
                {
                    self.emit(&Notification::SocketClose {
                        id,
                        result: SocketResult::Success,
                    });
                }
            }
            Urc::Upgrade(upgrade) if open => match upgrade.event() {
                None => trace!("Upgrade phase {}", upgrade.phase.as_str()),
                Some(UpgradeEvent::Start) => {
                    warn!("Modem firmware upgrade started");
                    self.abort_all();
                    self.state = DriverState::Upgrading;
                    self.emit(&Notification::UpgradeStart);
                }
                Some(event) => {
                    if event == UpgradeEvent::Success {
                        info!("Modem firmware upgrade done");
                        self.emit(&Notification::UpgradeSuccess);
                    } else {
                        error!("Modem firmware upgrade failed");
                        self.emit(&Notification::UpgradeFailure);
                    }
                    self.abort_all();
                    self.restart_open(true);
                }
            },
            Urc::SystemStart
                if matches!(
                    self.state,
                    DriverState::Active | DriverState::Sleeping | DriverState::WaitWakeup
                ) =>
            {
                error!("Modem restarted unexpectedly");
                self.emit(&Notification::ModemCrash);
                self.abort_all();
                self.restart_open(false);
            }
            Urc::Upgrade(_) | Urc::SystemStart => trace!("Ignored upgrade or start report"),
        }
    }

    fn socket_ring(&mut self, ring: &SocketRing, open: bool) {
        let Ok(id) = SocketId::new(ring.sid) else {
            warn!("Data for unknown socket {}", ring.sid);
            return;
        };
        if self.sockets.state(id) != SocketState::Open {
            warn!("[{}] Data on a socket that is not open", ring.sid);
            return;
        }
        let decoded = core::str::from_utf8(ring.hex())
            .map_err(|_| hex::DecodeHexError::InvalidHexCharacter)
            .and_then(|hex| hex::decode_hex_into(hex, &mut self.rx_data));
        if let Err(e) = decoded {
            warn!("[{}] Undecodable socket data: {:?}", ring.sid, e);
            return;
        }
        if self.rx_data.len() != usize::from(ring.len) {
            warn!(
                "[{}] Announced {} bytes, got {}",
                ring.sid,
                ring.len,
                self.rx_data.len()
            );
        }
        if open {
            let user_arg = self.user_arg();
            self.handler.on_notification(
                &Notification::SocketRxData {
                    id,
                    data: &self.rx_data,
                },
                user_arg,
            );
        }
    }

    /// Runs the open sequence again with the stored configuration.
    fn restart_open(&mut self, wait_boot: bool) {
        if self.config.is_none() {
            self.power_off();
            self.state = DriverState::Shutdown;
            return;
        }
        self.state = DriverState::Opening;
        if wait_boot {
            self.wait = Some((self.clock.now() + boot_time(), Wait::Boot));
        } else {
            self.start_attention(true);
        }
    }

    fn on_resolved(&mut self, resolved: Resolved<Origin>) {
        if resolved.error.is_some() {
            self.last_error = resolved.error;
        }

        match resolved.origin {
            Origin::Step(step) => {
                if resolved.status != ResponseStatus::Cancelled {
                    self.step_done(step, resolved.status, &resolved.raw);
                }
            }
            Origin::User { user_arg, op } => self.user_done(user_arg, op, &resolved),
            Origin::Socket { id, op } => self.socket_done(id, op, &resolved),
            Origin::UtcTime => {
                if !succeeded(resolved.status) {
                    warn!("Reading the clock failed: {}", resolved.status.as_str());
                    return;
                }
                let time = decode::<NetworkClock>(&resolved.raw)
                    .and_then(|clock| UtcTime::try_from(&clock).ok());
                match time {
                    Some(time) => self.emit(&Notification::UtcTime(time)),
                    None => warn!("Unreadable clock answer"),
                }
            }
        }
    }

    fn user_done(&mut self, user_arg: u32, op: UserOp, resolved: &Resolved<Origin>) {
        let raw = resolved.raw.as_str();
        let mut status = resolved.status;

        if op == UserOp::SimCardId && status != ResponseStatus::Cancelled {
            if let Some(card) =
                decode::<CardIdentification>(raw).and_then(CardIdentification::normalized)
            {
                self.sim.set_card(card);
            }
            let origin = Origin::User {
                user_arg,
                op: UserOp::SimImsi,
            };
            match Request::from_cmd(&GetIMSI, RequestKind::GetSingle, origin)
                .and_then(|req| self.submit(req))
            {
                Ok(()) => return,
                Err(e) => warn!("Reading the IMSI failed: {:?}", e),
            }
        }

        let data = if !succeeded(status) {
            ResponseData::None
        } else {
            match op {
                UserOp::Raw => ResponseData::None,
                UserOp::Rssi => decode::<SignalQuality>(raw)
                    .map_or(ResponseData::None, |q| ResponseData::Rssi(q.rssi_dbm())),
                UserOp::RxTxStats => decode::<RxTxStatsResponse>(raw).map_or(
                    ResponseData::None,
                    |r| ResponseData::RxTxStats(RxTxStats::from(&r)),
                ),
                UserOp::RfRssi => decode::<CwRxRssi>(raw)
                    .map_or(ResponseData::None, |r| ResponseData::RfRssi(r.rssi)),
                UserOp::SimCardId | UserOp::SimImsi => {
                    if let Some(imsi) = decode::<Imsi>(raw).and_then(|i| i.digits()) {
                        self.sim.imsi = Some(imsi);
                    }
                    if !self.sim.is_complete() {
                        status = ResponseStatus::Partial;
                    }
                    ResponseData::SimId(self.sim.clone())
                }
            }
        };

        let response = Response {
            status,
            raw,
            data,
            error: resolved.error,
        };
        self.handler.on_response(user_arg, &response);
    }

    fn socket_done(&mut self, id: SocketId, op: SocketOp, resolved: &Resolved<Origin>) {
        // Force closed sockets were already reported by whoever cancelled
        if resolved.status == ResponseStatus::Cancelled {
            return;
        }
        let result = SocketResult::from_resolution(resolved.status, resolved.error);

        match op {
            SocketOp::Open => {
                let next = if result == SocketResult::Success {
                    SocketState::Open
                } else {
                    SocketState::Closed
                };
                if self.sockets.transition(id, next).is_ok() {
                    info!("[{}] Open: {}", id.get(), result.as_str());
                    self.emit(&Notification::SocketOpen { id, result });
                }
            }
            SocketOp::Close => {
                if self.sockets.transition(id, SocketState::Closed).is_ok() {
                    self.emit(&Notification::SocketClose { id, result });
                }
            }
            SocketOp::Send => self.emit(&Notification::SocketTxDone { id, result }),
        }
    }

    fn config(&self) -> Result<&ModemConfig, Error> {
        self.config.as_ref().ok_or(Error::InvalidParameter)
    }

    fn step_request(&self, step: Step) -> Result<Request<Origin>, Error> {
        let origin = Origin::Step(step);
        match step {
            Step::Attention { .. } => Request::from_cmd(&AT, RequestKind::Set, origin),
            Step::EchoOff => Request::from_cmd(
                &SetEcho {
                    enabled: Echo::Disable,
                },
                RequestKind::Set,
                origin,
            ),
            Step::ErrorReporting => Request::from_cmd(
                &SetReportMobileTerminationError {
                    n: TerminationErrorMode::Enabled,
                },
                RequestKind::Set,
                origin,
            ),
            Step::FirmwareVersion => {
                Request::from_cmd(&GetFirmwareVersion, RequestKind::GetSingle, origin)
            }
            Step::CardId | Step::OpenCardId => {
                Request::from_cmd(&GetCCID, RequestKind::GetSingle, origin)
            }
            Step::Imsi => Request::from_cmd(&GetIMSI, RequestKind::GetSingle, origin),
            Step::InitAirplane | Step::Suspend => cfun(Functionality::AirplaneMode, origin),
            Step::InitMinimum | Step::OpenMinimum | Step::Close => {
                cfun(Functionality::Minimum, origin)
            }
            Step::Resume => cfun(Functionality::Full, origin),
            Step::Functionality => {
                let fun = match self.open_mode {
                    OpenMode::Normal => Functionality::Full,
                    OpenMode::Manufacturing => Functionality::TestMode,
                    _ => Functionality::AirplaneMode,
                };
                cfun(fun, origin)
            }
            Step::NetworkMode => Request::from_cmd(
                &SetModeActivation {
                    mode: self.config()?.network_type.into(),
                },
                RequestKind::Set,
                origin,
            ),
            Step::SimSelect => {
                let slot = self.config()?.sim_slot;
                Request::from_cmd(
                    &SetSimInterface::new(slot.index(), true),
                    RequestKind::Set,
                    origin,
                )
            }
            Step::RegistrationUrc => Request::from_cmd(
                &SetEPSNetworkRegistrationStatus {
                    n: EPSNetworkRegistrationUrcConfig::UrcPsm,
                },
                RequestKind::Set,
                origin,
            ),
            Step::Edrx => {
                let edrx = self.config()?.edrx;
                let value: String<4> = power::bit_string(edrx.requested_value, 4);
                let mode = if edrx.enabled {
                    EdrxMode::EnableWithUrc
                } else {
                    EdrxMode::Disable
                };
                Request::from_cmd(
                    &SetEdrx {
                        mode,
                        act_type: edrx.act_type.into(),
                        requested_edrx_value: value.as_str(),
                    },
                    RequestKind::Set,
                    origin,
                )
            }
            Step::Ptw => {
                let edrx = self.config()?.edrx;
                let ptw: String<4> = power::bit_string(edrx.ptw, 4);
                let value: String<4> = power::bit_string(edrx.requested_value, 4);
                Request::from_cmd(
                    &SetPtwEdrx {
                        mode: EdrxMode::EnableWithUrc,
                        act_type: edrx.act_type.into(),
                        requested_ptw: ptw.as_str(),
                        requested_edrx_value: value.as_str(),
                    },
                    RequestKind::Set,
                    origin,
                )
            }
            Step::Psm => {
                let psm = self.config()?.psm;
                let tau: String<8> = power::bit_string(psm.tau, 8);
                let active_time: String<8> = power::bit_string(psm.active_time, 8);
                let cmd = if psm.enabled {
                    SetPowerSavingMode {
                        mode: PsmMode::Enable,
                        requested_periodic_rau: None,
                        requested_gprs_ready_timer: None,
                        requested_periodic_tau: Some(tau.as_str()),
                        requested_active_time: Some(active_time.as_str()),
                    }
                } else {
                    SetPowerSavingMode {
                        mode: PsmMode::Disable,
                        requested_periodic_rau: None,
                        requested_gprs_ready_timer: None,
                        requested_periodic_tau: None,
                        requested_active_time: None,
                    }
                };
                Request::from_cmd(&cmd, RequestKind::Set, origin)
            }
            Step::PdpContext => Request::from_cmd(
                &SetPDPContextDefinition {
                    cid: PDP_CID,
                    pdp_type: "IP",
                    apn: self.config()?.apn.as_str(),
                },
                RequestKind::Set,
                origin,
            ),
            Step::Operator => Request::from_cmd(
                &SetOperatorSelection {
                    mode: OperatorSelectionMode::Manual,
                    format: Some(OperatorFormat::Numeric),
                    oper: Some(self.config()?.operator()),
                },
                RequestKind::Set,
                origin,
            ),
            Step::SocketConfig(sid) => Request::from_cmd(
                &SetSocketConfigExt {
                    sid,
                    ring_mode: RingMode::WithData,
                    recv_data_mode: RecvDataMode::Hex,
                    keepalive: 0,
                },
                RequestKind::Set,
                origin,
            ),
        }
    }

    /// Sends `step`. A step that cannot be sent counts as failed.
    fn start(&mut self, step: Step) {
        if let Err(e) = self.step_request(step).and_then(|req| self.submit(req)) {
            warn!("{:?} not sent: {:?}", step, e);
            self.step_done(step, ResponseStatus::Error, "");
        }
    }

    fn start_attention(&mut self, high_speed: bool) {
        let baud = if high_speed {
            HW::HIGH_BAUD_RATE
        } else {
            HW::LOW_BAUD_RATE
        };
        self.hw.set_baud_rate(baud);
        self.high_speed = high_speed;
        self.start(Step::Attention { high_speed });
    }

    fn next_open_step(&self, step: Step) -> Step {
        let manual_operator = self
            .config
            .as_ref()
            .map_or(false, |c| !c.operator().is_empty());
        let edrx_enabled = self.config.as_ref().map_or(false, |c| c.edrx.enabled);
        match step {
            Step::OpenMinimum => Step::NetworkMode,
            Step::NetworkMode => Step::SimSelect,
            Step::SimSelect => Step::RegistrationUrc,
            Step::RegistrationUrc => Step::Edrx,
            Step::Edrx if edrx_enabled => Step::Ptw,
            Step::Edrx | Step::Ptw => Step::Psm,
            Step::Psm => Step::PdpContext,
            Step::PdpContext if manual_operator => Step::Operator,
            Step::PdpContext | Step::Operator => Step::SocketConfig(1),
            Step::SocketConfig(sid) if usize::from(sid) < MAX_SOCKETS => {
                Step::SocketConfig(sid + 1)
            }
            _ => Step::Functionality,
        }
    }

    fn step_done(&mut self, step: Step, status: ResponseStatus, raw: &str) {
        let ok = succeeded(status);

        match step {
            Step::Attention { high_speed } => {
                if ok {
                    debug!("Modem answered, high speed: {}", high_speed);
                    if self.state == DriverState::Probing {
                        self.state = DriverState::Initializing;
                    }
                    self.start(Step::EchoOff);
                } else if high_speed {
                    self.start_attention(false);
                } else {
                    error!("Modem not responding");
                    self.sequence_failed();
                }
            }
            Step::EchoOff => {
                if !ok {
                    warn!("Disabling echo failed");
                }
                self.start(Step::ErrorReporting);
            }
            Step::ErrorReporting => {
                if !ok {
                    warn!("Enabling error reporting failed");
                }
                if self.state == DriverState::Initializing {
                    self.start(Step::FirmwareVersion);
                } else {
                    self.start(Step::OpenMinimum);
                }
            }
            Step::FirmwareVersion => {
                self.firmware = decode::<FirmwareRevision>(raw)
                    .and_then(|rev| FirmwareVersion::try_from(&rev).ok());
                if self.firmware.is_none() {
                    warn!("Firmware version unavailable");
                    self.init_partial = true;
                }
                self.start(Step::InitAirplane);
            }
            Step::InitAirplane => {
                if !ok {
                    warn!("Airplane mode failed");
                }
                self.start(Step::CardId);
            }
            Step::CardId => {
                match decode::<CardIdentification>(raw).and_then(CardIdentification::normalized) {
                    Some(card) => self.sim.set_card(card),
                    None => {
                        warn!("ICCID unavailable");
                        self.init_partial = true;
                    }
                }
                self.start(Step::Imsi);
            }
            Step::Imsi => {
                match decode::<Imsi>(raw).and_then(|i| i.digits()) {
                    Some(imsi) => self.sim.imsi = Some(imsi),
                    None => {
                        warn!("IMSI unavailable");
                        self.init_partial = true;
                    }
                }
                self.start(Step::InitMinimum);
            }
            Step::InitMinimum => {
                self.power_off();
                self.state = DriverState::Shutdown;
                let status = if self.init_partial {
                    InitStatus::Partial
                } else {
                    InitStatus::Success
                };
                info!("Modem initialized: {:?}", status);
                self.handler.on_init(status);
            }
            Step::Functionality => {
                if !ok {
                    error!("Setting modem functionality failed");
                    self.sequence_failed();
                } else if self.open_mode == OpenMode::ManufacturingCcid {
                    self.start(Step::OpenCardId);
                } else {
                    self.open_done();
                }
            }
            Step::OpenCardId => {
                if let Some(card) =
                    decode::<CardIdentification>(raw).and_then(CardIdentification::normalized)
                {
                    self.sim.set_card(card);
                }
                self.open_done();
            }
            Step::Close => {
                if !ok {
                    warn!("Minimum functionality failed: {}", status.as_str());
                }
                self.power_off();
                self.state = DriverState::Shutdown;
                self.open_mode = OpenMode::Off;
                info!("Modem closed");
                self.emit(&Notification::CloseDone);
            }
            Step::Suspend => {
                if !ok {
                    warn!("Suspend failed: {}", status.as_str());
                    return;
                }
                self.state = DriverState::Sleeping;
                for id in self.sockets.reset_all() {
                    self.emit(&Notification::SocketClose {
                        id,
                        result: SocketResult::Unknown,
                    });
                }
                self.network.status = Status::Suspended;
                self.emit(&Notification::NetworkStatus(self.network));
            }
            Step::Resume => {
                if ok {
                    self.state = DriverState::Active;
                } else {
                    warn!("Resume failed: {}", status.as_str());
                    self.state = DriverState::Sleeping;
                }
            }
            Step::OpenMinimum
            | Step::NetworkMode
            | Step::SimSelect
            | Step::RegistrationUrc
            | Step::Edrx
            | Step::Ptw
            | Step::Psm
            | Step::PdpContext
            | Step::Operator
            | Step::SocketConfig(_) => {
                if !ok {
                    warn!("{:?} failed: {}", step, status.as_str());
                }
                self.start(self.next_open_step(step));
            }
        }
    }

    fn open_done(&mut self) {
        self.state = DriverState::Active;
        info!("Modem open, {} mode", self.open_mode.as_str());
        self.emit(&Notification::OpenDone { success: true });
    }

    fn sequence_failed(&mut self) {
        self.power_off();
        match self.state {
            DriverState::Probing | DriverState::Initializing => {
                self.state = DriverState::Off;
                self.handler.on_init(InitStatus::Failure);
            }
            _ => {
                self.state = DriverState::Shutdown;
                self.open_mode = OpenMode::Off;
                self.emit(&Notification::OpenDone { success: false });
            }
        }
    }
}
