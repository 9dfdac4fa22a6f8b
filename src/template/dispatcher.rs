//! Message dispatcher
//!
//! Reads one message at a time from the navigation console, acknowledges it,
//! drives the workflow and answers targeting requests. Only transport
//! failures end a session; malformed input is logged and skipped.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{IgtlError, Result, TemplateError};
use crate::io::{IgtlConnection, TemplateListener};
use crate::protocol::header::Header;
use crate::protocol::message::{IgtlMessage, Message};
use crate::protocol::types::{StatusMessage, StringMessage, TransformMessage};
use crate::template::device::{Category, DeviceId};
use crate::template::grid::GridSpec;
use crate::template::registration::Registration;
use crate::template::report::{self, TARGET_DEVICE};
use crate::template::targeting::{find_nearest_hole, SelectedHole};
use crate::template::workflow::{Command, Workflow};
use crate::template::zframe::{zframe_configuration, ZFRAME_DEVICE};
use crate::template::{Point, Pose};

/// Session state and message handling for one console connection
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    grid: GridSpec,
    workflow: Workflow,
    registration: Registration,
    last_target: Option<Pose>,
    last_selection: Option<SelectedHole>,
}

impl Dispatcher {
    /// Dispatcher for the production template
    pub fn new() -> Self {
        Self::with_grid(GridSpec::TEMPLATE)
    }

    /// Dispatcher for a custom hole layout
    pub fn with_grid(grid: GridSpec) -> Self {
        Dispatcher {
            grid,
            workflow: Workflow::new(),
            registration: Registration::new(),
            last_target: None,
            last_selection: None,
        }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Last pose received on a `TGT_` device while targeting
    pub fn last_target(&self) -> Option<&Pose> {
        self.last_target.as_ref()
    }

    /// Last successful snap
    pub fn last_selection(&self) -> Option<&SelectedHole> {
        self.last_selection.as_ref()
    }

    /// Process messages until the peer disconnects
    ///
    /// # Errors
    ///
    /// Transport errors other than a disconnect.
    pub async fn run<S>(&mut self, conn: &mut IgtlConnection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        info!("Session started");
        loop {
            match self.handle_next(conn).await {
                Ok(()) => {}
                Err(e) if e.is_disconnect() => {
                    info!("Client disconnected");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "Session aborted");
                    return Err(e);
                }
            }
        }
    }

    /// Read and handle exactly one message
    pub async fn handle_next<S>(&mut self, conn: &mut IgtlConnection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let header = conn.receive_header().await?;
        let msg_type = header.type_str().to_string();

        match msg_type.as_str() {
            "TRANSFORM" => self.on_transform(conn, header).await,
            "STRING" => self.on_string(conn, header).await,
            "STATUS" => {
                // Console status reports carry nothing the template acts on
                if let Some(status) = receive_or_drop::<StatusMessage, S>(conn, header).await? {
                    debug!(
                        code = status.content.code,
                        text = %status.content.status_string,
                        "Status ignored"
                    );
                }
                Ok(())
            }
            other => {
                warn!(msg_type = other, "Unsupported message type, body skipped");
                conn.discard_body(&header).await
            }
        }
    }

    async fn on_transform<S>(&mut self, conn: &mut IgtlConnection<S>, header: Header) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(msg) = receive_or_drop::<TransformMessage, S>(conn, header).await? else {
            return Ok(());
        };
        let device = match DeviceId::parse(msg.header.device_str()) {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "Transform dropped");
                return Ok(());
            }
        };

        debug!(
            device = %device,
            matrix = ?msg.content.matrix,
            "Transform received"
        );

        let ack = IgtlMessage::new(msg.content.clone(), &device.ack_name())?;
        conn.send(&ack).await?;

        let pose = msg.content.to_matrix4();

        match device.category {
            Category::Calibration if self.workflow.accepts_calibration_pose() => {
                self.calibrate(pose);
            }
            Category::Targeting if self.workflow.accepts_target_pose() => {
                let result = self.target(pose);

                let status = IgtlMessage::new(report::targeting_status(&result), TARGET_DEVICE)?;
                conn.send(&status).await?;

                if let Ok(selected) = result {
                    let snapped = IgtlMessage::new(
                        TransformMessage::from_matrix4(&selected.pose),
                        TARGET_DEVICE,
                    )?;
                    conn.send(&snapped).await?;
                }
            }
            _ => {
                debug!(
                    device = %device,
                    startup = %self.workflow.startup(),
                    calibration = %self.workflow.calibration(),
                    targeting = %self.workflow.targeting(),
                    "Transform acknowledged without action"
                );
            }
        }

        Ok(())
    }

    async fn on_string<S>(&mut self, conn: &mut IgtlConnection<S>, header: Header) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let device = match DeviceId::parse(header.device_str()) {
            Ok(device) if device.category == Category::Command => device,
            Ok(device) => {
                debug!(device = %device, "Non-command string skipped");
                return conn.discard_body(&header).await;
            }
            Err(e) => {
                warn!(error = %e, "String dropped");
                return conn.discard_body(&header).await;
            }
        };

        let Some(msg) = receive_or_drop::<StringMessage, S>(conn, header).await? else {
            return Ok(());
        };

        info!(device = %device, command = msg.content.as_str(), "Command received");

        let ack = IgtlMessage::new(msg.content.clone(), &device.ack_name())?;
        conn.send(&ack).await?;

        match msg.content.as_str().parse::<Command>() {
            Ok(Command::StartUp) => self.startup(conn).await?,
            Ok(Command::Calibration) => {
                self.workflow.start_calibration();
            }
            Ok(Command::Targeting) => {
                self.workflow.start_targeting();
            }
            Err(()) => debug!(command = msg.content.as_str(), "Unknown command ignored"),
        }

        Ok(())
    }

    /// Run the startup phase: send the Z-frame geometry
    ///
    /// # Errors
    ///
    /// The send failure; startup is then marked failed.
    pub async fn startup<S>(&mut self, conn: &mut IgtlConnection<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.workflow.begin_startup();

        let sent = match IgtlMessage::new(zframe_configuration(), ZFRAME_DEVICE) {
            Ok(msg) => conn.send(&msg).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                self.workflow.finish_startup(true);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to send Z-frame configuration");
                self.workflow.finish_startup(false);
                Err(e)
            }
        }
    }

    /// Store a calibration pose and complete the calibration phase
    pub fn calibrate(&mut self, pose: Pose) {
        info!("Calibration received");
        self.registration.set(pose);
        self.workflow.complete_calibration();
    }

    /// Snap the translation of `pose` to the nearest hole
    pub fn target(&mut self, pose: Pose) -> std::result::Result<SelectedHole, TemplateError> {
        let target = Point::new(pose[(0, 3)], pose[(1, 3)], pose[(2, 3)]);
        self.last_target = Some(pose);

        match find_nearest_hole(&self.grid, &self.registration, &target) {
            Ok(selected) => {
                info!(
                    label = %report::HoleLabel::from_index(selected.index),
                    row = selected.index.row,
                    column = selected.index.column,
                    depth = selected.depth,
                    "Target snapped"
                );
                self.last_selection = Some(selected.clone());
                Ok(selected)
            }
            Err(e) => {
                warn!(error = %e, "Targeting failed");
                Err(e)
            }
        }
    }
}

/// Serve a single console session according to `config`
///
/// Binds, waits for one client within the accept window, processes messages
/// until the client disconnects and returns.
///
/// # Errors
///
/// - [`IgtlError::InvalidPort`] / [`IgtlError::Io`] - bind failure
/// - [`IgtlError::AcceptTimeout`] - nobody connected in time
pub async fn serve(config: &ServerConfig) -> Result<Dispatcher> {
    let listener = TemplateListener::from_config(config).await?;
    let mut conn = listener
        .wait_for_client(config.accept_timeout, config.accept_attempts)
        .await?;

    let mut dispatcher = Dispatcher::new();
    dispatcher.run(&mut conn).await?;
    info!("Session finished");
    Ok(dispatcher)
}

/// Receive a body, or log and drop it when it is corrupt or malformed
///
/// The body has been consumed either way, so the next header is aligned.
async fn receive_or_drop<T, S>(
    conn: &mut IgtlConnection<S>,
    header: Header,
) -> Result<Option<IgtlMessage<T>>>
where
    T: Message,
    S: AsyncRead + AsyncWrite + Unpin,
{
    match conn.receive_body::<T>(header).await {
        Ok(msg) => Ok(Some(msg)),
        Err(e @ IgtlError::Io(_)) => Err(e),
        Err(e) => {
            warn!(msg_type = T::message_type(), error = %e, "Message dropped");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{StatusCode, TrajectoryMessage};
    use crate::protocol::{calculate_crc, DeviceName, Timestamp, TypeName};
    use crate::template::grid::HoleIndex;
    use crate::template::workflow::PhaseStatus;
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix4;
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    type Client = IgtlConnection<DuplexStream>;

    fn spawn_session(dispatcher: Dispatcher) -> (Client, JoinHandle<Dispatcher>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let mut dispatcher = dispatcher;
            let mut conn = IgtlConnection::new(server);
            dispatcher.run(&mut conn).await.unwrap();
            dispatcher
        });
        (IgtlConnection::new(client), handle)
    }

    async fn send<T: Message>(client: &mut Client, content: T, device: &str) {
        client
            .send(&IgtlMessage::new(content, device).unwrap())
            .await
            .unwrap();
    }

    async fn recv<T: Message>(client: &mut Client) -> IgtlMessage<T> {
        let header = client.receive_header().await.unwrap();
        assert_eq!(header.type_str(), T::message_type());
        client.receive_body(header).await.unwrap()
    }

    async fn command(client: &mut Client, id: &str, cmd: &str) {
        send(client, StringMessage::new(cmd), id).await;
        let ack = recv::<StringMessage>(client).await;
        assert_eq!(ack.content.as_str(), cmd);
    }

    async fn start_up(client: &mut Client) {
        command(client, "CMD_0001", "START_UP").await;
        let zframe = recv::<TrajectoryMessage>(client).await;
        assert_eq!(zframe.header.device_str(), ZFRAME_DEVICE);
    }

    async fn calibrate(client: &mut Client, pose: TransformMessage) {
        command(client, "CMD_0002", "CALIBRATION").await;
        send(client, pose, "CLB_0003").await;
        recv::<TransformMessage>(client).await;
    }

    #[tokio::test]
    async fn test_ack_echoes_matrix() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        let pose = TransformMessage::translation(1.5, -2.0, 80.25);
        send(&mut client, pose.clone(), "TGT_0007").await;
        let ack = recv::<TransformMessage>(&mut client).await;
        assert_eq!(ack.header.device_str(), "ACK_0007");
        assert_eq!(ack.content, pose);

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert!(dispatcher.last_target().is_none());
    }

    #[tokio::test]
    async fn test_startup_sends_zframe() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        start_up(&mut client).await;

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert_eq!(dispatcher.workflow().startup(), PhaseStatus::Done);
    }

    #[tokio::test]
    async fn test_startup_failure() {
        let (client, server) = tokio::io::duplex(1024);
        drop(client);
        let mut conn = IgtlConnection::new(server);
        let mut dispatcher = Dispatcher::new();

        assert!(dispatcher.startup(&mut conn).await.is_err());
        assert_eq!(dispatcher.workflow().startup(), PhaseStatus::Failed);
    }

    #[tokio::test]
    async fn test_calibration_sets_registration() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        start_up(&mut client).await;
        calibrate(&mut client, TransformMessage::translation(0.0, 0.0, 100.0)).await;

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert_eq!(dispatcher.workflow().calibration(), PhaseStatus::Done);
        let registration = dispatcher.registration().transform().unwrap();
        assert_eq!(registration[(2, 3)], 100.0);
    }

    #[tokio::test]
    async fn test_calibration_pose_ignored_before_command() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        start_up(&mut client).await;
        send(&mut client, TransformMessage::identity(), "CLB_0004").await;
        let ack = recv::<TransformMessage>(&mut client).await;
        assert_eq!(ack.header.device_str(), "ACK_0004");

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert!(!dispatcher.registration().is_set());
        assert_eq!(dispatcher.workflow().calibration(), PhaseStatus::Waiting);
    }

    #[tokio::test]
    async fn test_targeting_round_trip() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        start_up(&mut client).await;
        calibrate(&mut client, TransformMessage::identity()).await;
        command(&mut client, "CMD_0004", "TARGETING").await;

        // Hole (2, 9) of the identity-registered template, 20 mm deep
        send(&mut client, TransformMessage::translation(-7.5, 21.64, 50.0), "TGT_0005").await;
        let ack = recv::<TransformMessage>(&mut client).await;
        assert_eq!(ack.header.device_str(), "ACK_0005");

        let status = recv::<StatusMessage>(&mut client).await;
        assert_eq!(status.header.device_str(), TARGET_DEVICE);
        assert!(status.content.is_ok());
        assert_eq!(status.content.status_string, "C,2,20");

        let snapped = recv::<TransformMessage>(&mut client).await;
        assert_eq!(snapped.header.device_str(), TARGET_DEVICE);
        assert_abs_diff_eq!(snapped.content.matrix[0][3], -7.5, epsilon = 1e-4);
        assert_abs_diff_eq!(snapped.content.matrix[1][3], 21.64, epsilon = 1e-4);
        assert_abs_diff_eq!(snapped.content.matrix[2][3], 30.0, epsilon = 1e-4);

        drop(client);
        let dispatcher = handle.await.unwrap();
        let selected = dispatcher.last_selection().unwrap();
        assert_eq!(selected.index, HoleIndex::new(2, 9));
        assert_abs_diff_eq!(selected.depth, 20.0, epsilon = 1e-4);
        assert_eq!(dispatcher.workflow().targeting(), PhaseStatus::Running);
    }

    #[tokio::test]
    async fn test_targeting_rejected_before_calibration() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        start_up(&mut client).await;
        command(&mut client, "CMD_0002", "TARGETING").await;
        send(&mut client, TransformMessage::identity(), "TGT_0003").await;
        recv::<TransformMessage>(&mut client).await;

        // Next reply must be the ack of this command, not a status
        command(&mut client, "CMD_0004", "NOOP").await;

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert_eq!(dispatcher.workflow().targeting(), PhaseStatus::Waiting);
        assert!(dispatcher.last_selection().is_none());
    }

    #[tokio::test]
    async fn test_invalid_device_id_dropped() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        send(&mut client, TransformMessage::identity(), "TGT_abc").await;
        send(&mut client, StringMessage::new("START_UP"), "CMD_x").await;
        command(&mut client, "CMD_0009", "NOOP").await;

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert_eq!(dispatcher.workflow().startup(), PhaseStatus::Waiting);
    }

    #[tokio::test]
    async fn test_non_command_string_skipped() {
        let (mut client, handle) = spawn_session(Dispatcher::new());

        send(&mut client, StringMessage::new("START_UP"), "TGT_0001").await;
        send(&mut client, StatusMessage::ok("console ready"), "Console").await;
        command(&mut client, "CMD_0002", "NOOP").await;

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert_eq!(dispatcher.workflow().startup(), PhaseStatus::Waiting);
    }

    #[tokio::test]
    async fn test_corrupted_body_dropped() {
        let (client, handle) = spawn_session(Dispatcher::new());
        let mut raw = client.into_inner();

        let mut data = IgtlMessage::new(TransformMessage::identity(), "TGT_0001")
            .unwrap()
            .encode()
            .unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        raw.write_all(&data).await.unwrap();

        let mut client = IgtlConnection::new(raw);
        command(&mut client, "CMD_0002", "NOOP").await;

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_type_skipped() {
        let (client, handle) = spawn_session(Dispatcher::new());
        let mut raw = client.into_inner();

        // One POINT element, never decoded by the server
        let body = vec![0xAB; 136];
        let header = Header {
            version: 1,
            type_name: TypeName::new("POINT").unwrap(),
            device_name: DeviceName::new("Console").unwrap(),
            timestamp: Timestamp::now(),
            body_size: body.len() as u64,
            crc: calculate_crc(&body),
        };
        raw.write_all(&header.encode()).await.unwrap();
        raw.write_all(&body).await.unwrap();

        let mut client = IgtlConnection::new(raw);
        start_up(&mut client).await;
        command(&mut client, "CMD_0004", "NOOP").await;

        drop(client);
        let dispatcher = handle.await.unwrap();
        assert_eq!(dispatcher.workflow().startup(), PhaseStatus::Done);
        assert_eq!(dispatcher.workflow().calibration(), PhaseStatus::Waiting);
    }

    #[test]
    fn test_target_before_registration() {
        let mut dispatcher = Dispatcher::new();
        let result = dispatcher.target(Matrix4::identity());
        assert_eq!(result, Err(TemplateError::NotRegistered));
        assert_eq!(
            report::targeting_status(&result).code,
            StatusCode::ConfigError as u16
        );
        assert!(dispatcher.last_target().is_some());
        assert!(dispatcher.last_selection().is_none());
    }
}
