// Licensed under the Apache-2.0 license

use crate::binding::{ProtocolFamily, TransportError};
use crate::registry::TransportRegistry;
use ipmi_common::codec::IpmiCodec;
use ipmi_common::protocol::base::{
    is_soft_error_completion_code, IpmiMsgHeader, IPMI_MAX_LUN, IPMI_MSG_HEADER_LEN,
};
use log::{debug, error, warn};
use mgmt_config::PollBudget;
use pldm_common::codec::PldmCodec;
use pldm_common::protocol::base::{
    PldmMsgHeader, PldmMsgType, PldmSupportedType, PLDM_MSG_HEADER_LEN,
};
use smlang::statemachine;
use thiserror::Error;

/// Largest request or response body the dispatcher carries. Transports
/// with a smaller hardware maximum reject oversized frames themselves.
pub const MAX_MGMT_PAYLOAD_SIZE: usize = 1024;

const MAX_FRAME_SIZE: usize = MAX_MGMT_PAYLOAD_SIZE + PLDM_MSG_HEADER_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no transport registered for the protocol family")]
    TransportNotFound,
    #[error("transport stayed busy past the ready poll budget")]
    TransportNotReady,
    #[error("another command is already in flight on this binding")]
    Busy,
    #[error("response did not arrive within the receive budget")]
    Timeout,
    #[error("transport hardware fault")]
    DeviceError,
    #[error("protocol or command not supported by the binding")]
    Unsupported,
    #[error(
        "response truncated ({actual_len} bytes offered), completion code {completion_code:#04x}"
    )]
    ResponseTruncated {
        completion_code: u8,
        actual_len: usize,
    },
    #[error("invalid request or response parameters")]
    InvalidParameter,
}

/// A management command as the caller submits it. Never mutated after
/// submission; the dispatcher copies what it needs.
#[derive(Debug, Clone, Copy)]
pub struct CommandRequest<'a> {
    pub protocol: ProtocolFamily,
    /// IPMI NetFn or PLDM message type. Ignored for ASF, whose frames
    /// are self-describing.
    pub type_or_netfn: u8,
    pub command: u8,
    pub lun: u8,
    pub payload: &'a [u8],
    /// Zero means fire-and-forget: the exchange completes at send and
    /// no receive is attempted.
    pub expected_response_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResponse {
    /// First byte of the response body for IPMI-family protocols.
    /// Callers check this before trusting the rest of the payload.
    pub completion_code: u8,
    /// Bytes written to the caller's response buffer.
    pub len: usize,
}

/// Request metadata the state machine carries while the exchange is in
/// flight.
#[derive(Debug, Clone, Copy)]
pub struct PendingCommand {
    pub protocol: ProtocolFamily,
    pub type_or_netfn: u8,
    pub command: u8,
    pub lun: u8,
    pub instance_id: u8,
    pub expected_response_size: usize,
}

// The dispatch state machine. Terminal states hand control back to the
// caller and are reclaimed to Idle before the dispatcher call returns;
// between a begin and its complete the machine parks in
// AwaitingResponse, which is what makes a second submission fail fast
// with Busy.
statemachine! {
    derive_states: [Debug, Clone, Copy],
    derive_events: [Clone, Debug],
    transitions: {
        *Idle + Submit(PendingCommand) / on_submit = Submitting,
        Submitting + BindingResolved / on_binding_resolved = WaitingForTransport,
        WaitingForTransport + RequestSent / on_request_sent = AwaitingResponse,
        AwaitingResponse + ResponseReceived(CommandResponse) / on_response_received = Completed,
        Completed + Reclaim / on_reclaim = Idle,
        Failed + Reclaim / on_reclaim = Idle,
        _ + DispatchFailed(DispatchError) / on_dispatch_failed = Failed,
    }
}

/// Hooks invoked on every dispatch transition. The defaults keep the
/// bookkeeping the dispatcher relies on; tests and platform code can
/// layer their own observation on top.
pub trait StateMachineActions {
    fn on_submit(&mut self, ctx: &mut InnerContext, command: PendingCommand) -> Result<(), ()> {
        ctx.pending = Some(command);
        ctx.response = None;
        ctx.last_error = None;
        Ok(())
    }

    fn on_binding_resolved(&mut self, _ctx: &mut InnerContext) -> Result<(), ()> {
        Ok(())
    }

    fn on_request_sent(&mut self, _ctx: &mut InnerContext) -> Result<(), ()> {
        Ok(())
    }

    fn on_response_received(
        &mut self,
        ctx: &mut InnerContext,
        response: CommandResponse,
    ) -> Result<(), ()> {
        ctx.response = Some(response);
        Ok(())
    }

    fn on_dispatch_failed(
        &mut self,
        ctx: &mut InnerContext,
        error: DispatchError,
    ) -> Result<(), ()> {
        ctx.last_error = Some(error);
        Ok(())
    }

    fn on_reclaim(&mut self, ctx: &mut InnerContext) -> Result<(), ()> {
        ctx.pending = None;
        Ok(())
    }
}

pub struct DefaultActions;
impl StateMachineActions for DefaultActions {}

#[derive(Default)]
pub struct InnerContext {
    pub pending: Option<PendingCommand>,
    pub response: Option<CommandResponse>,
    pub last_error: Option<DispatchError>,
}

pub struct Context<T: StateMachineActions> {
    inner: T,
    pub inner_ctx: InnerContext,
}

impl<T: StateMachineActions> Context<T> {
    pub fn new(actions: T) -> Self {
        Self {
            inner: actions,
            inner_ctx: InnerContext::default(),
        }
    }
}

// Delegates the generated context trait to the pluggable actions, with
// the shared bookkeeping context threaded through.
macro_rules! delegate_to_inner_action {
    ($($fn_name:ident ($($arg:ident : $arg_ty:ty),*) -> $ret:ty),* $(,)?) => {
        $(
            fn $fn_name(&mut self, $($arg: $arg_ty),*) -> $ret {
                debug!("Dispatch action: {}", stringify!($fn_name));
                self.inner.$fn_name(&mut self.inner_ctx, $($arg),*)
            }
        )*
    };
}

impl<T: StateMachineActions> StateMachineContext for Context<T> {
    delegate_to_inner_action! {
        on_submit(command: PendingCommand) -> Result<(), ()>,
        on_binding_resolved() -> Result<(), ()>,
        on_request_sent() -> Result<(), ()>,
        on_response_received(response: CommandResponse) -> Result<(), ()>,
        on_dispatch_failed(error: DispatchError) -> Result<(), ()>,
        on_reclaim() -> Result<(), ()>,
    }
}

/// Routes management commands to the registered transport binding and
/// enforces timeout, serialization, and completion-code semantics
/// uniformly.
///
/// The dispatcher never retries on its own: terminal failures go
/// straight back to the caller, which knows its own timing budget.
pub struct CommandDispatcher<A: StateMachineActions> {
    sm: StateMachine<Context<A>>,
    budget: PollBudget,
    next_instance_id: u8,
    soft_error_count: u32,
}

impl CommandDispatcher<DefaultActions> {
    pub fn new(budget: PollBudget) -> Self {
        Self::with_actions(DefaultActions, budget)
    }
}

impl<A: StateMachineActions> CommandDispatcher<A> {
    pub fn with_actions(actions: A, budget: PollBudget) -> Self {
        Self {
            sm: StateMachine::new(Context::new(actions)),
            budget,
            next_instance_id: 0,
            soft_error_count: 0,
        }
    }

    pub fn state(&self) -> &States {
        self.sm.state()
    }

    /// Transient BMC completion codes observed so far. Platform health
    /// code reads this when deciding whether the interface is degraded.
    pub fn soft_error_count(&self) -> u32 {
        self.soft_error_count
    }

    pub fn last_error(&self) -> Option<DispatchError> {
        self.sm.context().inner_ctx.last_error
    }

    /// Submits a command and waits for its response. Equivalent to
    /// [`Self::begin_command`] followed by [`Self::complete_command`].
    pub fn submit_command(
        &mut self,
        registry: &mut TransportRegistry,
        request: &CommandRequest<'_>,
        response_buf: &mut [u8],
    ) -> Result<CommandResponse, DispatchError> {
        self.begin_command(registry, request)?;
        self.complete_command(registry, response_buf)
    }

    /// Resolves the binding, waits for readiness, and sends the request
    /// frame. On success the exchange is in flight and the dispatcher
    /// refuses further submissions until [`Self::complete_command`]
    /// runs.
    pub fn begin_command(
        &mut self,
        registry: &mut TransportRegistry,
        request: &CommandRequest<'_>,
    ) -> Result<(), DispatchError> {
        if !matches!(self.sm.state(), States::Idle) {
            // One request per binding, no queueing: nothing in this
            // environment could drain a queue behind the caller's back.
            return Err(DispatchError::Busy);
        }
        if request.payload.len() > MAX_MGMT_PAYLOAD_SIZE || request.lun > IPMI_MAX_LUN {
            return Err(DispatchError::InvalidParameter);
        }

        let pending = PendingCommand {
            protocol: request.protocol,
            type_or_netfn: request.type_or_netfn,
            command: request.command,
            lun: request.lun,
            instance_id: self.next_instance_id,
            expected_response_size: request.expected_response_size,
        };

        // Encode before touching the state machine so a malformed
        // request fails without leaving Idle or touching hardware.
        let mut frame = [0u8; MAX_FRAME_SIZE];
        let header_len = encode_request_header(&pending, &mut frame)?;
        frame[header_len..header_len + request.payload.len()].copy_from_slice(request.payload);
        let frame_len = header_len + request.payload.len();

        self.process(Events::Submit(pending))?;

        let Some(binding) = registry.resolve_mut(request.protocol) else {
            error!("No transport registered for {:?}", request.protocol);
            return self.fail(DispatchError::TransportNotFound);
        };
        self.process(Events::BindingResolved)?;

        let mut polls: u32 = 0;
        while !binding.is_ready() {
            polls += 1;
            if polls >= self.budget.ready_poll_count {
                error!(
                    "{:?} transport stayed busy for {} polls",
                    request.protocol, polls
                );
                return self.fail(DispatchError::TransportNotReady);
            }
        }

        if let Err(e) = binding.send(&frame[..frame_len]) {
            error!("{:?} transport send failed: {}", request.protocol, e);
            return self.fail(transport_to_dispatch(e));
        }

        if request.protocol == ProtocolFamily::Pldm {
            // Instance ids are 5 bits on the wire.
            self.next_instance_id = (self.next_instance_id + 1) & 0x1F;
        }

        self.process(Events::RequestSent)
    }

    /// Receives and decodes the response for the in-flight exchange.
    /// The caller's buffer bounds how much payload is kept; a longer
    /// response is truncated with the completion code copied first and
    /// reported as [`DispatchError::ResponseTruncated`].
    pub fn complete_command(
        &mut self,
        registry: &mut TransportRegistry,
        response_buf: &mut [u8],
    ) -> Result<CommandResponse, DispatchError> {
        if !matches!(self.sm.state(), States::AwaitingResponse) {
            return Err(DispatchError::InvalidParameter);
        }
        let pending = match self.sm.context().inner_ctx.pending {
            Some(p) => p,
            None => return Err(DispatchError::InvalidParameter),
        };

        if pending.expected_response_size == 0 {
            // Fire-and-forget (ASF alerts, resets): the exchange is
            // complete once the frame left the transport.
            return self.finish(CommandResponse {
                completion_code: 0,
                len: 0,
            });
        }

        if response_buf.is_empty() {
            return self.fail(DispatchError::InvalidParameter);
        }

        let Some(binding) = registry.resolve_mut(pending.protocol) else {
            return self.fail(DispatchError::TransportNotFound);
        };

        let mut rx = [0u8; MAX_FRAME_SIZE];
        let received = match binding.receive(&mut rx) {
            Ok(n) => n,
            Err(e) => {
                error!("{:?} transport receive failed: {}", pending.protocol, e);
                return self.fail(transport_to_dispatch(e));
            }
        };

        let body = match decode_response_header(&pending, &rx[..received]) {
            Ok(body) => body,
            Err(e) => return self.fail(e),
        };

        if body.is_empty() {
            error!("{:?} response carried no completion code", pending.protocol);
            return self.fail(DispatchError::DeviceError);
        }

        let completion_code = body[0];
        if pending.protocol == ProtocolFamily::Ipmi
            && is_soft_error_completion_code(completion_code)
        {
            self.soft_error_count += 1;
        }
        if completion_code != 0 {
            warn!(
                "{:?} command {:#04x} completed with code {:#04x}",
                pending.protocol, pending.command, completion_code
            );
        }

        // Completion code first, so truncation can never lose it.
        let copy_len = body.len().min(response_buf.len());
        response_buf[..copy_len].copy_from_slice(&body[..copy_len]);

        let response = CommandResponse {
            completion_code,
            len: copy_len,
        };

        if body.len() > response_buf.len() {
            warn!(
                "{:?} response of {} bytes truncated to caller buffer of {}",
                pending.protocol,
                body.len(),
                response_buf.len()
            );
            let actual_len = body.len();
            self.finish(response)?;
            return Err(DispatchError::ResponseTruncated {
                completion_code,
                actual_len,
            });
        }

        self.finish(response)
    }

    fn finish(&mut self, response: CommandResponse) -> Result<CommandResponse, DispatchError> {
        self.process(Events::ResponseReceived(response))?;
        self.process(Events::Reclaim)?;
        Ok(response)
    }

    fn fail<T>(&mut self, error: DispatchError) -> Result<T, DispatchError> {
        let _ = self.sm.process_event(Events::DispatchFailed(error));
        let _ = self.sm.process_event(Events::Reclaim);
        Err(error)
    }

    fn process(&mut self, event: Events) -> Result<(), DispatchError> {
        self.sm
            .process_event(event)
            .map(|_| ())
            .map_err(|_| DispatchError::Busy)
    }
}

fn transport_to_dispatch(error: TransportError) -> DispatchError {
    match error {
        TransportError::Busy => DispatchError::TransportNotReady,
        TransportError::Timeout => DispatchError::Timeout,
        TransportError::DeviceError => DispatchError::DeviceError,
        TransportError::Unsupported => DispatchError::Unsupported,
    }
}

/// Packs the protocol header in front of the request payload. ASF
/// frames carry their own framing and get no extra header.
fn encode_request_header(
    pending: &PendingCommand,
    frame: &mut [u8],
) -> Result<usize, DispatchError> {
    match pending.protocol {
        ProtocolFamily::Ipmi => {
            let header =
                IpmiMsgHeader::from_parts(pending.type_or_netfn, pending.lun, pending.command);
            IpmiCodec::encode(&header, frame).map_err(|_| DispatchError::InvalidParameter)
        }
        ProtocolFamily::Pldm => {
            let pldm_type = PldmSupportedType::try_from(pending.type_or_netfn)
                .map_err(|_| DispatchError::InvalidParameter)?;
            let header = PldmMsgHeader::new(
                pending.instance_id,
                PldmMsgType::Request,
                pldm_type,
                pending.command,
            );
            PldmCodec::encode(&header, frame).map_err(|_| DispatchError::InvalidParameter)
        }
        ProtocolFamily::Asf => Ok(0),
    }
}

/// Strips and sanity-checks the protocol header of a response frame,
/// returning the body with the completion code at byte 0. Mismatched
/// echo fields are logged but delivered; the completion code is the
/// caller's source of truth.
fn decode_response_header<'a>(
    pending: &PendingCommand,
    frame: &'a [u8],
) -> Result<&'a [u8], DispatchError> {
    match pending.protocol {
        ProtocolFamily::Ipmi => {
            if frame.len() < IPMI_MSG_HEADER_LEN {
                return Err(DispatchError::DeviceError);
            }
            let header: IpmiMsgHeader<[u8; IPMI_MSG_HEADER_LEN]> =
                IpmiCodec::decode(frame).map_err(|_| DispatchError::DeviceError)?;
            if !header.is_response() || header.request_netfn() != (pending.type_or_netfn & !0x01) {
                warn!(
                    "IPMI response NetFn {:#04x} does not match request {:#04x}",
                    header.netfn(),
                    pending.type_or_netfn
                );
            }
            if header.cmd() != pending.command {
                warn!(
                    "IPMI response command {:#04x} does not match request {:#04x}",
                    header.cmd(),
                    pending.command
                );
            }
            Ok(&frame[IPMI_MSG_HEADER_LEN..])
        }
        ProtocolFamily::Pldm => {
            if frame.len() < PLDM_MSG_HEADER_LEN {
                return Err(DispatchError::DeviceError);
            }
            let header: PldmMsgHeader<[u8; PLDM_MSG_HEADER_LEN]> =
                PldmCodec::decode(frame).map_err(|_| DispatchError::DeviceError)?;
            if header.is_request() || !header.is_hdr_ver_valid() {
                error!("PLDM frame is not a valid response");
                return Err(DispatchError::DeviceError);
            }
            if header.instance_id() != pending.instance_id {
                warn!(
                    "PLDM response instance id {} does not match request {}",
                    header.instance_id(),
                    pending.instance_id
                );
            }
            Ok(&frame[PLDM_MSG_HEADER_LEN..])
        }
        // ASF responses are raw frames; nothing to strip.
        ProtocolFamily::Asf => Ok(frame),
    }
}
