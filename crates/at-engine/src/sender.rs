//! SMS send state machine
//!
//! Drives the ordered AT dialogue for one outbound message:
//!
//! 1. open the port, `AT` (required), `ATE0`
//! 2. status probes, USSD balance probe, optional modem reset
//! 3. message format and text parameters
//! 4. `AT+CMGS`, falling back to PDU mode when no `>` prompt appears
//! 5. message body + Ctrl-Z, then the final confirmation
//!
//! Every exchange lands in the [`StepLog`], whether it succeeded or not.

use std::time::Duration;

use at_protocol::command::{DEFAULT_TERMINATORS, SUBMIT_TERMINATORS};
use at_protocol::response::{clean, find_terminator, has_prompt, parse_ussd};
use at_protocol::{classify, encode_body, pdu, sanitize, AtCommand, Rejection, SmsMode};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::error::ModemError;
use crate::link::Link;
use crate::request::ResolvedSend;
use crate::types::{SendOutcome, StepLog};

/// Best-effort status queries issued before every send
const STATUS_PROBES: [AtCommand; 6] = [
    AtCommand::SignalQuality,
    AtCommand::SimStatus,
    AtCommand::NetworkRegistration,
    AtCommand::SmsCenter,
    AtCommand::SmsMemory,
    AtCommand::Operator,
];

const FINAL_RESPONSE: &str = "Final response";

/// Send one message and report every step
///
/// The request's timeout bounds the whole dialogue. When it fires the
/// outcome fails with a timeout; when `cancel` fires it fails as cancelled.
pub async fn send_sms<C: Connector>(
    connector: &C,
    config: &EngineConfig,
    request: &ResolvedSend,
    cancel: &CancellationToken,
) -> SendOutcome {
    let started = Instant::now();
    let mut steps = StepLog::default();

    info!(
        "Sending SMS to {} via {} ({} mode)",
        request.to, request.port, request.mode
    );

    // On deadline the dialogue is cancelled, then allowed to log and close
    let operation = cancel.child_token();
    let result = {
        let dialogue = run(connector, config, request, &operation, &mut steps);
        tokio::pin!(dialogue);
        tokio::select! {
            result = &mut dialogue => result,
            _ = tokio::time::sleep(request.timeout) => {
                operation.cancel();
                dialogue.await
            }
        }
    };

    let result = match result {
        Err(ModemError::Cancelled { command, partial }) if !cancel.is_cancelled() => {
            Err(ModemError::Timeout {
                command,
                after_ms: request.timeout.as_millis() as u64,
                partial,
            })
        }
        other => other,
    };

    match &result {
        Ok(id) => info!(
            "SMS to {} sent (reference {})",
            request.to,
            id.as_deref().unwrap_or("none")
        ),
        Err(e) => warn!("SMS to {} failed: {}", request.to, e),
    }

    SendOutcome::new(
        &request.to,
        &request.port,
        request.mode,
        steps,
        started.elapsed(),
        result,
    )
}

async fn run<C: Connector>(
    connector: &C,
    config: &EngineConfig,
    request: &ResolvedSend,
    cancel: &CancellationToken,
    steps: &mut StepLog,
) -> Result<Option<String>, ModemError> {
    let label = format!("open {} @ {}", request.port, request.baud_rate);
    let io = match connector.open(&request.port, request.baud_rate) {
        Ok(io) => io,
        Err(e) => {
            let err = ModemError::PortOpen {
                port: request.port.clone(),
                reason: e.to_string(),
            };
            steps.error(&label, &err);
            return Err(err);
        }
    };
    steps.entry(&label, "connected");

    let mut link = Link::new(&request.port, request.baud_rate, io, config.timings.poll());
    let result = Dialogue {
        link: &mut link,
        config,
        cancel,
        steps,
    }
    .run(request)
    .await;
    link.close().await;
    result
}

/// One send dialogue over an open link
struct Dialogue<'a, T> {
    link: &'a mut Link<T>,
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
    steps: &'a mut StepLog,
}

impl<T> Dialogue<'_, T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn run(&mut self, request: &ResolvedSend) -> Result<Option<String>, ModemError> {
        let config = self.config;
        let timings = &config.timings;

        self.exchange(&AtCommand::Test, timings.command())
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    e
                } else {
                    ModemError::ModemUnresponsive {
                        reason: e.to_string(),
                    }
                }
            })?;

        self.probe(&AtCommand::EchoOff, timings.command()).await?;
        for command in &STATUS_PROBES {
            self.probe(command, timings.command()).await?;
        }

        self.check_balance().await?;

        if config.reset_before_send {
            self.reset_modem().await?;
        }

        match request.mode {
            SmsMode::Text => self.submit_text(request).await?,
            SmsMode::Pdu => self.submit_pdu(request, "in PDU mode").await?,
        }

        self.await_confirmation().await
    }

    /// Run one command, logging the step either way
    async fn exchange(
        &mut self,
        command: &AtCommand,
        timeout: Duration,
    ) -> Result<String, ModemError> {
        let line = command.line();
        self.exchange_as(&line, command, timeout).await
    }

    async fn exchange_as(
        &mut self,
        label: &str,
        command: &AtCommand,
        timeout: Duration,
    ) -> Result<String, ModemError> {
        let result = self
            .link
            .transact(command, command.terminators(), timeout, self.cancel)
            .await;
        match &result {
            Ok(response) => self.steps.entry(label, response),
            Err(e) => self.steps.error(label, e),
        }
        result
    }

    /// Best-effort command: failures are swallowed, cancellation is not
    async fn probe(
        &mut self,
        command: &AtCommand,
        timeout: Duration,
    ) -> Result<Option<String>, ModemError> {
        match self.exchange(command, timeout).await {
            Ok(response) => Ok(Some(response)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("{} failed on {}: {}", command, self.link.port(), e);
                Ok(None)
            }
        }
    }

    async fn check_balance(&mut self) -> Result<(), ModemError> {
        let config = self.config;
        let Some(code) = config.balance_ussd.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(());
        };

        let command = AtCommand::Ussd(code.to_string());
        let Some(response) = self.probe(&command, config.timings.ussd()).await? else {
            return Ok(());
        };

        let text = parse_ussd(&response).unwrap_or_else(|| clean(&response));
        if let Some(marker) = config.balance_markers.find(&response) {
            warn!("Balance check matched {:?}: {}", marker, text);
            return Err(Rejection::InsufficientBalance(sanitize(&text)).into());
        }
        debug!("Balance on {}: {}", self.link.port(), text);
        Ok(())
    }

    async fn reset_modem(&mut self) -> Result<(), ModemError> {
        let config = self.config;
        let timings = &config.timings;
        self.probe(&AtCommand::Reset, timings.command()).await?;
        self.pause("modem restart", timings.reset_settle()).await?;

        match self
            .exchange_as("AT (after restart)", &AtCommand::Test, timings.command())
            .await
        {
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("Modem on {} did not answer after restart: {}", self.link.port(), e);
                Ok(())
            }
            Ok(_) => Ok(()),
        }
    }

    /// Cancellable sleep
    async fn pause(&self, label: &str, duration: Duration) -> Result<(), ModemError> {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(ModemError::Cancelled {
                command: label.to_string(),
                partial: String::new(),
            }),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn submit_text(&mut self, request: &ResolvedSend) -> Result<(), ModemError> {
        let config = self.config;
        self.exchange(&AtCommand::MessageFormat(SmsMode::Text), config.timings.mode())
            .await?;
        self.exchange(
            &AtCommand::TextParams(config.text_params.clone()),
            config.timings.mode(),
        )
        .await?;

        if self.initiate(&AtCommand::SubmitText(request.to.clone())).await? {
            return self.transmit(&request.message).await;
        }

        info!("No input prompt in text mode on {}, trying PDU mode", self.link.port());
        self.steps.note("Trying PDU mode as fallback...");
        self.submit_pdu(request, "in either mode").await
    }

    async fn submit_pdu(
        &mut self,
        request: &ResolvedSend,
        attempted: &'static str,
    ) -> Result<(), ModemError> {
        let pdu = pdu::encode_submit(&request.to, &request.message);
        self.exchange(&AtCommand::MessageFormat(SmsMode::Pdu), self.config.timings.mode())
            .await?;

        if !self
            .initiate(&AtCommand::SubmitPdu(pdu::octet_length(&pdu)))
            .await?
        {
            return Err(ModemError::NoInputPrompt { attempted });
        }
        self.transmit(&pdu).await
    }

    /// Start a submit; `Ok(false)` when the modem never showed the prompt
    async fn initiate(&mut self, command: &AtCommand) -> Result<bool, ModemError> {
        match self.exchange(command, self.config.timings.prompt()).await {
            Ok(response) => Ok(has_prompt(&response)),
            Err(ModemError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn transmit(&mut self, body: &str) -> Result<(), ModemError> {
        let label = format!("Message body ({} chars) + Ctrl-Z", body.chars().count());
        if self.cancel.is_cancelled() {
            let err = ModemError::Cancelled {
                command: label.clone(),
                partial: String::new(),
            };
            self.steps.error(&label, &err);
            return Err(err);
        }

        match self.link.write(&encode_body(body)).await {
            Ok(()) => {
                self.steps.entry(&label, "sent");
                Ok(())
            }
            Err(e) => {
                self.steps.error(&label, &e);
                Err(e)
            }
        }
    }

    async fn await_confirmation(&mut self) -> Result<Option<String>, ModemError> {
        let config = self.config;
        let timings = &config.timings;
        let mut response = match self
            .link
            .collect(
                FINAL_RESPONSE,
                SUBMIT_TERMINATORS,
                timings.final_response(),
                self.cancel,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.steps.error(FINAL_RESPONSE, &e);
                return Err(e);
            }
        };

        // `+CMGS: <n>` can arrive ahead of its OK line
        if find_terminator(&response, DEFAULT_TERMINATORS).is_none() {
            match self
                .link
                .collect(
                    FINAL_RESPONSE,
                    DEFAULT_TERMINATORS,
                    timings.command(),
                    self.cancel,
                )
                .await
            {
                Ok(rest) => response.push_str(&rest),
                Err(e) if e.is_cancelled() => {
                    self.steps.error(FINAL_RESPONSE, &e);
                    return Err(e);
                }
                Err(e) => response.push_str(e.partial().unwrap_or_default()),
            }
        }

        self.steps.entry(FINAL_RESPONSE, &response);
        Ok(classify(&response)?)
    }
}
