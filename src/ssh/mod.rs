use anyhow::Result;
use async_trait::async_trait;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::models::{DeviceDescriptor, DeviceType};

/// Opens authenticated command-line sessions to devices
#[async_trait]
pub trait CliTransport: Send + Sync {
    async fn open_session(&self, device: &DeviceDescriptor) -> Result<Box<dyn CliSession>>;
}

/// A live command-line session. Commands are applied in order; output is returned untouched.
#[async_trait]
pub trait CliSession: Send {
    async fn execute(&mut self, commands: &[String]) -> Result<String>;
}

/// Push a rendered command set to one device.
/// The returned output is not inspected for device-side errors.
pub async fn dispatch_cli(
    transport: &dyn CliTransport,
    device: &DeviceDescriptor,
    commands: &[String],
) -> Result<String> {
    tracing::info!("Connecting to {} {}:{}", device.device_type, device.host, device.port);
    let mut session = transport.open_session(device).await?;

    tracing::debug!("Sending {} commands to {}", commands.len(), device.host);
    let output = session.execute(commands).await?;

    tracing::info!("SNMPv3 configuration sent to {}", device.host);
    tracing::debug!("{} output:\n{}", device.host, output);
    Ok(output)
}

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// ssh2-backed transport
#[derive(Debug, Clone, Default)]
pub struct SshTransport {
    /// 0 means block indefinitely
    pub timeout_secs: u64,
}

impl SshTransport {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl CliTransport for SshTransport {
    async fn open_session(&self, device: &DeviceDescriptor) -> Result<Box<dyn CliSession>> {
        let host = device.host.clone();
        let port = device.port;
        let user = device.credentials.username.clone();
        let pass = device.credentials.password.clone();
        let timeout_secs = self.timeout_secs;

        let session = tokio::task::spawn_blocking(move || {
            ssh_connect(&host, port, &user, &pass, timeout_secs)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
        .map_err(|e| anyhow::anyhow!("{}: {}", device.host, e))?;

        Ok(Box::new(SshSession {
            session: Some(session),
            device_type: device.device_type,
            secret: device.credentials.secret.clone(),
        }))
    }
}

/// Create an SSH session and authenticate with password + keyboard-interactive.
/// This is blocking, so call from a spawn_blocking context.
fn ssh_connect(host: &str, port: u16, user: &str, pass: &str, timeout_secs: u64) -> Result<ssh2::Session, String> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("Invalid address {}:{}: {}", host, port, e))?
        .next()
        .ok_or_else(|| format!("No address found for {}:{}", host, port))?;

    let tcp = if timeout_secs > 0 {
        TcpStream::connect_timeout(&addr, Duration::from_secs(timeout_secs))
    } else {
        TcpStream::connect(addr)
    }
    .map_err(|e| format!("TCP connection failed: {}", e))?;

    if timeout_secs > 0 {
        tcp.set_read_timeout(Some(Duration::from_secs(timeout_secs))).ok();
        tcp.set_write_timeout(Some(Duration::from_secs(timeout_secs))).ok();
    }

    let mut session = ssh2::Session::new()
        .map_err(|e| format!("Failed to create SSH session: {}", e))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(session_timeout_ms(timeout_secs));
    session.handshake()
        .map_err(|e| format!("SSH handshake failed: {}", e))?;

    match session.userauth_password(user, pass) {
        Ok(_) if session.authenticated() => return Ok(session),
        _ => {}
    }

    // Some IOS/NX-OS images only offer keyboard-interactive
    let mut prompter = PasswordPrompt { password: pass.to_string() };
    let _ = session.userauth_keyboard_interactive(user, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err("SSH authentication failed: all methods exhausted".to_string())
    }
}

/// libssh2 takes its blocking timeout in milliseconds as a u32; 0 blocks forever
fn session_timeout_ms(timeout_secs: u64) -> u32 {
    timeout_secs.saturating_mul(1000).min(u32::MAX as u64) as u32
}

/// Lines written to the interactive shell for one command set: privilege
/// elevation, configuration mode entry/exit, and logout around the payload.
pub fn session_script(device_type: DeviceType, secret: &str, commands: &[String]) -> Vec<String> {
    let mut script = Vec::with_capacity(commands.len() + 5);

    if device_type.has_privileged_mode() && !secret.is_empty() {
        script.push("enable".to_string());
        script.push(secret.to_string());
    }
    if device_type.uses_config_mode() {
        script.push("configure terminal".to_string());
    }
    script.extend(commands.iter().cloned());
    if device_type.uses_config_mode() {
        script.push("end".to_string());
    }
    script.push("exit".to_string());

    script
}

struct SshSession {
    session: Option<ssh2::Session>,
    device_type: DeviceType,
    secret: String,
}

#[async_trait]
impl CliSession for SshSession {
    async fn execute(&mut self, commands: &[String]) -> Result<String> {
        let session = self
            .session
            .take()
            .ok_or_else(|| anyhow::anyhow!("SSH session already closed"))?;
        let script = session_script(self.device_type, &self.secret, commands);

        let (session, output) = tokio::task::spawn_blocking(move || {
            let output = ssh_run_interactive(&session, &script);
            (session, output)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?;

        self.session = Some(session);
        output.map_err(|e| anyhow::anyhow!(e))
    }
}

/// Feed lines to a PTY shell (network devices need one for config mode) and collect the transcript.
/// This is blocking, so call from a spawn_blocking context.
fn ssh_run_interactive(session: &ssh2::Session, lines: &[String]) -> Result<String, String> {
    let mut channel = session.channel_session()
        .map_err(|e| format!("Failed to open channel: {}", e))?;

    channel.request_pty("vt100", None, None)
        .map_err(|e| format!("Failed to request PTY: {}", e))?;
    channel.shell()
        .map_err(|e| format!("Failed to start shell: {}", e))?;

    for line in lines {
        channel.write_all(line.as_bytes())
            .and_then(|_| channel.write_all(b"\n"))
            .map_err(|e| format!("Failed to send command: {}", e))?;
    }
    channel.flush()
        .map_err(|e| format!("Failed to flush channel: {}", e))?;
    channel.send_eof()
        .map_err(|e| format!("Failed to send EOF: {}", e))?;

    let output = read_transcript(&mut channel)?;

    channel.wait_close()
        .map_err(|e| format!("Failed to close channel: {}", e))?;

    Ok(output)
}

/// Drain a session transcript. Non-UTF-8 bytes from the device are replaced, never an error.
fn read_transcript<R: Read>(reader: &mut R) -> Result<String, String> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)
        .map_err(|e| format!("Failed to read output: {}", e))?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
