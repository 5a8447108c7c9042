use anyhow::Result;
use std::sync::Arc;

use crate::aci::{self, ControllerClient, PushOutcome};
use crate::config::Config;
use crate::models::*;
use crate::render::{self, CommandRenderer, RenderTarget};
use crate::ssh::{self, CliTransport};

/// Per-run tally, logged once the inventory is exhausted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Rendered and logged only (dry-run)
    pub rendered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Applied,
    Skipped,
    Failed,
    Rendered,
}

/// Provisioner walks the inventory one record at a time and pushes SNMPv3 settings
pub struct Provisioner {
    config: Config,
    renderer: CommandRenderer,
    transport: Arc<dyn CliTransport>,
    dry_run: bool,
}

impl Provisioner {
    pub fn new(config: Config, renderer: CommandRenderer, transport: Arc<dyn CliTransport>) -> Self {
        Self {
            config,
            renderer,
            transport,
            dry_run: false,
        }
    }

    /// Render and log instead of touching devices or controllers
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process every record in order. Stops at the first error that is not a
    /// per-record condition (unknown tag, rejected controller push); a
    /// controller login failure comes back as [`aci::ControllerError`].
    pub async fn run<I>(&self, records: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<InventoryRecord>>,
    {
        let mut summary = RunSummary::default();

        for record in records {
            let record = record?;
            match self.process_record(&record).await? {
                RecordOutcome::Applied => summary.applied += 1,
                RecordOutcome::Skipped => summary.skipped += 1,
                RecordOutcome::Failed => summary.failed += 1,
                RecordOutcome::Rendered => summary.rendered += 1,
            }
        }

        if self.dry_run {
            tracing::info!(
                "[dry-run] Run complete: {} rendered, {} skipped, nothing applied",
                summary.rendered,
                summary.skipped
            );
        } else {
            tracing::info!(
                "Run complete: {} applied, {} skipped, {} failed",
                summary.applied,
                summary.skipped,
                summary.failed
            );
        }
        Ok(summary)
    }

    async fn process_record(&self, record: &InventoryRecord) -> Result<RecordOutcome> {
        // Every branch reads the same canonical config; nothing is carried between records
        let (device_type, target) = match self.renderer.render_tag(&record.device_type, &self.config.snmp) {
            Ok(rendered) => rendered,
            Err(e) if render::is_unsupported_tag(&e) => {
                tracing::warn!("{}: {}", record.ip_address, e);
                return Ok(RecordOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        match target {
            RenderTarget::Commands(commands) => self.provision_cli(device_type, record, &commands).await,
            RenderTarget::Controller => self.provision_controller(record).await,
        }
    }

    async fn provision_cli(
        &self,
        device_type: DeviceType,
        record: &InventoryRecord,
        commands: &[String],
    ) -> Result<RecordOutcome> {
        let device = DeviceDescriptor {
            device_type,
            host: record.ip_address.clone(),
            port: self.config.ssh_port,
            credentials: self.config.credentials.clone(),
        };

        if self.dry_run {
            tracing::info!("[dry-run] {} {}:", device_type, device.host);
            for command in commands {
                tracing::info!("[dry-run]   {}", self.redact(command));
            }
            return Ok(RecordOutcome::Rendered);
        }

        ssh::dispatch_cli(self.transport.as_ref(), &device, commands).await?;
        Ok(RecordOutcome::Applied)
    }

    async fn provision_controller(&self, record: &InventoryRecord) -> Result<RecordOutcome> {
        let client = ControllerClient::new(record.controller_address()?, &self.config.controller_tls)?;

        if self.dry_run {
            let payload = aci::snmp_user_payload(&self.config);
            tracing::info!(
                "[dry-run] ACI {}: POST /api/mo/uni/userext/user-{}.json (authType={}, privType={})",
                client.base_url(),
                payload.user_name(),
                payload.snmp_user.attributes.auth_type,
                payload.snmp_user.attributes.priv_type
            );
            return Ok(RecordOutcome::Rendered);
        }

        match aci::dispatch_controller(&client, &self.config).await? {
            PushOutcome::Applied => Ok(RecordOutcome::Applied),
            PushOutcome::Rejected { .. } => Ok(RecordOutcome::Failed),
        }
    }

    /// Mask SNMP passwords in anything that is only logged
    fn redact(&self, line: &str) -> String {
        let mut out = line.to_string();
        for secret in [&self.config.snmp.auth_password, &self.config.snmp.priv_password] {
            if !secret.is_empty() {
                out = out.replace(secret.as_str(), "********");
            }
        }
        out
    }
}
