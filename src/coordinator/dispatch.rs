//! Per-client command dispatch
//!
//! One session runs per client connection, stateless across commands.
//! Parse failures, routing failures and worker failures all answer with a
//! single error line and leave the connection open; only an I/O failure
//! on the client's own stream ends the loop.

use crate::common::protocol::{self, ClientCommand, WorkerCommand, WorkerReply};
use crate::common::{CoordinatorConfig, Error, Result};
use crate::coordinator::audit;
use crate::coordinator::registry::WorkerRegistry;
use crate::coordinator::router::Router;
use crate::coordinator::rpc;
use crate::coordinator::transfer;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

pub struct ClientSession {
    registry: Arc<WorkerRegistry>,
    router: Router,
    config: CoordinatorConfig,
}

impl ClientSession {
    pub fn new(registry: Arc<WorkerRegistry>, config: CoordinatorConfig) -> Self {
        let router = Router::new(registry.clone());
        Self {
            registry,
            router,
            config,
        }
    }

    /// Serve one client until its stream closes.
    pub async fn run(
        &self,
        mut lines: Lines<BufReader<OwnedReadHalf>>,
        mut writer: OwnedWriteHalf,
    ) -> Result<()> {
        write_line(&mut writer, protocol::WELCOME).await?;

        while let Some(line) = lines.next_line().await? {
            tracing::debug!(command = %line, "client command");
            self.handle_line(&line, &mut writer).await?;
        }
        Ok(())
    }

    /// Errors returned here are client-stream I/O failures; every command
    /// outcome, including command errors, is written as a reply line.
    async fn handle_line(&self, line: &str, writer: &mut OwnedWriteHalf) -> Result<()> {
        let reply = match ClientCommand::parse(line) {
            // Bulk creation emits an INFO line up front, then the DONE
            // line with the per-id acknowledgement count.
            Ok(ClientCommand::CreateAccounts {
                count,
                initial_balance,
            }) => {
                if self.registry.is_empty() {
                    Error::NoWorkersAvailable.wire_line()
                } else {
                    write_line(writer, &protocol::info_creating(count, initial_balance)).await?;
                    let created = self.create_accounts(count, initial_balance).await;
                    protocol::done_created(created)
                }
            }
            Ok(cmd) => match self.execute(cmd).await {
                Ok(reply) => reply,
                Err(e) => e.wire_line(),
            },
            Err(e) => e.wire_line(),
        };
        write_line(writer, &reply).await
    }

    async fn execute(&self, cmd: ClientCommand) -> Result<String> {
        match cmd {
            ClientCommand::ConsultAccount { account_id } => {
                self.forward(
                    account_id,
                    WorkerCommand::ConsultAccount { account_id },
                    self.config.query_timeout(),
                )
                .await
            }
            ClientCommand::Transfer { from, to, amount } => {
                transfer::execute(&self.router, &self.config, from, to, amount).await
            }
            ClientCommand::CreateLoan {
                account_id,
                amount,
                pending_amount,
            } => {
                self.forward(
                    account_id,
                    WorkerCommand::CreateLoan {
                        account_id,
                        amount,
                        pending_amount,
                    },
                    self.config.rpc_timeout(),
                )
                .await
            }
            ClientCommand::PayLoan {
                account_id,
                loan_id,
                amount,
            } => {
                self.forward(
                    account_id,
                    WorkerCommand::PayLoan {
                        account_id,
                        loan_id,
                        amount,
                    },
                    self.config.rpc_timeout(),
                )
                .await
            }
            ClientCommand::LoanStatus { account_id } => {
                self.forward(
                    account_id,
                    WorkerCommand::LoanStatus { account_id },
                    self.config.rpc_timeout(),
                )
                .await
            }
            ClientCommand::Arqueo => {
                let report = audit::run(&self.registry, self.config.audit_timeout()).await?;
                Ok(protocol::audit_reply(
                    report.total_balance,
                    report.total_accounts,
                ))
            }
            // Handled before execute(); kept for exhaustiveness
            ClientCommand::CreateAccounts { .. } => {
                Err(Error::Internal("bulk creation routed here".into()))
            }
        }
    }

    /// Route a single-shard command to its owning worker and hand the
    /// worker's reply back verbatim, error replies included.
    async fn forward(
        &self,
        account_id: i64,
        cmd: WorkerCommand,
        timeout: std::time::Duration,
    ) -> Result<String> {
        let worker = self.router.route(account_id)?;
        rpc::call(&worker, &cmd.to_line(), timeout).await
    }

    /// Create ids 1..=count, each on its single owning worker. An id
    /// counts as created only if that worker acknowledged it; routing
    /// failures and timeouts skip the id.
    async fn create_accounts(&self, count: u32, initial_balance: f64) -> u32 {
        let mut created = 0;
        for account_id in 1..=i64::from(count) {
            let cmd = WorkerCommand::CreateAccount {
                account_id,
                initial_balance,
            };
            match self.router.route(account_id) {
                Ok(worker) => {
                    match rpc::call(&worker, &cmd.to_line(), self.config.query_timeout()).await {
                        Ok(raw) => {
                            let reply = WorkerReply::new(raw);
                            if reply.is_ok() {
                                created += 1;
                            } else {
                                tracing::warn!(
                                    account = account_id,
                                    reply = reply.line(),
                                    "creation rejected"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::warn!(account = account_id, error = %e, "creation failed")
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(account = account_id, error = %e, "creation unroutable");
                }
            }
        }
        created
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}
