//! Wire protocol: newline-terminated lines, `|`-separated fields
//!
//! Both sides of the coordinator speak this vocabulary: clients submit
//! [`ClientCommand`] lines and workers answer [`WorkerCommand`] lines.
//! Replies are single lines whose first field is `OK`, `ERROR`, `INFO`,
//! `DONE` or `CONFIRMACION`.

use crate::common::{Error, Result};

/// Field delimiter within a line
pub const DELIM: char = '|';

/// Welcome line sent to a freshly registered client
pub const WELCOME: &str = "WELCOME|shardbank-coord";

/// Reply sent to peers that declare an unknown role
pub const UNKNOWN_ROLE: &str = "ERROR|UnknownRole";

/// A command submitted by a bank client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    CreateAccounts { count: u32, initial_balance: f64 },
    ConsultAccount { account_id: i64 },
    Transfer { from: i64, to: i64, amount: f64 },
    CreateLoan { account_id: i64, amount: f64, pending_amount: f64 },
    PayLoan { account_id: i64, loan_id: i64, amount: f64 },
    LoanStatus { account_id: i64 },
    Arqueo,
}

impl ClientCommand {
    /// Serialize to the wire line a client submits.
    pub fn to_line(&self) -> String {
        match self {
            ClientCommand::CreateAccounts {
                count,
                initial_balance,
            } => format!("CREATE_ACCOUNTS|{}|{}", count, initial_balance),
            ClientCommand::ConsultAccount { account_id } => {
                format!("CONSULTAR_CUENTA|{}", account_id)
            }
            ClientCommand::Transfer { from, to, amount } => {
                format!("TRANSFERIR_CUENTA|{}|{}|{}", from, to, amount)
            }
            ClientCommand::CreateLoan {
                account_id,
                amount,
                pending_amount,
            } => format!("CREAR_PRESTAMO|{}|{}|{}", account_id, amount, pending_amount),
            ClientCommand::PayLoan {
                account_id,
                loan_id,
                amount,
            } => format!("PAGAR_PRESTAMO|{}|{}|{}", account_id, loan_id, amount),
            ClientCommand::LoanStatus { account_id } => {
                format!("ESTADO_PAGO_PRESTAMO|{}", account_id)
            }
            ClientCommand::Arqueo => "ARQUEO".to_string(),
        }
    }

    /// Parse one client line. Arity is checked before any typed field is
    /// parsed; both too few fields and unparsable numerics are malformed.
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(DELIM).collect();
        match parts[0] {
            "CREATE_ACCOUNTS" => {
                require_arity(&parts, 3)?;
                Ok(ClientCommand::CreateAccounts {
                    count: parse_field(parts[1])?,
                    initial_balance: parse_field(parts[2])?,
                })
            }
            "CONSULTAR_CUENTA" => {
                require_arity(&parts, 2)?;
                Ok(ClientCommand::ConsultAccount {
                    account_id: parse_field(parts[1])?,
                })
            }
            "TRANSFERIR_CUENTA" => {
                require_arity(&parts, 4)?;
                Ok(ClientCommand::Transfer {
                    from: parse_field(parts[1])?,
                    to: parse_field(parts[2])?,
                    amount: parse_field(parts[3])?,
                })
            }
            "CREAR_PRESTAMO" => {
                require_arity(&parts, 4)?;
                Ok(ClientCommand::CreateLoan {
                    account_id: parse_field(parts[1])?,
                    amount: parse_field(parts[2])?,
                    pending_amount: parse_field(parts[3])?,
                })
            }
            "PAGAR_PRESTAMO" => {
                require_arity(&parts, 4)?;
                Ok(ClientCommand::PayLoan {
                    account_id: parse_field(parts[1])?,
                    loan_id: parse_field(parts[2])?,
                    amount: parse_field(parts[3])?,
                })
            }
            "ESTADO_PAGO_PRESTAMO" => {
                require_arity(&parts, 2)?;
                Ok(ClientCommand::LoanStatus {
                    account_id: parse_field(parts[1])?,
                })
            }
            "ARQUEO" => Ok(ClientCommand::Arqueo),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// A command the coordinator sends to a shard worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCommand {
    CreateAccount { account_id: i64, initial_balance: f64 },
    Debit { account_id: i64, amount: f64 },
    Credit { account_id: i64, amount: f64 },
    RecordTx { from: i64, to: i64, amount: f64 },
    ConsultAccount { account_id: i64 },
    CreateLoan { account_id: i64, amount: f64, pending_amount: f64 },
    PayLoan { account_id: i64, loan_id: i64, amount: f64 },
    LoanStatus { account_id: i64 },
    Arqueo,
}

impl WorkerCommand {
    /// Serialize to the wire line the worker receives.
    pub fn to_line(&self) -> String {
        match self {
            WorkerCommand::CreateAccount {
                account_id,
                initial_balance,
            } => format!("CREATE_ACCOUNT|{}|{}", account_id, initial_balance),
            WorkerCommand::Debit { account_id, amount } => {
                format!("DEBIT|{}|{}", account_id, amount)
            }
            WorkerCommand::Credit { account_id, amount } => {
                format!("CREDIT|{}|{}", account_id, amount)
            }
            WorkerCommand::RecordTx { from, to, amount } => {
                format!("RECORD_TX|{}|{}|{}", from, to, amount)
            }
            WorkerCommand::ConsultAccount { account_id } => {
                format!("CONSULTAR_CUENTA|{}", account_id)
            }
            WorkerCommand::CreateLoan {
                account_id,
                amount,
                pending_amount,
            } => format!("CREAR_PRESTAMO|{}|{}|{}", account_id, amount, pending_amount),
            WorkerCommand::PayLoan {
                account_id,
                loan_id,
                amount,
            } => format!("PAGAR_PRESTAMO|{}|{}|{}", account_id, loan_id, amount),
            WorkerCommand::LoanStatus { account_id } => {
                format!("ESTADO_PAGO_PRESTAMO|{}", account_id)
            }
            WorkerCommand::Arqueo => "ARQUEO".to_string(),
        }
    }

    /// Parse a line received from the coordinator (reference worker side).
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split(DELIM).collect();
        match parts[0] {
            "CREATE_ACCOUNT" => {
                require_arity(&parts, 3)?;
                Ok(WorkerCommand::CreateAccount {
                    account_id: parse_field(parts[1])?,
                    initial_balance: parse_field(parts[2])?,
                })
            }
            "DEBIT" => {
                require_arity(&parts, 3)?;
                Ok(WorkerCommand::Debit {
                    account_id: parse_field(parts[1])?,
                    amount: parse_field(parts[2])?,
                })
            }
            "CREDIT" => {
                require_arity(&parts, 3)?;
                Ok(WorkerCommand::Credit {
                    account_id: parse_field(parts[1])?,
                    amount: parse_field(parts[2])?,
                })
            }
            "RECORD_TX" => {
                require_arity(&parts, 4)?;
                Ok(WorkerCommand::RecordTx {
                    from: parse_field(parts[1])?,
                    to: parse_field(parts[2])?,
                    amount: parse_field(parts[3])?,
                })
            }
            "CONSULTAR_CUENTA" => {
                require_arity(&parts, 2)?;
                Ok(WorkerCommand::ConsultAccount {
                    account_id: parse_field(parts[1])?,
                })
            }
            "CREAR_PRESTAMO" => {
                require_arity(&parts, 4)?;
                Ok(WorkerCommand::CreateLoan {
                    account_id: parse_field(parts[1])?,
                    amount: parse_field(parts[2])?,
                    pending_amount: parse_field(parts[3])?,
                })
            }
            "PAGAR_PRESTAMO" => {
                require_arity(&parts, 4)?;
                Ok(WorkerCommand::PayLoan {
                    account_id: parse_field(parts[1])?,
                    loan_id: parse_field(parts[2])?,
                    amount: parse_field(parts[3])?,
                })
            }
            "ESTADO_PAGO_PRESTAMO" => {
                require_arity(&parts, 2)?;
                Ok(WorkerCommand::LoanStatus {
                    account_id: parse_field(parts[1])?,
                })
            }
            "ARQUEO" => Ok(WorkerCommand::Arqueo),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// A single-line reply received from a shard worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerReply {
    line: String,
}

impl WorkerReply {
    pub fn new(line: String) -> Self {
        Self { line }
    }

    /// A reply indicates success iff its first field is exactly `OK`.
    pub fn is_ok(&self) -> bool {
        self.line.split(DELIM).next() == Some("OK")
    }

    /// Fields after the leading status field.
    pub fn payload_fields(&self) -> impl Iterator<Item = &str> {
        self.line.split(DELIM).skip(1)
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn into_line(self) -> String {
        self.line
    }
}

/// `INFO` line announcing a bulk creation run
pub fn info_creating(count: u32, initial_balance: f64) -> String {
    format!("INFO|Creating {} accounts with initial {}", count, initial_balance)
}

/// `DONE` line terminating a bulk creation run
pub fn done_created(created: u32) -> String {
    format!("DONE|Created:{}", created)
}

/// Client-visible confirmation of a completed transfer
pub fn transfer_confirmation() -> String {
    "CONFIRMACION|Transferencia realizada".to_string()
}

/// Client-visible aggregate audit result
pub fn audit_reply(total_balance: f64, total_accounts: u64) -> String {
    format!("OK|TotalBalance:{}|TotalAccounts:{}", total_balance, total_accounts)
}

fn require_arity(parts: &[&str], expected: usize) -> Result<()> {
    if parts.len() < expected {
        return Err(Error::MalformedRequest(format!(
            "expected {} fields, got {}",
            expected,
            parts.len()
        )));
    }
    Ok(())
}

fn parse_field<T: std::str::FromStr>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::MalformedRequest(format!("unparsable field: {}", raw)))
}
