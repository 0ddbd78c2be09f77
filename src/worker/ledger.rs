//! In-memory shard ledger for the reference worker
//!
//! Holds the accounts, per-account transaction log and loans of one
//! shard, and answers each coordinator command with its wire reply line.
//! The whole ledger optionally snapshots to a JSON file after every
//! mutation and is reloaded at startup; snapshot failures are logged,
//! not fatal.

use crate::common::protocol::WorkerCommand;
use crate::common::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(rename = "id_cliente")]
    pub customer_id: i64,
    pub balance: f64,
    pub loans: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanState {
    Activo,
    Cancelado,
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanState::Activo => write!(f, "Activo"),
            LoanState::Cancelado => write!(f, "Cancelado"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub customer_id: i64,
    pub amount: f64,
    pub pending_amount: f64,
    pub state: LoanState,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Debit,
    Credit,
    TransferIn,
    TransferOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub kind: TxKind,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    accounts: HashMap<i64, Account>,
    transactions: HashMap<i64, Vec<TxRecord>>,
    loans: HashMap<i64, Vec<Loan>>,
    loan_counter: i64,
}

pub struct Ledger {
    state: LedgerState,
    snapshot_path: Option<PathBuf>,
}

impl Ledger {
    /// Open a ledger, reloading the snapshot if one exists at `path`.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let state = match &path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                serde_json::from_str(&raw)
                    .map_err(|e| crate::Error::Internal(format!("snapshot corrupted: {}", e)))?
            }
            _ => LedgerState::default(),
        };
        Ok(Self {
            state,
            snapshot_path: path,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            state: LedgerState::default(),
            snapshot_path: None,
        }
    }

    /// Apply one coordinator command and produce its reply line.
    pub fn apply(&mut self, cmd: &WorkerCommand) -> String {
        let reply = self.dispatch(cmd);
        if cmd_mutates(cmd) {
            self.snapshot();
        }
        reply
    }

    pub fn account(&self, id: i64) -> Option<&Account> {
        self.state.accounts.get(&id)
    }

    pub fn transactions(&self, id: i64) -> &[TxRecord] {
        self.state
            .transactions
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Partial audit totals for this shard.
    pub fn totals(&self) -> (f64, u64) {
        let balance = self.state.accounts.values().map(|a| a.balance).sum();
        (balance, self.state.accounts.len() as u64)
    }

    fn dispatch(&mut self, cmd: &WorkerCommand) -> String {
        match *cmd {
            WorkerCommand::CreateAccount {
                account_id,
                initial_balance,
            } => {
                self.state.accounts.insert(
                    account_id,
                    Account {
                        id: account_id,
                        customer_id: account_id,
                        balance: initial_balance,
                        loans: Vec::new(),
                    },
                );
                "OK".to_string()
            }
            WorkerCommand::ConsultAccount { account_id } => {
                match self.state.accounts.get(&account_id) {
                    Some(account) => match serde_json::to_string(account) {
                        Ok(json) => format!("OK|{}", json),
                        Err(e) => format!("ERROR|{}", e),
                    },
                    None => "ERROR|NoExiste".to_string(),
                }
            }
            WorkerCommand::Debit { account_id, amount } => {
                let Some(account) = self.state.accounts.get_mut(&account_id) else {
                    return "ERROR|NoExiste".to_string();
                };
                if account.balance < amount {
                    return "ERROR|SaldoInsuficiente".to_string();
                }
                account.balance -= amount;
                self.state.transactions.entry(account_id).or_default().push(TxRecord {
                    kind: TxKind::Debit,
                    amount,
                    from: None,
                    to: None,
                });
                "OK".to_string()
            }
            WorkerCommand::Credit { account_id, amount } => {
                let Some(account) = self.state.accounts.get_mut(&account_id) else {
                    return "ERROR|NoExiste".to_string();
                };
                account.balance += amount;
                self.state.transactions.entry(account_id).or_default().push(TxRecord {
                    kind: TxKind::Credit,
                    amount,
                    from: None,
                    to: None,
                });
                "OK".to_string()
            }
            WorkerCommand::RecordTx { from, to, amount } => {
                self.state.transactions.entry(from).or_default().push(TxRecord {
                    kind: TxKind::TransferOut,
                    amount,
                    from: None,
                    to: Some(to),
                });
                self.state.transactions.entry(to).or_default().push(TxRecord {
                    kind: TxKind::TransferIn,
                    amount,
                    from: Some(from),
                    to: None,
                });
                "OK".to_string()
            }
            WorkerCommand::CreateLoan {
                account_id,
                amount,
                pending_amount,
            } => {
                let Some(account) = self.state.accounts.get_mut(&account_id) else {
                    return "ERROR|NoExiste".to_string();
                };
                self.state.loan_counter += 1;
                let loan_id = self.state.loan_counter;
                account.loans.push(loan_id);
                let customer_id = account.customer_id;
                self.state.loans.entry(account_id).or_default().push(Loan {
                    id: loan_id,
                    customer_id,
                    amount,
                    pending_amount,
                    state: LoanState::Activo,
                    requested_at: Utc::now(),
                });
                format!("OK|LoanID:{}", loan_id)
            }
            WorkerCommand::PayLoan {
                account_id,
                loan_id,
                amount,
            } => {
                if !self.state.accounts.contains_key(&account_id) {
                    return "ERROR|NoExiste".to_string();
                }
                let loans = self.state.loans.entry(account_id).or_default();
                let Some(loan) = loans.iter_mut().find(|l| l.id == loan_id) else {
                    return "ERROR|PrestamoNoExiste".to_string();
                };
                if loan.pending_amount < amount {
                    return "ERROR|MontoExcedeMontoPendiente".to_string();
                }
                loan.pending_amount -= amount;
                if loan.pending_amount <= 0.0 {
                    loan.pending_amount = 0.0;
                    loan.state = LoanState::Cancelado;
                }
                format!("OK|MontoRestante:{:.2}", loan.pending_amount)
            }
            WorkerCommand::LoanStatus { account_id } => {
                if !self.state.accounts.contains_key(&account_id) {
                    return "ERROR|NoExiste".to_string();
                }
                let summaries: Vec<_> = self
                    .state
                    .loans
                    .get(&account_id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
                    .iter()
                    .map(|loan| {
                        serde_json::json!({
                            "id_prestamo": loan.id,
                            "monto_total": loan.amount,
                            "monto_pagado": loan.amount - loan.pending_amount,
                            "monto_pendiente": loan.pending_amount,
                            "estado": loan.state.to_string(),
                            "fecha_solicitud": loan.requested_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        })
                    })
                    .collect();
                match serde_json::to_string(&summaries) {
                    Ok(json) => format!("OK|{}", json),
                    Err(e) => format!("ERROR|{}", e),
                }
            }
            WorkerCommand::Arqueo => {
                let (balance, accounts) = self.totals();
                format!("OK|{}|{}", balance, accounts)
            }
        }
    }

    fn snapshot(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let result = serde_json::to_string_pretty(&self.state)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "ledger snapshot failed");
        }
    }
}

fn cmd_mutates(cmd: &WorkerCommand) -> bool {
    !matches!(
        cmd,
        WorkerCommand::ConsultAccount { .. }
            | WorkerCommand::LoanStatus { .. }
            | WorkerCommand::Arqueo
    )
}
