//! Integration tests: dispatch, routing, transfers, audit, bulk creation

mod common;

use common::{echo_ok, fast_config, spawn_coordinator, wait_for_workers, MockWorker, ScriptAction};

#[tokio::test]
async fn dispatch_errors_leave_connection_open() {
    let (addr, _registry) = spawn_coordinator(fast_config()).await;
    let mut client = common::TestClient::connect(addr).await;

    assert_eq!(client.request("FROBNICATE|1").await, "ERROR|UnknownCommand");
    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2").await,
        "ERROR|FormatoInvalido"
    );
    assert_eq!(
        client.request("CONSULTAR_CUENTA|abc").await,
        "ERROR|FormatoInvalido"
    );

    // Registry is empty: every routed command answers NoWorkers
    assert_eq!(client.request("CONSULTAR_CUENTA|5").await, "ERROR|NoWorkers");
    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|50").await,
        "ERROR|NoWorkers"
    );
    assert_eq!(client.request("ARQUEO").await, "ERROR|NoWorkers");
    assert_eq!(
        client.request("CREATE_ACCOUNTS|3|10").await,
        "ERROR|NoWorkers"
    );

    // The connection survived all of the above
    assert_eq!(client.request("FROBNICATE|2").await, "ERROR|UnknownCommand");
}

#[tokio::test]
async fn consult_routes_to_owning_worker() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;
    let w1 = MockWorker::join(addr, "w1", echo_ok("w1")).await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;

    // 4 % 2 == 0 → w0, 5 % 2 == 1 → w1
    assert_eq!(
        client.request("CONSULTAR_CUENTA|4").await,
        "OK|w0|CONSULTAR_CUENTA|4"
    );
    assert_eq!(
        client.request("CONSULTAR_CUENTA|5").await,
        "OK|w1|CONSULTAR_CUENTA|5"
    );

    assert_eq!(w0.received(), vec!["CONSULTAR_CUENTA|4"]);
    assert_eq!(w1.received(), vec!["CONSULTAR_CUENTA|5"]);
}

#[tokio::test]
async fn negative_account_id_fails_resolution() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let _w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;
    let _w1 = MockWorker::join(addr, "w1", echo_ok("w1")).await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;

    // -7 % 2 == -1: the index keeps the dividend's sign and no worker
    // lives at a negative position
    assert_eq!(
        client.request("CONSULTAR_CUENTA|-7").await,
        "ERROR|WorkerUnavailable"
    );
    // A multiple of the worker count still lands on shard 0
    assert_eq!(
        client.request("CONSULTAR_CUENTA|-4").await,
        "OK|w0|CONSULTAR_CUENTA|-4"
    );
}

#[tokio::test]
async fn transfer_success_debits_and_credits_once() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;
    let w1 = MockWorker::join(addr, "w1", echo_ok("w1")).await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;

    // from=1 → w1, to=2 → w0
    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|100").await,
        "CONFIRMACION|Transferencia realizada"
    );

    assert_eq!(w1.received(), vec!["DEBIT|1|100", "RECORD_TX|1|2|100"]);
    assert_eq!(w0.received(), vec!["CREDIT|2|100", "RECORD_TX|1|2|100"]);
}

#[tokio::test]
async fn transfer_within_one_worker() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;

    let mut client = common::TestClient::connect(addr).await;

    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|25").await,
        "CONFIRMACION|Transferencia realizada"
    );
    // Both sides resolve to the same handle; all four exchanges are
    // serialized on it
    assert_eq!(
        w0.received(),
        vec![
            "DEBIT|1|25",
            "CREDIT|2|25",
            "RECORD_TX|1|2|25",
            "RECORD_TX|1|2|25"
        ]
    );
}

#[tokio::test]
async fn transfer_credit_failure_compensates_source() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    // w0 owns the destination and rejects credits
    let w0 = MockWorker::join(addr, "w0", |cmd: &str| {
        if cmd.starts_with("CREDIT") {
            ScriptAction::Reply("ERROR|NoExiste".to_string())
        } else {
            ScriptAction::Reply("OK".to_string())
        }
    })
    .await;
    wait_for_workers(&registry, 1).await;
    let w1 = MockWorker::join(addr, "w1", echo_ok("w1")).await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;

    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|100").await,
        "ERROR|CreditFailed|ERROR|NoExiste"
    );

    // Exactly one compensating credit back to the source, no RECORD_TX
    assert_eq!(w1.received(), vec!["DEBIT|1|100", "CREDIT|1|100"]);
    assert_eq!(w0.received(), vec!["CREDIT|2|100"]);
}

#[tokio::test]
async fn transfer_debit_failure_stops_the_saga() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;
    // w1 owns the source and rejects debits
    let w1 = MockWorker::join(addr, "w1", |cmd: &str| {
        if cmd.starts_with("DEBIT") {
            ScriptAction::Reply("ERROR|SaldoInsuficiente".to_string())
        } else {
            ScriptAction::Reply("OK".to_string())
        }
    })
    .await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;

    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|100").await,
        "ERROR|DebitFailed|ERROR|SaldoInsuficiente"
    );

    // No credit, no compensation: money never moved
    assert_eq!(w1.received(), vec!["DEBIT|1|100"]);
    assert!(w0.received().is_empty());
}

#[tokio::test]
async fn transfer_rejects_non_positive_amount() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;

    let mut client = common::TestClient::connect(addr).await;
    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|-5").await,
        "ERROR|FormatoInvalido"
    );
    assert_eq!(
        client.request("TRANSFERIR_CUENTA|1|2|0").await,
        "ERROR|FormatoInvalido"
    );
    assert!(w0.received().is_empty());
}

#[tokio::test]
async fn arqueo_excludes_silent_workers() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let _w0 = MockWorker::join(addr, "w0", |_: &str| {
        ScriptAction::Reply("OK|100|2".to_string())
    })
    .await;
    wait_for_workers(&registry, 1).await;
    let _w1 = MockWorker::join(addr, "w1", |_: &str| {
        ScriptAction::Reply("OK|50|1".to_string())
    })
    .await;
    wait_for_workers(&registry, 2).await;
    // w2 never answers: it must be excluded from the totals, not
    // treated as zero and not aborting the audit
    let _w2 = MockWorker::join(addr, "w2", |_: &str| ScriptAction::Ignore).await;
    wait_for_workers(&registry, 3).await;

    let mut client = common::TestClient::connect(addr).await;
    assert_eq!(
        client.request("ARQUEO").await,
        "OK|TotalBalance:150|TotalAccounts:3"
    );
}

#[tokio::test]
async fn arqueo_excludes_malformed_partials() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let _w0 = MockWorker::join(addr, "w0", |_: &str| {
        ScriptAction::Reply("OK|75.5|4".to_string())
    })
    .await;
    wait_for_workers(&registry, 1).await;
    let _w1 = MockWorker::join(addr, "w1", |_: &str| {
        ScriptAction::Reply("OK|not-a-number|1".to_string())
    })
    .await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;
    assert_eq!(
        client.request("ARQUEO").await,
        "OK|TotalBalance:75.5|TotalAccounts:4"
    );
}

#[tokio::test]
async fn bulk_create_routes_each_id_to_its_owner() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;
    let w1 = MockWorker::join(addr, "w1", echo_ok("w1")).await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;
    client.send("CREATE_ACCOUNTS|5|10").await;
    assert_eq!(
        client.read_line().await,
        "INFO|Creating 5 accounts with initial 10"
    );
    assert_eq!(client.read_line().await, "DONE|Created:5");

    // Even ids on w0, odd ids on w1, each exactly once — never broadcast
    assert_eq!(
        w0.received(),
        vec!["CREATE_ACCOUNT|2|10", "CREATE_ACCOUNT|4|10"]
    );
    assert_eq!(
        w1.received(),
        vec![
            "CREATE_ACCOUNT|1|10",
            "CREATE_ACCOUNT|3|10",
            "CREATE_ACCOUNT|5|10"
        ]
    );
}

#[tokio::test]
async fn bulk_create_counts_only_acknowledged_ids() {
    let (addr, registry) = spawn_coordinator(fast_config()).await;
    let _w0 = MockWorker::join(addr, "w0", echo_ok("w0")).await;
    wait_for_workers(&registry, 1).await;
    // w1 rejects every creation
    let _w1 = MockWorker::join(addr, "w1", |_: &str| {
        ScriptAction::Reply("ERROR|Full".to_string())
    })
    .await;
    wait_for_workers(&registry, 2).await;

    let mut client = common::TestClient::connect(addr).await;
    client.send("CREATE_ACCOUNTS|4|10").await;
    let _info = client.read_line().await;
    // ids 2 and 4 land on w0 and succeed; 1 and 3 are rejected by w1
    assert_eq!(client.read_line().await, "DONE|Created:2");
}
