//! End-to-end order lifecycle tests driving the public crate API.
//!
//! Exercises the flows a counterparty session would see:
//! - Order intake with automatic acknowledgement
//! - Worker-driven fills, whole and sliced into partials
//! - Volume-weighted average price across mixed-price fills
//! - Cancel and replace request chains with client id rotation
//! - Cancel rejects for unknown orders and refused requests
//! - Execution busts, corrections, and don't-know-trade flags
//! - Worker shutdown mid-pacing
//! - Activity log capacity eviction and delivery identity

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use tokio::time::timeout;

use broker_sim::{
    ActivityLog, CancelRequest, ClientOrderId, Direction, ExecTransType, ExecType, Execution,
    ExecutionRegistry, FillWorker, FixedPriceFeed, LifecycleEngine, NewOrderRequest, OrderId,
    OrderRegistry, OrderStatus, OutboundMessage, Price, Quantity, RecordingTransport,
    ReplaceRequest, RequestKind, SessionId, Settings, Side, WorkerEvent, WorkerState,
};

/// Build a connected simulator over a recording transport.
fn make_simulator() -> (Arc<LifecycleEngine>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let engine = Arc::new(LifecycleEngine::new(
        Arc::new(OrderRegistry::new()),
        Arc::new(ExecutionRegistry::new()),
        Arc::new(ActivityLog::new()),
        transport.clone(),
        Settings::default(),
    ));
    engine.on_connect(SessionId::new("FIX.4.2:CLIENT->SIM"));
    (engine, transport)
}

/// Submit one order and return its engine-assigned id.
fn submit(engine: &LifecycleEngine, client_id: &str, symbol: &str, qty: i64) -> OrderId {
    engine
        .on_new_order(NewOrderRequest {
            client_order_id: ClientOrderId::new(client_id),
            symbol: symbol.to_string(),
            side: Side::Buy,
            quantity: Quantity::from_i64(qty),
            security: None,
        })
        .expect("order should be accepted")
}

/// Execution reports delivered over the transport, in send order.
fn execution_reports(transport: &RecordingTransport) -> Vec<Execution> {
    transport
        .sent()
        .into_iter()
        .filter_map(|(message, _)| match message {
            OutboundMessage::ExecutionReport(execution) => Some(execution),
            OutboundMessage::CancelReject(_) => None,
        })
        .collect()
}

/// Wait until the worker reports `count` orders worked.
async fn await_orders_worked(events: &mut broadcast::Receiver<WorkerEvent>, count: usize) {
    timeout(Duration::from_secs(5), async {
        let mut worked = 0;
        while worked < count {
            if let WorkerEvent::OrderWorked { .. } = events.recv().await.expect("event stream open")
            {
                worked += 1;
            }
        }
    })
    .await
    .expect("worker should report completion in time");
}

// ============================================
// Intake and Acknowledgement
// ============================================

#[test]
fn new_order_acknowledges_and_leaves_full_quantity() {
    let (engine, transport) = make_simulator();
    engine
        .settings()
        .apply(|config| config.engine.auto_acknowledge = true);

    let order_id = submit(&engine, "client-1", "AAPL", 100);

    let order = engine.orders().get(&order_id).expect("order recorded");
    assert_eq!(order.status(), OrderStatus::New);
    assert_eq!(order.open_qty(), Quantity::from_i64(100));
    assert_eq!(order.executed_qty(), Quantity::ZERO);
    assert_eq!(order.avg_px(), Price::ZERO);

    let reports = execution_reports(&transport);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].exec_type(), ExecType::New);
    assert_eq!(reports[0].exec_trans_type(), ExecTransType::New);
    assert_eq!(reports[0].leaves_qty(), Quantity::from_i64(100));
    assert_eq!(reports[0].cum_qty(), Quantity::ZERO);
}

#[test]
fn order_without_auto_acknowledge_waits_at_unknown() {
    let (engine, transport) = make_simulator();

    let order_id = submit(&engine, "client-1", "AAPL", 100);

    let order = engine.orders().get(&order_id).expect("order recorded");
    assert_eq!(order.status(), OrderStatus::Unknown);
    assert!(order.received_order());
    assert_eq!(transport.sent_count(), 0);
}

// ============================================
// Fills and Average Price
// ============================================

#[test]
fn mixed_price_partials_average_out() {
    let (engine, transport) = make_simulator();
    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine.acknowledge(&order_id).unwrap();

    engine
        .fill(&order_id, Quantity::from_i64(60), Price::new(dec!(10.00)))
        .unwrap();
    engine
        .fill(&order_id, Quantity::from_i64(40), Price::new(dec!(20.00)))
        .unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::Filled);
    assert_eq!(order.executed_qty(), Quantity::from_i64(100));
    assert_eq!(order.open_qty(), Quantity::ZERO);
    assert_eq!(order.avg_px(), Price::new(dec!(14.00)));

    let reports = execution_reports(&transport);
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1].exec_type(), ExecType::PartialFill);
    assert_eq!(reports[1].cum_qty(), Quantity::from_i64(60));
    assert_eq!(reports[2].exec_type(), ExecType::Fill);
    assert_eq!(reports[2].cum_qty(), Quantity::from_i64(100));
    assert_eq!(reports[2].avg_px(), Price::new(dec!(14.00)));
}

#[test]
fn overfill_clamps_to_open_quantity() {
    let (engine, transport) = make_simulator();
    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine.acknowledge(&order_id).unwrap();

    engine
        .fill(&order_id, Quantity::from_i64(150), Price::new(dec!(10.00)))
        .unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::Filled);
    assert_eq!(order.executed_qty(), Quantity::from_i64(100));

    let last = execution_reports(&transport).pop().unwrap();
    assert_eq!(last.exec_type(), ExecType::Fill);
    assert_eq!(last.last_shares(), Quantity::from_i64(100));
}

// ============================================
// Worker Fulfillment
// ============================================

#[tokio::test]
async fn worker_slices_an_order_into_partials() {
    let (engine, transport) = make_simulator();
    let feed = Arc::new(FixedPriceFeed::new());
    feed.set_price("AAPL", Price::new(dec!(10.00)));

    let worker = FillWorker::new(Arc::clone(&engine));
    let mut events = worker.subscribe();
    worker
        .start(Duration::from_millis(1), 4, feed)
        .expect("worker should start");

    let order_id = submit(&engine, "client-1", "AAPL", 100);
    await_orders_worked(&mut events, 1).await;
    worker.stop().await;

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::Filled);
    assert_eq!(order.executed_qty(), Quantity::from_i64(100));
    assert_eq!(order.avg_px(), Price::new(dec!(10.00)));

    // Acknowledgement first, then three partial slices of 25 and a
    // closing fill.
    let reports = execution_reports(&transport);
    assert_eq!(reports.len(), 5);
    assert_eq!(reports[0].exec_type(), ExecType::New);
    for report in &reports[1..4] {
        assert_eq!(report.exec_type(), ExecType::PartialFill);
        assert_eq!(report.last_shares(), Quantity::from_i64(25));
        assert_eq!(report.last_px(), Price::new(dec!(10.00)));
    }
    assert_eq!(reports[4].exec_type(), ExecType::Fill);
    assert_eq!(reports[4].last_shares(), Quantity::from_i64(25));
    assert_eq!(reports[4].leaves_qty(), Quantity::ZERO);

    assert_eq!(worker.state(), WorkerState::Stopped);
}

#[tokio::test]
async fn stopping_mid_pacing_exits_promptly() {
    let (engine, transport) = make_simulator();
    let feed = Arc::new(FixedPriceFeed::new());
    feed.set_price("AAPL", Price::new(dec!(10.00)));

    let worker = FillWorker::new(Arc::clone(&engine));
    worker
        .start(Duration::from_secs(60), 4, feed)
        .expect("worker should start");

    let order_id = submit(&engine, "client-1", "AAPL", 100);

    // Acknowledgement plus the first slice, then the worker sleeps.
    timeout(Duration::from_secs(5), async {
        while transport.sent_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first slice should land");

    let before = Instant::now();
    worker.stop().await;
    assert!(before.elapsed() < Duration::from_secs(5));
    assert!(!worker.is_running());

    let sent = transport.sent_count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.sent_count(), sent);

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::PartiallyFilled);
    assert_eq!(order.executed_qty(), Quantity::from_i64(25));
}

// ============================================
// Cancel and Replace Chains
// ============================================

#[test]
fn cancel_request_rotates_the_id_chain() {
    let (engine, transport) = make_simulator();
    engine.settings().apply(|config| {
        config.engine.auto_acknowledge = true;
        config.engine.auto_pending_cancel = true;
        config.engine.auto_cancel = true;
    });

    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine
        .on_cancel_request(CancelRequest {
            client_order_id: ClientOrderId::new("cancel-1"),
            orig_client_order_id: ClientOrderId::new("client-1"),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
        })
        .unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::Canceled);
    assert_eq!(order.client_order_id().as_str(), "cancel-1");
    assert_eq!(
        order.orig_client_order_id().map(ClientOrderId::as_str),
        Some("client-1")
    );

    let reports = execution_reports(&transport);
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].exec_type(), ExecType::New);
    assert_eq!(reports[1].exec_type(), ExecType::PendingCancel);
    assert_eq!(reports[2].exec_type(), ExecType::Canceled);
    assert_eq!(reports[2].client_order_id().as_str(), "cancel-1");
}

#[test]
fn replace_request_rotates_and_terminates() {
    let (engine, transport) = make_simulator();
    engine.settings().apply(|config| {
        config.engine.auto_acknowledge = true;
        config.engine.auto_pending_replace = true;
        config.engine.auto_replace = true;
    });

    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine
        .on_replace_request(ReplaceRequest {
            client_order_id: ClientOrderId::new("replace-1"),
            orig_client_order_id: ClientOrderId::new("client-1"),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            new_quantity: Quantity::from_i64(150),
        })
        .unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::Replaced);
    assert_eq!(order.client_order_id().as_str(), "replace-1");
    // The record terminates at Replaced; the requested quantity belongs
    // to the replacement chain, not this record.
    assert_eq!(order.ordered_qty(), Quantity::from_i64(100));

    let reports = execution_reports(&transport);
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1].exec_type(), ExecType::PendingReplace);
    assert_eq!(reports[2].exec_type(), ExecType::Replace);
}

#[test]
fn cancel_for_an_unknown_order_is_rejected() {
    let (engine, transport) = make_simulator();

    engine
        .on_cancel_request(CancelRequest {
            client_order_id: ClientOrderId::new("cancel-1"),
            orig_client_order_id: ClientOrderId::new("missing"),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
        })
        .unwrap();

    let (message, _) = transport.last().expect("reject delivered");
    let OutboundMessage::CancelReject(reject) = message else {
        panic!("expected a cancel reject, got {message:?}");
    };
    assert!(reject.order_id.is_none());
    assert_eq!(reject.status, OrderStatus::Rejected);
    assert_eq!(reject.refused, RequestKind::Cancel);
    assert!(engine.executions().is_empty());
}

#[test]
fn refusing_a_cancel_request_keeps_the_order_working() {
    let (engine, transport) = make_simulator();
    engine
        .settings()
        .apply(|config| config.engine.auto_acknowledge = true);

    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine
        .on_cancel_request(CancelRequest {
            client_order_id: ClientOrderId::new("cancel-1"),
            orig_client_order_id: ClientOrderId::new("client-1"),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
        })
        .unwrap();
    engine.reject_cancel_replace(&order_id).unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::New);
    assert!(!order.pending_request().is_pending());

    let (message, _) = transport.last().expect("reject delivered");
    let OutboundMessage::CancelReject(reject) = message else {
        panic!("expected a cancel reject, got {message:?}");
    };
    assert_eq!(reject.order_id.as_ref(), Some(&order_id));
    assert_eq!(reject.refused, RequestKind::Cancel);
    // The refusal is not an execution.
    assert_eq!(engine.executions().len(), 1);
}

// ============================================
// Busts, Corrections, and DK
// ============================================

#[test]
fn busting_the_only_fill_restores_the_order() {
    let (engine, transport) = make_simulator();
    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine.acknowledge(&order_id).unwrap();
    engine
        .fill(&order_id, Quantity::from_i64(50), Price::new(dec!(10.00)))
        .unwrap();

    let fill_id = engine.executions().snapshot()[1].id().clone();
    engine.bust(&fill_id).unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::New);
    assert_eq!(order.executed_qty(), Quantity::ZERO);
    assert_eq!(order.open_qty(), Quantity::from_i64(100));
    assert_eq!(order.avg_px(), Price::ZERO);

    let busted = execution_reports(&transport).pop().unwrap();
    assert_eq!(busted.exec_trans_type(), ExecTransType::Cancel);
    assert_eq!(busted.ref_id(), Some(&fill_id));
    assert_eq!(busted.last_shares(), Quantity::from_i64(50));
    assert_eq!(busted.cum_qty(), Quantity::ZERO);
    assert_eq!(busted.leaves_qty(), Quantity::from_i64(100));
}

#[test]
fn correcting_a_fill_amends_the_price() {
    let (engine, transport) = make_simulator();
    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine.acknowledge(&order_id).unwrap();
    engine
        .fill(&order_id, Quantity::from_i64(50), Price::new(dec!(10.00)))
        .unwrap();

    let fill_id = engine.executions().snapshot()[1].id().clone();
    engine
        .correct(&fill_id, Quantity::from_i64(50), Price::new(dec!(12.00)))
        .unwrap();

    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::PartiallyFilled);
    assert_eq!(order.executed_qty(), Quantity::from_i64(50));
    assert_eq!(order.avg_px(), Price::new(dec!(12.00)));

    let corrected = execution_reports(&transport).pop().unwrap();
    assert_eq!(corrected.exec_trans_type(), ExecTransType::Correct);
    assert_eq!(corrected.ref_id(), Some(&fill_id));
    assert_eq!(corrected.last_shares(), Quantity::from_i64(50));
    assert_eq!(corrected.last_px(), Price::new(dec!(12.00)));
}

#[test]
fn dont_know_trade_flags_the_execution() {
    let (engine, _transport) = make_simulator();
    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine.acknowledge(&order_id).unwrap();
    engine
        .fill(&order_id, Quantity::from_i64(50), Price::new(dec!(10.00)))
        .unwrap();

    let fill_id = engine.executions().snapshot()[1].id().clone();
    engine.on_dont_know_trade(&fill_id).unwrap();

    let execution = engine.executions().lookup(&fill_id).unwrap();
    assert!(execution.dk());
}

// ============================================
// Audit Trail and Delivery Identity
// ============================================

#[test]
fn activity_log_evicts_oldest_beyond_capacity() {
    let (engine, _transport) = make_simulator();
    engine.settings().apply(|config| {
        config.engine.auto_acknowledge = true;
        config.log.capacity = 5;
    });

    // Each order contributes one inbound entry and one outbound entry.
    for i in 0..4 {
        submit(&engine, &format!("client-{i}"), "AAPL", 100);
    }

    let entries = engine.activity().snapshot();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0].index, 3);
    assert_eq!(entries[4].index, 7);
    assert_eq!(entries[4].direction, Direction::Outbound);
    assert!(entries[3].summary.starts_with("NewOrderSingle"));
}

#[test]
fn delivery_carries_on_behalf_of_identity() {
    let (engine, transport) = make_simulator();
    engine.settings().apply(|config| {
        config.engine.auto_acknowledge = true;
        config.delivery.send_on_behalf_of_comp_id = true;
        config.delivery.on_behalf_of_comp_id = "SIMBROKER".to_string();
    });

    submit(&engine, "client-1", "AAPL", 100);

    let (_, context) = transport.last().expect("ack delivered");
    assert_eq!(context.session.as_str(), "FIX.4.2:CLIENT->SIM");
    assert_eq!(context.on_behalf_of_comp_id.as_deref(), Some("SIMBROKER"));
    assert!(context.on_behalf_of_sub_id.is_none());
}

#[test]
fn disconnect_drops_deliveries_but_keeps_state() {
    let (engine, transport) = make_simulator();
    let order_id = submit(&engine, "client-1", "AAPL", 100);
    engine.on_disconnect();

    engine.acknowledge(&order_id).unwrap();

    assert_eq!(transport.sent_count(), 0);
    let order = engine.orders().get(&order_id).unwrap();
    assert_eq!(order.status(), OrderStatus::New);
    // The execution record stands even though delivery was dropped.
    assert_eq!(engine.executions().len(), 1);
}
