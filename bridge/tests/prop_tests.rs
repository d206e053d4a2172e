//! Property-based tests for change detection and connection accounting.

use std::sync::{Arc, Mutex};

use chainview_bridge::{
    BlockTip, BridgeConfig, ChangeEmitter, ClientBridge, ClientNotification, MempoolStats,
    NotificationBus, PollObservation, MAX_POLL_INTERVAL_MS,
};
use chainview_nullables::{NullEventRegistry, NullNode};
use chainview_types::{ConnectionDirection, Timestamp};
use proptest::prelude::*;

fn arb_observation() -> impl Strategy<Value = PollObservation> {
    // Small value ranges so repeats are common.
    (
        proptest::option::of((0u64..3, 0u64..2)),
        proptest::option::of((0u64..2, 0u64..2)),
    )
        .prop_map(|(tip, mempool)| PollObservation {
            block_tip: tip.map(|(height, time)| BlockTip {
                height,
                time: Timestamp::new(time),
            }),
            mempool: mempool.map(|(tx_count, bytes)| MempoolStats { tx_count, bytes }),
            traffic: None,
        })
}

fn recording_emitter() -> (ChangeEmitter, Arc<Mutex<Vec<ClientNotification>>>) {
    let bus = Arc::new(NotificationBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen);
        bus.subscribe(Box::new(move |n: &ClientNotification| {
            seen.lock().unwrap().push(n.clone())
        }));
    }
    (ChangeEmitter::new(bus), seen)
}

proptest! {
    /// A field is announced exactly when it differs from the last value
    /// announced for it. Missing observations leave it untouched.
    #[test]
    fn emits_iff_value_differs_from_last_emitted(
        observations in proptest::collection::vec(arb_observation(), 1..40)
    ) {
        let (emitter, seen) = recording_emitter();
        let mut last_tip: Option<BlockTip> = None;
        let mut last_mempool: Option<MempoolStats> = None;

        for observation in &observations {
            seen.lock().unwrap().clear();
            let emitted = emitter.observe_poll(observation);

            let mut expected = Vec::new();
            if let Some(tip) = observation.block_tip {
                if last_tip != Some(tip) {
                    last_tip = Some(tip);
                    expected.push(ClientNotification::NumBlocksChanged {
                        count: tip.height,
                        block_time: tip.time,
                    });
                }
            }
            if let Some(mempool) = observation.mempool {
                if last_mempool != Some(mempool) {
                    last_mempool = Some(mempool);
                    expected.push(ClientNotification::MempoolSizeChanged {
                        count: mempool.tx_count,
                        bytes: mempool.bytes,
                    });
                }
            }

            prop_assert_eq!(emitted, expected.len());
            prop_assert_eq!(&*seen.lock().unwrap(), &expected);
        }
    }

    #[test]
    fn connection_count_sequence_has_no_adjacent_repeats(
        counts in proptest::collection::vec(0usize..4, 1..60)
    ) {
        let (emitter, seen) = recording_emitter();
        for count in &counts {
            emitter.observe_num_connections(*count);
        }

        let mut expected: Vec<usize> = counts.clone();
        expected.dedup();
        let announced: Vec<usize> = seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                ClientNotification::NumConnectionsChanged(c) => Some(*c),
                _ => None,
            })
            .collect();
        prop_assert_eq!(announced, expected);
    }

    #[test]
    fn inbound_plus_outbound_equals_all(inbound in 0usize..200, outbound in 0usize..200) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let node = Arc::new(NullNode::new());
        node.set_connections(inbound, outbound);
        let bridge = ClientBridge::builder()
            .config(Arc::new(BridgeConfig {
                poll_interval_ms: MAX_POLL_INTERVAL_MS,
                ..BridgeConfig::default()
            }))
            .node(node)
            .registry(Arc::new(NullEventRegistry::new()))
            .runtime(rt.handle().clone())
            .build()
            .unwrap();

        prop_assert_eq!(
            bridge.num_connections(ConnectionDirection::Inbound)
                + bridge.num_connections(ConnectionDirection::Outbound),
            bridge.num_connections(ConnectionDirection::All)
        );
        prop_assert_eq!(bridge.num_connections_all(), inbound + outbound);
    }
}
